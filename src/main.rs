//! GameAnalytics Editor - console front end
//!
//! Line-based stand-in for the editor settings page: log in, pick a studio
//! and game per platform, and edit the persisted project settings.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use gameanalytics_editor::account::ClientOptions;
use gameanalytics_editor::app::{
    App, LaunchOverrides, NoticeKind, Platform, SettingsFlag, SettingsList, DEFAULT_CONFIG_FILE,
};

const DOCUMENTATION_URL: &str = "http://support.gameanalytics.com";
const SIGNUP_URL: &str = "https://go.gameanalytics.com/signup";

/// How often the console polls for account results after `login`
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const HELP: &str = "\
Commands:
  user <email>                 set the account username (saved)
  password <password>          set the password (kept in memory only)
  login                        log in and load studios
  studios                      list studios and games
  studio <platform> <n>        pick studio n for a platform
  game <platform> <n>          pick game n of the platform's studio
  build <platform> <value>     set the platform's build version
  list <name> [values...]      set a list (dimensions01..03, currencies, itemtypes)
  flag <name> <true|false>     set a flag (manualsessions, infolog, verboselog)
  show                         print current settings
  effective                    print settings with command-line overrides applied
  docs                         open the documentation
  signup                       open the sign-up page
  help                         show this text
  quit                         exit
Platforms: ios, android, mac, windows, linux, html5";

/// Command-line options
struct CliArgs {
    config: PathBuf,
    timeout: Option<Duration>,
    build: Option<String>,
    overrides: LaunchOverrides,
}

impl CliArgs {
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut cli = Self {
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            timeout: None,
            build: None,
            overrides: LaunchOverrides::from_args(&args),
        };

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => {
                    let value = iter.next().context("--config needs a path")?;
                    cli.config = PathBuf::from(value);
                }
                "--timeout-secs" => {
                    let value = iter.next().context("--timeout-secs needs a value")?;
                    let secs: u64 = value
                        .parse()
                        .with_context(|| format!("Invalid timeout: {}", value))?;
                    cli.timeout = Some(Duration::from_secs(secs));
                }
                "--build" => {
                    cli.build = Some(iter.next().context("--build needs a value")?.clone());
                }
                "-h" | "--help" => {
                    println!(
                        "Usage: ga-editor [--config <path>] [--timeout-secs <n>] \
                         [--build <version>] [-GA<Flag>...]"
                    );
                    println!();
                    println!("{}", HELP);
                    std::process::exit(0);
                }
                other if other.to_ascii_lowercase().starts_with("-ga") => {}
                other => bail!("Unknown argument: {}", other),
            }
        }

        Ok(cli)
    }
}

enum Flow {
    Continue,
    Quit,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("GameAnalytics Editor v{}", env!("CARGO_PKG_VERSION"));
    info!("Platform: {}", std::env::consts::OS);

    let cli = CliArgs::parse()?;

    // Create tokio runtime for async operations
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let mut options = ClientOptions::default();
    if let Some(timeout) = cli.timeout {
        options = options.with_timeout(timeout);
    }

    let mut app = App::new(runtime.handle().clone(), &cli.config, options)?;
    println!("{}", HELP);

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let flow = match run_command(&mut app, &cli, line.trim_end_matches(['\r', '\n'])) {
            Ok(flow) => flow,
            Err(e) => {
                println!("Error: {:#}", e);
                Flow::Continue
            }
        };
        print_notices(&mut app);

        if let Flow::Quit = flow {
            break;
        }
    }

    Ok(())
}

/// Split a line into the command word and the raw text after the single
/// separator that follows it
fn split_command(line: &str) -> (&str, &str) {
    let line = line.trim_start();
    line.split_once(char::is_whitespace).unwrap_or((line, ""))
}

fn run_command(app: &mut App, cli: &CliArgs, line: &str) -> Result<Flow> {
    let (command, raw_rest) = split_command(line);
    if command.is_empty() {
        return Ok(Flow::Continue);
    }
    let rest: Vec<&str> = raw_rest.split_whitespace().collect();

    match command {
        "user" => {
            if app.edit_username(raw_rest.trim())? {
                println!("Username saved");
            }
        }
        "password" => {
            // taken verbatim, spaces included
            app.edit_password(raw_rest);
        }
        "login" => login(app),
        "studios" => print_studios(app),
        "studio" => {
            let (platform, index) = platform_and_index(&rest)?;
            let studio = app
                .studio(index)
                .with_context(|| format!("No studio #{}", index + 1))?;
            app.select_studio(platform, studio);
        }
        "game" => {
            let (platform, index) = platform_and_index(&rest)?;
            let game = app
                .selection(platform)
                .studio
                .as_ref()
                .with_context(|| format!("Select a studio for {} first", platform))?
                .games
                .get(index)
                .cloned()
                .with_context(|| format!("No game #{}", index + 1))?;
            if let Err(e) = app.select_game(platform, game) {
                warn!("Game not assigned: {}", e);
            }
        }
        "build" => {
            let [platform, value] = rest[..] else {
                bail!("Usage: build <platform> <value>");
            };
            app.set_build(parse_platform(platform)?, value)?;
        }
        "list" => {
            let Some((name, values)) = rest.split_first() else {
                bail!("Usage: list <name> [values...]");
            };
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            app.set_list(parse_list(name)?, &values)?;
        }
        "flag" => {
            let [name, value] = rest[..] else {
                bail!("Usage: flag <name> <true|false>");
            };
            let value = match value.to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => true,
                "false" | "off" | "0" => false,
                other => bail!("Not a boolean: {}", other),
            };
            app.set_flag(parse_flag(name)?, value)?;
        }
        "show" => print_settings(app),
        "effective" => {
            let settings = app.effective_settings(cli.build.as_deref(), cli.overrides);
            let keys = settings.current_keys();
            println!(
                "{}: game key {:?}, build {:?}",
                Platform::current(),
                keys.game_key,
                keys.build
            );
            println!(
                "Info log: {}, Verbose log: {}",
                settings.info_log_build, settings.verbose_log_build
            );
        }
        "docs" => open_url(DOCUMENTATION_URL),
        "signup" => open_url(SIGNUP_URL),
        "help" => println!("{}", HELP),
        "quit" | "exit" => return Ok(Flow::Quit),
        other => println!("Unknown command: {} (try 'help')", other),
    }

    Ok(Flow::Continue)
}

/// Start a login and pump results until the client is idle
fn login(app: &mut App) {
    if app.username().is_empty() {
        println!("Set a username first");
        return;
    }
    if app.login().is_none() {
        println!("Login not started");
        return;
    }

    while app.is_busy() {
        app.update();
        std::thread::sleep(POLL_INTERVAL);
    }
    app.update();
}

fn print_notices(app: &mut App) {
    for notice in app.take_notices() {
        match notice.kind {
            NoticeKind::Dialog => println!("\n{}\n", notice.text),
            NoticeKind::Warning => println!("Warning: {}", notice.text),
        }
    }
}

fn print_studios(app: &App) {
    let studios = app.studios();
    if studios.is_empty() {
        println!("No studios loaded (log in first)");
        return;
    }
    for (i, studio) in studios.iter().enumerate() {
        println!("{}. {}", i + 1, studio.name);
        for (j, game) in studio.games.iter().enumerate() {
            println!("     {}. {} [{}]", j + 1, game.name, game.game_key);
        }
    }
}

fn print_settings(app: &App) {
    let settings = app.settings();
    println!("Config: {:?}", app.config_path());
    println!("Username: {}", settings.username);
    for platform in Platform::all() {
        let keys = settings.keys_for(*platform);
        let selection = app.selection(*platform);
        println!(
            "{:<8} studio: {:<20} game: {:<20} key: {:<34} build: {}",
            platform.display_name(),
            selection.studio_label(),
            selection.game_label(),
            keys.game_key,
            keys.build
        );
    }
    for list in SettingsList::all() {
        println!("{}: {:?}", list.config_key(), settings.list(*list));
    }
    for flag in [
        SettingsFlag::UseManualSessionHandling,
        SettingsFlag::InfoLogBuild,
        SettingsFlag::VerboseLogBuild,
    ] {
        println!("{}: {}", flag.config_key(), settings.flag(flag));
    }
}

fn open_url(url: &str) {
    info!("Opening {}", url);
    if let Err(e) = open::that(url) {
        warn!("Failed to open browser: {}", e);
        println!("Open {} in your browser", url);
    }
}

fn parse_platform(text: &str) -> Result<Platform> {
    Platform::parse(text).with_context(|| format!("Unknown platform: {}", text))
}

/// `<platform> <n>` with `n` counted from 1
fn platform_and_index(rest: &[&str]) -> Result<(Platform, usize)> {
    let [platform, n] = rest[..] else {
        bail!("Expected <platform> <n>");
    };
    let n: usize = n.parse().with_context(|| format!("Not a number: {}", n))?;
    if n == 0 {
        bail!("Numbers start at 1");
    }
    Ok((parse_platform(platform)?, n - 1))
}

fn parse_list(name: &str) -> Result<SettingsList> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "dimensions01" => SettingsList::CustomDimensions01,
        "dimensions02" => SettingsList::CustomDimensions02,
        "dimensions03" => SettingsList::CustomDimensions03,
        "currencies" => SettingsList::ResourceCurrencies,
        "itemtypes" => SettingsList::ResourceItemTypes,
        other => bail!("Unknown list: {}", other),
    })
}

fn parse_flag(name: &str) -> Result<SettingsFlag> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "manualsessions" => SettingsFlag::UseManualSessionHandling,
        "infolog" => SettingsFlag::InfoLogBuild,
        "verboselog" => SettingsFlag::VerboseLogBuild,
        other => bail!("Unknown flag: {}", other),
    })
}
