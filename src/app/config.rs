//! Project Configuration
//!
//! Persistent GameAnalytics settings stored in the project's engine config.

use anyhow::Result;
use log::info;

use super::ini::ConfigStore;
use super::types::Platform;

/// Section holding every GameAnalytics setting
pub const SETTINGS_SECTION: &str = "/Script/GameAnalyticsEditor.GameAnalyticsProjectSettings";

/// Engine config file, relative to the project directory
pub const DEFAULT_CONFIG_FILE: &str = "Config/DefaultEngine.ini";

/// Build name used until the developer sets one
pub const DEFAULT_BUILD: &str = "0.1";

/// Keys and build name for one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformKeys {
    pub game_key: String,
    pub secret_key: String,
    pub build: String,
}

impl Default for PlatformKeys {
    fn default() -> Self {
        Self {
            game_key: String::new(),
            secret_key: String::new(),
            build: DEFAULT_BUILD.to_string(),
        }
    }
}

/// String lists shared by all platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsList {
    CustomDimensions01,
    CustomDimensions02,
    CustomDimensions03,
    ResourceCurrencies,
    ResourceItemTypes,
}

impl SettingsList {
    pub fn all() -> &'static [SettingsList] {
        &[
            SettingsList::CustomDimensions01,
            SettingsList::CustomDimensions02,
            SettingsList::CustomDimensions03,
            SettingsList::ResourceCurrencies,
            SettingsList::ResourceItemTypes,
        ]
    }

    pub fn config_key(&self) -> &'static str {
        match self {
            SettingsList::CustomDimensions01 => "CustomDimensions01",
            SettingsList::CustomDimensions02 => "CustomDimensions02",
            SettingsList::CustomDimensions03 => "CustomDimensions03",
            SettingsList::ResourceCurrencies => "ResourceCurrencies",
            SettingsList::ResourceItemTypes => "ResourceItemTypes",
        }
    }
}

/// Boolean settings shared by all platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFlag {
    /// Manually choose when sessions start and end
    UseManualSessionHandling,
    /// Show info messages from the SDK in builds
    InfoLogBuild,
    /// Show full messages, including request payloads, in builds
    VerboseLogBuild,
}

impl SettingsFlag {
    pub fn config_key(&self) -> &'static str {
        match self {
            SettingsFlag::UseManualSessionHandling => "UseManualSessionHandling",
            SettingsFlag::InfoLogBuild => "InfoLogBuild",
            SettingsFlag::VerboseLogBuild => "VerboseLogBuild",
        }
    }

    pub fn default_value(&self) -> bool {
        matches!(self, SettingsFlag::InfoLogBuild)
    }
}

/// Command-line switches that override persisted log flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOverrides {
    pub info_log_build: Option<bool>,
    pub verbose_log_build: Option<bool>,
}

impl LaunchOverrides {
    /// Scan process arguments for `-GAInfoLogBuild`, `-GANoInfoLogBuild`,
    /// `-GAVerboseLogBuild` and `-GANoVerboseLogBuild` (case-insensitive).
    /// The enabling switch wins when both forms are given.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut on = [false; 2];
        let mut off = [false; 2];

        for arg in args {
            let arg = arg.as_ref().trim_start_matches('-');
            if arg.eq_ignore_ascii_case("GAInfoLogBuild") {
                on[0] = true;
            } else if arg.eq_ignore_ascii_case("GANoInfoLogBuild") {
                off[0] = true;
            } else if arg.eq_ignore_ascii_case("GAVerboseLogBuild") {
                on[1] = true;
            } else if arg.eq_ignore_ascii_case("GANoVerboseLogBuild") {
                off[1] = true;
            }
        }

        let pick = |i: usize| {
            if on[i] {
                Some(true)
            } else if off[i] {
                Some(false)
            } else {
                None
            }
        };

        Self {
            info_log_build: pick(0),
            verbose_log_build: pick(1),
        }
    }
}

/// GameAnalytics project settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSettings {
    /// Per-platform keys, indexed by `Platform::index`
    pub platforms: [PlatformKeys; 6],

    pub custom_dimensions_01: Vec<String>,
    pub custom_dimensions_02: Vec<String>,
    pub custom_dimensions_03: Vec<String>,

    pub resource_currencies: Vec<String>,
    pub resource_item_types: Vec<String>,

    pub use_manual_session_handling: bool,
    pub info_log_build: bool,
    pub verbose_log_build: bool,

    /// Account login name, remembered between editor sessions
    pub username: String,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            platforms: Default::default(),
            custom_dimensions_01: Vec::new(),
            custom_dimensions_02: Vec::new(),
            custom_dimensions_03: Vec::new(),
            resource_currencies: Vec::new(),
            resource_item_types: Vec::new(),
            use_manual_session_handling: SettingsFlag::UseManualSessionHandling.default_value(),
            info_log_build: SettingsFlag::InfoLogBuild.default_value(),
            verbose_log_build: SettingsFlag::VerboseLogBuild.default_value(),
            username: String::new(),
        }
    }
}

impl ProjectSettings {
    /// Read settings from the store, falling back to defaults for missing keys
    pub fn from_store(store: &ConfigStore) -> Self {
        let get = |key: &str| store.get_string(SETTINGS_SECTION, key);
        let mut settings = Self::default();

        for platform in Platform::all() {
            let prefix = platform.key_prefix();
            let keys = &mut settings.platforms[platform.index()];
            if let Some(value) = get(&format!("{}GameKey", prefix)) {
                keys.game_key = value;
            }
            if let Some(value) = get(&format!("{}SecretKey", prefix)) {
                keys.secret_key = value;
            }
            if let Some(value) = get(&format!("{}Build", prefix)) {
                keys.build = value;
            }
        }

        for list in SettingsList::all() {
            *settings.list_mut(*list) = store.get_array(SETTINGS_SECTION, list.config_key());
        }

        for flag in [
            SettingsFlag::UseManualSessionHandling,
            SettingsFlag::InfoLogBuild,
            SettingsFlag::VerboseLogBuild,
        ] {
            if let Some(value) = store.get_bool(SETTINGS_SECTION, flag.config_key()) {
                *settings.flag_mut(flag) = value;
            }
        }

        settings.username = get("Username").unwrap_or_default();
        settings
    }

    /// Read settings the way a packaged build sees them
    pub fn load(
        store: &ConfigStore,
        build_override: Option<&str>,
        overrides: LaunchOverrides,
    ) -> Self {
        let mut settings = Self::from_store(store);

        if let Some(build) = build_override {
            info!("Using build override: {}", build);
            for keys in settings.platforms.iter_mut() {
                keys.build = build.to_string();
            }
        }
        if let Some(value) = overrides.info_log_build {
            settings.info_log_build = value;
        }
        if let Some(value) = overrides.verbose_log_build {
            settings.verbose_log_build = value;
        }
        settings
    }

    /// Write every field to the store and flush it
    pub fn save(&self, store: &mut ConfigStore) -> Result<bool> {
        for platform in Platform::all() {
            let prefix = platform.key_prefix();
            let keys = self.keys_for(*platform);
            store.set_string(SETTINGS_SECTION, &format!("{}GameKey", prefix), &keys.game_key)?;
            store.set_string(SETTINGS_SECTION, &format!("{}SecretKey", prefix), &keys.secret_key)?;
            store.set_string(SETTINGS_SECTION, &format!("{}Build", prefix), &keys.build)?;
        }
        for list in SettingsList::all() {
            store.set_array(SETTINGS_SECTION, list.config_key(), self.list(*list))?;
        }
        store.set_bool(
            SETTINGS_SECTION,
            SettingsFlag::UseManualSessionHandling.config_key(),
            self.use_manual_session_handling,
        )?;
        store.set_bool(
            SETTINGS_SECTION,
            SettingsFlag::InfoLogBuild.config_key(),
            self.info_log_build,
        )?;
        store.set_bool(
            SETTINGS_SECTION,
            SettingsFlag::VerboseLogBuild.config_key(),
            self.verbose_log_build,
        )?;
        store.set_string(SETTINGS_SECTION, "Username", &self.username)?;
        store.flush()
    }

    pub fn keys_for(&self, platform: Platform) -> &PlatformKeys {
        &self.platforms[platform.index()]
    }

    pub fn keys_for_mut(&mut self, platform: Platform) -> &mut PlatformKeys {
        &mut self.platforms[platform.index()]
    }

    /// Keys the running build would report with
    pub fn current_keys(&self) -> &PlatformKeys {
        self.keys_for(Platform::current())
    }

    pub fn list(&self, list: SettingsList) -> &Vec<String> {
        match list {
            SettingsList::CustomDimensions01 => &self.custom_dimensions_01,
            SettingsList::CustomDimensions02 => &self.custom_dimensions_02,
            SettingsList::CustomDimensions03 => &self.custom_dimensions_03,
            SettingsList::ResourceCurrencies => &self.resource_currencies,
            SettingsList::ResourceItemTypes => &self.resource_item_types,
        }
    }

    fn list_mut(&mut self, list: SettingsList) -> &mut Vec<String> {
        match list {
            SettingsList::CustomDimensions01 => &mut self.custom_dimensions_01,
            SettingsList::CustomDimensions02 => &mut self.custom_dimensions_02,
            SettingsList::CustomDimensions03 => &mut self.custom_dimensions_03,
            SettingsList::ResourceCurrencies => &mut self.resource_currencies,
            SettingsList::ResourceItemTypes => &mut self.resource_item_types,
        }
    }

    pub fn flag(&self, flag: SettingsFlag) -> bool {
        match flag {
            SettingsFlag::UseManualSessionHandling => self.use_manual_session_handling,
            SettingsFlag::InfoLogBuild => self.info_log_build,
            SettingsFlag::VerboseLogBuild => self.verbose_log_build,
        }
    }

    fn flag_mut(&mut self, flag: SettingsFlag) -> &mut bool {
        match flag {
            SettingsFlag::UseManualSessionHandling => &mut self.use_manual_session_handling,
            SettingsFlag::InfoLogBuild => &mut self.info_log_build,
            SettingsFlag::VerboseLogBuild => &mut self.verbose_log_build,
        }
    }

    /// First platform other than `platform` whose persisted game key equals `game_key`.
    /// Unset keys never match.
    pub fn platform_using_key(&self, platform: Platform, game_key: &str) -> Option<Platform> {
        if game_key.is_empty() {
            return None;
        }
        Platform::all()
            .iter()
            .copied()
            .filter(|other| *other != platform)
            .find(|other| self.keys_for(*other).game_key == game_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ini::IniDocument;

    fn store_with(text: &str) -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("DefaultEngine.ini");
        std::fs::write(&path, text).unwrap();
        let store = ConfigStore::open(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn test_defaults_for_empty_store() {
        let (_dir, store) = store_with("");
        let settings = ProjectSettings::from_store(&store);
        assert_eq!(settings, ProjectSettings::default());
        assert_eq!(settings.keys_for(Platform::Html5).build, "0.1");
        assert!(settings.info_log_build);
        assert!(!settings.verbose_log_build);
        assert!(!settings.use_manual_session_handling);
    }

    #[test]
    fn test_reads_persisted_values() {
        let (_dir, store) = store_with(
            "[/Script/GameAnalyticsEditor.GameAnalyticsProjectSettings]\n\
             IosGameKey=ios-key\n\
             IosSecretKey=ios-secret\n\
             AndroidBuild=2.0\n\
             +CustomDimensions01=whale\n\
             +CustomDimensions01=dolphin\n\
             +ResourceCurrencies=gems\n\
             UseManualSessionHandling=True\n\
             InfoLogBuild=False\n\
             Username=dev@example.com\n",
        );
        let settings = ProjectSettings::from_store(&store);

        assert_eq!(settings.keys_for(Platform::Ios).game_key, "ios-key");
        assert_eq!(settings.keys_for(Platform::Ios).secret_key, "ios-secret");
        assert_eq!(settings.keys_for(Platform::Ios).build, "0.1");
        assert_eq!(settings.keys_for(Platform::Android).build, "2.0");
        assert_eq!(settings.custom_dimensions_01, vec!["whale", "dolphin"]);
        assert_eq!(settings.list(SettingsList::ResourceCurrencies), &vec!["gems".to_string()]);
        assert!(settings.use_manual_session_handling);
        assert!(!settings.info_log_build);
        assert_eq!(settings.username, "dev@example.com");
    }

    #[test]
    fn test_build_override_and_launch_flags() {
        let (_dir, store) = store_with(
            "[/Script/GameAnalyticsEditor.GameAnalyticsProjectSettings]\n\
             MacBuild=1.0\n\
             InfoLogBuild=False\n",
        );
        let overrides = LaunchOverrides::from_args(["-GAInfoLogBuild", "-GAVerboseLogBuild"]);
        let settings = ProjectSettings::load(&store, Some("5.4.1"), overrides);

        for platform in Platform::all() {
            assert_eq!(settings.keys_for(*platform).build, "5.4.1");
        }
        assert!(settings.info_log_build);
        assert!(settings.verbose_log_build);
    }

    #[test]
    fn test_launch_overrides_parsing() {
        let none = LaunchOverrides::from_args(Vec::<String>::new());
        assert_eq!(none, LaunchOverrides::default());

        let off = LaunchOverrides::from_args(["-GANoInfoLogBuild", "-ganoverboselogbuild"]);
        assert_eq!(off.info_log_build, Some(false));
        assert_eq!(off.verbose_log_build, Some(false));

        let both = LaunchOverrides::from_args(["-GANoInfoLogBuild", "-GAInfoLogBuild"]);
        assert_eq!(both.info_log_build, Some(true));
        assert_eq!(both.verbose_log_build, None);
    }

    #[test]
    fn test_save_writes_all_fields() {
        let (_dir, mut store) = store_with("[/Script/Engine.RendererSettings]\nr.Shadows=1\n");
        let mut settings = ProjectSettings::default();
        settings.keys_for_mut(Platform::Linux).game_key = "linux-key".to_string();
        settings.resource_item_types = vec!["weapon".to_string(), "armor".to_string()];
        settings.verbose_log_build = true;

        assert!(settings.save(&mut store).unwrap());

        let written = std::fs::read_to_string(store.path()).unwrap();
        let doc = IniDocument::parse(&written);
        assert_eq!(
            doc.get_string("/Script/Engine.RendererSettings", "r.Shadows").as_deref(),
            Some("1")
        );
        assert_eq!(doc.get_string(SETTINGS_SECTION, "LinuxGameKey").as_deref(), Some("linux-key"));
        assert_eq!(doc.get_array(SETTINGS_SECTION, "ResourceItemTypes"), vec!["weapon", "armor"]);
        assert_eq!(doc.get_bool(SETTINGS_SECTION, "VerboseLogBuild"), Some(true));

        store.reload().unwrap();
        assert_eq!(ProjectSettings::from_store(&store), settings);
    }

    #[test]
    fn test_platform_using_key() {
        let mut settings = ProjectSettings::default();
        settings.keys_for_mut(Platform::Ios).game_key = "abc123".to_string();
        settings.keys_for_mut(Platform::Linux).game_key = "abc123".to_string();

        assert_eq!(settings.platform_using_key(Platform::Android, "abc123"), Some(Platform::Ios));
        assert_eq!(settings.platform_using_key(Platform::Ios, "abc123"), Some(Platform::Linux));
        assert_eq!(settings.platform_using_key(Platform::Android, "other"), None);
        // unset slots share the empty key but never collide
        assert_eq!(settings.platform_using_key(Platform::Android, ""), None);
    }
}
