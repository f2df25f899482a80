//! Application Types
//!
//! Common types shared by the account client and the settings session.

use std::fmt;

/// Build target configured with its own key pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Android,
    Mac,
    Windows,
    Linux,
    Html5,
}

impl Platform {
    /// Fixed enumeration order, also used by collision checks
    pub const ALL: [Platform; 6] = [
        Platform::Ios,
        Platform::Android,
        Platform::Mac,
        Platform::Windows,
        Platform::Linux,
        Platform::Html5,
    ];

    /// Get all platforms in enumeration order
    pub fn all() -> &'static [Platform] {
        &Self::ALL
    }

    /// Position in `Platform::ALL`
    pub fn index(&self) -> usize {
        match self {
            Platform::Ios => 0,
            Platform::Android => 1,
            Platform::Mac => 2,
            Platform::Windows => 3,
            Platform::Linux => 4,
            Platform::Html5 => 5,
        }
    }

    /// Prefix of the platform's keys in the config section (e.g. "IosGameKey")
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Platform::Ios => "Ios",
            Platform::Android => "Android",
            Platform::Mac => "Mac",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Html5 => "Html5",
        }
    }

    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Ios => "iOS",
            Platform::Android => "Android",
            Platform::Mac => "Mac",
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Html5 => "HTML5",
        }
    }

    /// Parse a platform name as typed by a user ("ios", "HTML5", ...)
    pub fn parse(name: &str) -> Option<Platform> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|p| {
            p.key_prefix().eq_ignore_ascii_case(name) || p.display_name().eq_ignore_ascii_case(name)
        })
    }

    /// Platform whose keys a build for the current target would use
    pub fn current() -> Platform {
        if cfg!(target_os = "ios") {
            Platform::Ios
        } else if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "macos") {
            Platform::Mac
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_arch = "wasm32") {
            Platform::Html5
        } else {
            Platform::Linux
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Vendor-registered analytics project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    pub name: String,
    pub id: i64,
    pub game_key: String,
    pub secret_key: String,
}

/// Vendor account owning a list of games
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Studio {
    pub name: String,
    pub id: i64,
    pub games: Vec<Game>,
}

/// Where a platform is in the studio/game picking flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    NoStudioSelected,
    StudioSelected,
    GameSelected,
}

/// Studio and game picked for one platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformSelection {
    pub studio: Option<Studio>,
    pub game: Option<Game>,
}

impl PlatformSelection {
    pub fn state(&self) -> SelectionState {
        match (&self.studio, &self.game) {
            (None, _) => SelectionState::NoStudioSelected,
            (Some(_), None) => SelectionState::StudioSelected,
            (Some(_), Some(_)) => SelectionState::GameSelected,
        }
    }

    /// Label for the studio picker
    pub fn studio_label(&self) -> &str {
        self.studio.as_ref().map(|s| s.name.as_str()).unwrap_or("Select Studio")
    }

    /// Label for the game picker
    pub fn game_label(&self) -> &str {
        self.game.as_ref().map(|g| g.name.as_str()).unwrap_or("Select Game")
    }
}

/// Login credentials, held in memory only
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How a notice should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Modal acknowledgment
    Dialog,
    /// Non-blocking validation warning
    Warning,
}

/// User-facing message waiting to be shown by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn dialog(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Dialog,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }
}
