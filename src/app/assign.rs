//! Per-platform key assignment
//!
//! Studio and game pickers. Choosing a game writes its keys to the
//! platform's settings unless another platform already uses them.

use log::{info, warn};
use thiserror::Error;

use super::config::SETTINGS_SECTION;
use super::types::{Game, Notice, Platform, Studio};
use super::App;

/// Warning shown when a game's keys belong to another platform
pub const KEYS_IN_USE_MESSAGE: &str =
    "This game's keys are already in use. You cannot use the same keys for different platforms.";

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("no studio selected for {0}")]
    NoStudioSelected(Platform),

    /// `other` is the first platform, in enumeration order, holding the key
    #[error("game key already assigned to {other}")]
    KeyInUse { other: Platform },

    #[error("failed to save game keys: {0}")]
    Config(#[from] anyhow::Error),
}

impl App {
    /// Pick a studio for a platform. The game pick is always cleared.
    pub fn select_studio(&mut self, platform: Platform, studio: Studio) {
        info!("{} Studio selected: {}", platform, studio.name);

        let selection = &mut self.selections[platform.index()];
        selection.studio = Some(studio);
        selection.game = None;
    }

    /// Pick a game for a platform and persist its keys.
    ///
    /// Rejected when the game key is already saved for any other platform;
    /// the platform's saved keys stay as they were and a warning notice is
    /// queued.
    pub fn select_game(&mut self, platform: Platform, game: Game) -> Result<(), AssignError> {
        let index = platform.index();
        if self.selections[index].studio.is_none() {
            return Err(AssignError::NoStudioSelected(platform));
        }

        if let Some(other) = self.settings.platform_using_key(platform, &game.game_key) {
            warn!(
                "{}: game key {} is already assigned to {}",
                platform, game.game_key, other
            );
            self.selections[index].game = None;
            self.notices.push(Notice::warning(KEYS_IN_USE_MESSAGE));
            return Err(AssignError::KeyInUse { other });
        }

        let prefix = platform.key_prefix();
        let saved = self.apply(|store| {
            store.set_string(SETTINGS_SECTION, &format!("{}GameKey", prefix), &game.game_key)?;
            store.set_string(SETTINGS_SECTION, &format!("{}SecretKey", prefix), &game.secret_key)
        });
        if let Err(e) = saved {
            self.selections[index].game = None;
            return Err(AssignError::Config(e));
        }

        info!("Platform selected: {}, Game Key Saved: {}", platform, game.game_key);
        info!("Saved at: {:?}", self.store.path());

        self.selections[index].game = Some(game);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::testing::ScriptedTransport;
    use crate::app::config::ProjectSettings;
    use crate::app::ini::ConfigStore;
    use crate::app::tests::{app_with, app_with_blocked_dir};
    use crate::app::SettingsFlag;
    use crate::app::types::{NoticeKind, SelectionState};

    fn game(name: &str, key: &str, secret: &str) -> Game {
        Game {
            name: name.to_string(),
            id: 10,
            game_key: key.to_string(),
            secret_key: secret.to_string(),
        }
    }

    fn studio(games: Vec<Game>) -> Studio {
        Studio {
            name: "Blue Whale".to_string(),
            id: 1,
            games,
        }
    }

    #[tokio::test]
    async fn test_select_studio_clears_game() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let dive = game("Dive", "abc123", "s1");

        app.select_studio(Platform::Ios, studio(vec![dive.clone()]));
        assert_eq!(app.selection(Platform::Ios).state(), SelectionState::StudioSelected);
        app.select_game(Platform::Ios, dive).unwrap();
        assert_eq!(app.selection(Platform::Ios).state(), SelectionState::GameSelected);

        app.select_studio(Platform::Ios, studio(Vec::new()));
        assert_eq!(app.selection(Platform::Ios).state(), SelectionState::StudioSelected);
        assert!(app.selection(Platform::Ios).game.is_none());
        // persisted keys survive a studio change
        assert_eq!(app.settings().keys_for(Platform::Ios).game_key, "abc123");
    }

    #[tokio::test]
    async fn test_select_game_requires_studio() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let err = app
            .select_game(Platform::Mac, game("Dive", "abc123", "s1"))
            .unwrap_err();
        assert!(matches!(err, AssignError::NoStudioSelected(Platform::Mac)));
        assert_eq!(app.settings().keys_for(Platform::Mac).game_key, "");
    }

    #[tokio::test]
    async fn test_select_game_persists_keys() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let dive = game("Dive", "abc123", "s1");

        app.select_studio(Platform::Android, studio(vec![dive.clone()]));
        app.select_game(Platform::Android, dive).unwrap();

        let keys = app.settings().keys_for(Platform::Android);
        assert_eq!(keys.game_key, "abc123");
        assert_eq!(keys.secret_key, "s1");

        let written = std::fs::read_to_string(app.config_path()).unwrap();
        assert!(written.contains("AndroidGameKey=abc123"));
        assert!(written.contains("AndroidSecretKey=s1"));
        assert!(app.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_key_collision_rejected() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let dive = game("Dive", "abc123", "s1");
        let other = game("Surf", "def456", "s2");

        app.select_studio(Platform::Ios, studio(vec![dive.clone()]));
        app.select_game(Platform::Ios, dive.clone()).unwrap();

        app.select_studio(Platform::Android, studio(vec![dive.clone(), other.clone()]));
        app.select_game(Platform::Android, other).unwrap();

        let before = std::fs::read_to_string(app.config_path()).unwrap();
        let err = app.select_game(Platform::Android, dive).unwrap_err();
        assert!(matches!(err, AssignError::KeyInUse { other: Platform::Ios }));

        assert_eq!(app.settings().keys_for(Platform::Android).game_key, "def456");
        assert_eq!(app.settings().keys_for(Platform::Android).secret_key, "s2");
        assert_eq!(std::fs::read_to_string(app.config_path()).unwrap(), before);
        assert_eq!(app.selection(Platform::Android).state(), SelectionState::StudioSelected);

        let notices = app.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Warning);
        assert_eq!(notices[0].text, KEYS_IN_USE_MESSAGE);
    }

    #[tokio::test]
    async fn test_reselecting_same_game_on_same_platform() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let dive = game("Dive", "abc123", "s1");

        app.select_studio(Platform::Linux, studio(vec![dive.clone()]));
        app.select_game(Platform::Linux, dive.clone()).unwrap();
        app.select_game(Platform::Linux, dive).unwrap();
        assert!(app.take_notices().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_drops_keys() {
        let (_dir, blocker, mut app) = app_with_blocked_dir();
        let dive = game("Dive", "abc123", "s1");

        app.select_studio(Platform::Ios, studio(vec![dive.clone()]));
        let err = app.select_game(Platform::Ios, dive).unwrap_err();
        assert!(matches!(err, AssignError::Config(_)));
        assert_eq!(app.selection(Platform::Ios).state(), SelectionState::StudioSelected);
        assert_eq!(app.settings().keys_for(Platform::Ios).game_key, "");

        // a later unrelated write must not carry the unsaved keys
        std::fs::remove_file(&blocker).unwrap();
        app.set_flag(SettingsFlag::InfoLogBuild, false).unwrap();
        let written = std::fs::read_to_string(app.config_path()).unwrap();
        assert!(!written.contains("IosGameKey"));
        assert!(!written.contains("IosSecretKey"));
    }

    #[tokio::test]
    async fn test_collision_against_preexisting_config() {
        let ini = "[/Script/GameAnalyticsEditor.GameAnalyticsProjectSettings]\n\
                   WindowsGameKey=abc123\n\
                   WindowsSecretKey=s1\n";
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), ini);
        let dive = game("Dive", "abc123", "s1");

        app.select_studio(Platform::Html5, studio(vec![dive.clone()]));
        let err = app.select_game(Platform::Html5, dive).unwrap_err();
        assert!(matches!(err, AssignError::KeyInUse { other: Platform::Windows }));
        assert_eq!(app.settings().keys_for(Platform::Html5).game_key, "");
    }

    #[tokio::test]
    async fn test_no_two_platforms_share_a_key() {
        let (_dir, mut app) = app_with(ScriptedTransport::new(Vec::new()), "");
        let games = vec![
            game("A", "k1", "s1"),
            game("B", "k2", "s2"),
            game("C", "k1", "s3"),
        ];

        for (platform, g) in Platform::all().iter().zip(games.iter().cycle()) {
            app.select_studio(*platform, studio(games.clone()));
            let _ = app.select_game(*platform, g.clone());
        }

        let reopened = ProjectSettings::from_store(&ConfigStore::open(app.config_path()).unwrap());
        for p in Platform::all() {
            let key = &reopened.keys_for(*p).game_key;
            if key.is_empty() {
                continue;
            }
            assert_eq!(reopened.platform_using_key(*p, key), None, "{} shares {}", p, key);
        }
    }
}
