//! Application State Management
//!
//! Session context for the GameAnalytics settings page: persisted settings,
//! account login, the studio list and each platform's studio/game picks.

pub mod assign;
pub mod config;
pub mod ini;
pub mod types;

pub use assign::{AssignError, KEYS_IN_USE_MESSAGE};
pub use config::{
    LaunchOverrides, PlatformKeys, ProjectSettings, SettingsFlag, SettingsList,
    DEFAULT_CONFIG_FILE, SETTINGS_SECTION,
};
pub use ini::ConfigStore;
pub use types::{
    Credentials, Game, Notice, NoticeKind, Platform, PlatformSelection, SelectionState, Studio,
};

use anyhow::Result;
use log::{info, warn};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::account::api::LOGIN_SUCCESS_MESSAGE;
use crate::account::{AccountSyncClient, ClientOptions, SyncEvent, Transport};

/// Studio list shared with whatever renders the pickers.
/// Always replaced as a whole under the write lock.
pub type SharedStudios = Arc<RwLock<Vec<Studio>>>;

/// Main application structure
pub struct App {
    /// Engine config file holding the settings section
    store: ConfigStore,

    /// Settings as last read back from `store`
    settings: ProjectSettings,

    /// Studios and games of the logged-in account
    studios: SharedStudios,

    /// Studio/game picks, indexed by `Platform::index`
    selections: [PlatformSelection; 6],

    /// Login form contents
    credentials: Credentials,

    /// Account API client
    client: AccountSyncClient,

    /// Completions from `client`
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,

    /// Messages waiting to be shown to the user
    notices: Vec<Notice>,
}

impl App {
    /// Open the project's config and create a client on the reqwest transport
    pub fn new(
        runtime: Handle,
        config_path: impl AsRef<Path>,
        options: ClientOptions,
    ) -> Result<Self> {
        let store = ConfigStore::open(config_path.as_ref())?;
        let (client, events_rx) = AccountSyncClient::new(runtime, options);
        Ok(Self::from_parts(store, client, events_rx))
    }

    /// Build a session over an explicit transport
    pub fn with_transport(
        runtime: Handle,
        store: ConfigStore,
        options: ClientOptions,
        transport: Option<Arc<dyn Transport>>,
    ) -> Self {
        let (client, events_rx) = AccountSyncClient::with_transport(runtime, options, transport);
        Self::from_parts(store, client, events_rx)
    }

    fn from_parts(
        store: ConfigStore,
        client: AccountSyncClient,
        events_rx: mpsc::UnboundedReceiver<SyncEvent>,
    ) -> Self {
        let settings = ProjectSettings::from_store(&store);
        info!("Loaded GameAnalytics settings from {:?}", store.path());

        let credentials = Credentials {
            username: settings.username.clone(),
            password: String::new(),
        };

        Self {
            store,
            settings,
            studios: Arc::new(RwLock::new(Vec::new())),
            selections: Default::default(),
            credentials,
            client,
            events_rx,
            notices: Vec::new(),
        }
    }

    // ============================================================
    // Account
    // ============================================================

    /// Start a login with the current username and password.
    /// Returns `None` if the client dropped the call.
    pub fn login(&mut self) -> Option<JoinHandle<()>> {
        self.client.login(&self.credentials)
    }

    /// Whether an account request is in flight
    pub fn is_busy(&self) -> bool {
        self.client.is_busy()
    }

    /// Apply finished account requests (call regularly from the UI loop)
    pub fn update(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SyncEvent::LoginSucceeded => {
                    self.notices.push(Notice::dialog(LOGIN_SUCCESS_MESSAGE));
                }
                SyncEvent::LoginFailed { message } => {
                    self.notices.push(Notice::dialog(message));
                }
                SyncEvent::StudiosLoaded(studios) => {
                    info!("Studio list updated: {} studios", studios.len());
                    *self.studios.write() = studios;
                }
                SyncEvent::UserDataFailed(e) => {
                    // no dialog for this request; login already reported success
                    warn!("Could not load studios, keeping current list: {}", e);
                }
            }
        }
    }

    /// Notices queued since the last call, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Handle to the shared studio list
    pub fn studio_directory(&self) -> SharedStudios {
        self.studios.clone()
    }

    /// Snapshot of the studio list
    pub fn studios(&self) -> Vec<Studio> {
        self.studios.read().clone()
    }

    pub fn studio(&self, index: usize) -> Option<Studio> {
        self.studios.read().get(index).cloned()
    }

    // ============================================================
    // Login form
    // ============================================================

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Update the username. Persisted only when it differs from the current
    /// one; returns whether it was written. On error the held username is
    /// left as it was.
    pub fn edit_username(&mut self, text: &str) -> Result<bool> {
        if text == self.credentials.username {
            return Ok(false);
        }

        let written = self.apply(|store| store.set_string(SETTINGS_SECTION, "Username", text))?;
        self.credentials.username = text.to_string();
        Ok(written)
    }

    /// Update the password. Kept in memory only; returns whether it changed.
    pub fn edit_password(&mut self, text: &str) -> bool {
        if text == self.credentials.password {
            return false;
        }
        self.credentials.password = text.to_string();
        true
    }

    // ============================================================
    // Settings
    // ============================================================

    pub fn settings(&self) -> &ProjectSettings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        self.store.path()
    }

    /// Settings as a packaged build would read them
    pub fn effective_settings(
        &self,
        build_override: Option<&str>,
        overrides: LaunchOverrides,
    ) -> ProjectSettings {
        ProjectSettings::load(&self.store, build_override, overrides)
    }

    pub fn set_build(&mut self, platform: Platform, build: &str) -> Result<bool> {
        let key = format!("{}Build", platform.key_prefix());
        self.apply(|store| store.set_string(SETTINGS_SECTION, &key, build))
    }

    pub fn set_list(&mut self, list: SettingsList, values: &[String]) -> Result<bool> {
        self.apply(|store| store.set_array(SETTINGS_SECTION, list.config_key(), values))
    }

    pub fn set_flag(&mut self, flag: SettingsFlag, value: bool) -> Result<bool> {
        self.apply(|store| store.set_bool(SETTINGS_SECTION, flag.config_key(), value))
    }

    /// Run `edit` on the store and flush it, then reload the store and
    /// settings from disk. Returns whether anything was written.
    ///
    /// If the edit or the flush fails, unsaved edits are dropped by the
    /// reload so they can't ride along with a later write.
    pub(crate) fn apply<F>(&mut self, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut ConfigStore) -> Result<()>,
    {
        let result = edit(&mut self.store).and_then(|()| self.store.flush());
        let reloaded = self.store.reload();
        self.settings = ProjectSettings::from_store(&self.store);

        match (result, reloaded) {
            (Ok(written), Ok(())) => Ok(written),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(reload)) => {
                Err(e.context(format!("Reloading config also failed: {:#}", reload)))
            }
        }
    }

    // ============================================================
    // Platform selections
    // ============================================================

    pub fn selection(&self, platform: Platform) -> &PlatformSelection {
        &self.selections[platform.index()]
    }
}
