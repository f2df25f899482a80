//! GameAnalytics Account Client
//!
//! Logs in to the GameAnalytics user API and fetches the studios and games
//! the account can see. Requests run on the tokio runtime; results come
//! back as `SyncEvent`s on a channel drained by the owning session.

use futures::future::BoxFuture;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::{SyncError, TransportError};
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::app::types::{Credentials, Game, Studio};

const DEFAULT_API_URL: &str = "https://userapi.gameanalytics.com";
const TOKEN_PATH: &str = "/ext/v1/token";
const USER_PATH: &str = "/ext/v1/user";

const USER_AGENT: &str = "GameAnalyticsLinkClient/1.0";
// the API has always been called with this content type, even for JSON bodies
const CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful.\nPlease select your studio below.";
pub const TRANSPORT_ERROR_MESSAGE: &str = "Error: Unable to process HTTP Request!";
const LOGIN_FAILED_PREFIX: &str = "Login failed:\n";

/// Connection settings for the account API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// API root, without trailing slash
    pub base_url: String,
    /// Sent as `X-Caller`
    pub caller: String,
    /// Sent as `X-Caller-Version`
    pub caller_version: String,
    /// Sent as `X-Caller-Platform`
    pub caller_platform: String,
    /// Per-request limit. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            caller: "UnrealEditor".to_string(),
            caller_version: "1.0.0".to_string(),
            caller_platform: host_platform_name().to_string(),
            timeout: None,
        }
    }
}

impl ClientOptions {
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Development platform name as the API expects it
fn host_platform_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(target_os = "macos") {
        "Mac"
    } else {
        "Linux"
    }
}

// ============================================================
// Wire format
// ============================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEntry {
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct TokenResult {
    token: String,
}

#[derive(Debug, Deserialize)]
struct UserResult {
    studios: Vec<StudioDto>,
}

#[derive(Debug, Deserialize)]
struct StudioDto {
    name: String,
    id: i64,
    games: Vec<GameDto>,
}

#[derive(Debug, Deserialize)]
struct GameDto {
    name: String,
    id: i64,
    key: String,
    secret: String,
}

impl From<GameDto> for Game {
    fn from(dto: GameDto) -> Self {
        Game {
            name: dto.name,
            id: dto.id,
            game_key: dto.key,
            secret_key: dto.secret,
        }
    }
}

impl From<StudioDto> for Studio {
    fn from(dto: StudioDto) -> Self {
        Studio {
            name: dto.name,
            id: dto.id,
            games: dto.games.into_iter().map(Game::from).collect(),
        }
    }
}

impl Envelope {
    fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.msg.clone()).collect()
    }

    fn first_result<T: DeserializeOwned>(&self) -> Result<T, SyncError> {
        let first = self.results.first().ok_or(SyncError::MissingResult)?;
        Ok(T::deserialize(first)?)
    }
}

/// Extract the session token from a login response
pub fn parse_login(result: Result<HttpResponse, TransportError>) -> Result<String, SyncError> {
    let response = result?;

    let envelope: Envelope = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(_) => {
            return Err(SyncError::Unparseable {
                status: response.status,
                body: response.body,
            })
        }
    };

    if !envelope.errors.is_empty() || !response.is_success() {
        return Err(SyncError::Api(envelope.error_messages()));
    }

    match envelope.first_result::<TokenResult>() {
        Ok(result) => Ok(result.token),
        Err(_) => Err(SyncError::Unparseable {
            status: response.status,
            body: response.body,
        }),
    }
}

/// Build the studio list from a user data response. All or nothing.
pub fn parse_user_data(
    result: Result<HttpResponse, TransportError>,
) -> Result<Vec<Studio>, SyncError> {
    let response = result?;

    if !response.is_success() {
        return Err(SyncError::Status {
            status: response.status,
            body: response.body,
        });
    }

    let envelope: Envelope = serde_json::from_str(&response.body)?;
    if !envelope.errors.is_empty() {
        return Err(SyncError::Api(envelope.error_messages()));
    }

    let user: UserResult = envelope.first_result()?;
    Ok(user.studios.into_iter().map(Studio::from).collect())
}

/// Text shown to the user when login fails
pub fn login_failure_message(error: &SyncError) -> String {
    match error {
        SyncError::Transport(_) => TRANSPORT_ERROR_MESSAGE.to_string(),
        SyncError::Api(messages) => {
            let mut text = LOGIN_FAILED_PREFIX.to_string();
            for msg in messages {
                text.push_str(msg);
                text.push('\n');
            }
            text
        }
        SyncError::Unparseable { body, .. } | SyncError::Status { body, .. } => {
            format!("{}{}", LOGIN_FAILED_PREFIX, body)
        }
        SyncError::Malformed(_) | SyncError::MissingResult => {
            format!("{}{}", LOGIN_FAILED_PREFIX, error)
        }
    }
}

// ============================================================
// Client
// ============================================================

/// Completion of an account request, delivered to the session
#[derive(Debug)]
pub enum SyncEvent {
    /// Token received; the studio list request follows
    LoginSucceeded,
    /// Login rejected or unreachable, with the text to show
    LoginFailed { message: String },
    /// Complete replacement for the studio list
    StudiosLoaded(Vec<Studio>),
    /// The studio list request failed; the current list stays as it is.
    /// Not shown to the user, unlike login failures.
    UserDataFailed(SyncError),
}

struct ClientInner {
    transport: Option<Arc<dyn Transport>>,
    options: ClientOptions,
    busy: AtomicBool,
    events: mpsc::UnboundedSender<SyncEvent>,
}

/// Client for the GameAnalytics user API. At most one request is in flight;
/// calls made while busy are dropped.
pub struct AccountSyncClient {
    inner: Arc<ClientInner>,
    runtime: Handle,
}

impl AccountSyncClient {
    /// Create a client using the reqwest transport
    pub fn new(
        runtime: Handle,
        options: ClientOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let transport = match ReqwestTransport::new() {
            Ok(transport) => Some(Arc::new(transport) as Arc<dyn Transport>),
            Err(e) => {
                error!("Failed to create HTTP client: {}", e);
                None
            }
        };
        Self::with_transport(runtime, options, transport)
    }

    /// Create a client over any transport. `None` means no transport is available.
    pub fn with_transport(
        runtime: Handle,
        options: ClientOptions,
        transport: Option<Arc<dyn Transport>>,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(ClientInner {
            transport,
            options,
            busy: AtomicBool::new(false),
            events,
        });
        (Self { inner, runtime }, rx)
    }

    /// Whether a request is in flight
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Log in and, on success, fetch the account's studios.
    /// Returns `None` if the call was dropped.
    pub fn login(&self, credentials: &Credentials) -> Option<JoinHandle<()>> {
        let transport = self.inner.acquire()?;

        info!("Logging in as {}", credentials.username);
        let request = self.inner.login_request(credentials);
        let pending = transport.execute(request);

        let inner = self.inner.clone();
        Some(self.runtime.spawn(async move {
            inner.finish_login(pending).await;
        }))
    }

    /// Fetch the studios and games visible to `token`.
    /// Returns `None` if the call was dropped.
    pub fn fetch_user_data(&self, token: String) -> Option<JoinHandle<()>> {
        let transport = self.inner.acquire()?;
        let pending = transport.execute(self.inner.user_request(&token));

        let inner = self.inner.clone();
        Some(self.runtime.spawn(async move {
            inner.finish_user_data(pending).await;
        }))
    }
}

type PendingResponse = BoxFuture<'static, Result<HttpResponse, TransportError>>;

impl ClientInner {
    /// Claim the busy flag. `None` when the request must be dropped.
    fn acquire(&self) -> Option<Arc<dyn Transport>> {
        let Some(transport) = self.transport.as_ref() else {
            warn!("HTTP transport unavailable, request dropped");
            return None;
        };
        if !transport.is_enabled() {
            warn!("HTTP transport disabled, request dropped");
            return None;
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Account request already in flight, request dropped");
            return None;
        }
        Some(transport.clone())
    }

    fn with_caller_headers(&self, request: HttpRequest) -> HttpRequest {
        request
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Caller", self.options.caller.as_str())
            .header("X-Caller-Version", self.options.caller_version.as_str())
            .header("X-Caller-Platform", self.options.caller_platform.as_str())
    }

    fn login_request(&self, credentials: &Credentials) -> HttpRequest {
        let body = serde_json::json!({
            "email": credentials.username,
            "password": credentials.password,
        });
        let url = format!("{}{}", self.options.base_url, TOKEN_PATH);
        self.with_caller_headers(HttpRequest::post(url, body.to_string()))
    }

    fn user_request(&self, token: &str) -> HttpRequest {
        let url = format!("{}{}", self.options.base_url, USER_PATH);
        self.with_caller_headers(HttpRequest::get(url)).header("X-Authorization", token)
    }

    /// Await a response, applying the timeout
    async fn complete(&self, pending: PendingResponse) -> Result<HttpResponse, TransportError> {
        match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, pending).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::TimedOut(limit)),
            },
            None => pending.await,
        }
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    fn emit(&self, event: SyncEvent) {
        if self.events.send(event).is_err() {
            debug!("Account event dropped, receiver closed");
        }
    }

    async fn finish_login(&self, pending: PendingResponse) {
        let result = self.complete(pending).await;

        let token = match parse_login(result) {
            Ok(token) => token,
            Err(e) => {
                warn!("Login failed: {}", e);
                self.emit(SyncEvent::LoginFailed {
                    message: login_failure_message(&e),
                });
                self.release();
                return;
            }
        };

        info!("Login successful");
        self.emit(SyncEvent::LoginSucceeded);

        // the busy flag stays claimed until the studio list request finishes
        match self.transport.as_ref().filter(|t| t.is_enabled()) {
            Some(transport) => {
                let pending = transport.execute(self.user_request(&token));
                self.finish_user_data(pending).await;
            }
            None => {
                warn!("HTTP transport disabled, studio list not requested");
                self.release();
            }
        }
    }

    async fn finish_user_data(&self, pending: PendingResponse) {
        let result = self.complete(pending).await;

        match parse_user_data(result) {
            Ok(studios) => {
                info!("Fetched {} studios", studios.len());
                self.emit(SyncEvent::StudiosLoaded(studios));
            }
            Err(e) => {
                warn!("Failed to fetch user data: {}", e);
                self.emit(SyncEvent::UserDataFailed(e));
            }
        }
        self.release();
    }
}
