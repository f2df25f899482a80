//! Account Module
//!
//! Links the editor to a GameAnalytics account: login, then the list of
//! studios and games whose keys can be assigned to platforms.

pub mod api;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AccountSyncClient, ClientOptions, SyncEvent};
pub use error::{SyncError, TransportError};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
