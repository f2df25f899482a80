//! GameAnalytics Editor
//!
//! Project settings and account linking for the GameAnalytics SDK:
//! per-platform keys stored in the engine config, and a login flow that
//! lists the account's studios and games so their keys can be assigned.

pub mod account;
pub mod app;
