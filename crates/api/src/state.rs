use std::sync::Arc;

use crate::auth::signature::TriggerAuthenticator;
use crate::config::ServerConfig;
use crate::engine::DispatchEngine;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: vplan_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs signed dispatch triggers.
    pub engine: Arc<DispatchEngine>,
    /// Verifies trigger signatures.
    pub authenticator: Arc<TriggerAuthenticator>,
    /// VAPID public key handed to browsers; `None` when push is not configured.
    pub vapid_public_key: Option<Arc<str>>,
}
