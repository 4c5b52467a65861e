use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vplan_events::{PushDispatcher, VapidConfig, VapidKeys, WebPushTransport};
use vplan_provider::{ProviderConfig, UntisClient};

use vplan_api::auth::signature::TriggerAuthenticator;
use vplan_api::config::ServerConfig;
use vplan_api::engine::{DispatchEngine, PgDispatchStore};
use vplan_api::router::build_app_router;
use vplan_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vplan_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        timezone = %config.timezone,
        concurrency = config.dispatch.concurrency,
        "Loaded server configuration"
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = vplan_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    vplan_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    vplan_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Upstream provider ---
    let provider_config = ProviderConfig::from_env().expect("Invalid UNTIS provider configuration");
    tracing::info!(endpoint = %provider_config.endpoint(), "Substitution provider configured");
    let provider = UntisClient::new(provider_config, config.dispatch.provider_timeout())
        .expect("Failed to build provider HTTP client");

    // --- Web Push ---
    let (push, vapid_public_key) = build_push_dispatcher(&config);

    // --- Trigger signatures ---
    let authenticator = TriggerAuthenticator::new(config.signing.clone());
    if !authenticator.is_configured() {
        tracing::warn!("QSTASH signing keys missing; every dispatch trigger will be rejected");
    }

    // --- Dispatch engine ---
    let engine = DispatchEngine::new(
        Arc::new(PgDispatchStore::new(pool.clone())),
        Arc::new(provider),
        push,
        config.dispatch.clone(),
    );

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine: Arc::new(engine),
        authenticator: Arc::new(authenticator),
        vapid_public_key,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Initialize push delivery once at startup.
///
/// Missing or unusable VAPID keys are logged, not fatal: the dispatcher then
/// reports a configuration failure for every delivery and never prunes.
fn build_push_dispatcher(config: &ServerConfig) -> (PushDispatcher, Option<Arc<str>>) {
    let Some(vapid) = VapidConfig::from_env() else {
        tracing::warn!("VAPID keys not set; push delivery disabled");
        return (PushDispatcher::unconfigured(), None);
    };

    let timeout = config.dispatch.delivery_timeout();
    let transport = VapidKeys::from_config(&vapid)
        .and_then(|keys| WebPushTransport::new(keys, timeout));

    match transport {
        Ok(transport) => {
            tracing::info!(subject = %vapid.subject, "Web Push configured");
            (
                PushDispatcher::new(Arc::new(transport), timeout),
                Some(Arc::from(vapid.public_key.as_str())),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Invalid VAPID configuration; push delivery disabled");
            (PushDispatcher::unconfigured(), None)
        }
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
