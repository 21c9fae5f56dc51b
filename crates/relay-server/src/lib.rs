//! Runnable WebSocket relay server: axum HTTP upgrade, credentials config,
//! CLI, and the background reclamation sweep.

pub mod config;
pub mod error;
mod transport;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    routing::get,
    Router,
};
pub use error::ServerError;
use relay_core::{Environment, ReclaimGate, Registry, SystemEnv};

/// Interval between reclamation sweeps, matching the original
/// implementation's garbage-collection cadence.
pub const RECLAIM_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g. `"0.0.0.0:9696"`).
    pub bind_address: String,
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Registry>,
    credentials: Arc<relay_core::Credentials>,
    env: SystemEnv,
    gate: Arc<ReclaimGate>,
}

/// The running relay server, already bound but not yet accepting connections.
pub struct Server {
    listener: tokio::net::TcpListener,
    router: Router,
    registry: Arc<Registry>,
    env: SystemEnv,
    gate: Arc<ReclaimGate>,
}

impl Server {
    /// Binds the listening socket and builds the axum router.
    pub async fn bind(config: ServerRuntimeConfig, credentials: relay_core::Credentials) -> Result<Self, ServerError> {
        let addr: std::net::SocketAddr = config.bind_address.parse().map_err(|source| {
            ServerError::InvalidBindAddress { address: config.bind_address.clone(), source }
        })?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { address: config.bind_address.clone(), source })?;

        let registry = Arc::new(Registry::new());
        let env = SystemEnv::new();
        let gate = Arc::new(ReclaimGate::new());
        let state = AppState {
            registry: Arc::clone(&registry),
            credentials: Arc::new(credentials),
            env: env.clone(),
            gate: Arc::clone(&gate),
        };

        let router = Router::new().route("/", get(upgrade_handler)).with_state(state);

        Ok(Self { listener, router, registry, env, gate })
    }

    /// The address the server ended up bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until the process is asked to shut down,
    /// alongside a background task that sweeps the reclamation gate every
    /// [`RECLAIM_INTERVAL`].
    ///
    /// Every admission, dispatch, and disconnect call on the hot path
    /// acquires a permit from this same gate (`transport::handle_socket`),
    /// so a sweep never runs concurrently with live dispatcher work.
    pub async fn run(self) -> Result<(), ServerError> {
        let registry = self.registry;
        let env = self.env;
        let gate = self.gate;

        let reclaimer = tokio::spawn({
            let gate = Arc::clone(&gate);
            let env = env.clone();
            async move {
                loop {
                    env.sleep(RECLAIM_INTERVAL).await;
                    let sessions = registry.session_count();
                    gate.reclaim(|| {
                        tracing::debug!(sessions, "reclamation sweep");
                    });
                }
            }
        });

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|source| ServerError::Serve { source })?;

        reclaimer.abort();
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut signal) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            return;
        };
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn upgrade_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        transport::handle_socket(socket, state.registry, state.credentials, state.env, state.gate)
    })
}
