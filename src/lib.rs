use std::sync::Arc;

// --- Module Structure ---

// Core client services and components.
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod navigation;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod transport;

// Navigation guard over the route table (Public, Authenticated, Admin).
pub mod guard;
pub mod routes;

// UI-facing state helpers.
pub mod confirm;
pub mod optimistic;

// --- Public Re-exports ---

pub use api::AuthApi;
pub use config::{ClientConfig, Env};
pub use error::ClientError;
pub use gateway::Gateway;
pub use navigation::{NavigatorState, RecordingNavigator, TracingNavigator};
pub use session::{Session, SessionEvent, SessionStore};
pub use storage::{FileStorage, MemoryStorage, StorageState};
pub use transport::{ReqwestTransport, TransportState};

use routes::RouteTable;

/// SirineClient
///
/// The single container holding every client service. Built once per
/// process; all parts share the same session store, so a refresh performed by
/// one call is seen by every other.
#[derive(Clone)]
pub struct SirineClient {
    /// Configuration: the loaded, immutable client configuration.
    pub config: ClientConfig,
    /// Session layer: tokens and user, persisted through the storage backend.
    pub session: Arc<SessionStore>,
    /// Gateway: every outbound call, with 401 interception and refresh.
    pub gateway: Arc<Gateway>,
    /// Authentication operations.
    pub auth: AuthApi,
    pub routes: Arc<RouteTable>,
}

impl SirineClient {
    /// Assembles a client from explicit dependencies and restores the
    /// persisted session, if any.
    pub fn new(
        config: ClientConfig,
        transport: TransportState,
        storage: StorageState,
        navigator: NavigatorState,
    ) -> Self {
        let session = Arc::new(SessionStore::new(storage));
        if session.restore_auth() {
            tracing::info!("Restored persisted session");
        }

        let gateway = Arc::new(Gateway::new(transport, Arc::clone(&session), navigator));
        let auth = AuthApi::new(Arc::clone(&gateway));

        Self {
            config,
            session,
            gateway,
            auth,
            routes: Arc::new(RouteTable::standard()),
        }
    }

    /// Production wiring: reqwest transport, file-backed session and a
    /// navigator that only logs.
    ///
    /// # Errors
    /// `Config` when the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = Arc::new(ReqwestTransport::new(&config)?) as TransportState;
        let storage = Arc::new(FileStorage::open(&config.session_file)) as StorageState;
        let navigator = Arc::new(TracingNavigator) as NavigatorState;

        Ok(Self::new(config, transport, storage, navigator))
    }

    /// Runs the navigation guard for `location` against the current session,
    /// following redirects.
    pub fn navigate(&self, location: &str) -> routes::Navigation {
        self.routes.navigate(location, &self.session.snapshot())
    }
}
