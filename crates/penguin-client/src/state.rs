//! Application state shared by every user action.
//!
//! [`AppState`] is cheap to clone; all fields are handles to shared state.

use std::sync::Arc;

use tracing::{info, warn};

use penguin_store::{MemoryTokenStore, SqliteTokenStore, TokenStore};

use crate::api::{ChatApi, HttpChatApi};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    /// Token plus cached chats, shared with every running sync loop.
    pub session: SessionStore,

    /// Backend boundary. Real HTTP in the binary, a fake in tests.
    pub api: Arc<dyn ChatApi>,

    /// Notices and navigation requests for the UI.
    pub events: EventBus,

    pub config: Arc<ClientConfig>,
}

impl AppState {
    pub fn new(session: SessionStore, api: Arc<dyn ChatApi>, config: ClientConfig) -> Self {
        Self {
            session,
            api,
            events: EventBus::new(),
            config: Arc::new(config),
        }
    }

    /// Wire up the HTTP backend and on-disk token storage.
    ///
    /// An unusable data directory is not fatal: the token then only lives
    /// for the current process.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let api = HttpChatApi::new(&config)?;

        let persistence: Arc<dyn TokenStore> =
            match SqliteTokenStore::open(config.data_dir.as_deref()) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(error = %e, "Token storage unavailable, session will not persist");
                    Arc::new(MemoryTokenStore::new())
                }
            };

        info!(
            user_service = %config.user_service_url,
            chat_service = %config.chat_service_url,
            push = config.push_url.is_some(),
            "Client initialised"
        );

        Ok(Self::new(SessionStore::new(persistence), Arc::new(api), config))
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
