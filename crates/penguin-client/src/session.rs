//! Authentication token and chat membership shared by every screen.
//!
//! [`SessionStore`] is an explicit handle passed to whatever needs it. Only
//! the store mutates its state; screens read it and request changes through
//! its methods. Token changes are broadcast on a `watch` channel so running
//! sync loops stop as soon as the user logs out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use penguin_shared::protocol::Chat;
use penguin_shared::ChatId;
use penguin_store::{MemoryTokenStore, TokenStore};

use crate::error::{ClientError, Result};

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    token: watch::Sender<Option<String>>,
    /// Set by the first explicit `set_token`, after which hydration must not
    /// overwrite the in-memory token.
    token_touched: AtomicBool,
    chats: Mutex<Vec<Chat>>,
    current_chat: Mutex<Option<Chat>>,
    persistence: Arc<dyn TokenStore>,
}

impl SessionStore {
    /// Create an empty, logged-out session backed by `persistence`.
    pub fn new(persistence: Arc<dyn TokenStore>) -> Self {
        let (token, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                token,
                token_touched: AtomicBool::new(false),
                chats: Mutex::new(Vec::new()),
                current_chat: Mutex::new(None),
                persistence,
            }),
        }
    }

    /// Session whose token only lives as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    // ------------------------------------------------------------------
    // Token
    // ------------------------------------------------------------------

    /// Read the persisted token into memory.
    ///
    /// Storage failures leave the session logged out. A token set through
    /// [`set_token`](Self::set_token) while the read was in progress wins.
    pub async fn load_persisted_token(&self) -> Option<String> {
        let store = Arc::clone(&self.inner.persistence);
        let loaded = match tokio::task::spawn_blocking(move || store.load()).await {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to read persisted token, staying logged out");
                None
            }
            Err(e) => {
                warn!(error = %e, "Token load task failed, staying logged out");
                None
            }
        };

        let Some(token) = loaded.filter(|t| !t.trim().is_empty()) else {
            debug!("No persisted token");
            return self.token();
        };

        let touched = &self.inner.token_touched;
        let restored = self.inner.token.send_if_modified(|current| {
            if touched.load(Ordering::SeqCst) || current.is_some() {
                return false;
            }
            *current = Some(token);
            true
        });

        if restored {
            info!("Restored persisted session");
        }
        self.token()
    }

    /// Fire-and-forget [`load_persisted_token`](Self::load_persisted_token).
    pub fn spawn_hydrate(&self) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            session.load_persisted_token().await;
        })
    }

    /// Set and persist the token. An empty (or blank) token logs out.
    ///
    /// Persistence failures are logged; the in-memory session is updated
    /// regardless.
    pub fn set_token(&self, token: &str) {
        self.inner.token_touched.store(true, Ordering::SeqCst);
        let token = token.trim();

        if token.is_empty() {
            lock(&self.inner.chats).clear();
            *lock(&self.inner.current_chat) = None;
            self.inner.token.send_replace(None);
            if let Err(e) = self.inner.persistence.clear() {
                warn!(error = %e, "Failed to clear persisted token");
            }
            info!("Logged out");
            return;
        }

        self.inner.token.send_replace(Some(token.to_string()));
        if let Err(e) = self.inner.persistence.save(token) {
            warn!(error = %e, "Failed to persist token");
        }
        info!("Session token updated");
    }

    pub fn logout(&self) {
        self.set_token("");
    }

    pub fn token(&self) -> Option<String> {
        self.inner.token.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.token.borrow().is_some()
    }

    pub fn require_token(&self) -> Result<String> {
        self.token().ok_or(ClientError::Unauthenticated)
    }

    /// Observe token changes (login, logout, expiry).
    pub fn subscribe_token(&self) -> watch::Receiver<Option<String>> {
        self.inner.token.subscribe()
    }

    // ------------------------------------------------------------------
    // Chats
    // ------------------------------------------------------------------

    /// Replace the cached chat list. Last write wins.
    pub fn set_chats(&self, chats: Vec<Chat>) {
        debug!(count = chats.len(), "Chat list replaced");
        *lock(&self.inner.chats) = chats;
    }

    pub fn chats(&self) -> Vec<Chat> {
        lock(&self.inner.chats).clone()
    }

    pub fn find_chat(&self, chat_id: ChatId) -> Option<Chat> {
        lock(&self.inner.chats)
            .iter()
            .find(|c| c.id == chat_id)
            .cloned()
    }

    pub fn set_current_chat(&self, chat: Chat) {
        debug!(chat = %chat.id, "Current chat selected");
        *lock(&self.inner.current_chat) = Some(chat);
    }

    pub fn current_chat(&self) -> Option<Chat> {
        lock(&self.inner.current_chat).clone()
    }

    pub fn clear_current_chat(&self) {
        *lock(&self.inner.current_chat) = None;
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .field("chats", &lock(&self.inner.chats).len())
            .field("current_chat", &self.current_chat().map(|c| c.id))
            .finish()
    }
}

/// The guarded data stays consistent even if a holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
