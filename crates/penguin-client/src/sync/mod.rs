//! Keeps the message list of one open chat eventually consistent with the
//! server.
//!
//! The loop runs in a dedicated tokio task. It fetches every message the user
//! can see, keeps the active chat's subset, and publishes it through a
//! [`MessageView`]. Exactly one fetch is in flight at a time; the next one is
//! scheduled `interval` after the previous one finished, or later while the
//! backend keeps failing. The task ends on [`SyncHandle::stop`], when the
//! handle is dropped, or when the session loses its token.
//!
//! ```text
//! Idle --start--> Polling (Starting | Live | Stale) --stop / logout--> Idle
//! ```

mod push;
mod view;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use penguin_shared::protocol::Message;
use penguin_shared::ChatId;

use crate::api::{ApiError, ChatApi};
use crate::backoff::Backoff;
use crate::error::Result;
use crate::route;
use crate::session::SessionStore;

pub use view::{filter_for_chat, FetchTicket, MessageView};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between the end of one fetch and the start of the next.
    pub interval: Duration,
    /// Cap on the delay after consecutive failures.
    pub max_backoff: Duration,
    /// Websocket endpoint; polling only when `None`.
    pub push_url: Option<Url>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(penguin_shared::constants::DEFAULT_POLL_INTERVAL_MS),
            max_backoff: Duration::from_millis(penguin_shared::constants::DEFAULT_MAX_BACKOFF_MS),
            push_url: None,
        }
    }
}

/// Observable freshness of the displayed list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncHealth {
    /// Not running.
    Idle,
    /// Running, first fetch not finished yet.
    Starting,
    /// Last fetch succeeded.
    Live,
    /// Recent fetches failed; the list may be out of date.
    Stale {
        consecutive_failures: u32,
        last_error: String,
    },
    /// The backend rejected the token. The loop has stopped and the session
    /// was logged out.
    Unauthorized,
}

impl SyncHealth {
    pub fn is_polling(&self) -> bool {
        matches!(self, Self::Starting | Self::Live | Self::Stale { .. })
    }
}

#[derive(Debug)]
pub(crate) enum SyncCommand {
    RefreshNow,
}

/// Owner's side of a running loop. Dropping it stops the loop.
pub struct SyncHandle {
    view: MessageView,
    health: watch::Receiver<SyncHealth>,
    cmd_tx: mpsc::Sender<SyncCommand>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn chat_id(&self) -> ChatId {
        self.view.chat_id()
    }

    pub fn view(&self) -> &MessageView {
        &self.view
    }

    pub fn messages(&self) -> Vec<Message> {
        self.view.messages()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.view.subscribe()
    }

    pub fn health(&self) -> SyncHealth {
        self.health.borrow().clone()
    }

    pub fn subscribe_health(&self) -> watch::Receiver<SyncHealth> {
        self.health.clone()
    }

    /// Ask for a fetch as soon as the current one (if any) completes.
    /// Requests made while one is already pending are coalesced.
    pub fn refresh_now(&self) {
        if self.cmd_tx.try_send(SyncCommand::RefreshNow).is_err() {
            debug!(chat = %self.view.chat_id(), "Refresh already pending");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the loop and wait for its task to end. A fetch still in flight
    /// is cancelled and its result never reaches the view.
    pub async fn stop(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Sync task ended abnormally");
            }
        }
    }

    fn signal_stop(&mut self) {
        self.view.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("chat_id", &self.view.chat_id())
            .field("health", &*self.health.borrow())
            .finish()
    }
}

/// The polling task.
pub struct MessageSyncLoop {
    session: SessionStore,
    api: Arc<dyn ChatApi>,
    view: MessageView,
    config: SyncConfig,
    health: watch::Sender<SyncHealth>,
    cmd_rx: mpsc::Receiver<SyncCommand>,
    shutdown_rx: oneshot::Receiver<()>,
    token_rx: watch::Receiver<Option<String>>,
}

impl MessageSyncLoop {
    /// Start syncing `chat_id`. Requires a token and a chat present in the
    /// session's chat list; otherwise nothing is spawned and no request is
    /// made. Must be called from within a tokio runtime.
    pub fn start(
        session: &SessionStore,
        api: Arc<dyn ChatApi>,
        chat_id: ChatId,
        config: SyncConfig,
    ) -> Result<SyncHandle> {
        let chat = route::guard_chat(session, chat_id)?;

        let view = MessageView::new(chat.id);
        let (health_tx, health_rx) = watch::channel(SyncHealth::Starting);
        // Capacity 1: at most one refresh request is ever pending.
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let sync_loop = Self {
            session: session.clone(),
            api,
            view: view.clone(),
            config,
            health: health_tx,
            cmd_rx,
            shutdown_rx,
            token_rx: session.subscribe_token(),
        };

        let push_nudge = cmd_tx.clone();
        let task = tokio::spawn(sync_loop.run(push_nudge));

        Ok(SyncHandle {
            view,
            health: health_rx,
            cmd_tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    async fn run(self, push_nudge: mpsc::Sender<SyncCommand>) {
        let Self {
            session,
            api,
            view,
            config,
            health,
            mut cmd_rx,
            mut shutdown_rx,
            mut token_rx,
        } = self;
        let chat_id = view.chat_id();

        info!(
            chat = %chat_id,
            interval_ms = config.interval.as_millis() as u64,
            push = config.push_url.is_some(),
            "Message sync started"
        );

        let push_task = config.push_url.clone().map(|url| {
            tokio::spawn(push::run(
                url,
                view.clone(),
                push_nudge,
                token_rx.clone(),
                config.max_backoff,
            ))
        });

        let mut backoff = Backoff::new(config.interval, config.max_backoff);
        let mut delay = Duration::ZERO;

        'poll: loop {
            // -- Wait for the next tick, a refresh request, or a stop signal --
            tokio::select! {
                biased;
                _ = &mut shutdown_rx => break 'poll,
                changed = token_rx.changed() => {
                    if changed.is_err() || token_rx.borrow().is_none() {
                        info!(chat = %chat_id, "Token gone, stopping sync");
                        break 'poll;
                    }
                    // New token: fetch right away with it.
                }
                cmd = cmd_rx.recv() => {
                    if cmd.is_none() {
                        break 'poll;
                    }
                    debug!(chat = %chat_id, "Refresh requested");
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(token) = token_rx.borrow_and_update().clone() else {
                break 'poll;
            };

            // -- One fetch, cancellable --
            let ticket = view.begin();
            debug!(chat = %chat_id, ticket = ?ticket, "Fetching messages");
            let result = tokio::select! {
                biased;
                _ = &mut shutdown_rx => break 'poll,
                changed = token_rx.changed() => {
                    if changed.is_err() || token_rx.borrow().is_none() {
                        info!(chat = %chat_id, "Token gone mid-fetch, stopping sync");
                        break 'poll;
                    }
                    delay = Duration::ZERO;
                    continue 'poll;
                }
                result = api.all_messages(&token) => result,
            };

            match result {
                Ok(all) => {
                    let total = all.len();
                    if view.apply(ticket, all) {
                        debug!(chat = %chat_id, total, shown = view.messages().len(), "Messages applied");
                    }
                    if backoff.failures() > 0 {
                        info!(chat = %chat_id, after = backoff.failures(), "Message sync recovered");
                    }
                    backoff.reset();
                    health.send_replace(SyncHealth::Live);
                    delay = config.interval;
                }
                Err(ApiError::Unauthorized(message)) => {
                    warn!(chat = %chat_id, error = %message, "Token rejected, logging out");
                    health.send_replace(SyncHealth::Unauthorized);
                    view.close();
                    session.logout();
                    break 'poll;
                }
                Err(e) => {
                    delay = backoff.record_failure();
                    warn!(
                        chat = %chat_id,
                        error = %e,
                        failures = backoff.failures(),
                        retry_in_ms = delay.as_millis() as u64,
                        "Message fetch failed"
                    );
                    health.send_replace(SyncHealth::Stale {
                        consecutive_failures: backoff.failures(),
                        last_error: e.to_string(),
                    });
                }
            }
        }

        if let Some(task) = push_task {
            task.abort();
        }
        view.close();
        health.send_if_modified(|h| {
            if *h == SyncHealth::Unauthorized {
                return false;
            }
            *h = SyncHealth::Idle;
            true
        });
        info!(chat = %chat_id, "Message sync stopped");
    }
}
