//! The message list displayed for the active chat.
//!
//! Fetches are tagged with a monotonically increasing ticket. A response is
//! applied only if its ticket is newer than the last one applied, so a slow
//! older response can never overwrite newer data. Once the view is closed
//! (screen torn down) nothing is applied at all.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::debug;

use penguin_shared::protocol::Message;
use penguin_shared::ChatId;

/// Sequence number handed out when a fetch is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Clone)]
pub struct MessageView {
    inner: Arc<ViewInner>,
}

struct ViewInner {
    chat_id: ChatId,
    next_ticket: AtomicU64,
    state: Mutex<ViewState>,
    messages: watch::Sender<Vec<Message>>,
}

#[derive(Default)]
struct ViewState {
    last_applied: u64,
    closed: bool,
}

impl MessageView {
    pub fn new(chat_id: ChatId) -> Self {
        let (messages, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(ViewInner {
                chat_id,
                next_ticket: AtomicU64::new(0),
                state: Mutex::new(ViewState::default()),
                messages,
            }),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.inner.chat_id
    }

    /// Issue a ticket for a fetch that is about to start.
    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.inner.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replace the displayed list with the active chat's subset of
    /// `all_messages`.
    ///
    /// Returns `false` (and changes nothing) when the view is closed or a
    /// newer fetch has already been applied.
    pub fn apply(&self, ticket: FetchTicket, all_messages: Vec<Message>) -> bool {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if state.closed {
            debug!(chat = %self.inner.chat_id, ticket = ticket.0, "View closed, discarding response");
            return false;
        }
        if ticket.0 <= state.last_applied {
            debug!(
                chat = %self.inner.chat_id,
                ticket = ticket.0,
                last_applied = state.last_applied,
                "Discarding out-of-order response"
            );
            return false;
        }
        state.last_applied = ticket.0;

        let filtered = filter_for_chat(all_messages, self.inner.chat_id);
        self.inner.messages.send_if_modified(|current| {
            if *current == filtered {
                return false;
            }
            *current = filtered;
            true
        });
        true
    }

    /// Insert one pushed message, keeping id order.
    ///
    /// A merge counts as a newer update: fetches issued before it can no
    /// longer be applied, so their older snapshot cannot hide the message.
    ///
    /// Returns `false` if it belongs to another chat, is already displayed,
    /// or the view is closed.
    pub fn merge_pushed(&self, message: Message) -> bool {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if state.closed || message.chat_id != self.inner.chat_id {
            return false;
        }

        let merged = self.inner.messages.send_if_modified(|current| {
            match current.binary_search_by_key(&message.message_id, |m| m.message_id) {
                Ok(_) => false,
                Err(pos) => {
                    current.insert(pos, message);
                    true
                }
            }
        });
        if merged {
            state.last_applied = self.begin().0;
        }
        merged
    }

    /// Stop accepting updates. Idempotent.
    pub fn close(&self) {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .closed
    }

    /// Current displayed list.
    pub fn messages(&self) -> Vec<Message> {
        self.inner.messages.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Message>> {
        self.inner.messages.subscribe()
    }
}

impl std::fmt::Debug for MessageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageView")
            .field("chat_id", &self.inner.chat_id)
            .field("len", &self.inner.messages.borrow().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Messages of `chat_id` in ascending id order, each id at most once.
pub fn filter_for_chat(messages: impl IntoIterator<Item = Message>, chat_id: ChatId) -> Vec<Message> {
    let mut filtered: Vec<Message> = messages
        .into_iter()
        .filter(|m| m.chat_id == chat_id)
        .collect();
    filtered.sort_by_key(|m| m.message_id);
    filtered.dedup_by_key(|m| m.message_id);
    filtered
}
