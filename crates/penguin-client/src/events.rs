//! Notifications and navigation requests raised by user actions.
//!
//! The UI layer subscribes to the [`EventBus`] and renders notices as
//! transient banners. Background sync never emits here.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::route::Route;

const EVENT_BUS_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub header: String,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            header: "Success".into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            header: "Error".into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Notice(Notice),
    Navigate(Route),
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn notify(&self, notice: Notice) {
        self.emit(ClientEvent::Notice(notice));
    }

    pub fn navigate(&self, route: Route) {
        self.emit(ClientEvent::Navigate(route));
    }

    fn emit(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("No event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
