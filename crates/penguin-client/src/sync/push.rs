//! Optional websocket push channel.
//!
//! Frames either carry a full message, merged straight into the view, or only
//! hint that a chat changed, in which case the poll loop is asked to refresh.
//! Polling keeps running underneath; push only makes updates arrive sooner.

use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use penguin_shared::constants::PUSH_CHAT_QUERY_PARAM;
use penguin_shared::protocol::PushFrame;
use penguin_shared::ChatId;

use super::{MessageView, SyncCommand};
use crate::backoff::Backoff;
use crate::error::{ClientError, Result};

type PushStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECONNECT_BASE: Duration = Duration::from_secs(1);

/// What a single inbound frame did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameAction {
    Merged,
    Duplicate,
    Refresh,
    Ignored,
}

pub(super) async fn run(
    endpoint: Url,
    view: MessageView,
    nudge: mpsc::Sender<SyncCommand>,
    mut token_rx: watch::Receiver<Option<String>>,
    max_backoff: Duration,
) {
    let chat_id = view.chat_id();
    let mut backoff = Backoff::new(RECONNECT_BASE, max_backoff);

    'connect: loop {
        if view.is_closed() {
            return;
        }
        let Some(token) = token_rx.borrow_and_update().clone() else {
            return;
        };

        match connect(&endpoint, chat_id, &token).await {
            Ok(mut stream) => {
                info!(chat = %chat_id, "Push channel connected");
                backoff.reset();
                // Catch up on anything sent while disconnected.
                let _ = nudge.try_send(SyncCommand::RefreshNow);

                loop {
                    let frame = tokio::select! {
                        frame = stream.next() => frame,
                        changed = token_rx.changed() => {
                            if changed.is_err() || token_rx.borrow().is_none() {
                                return;
                            }
                            info!(chat = %chat_id, "Token changed, reconnecting push channel");
                            let _ = stream.close(None).await;
                            continue 'connect;
                        }
                    };
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            handle_frame(&text, chat_id, &view, &nudge);
                        }
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(chat = %chat_id, error = %e, "Push channel read failed");
                            break;
                        }
                    }
                    if view.is_closed() {
                        return;
                    }
                }
                debug!(chat = %chat_id, "Push channel closed");
            }
            Err(e) => {
                warn!(chat = %chat_id, error = %e, "Push channel connect failed");
            }
        }

        backoff.record_failure();
        let delay = backoff.jittered_delay();
        debug!(chat = %chat_id, retry_in_ms = delay.as_millis() as u64, "Reconnecting push channel");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = token_rx.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

async fn connect(endpoint: &Url, chat_id: ChatId, token: &str) -> Result<PushStream> {
    let mut url = endpoint.clone();
    url.query_pairs_mut()
        .append_pair(PUSH_CHAT_QUERY_PARAM, &chat_id.to_string());

    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| ClientError::Push(e.to_string()))?;
    let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| ClientError::Push(e.to_string()))?;
    request.headers_mut().insert(AUTHORIZATION, bearer);

    let (stream, _) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| ClientError::Push(e.to_string()))?;
    Ok(stream)
}

/// Apply one text frame to `view`.
pub(crate) fn handle_frame(
    text: &str,
    chat_id: ChatId,
    view: &MessageView,
    nudge: &mpsc::Sender<SyncCommand>,
) -> FrameAction {
    let frame = match PushFrame::from_json(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(chat = %chat_id, error = %e, "Ignoring push frame");
            return FrameAction::Ignored;
        }
    };
    if frame.chat_id() != chat_id {
        return FrameAction::Ignored;
    }

    match frame {
        PushFrame::Message(message) => {
            if view.merge_pushed(message) {
                FrameAction::Merged
            } else {
                FrameAction::Duplicate
            }
        }
        PushFrame::ChatHint(_) => {
            let _ = nudge.try_send(SyncCommand::RefreshNow);
            FrameAction::Refresh
        }
    }
}
