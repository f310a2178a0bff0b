//! Live connections of signed-in users.
//!
//! The directory maps a user id to the sender half of their open websocket.
//! The engine reaches it through [`LiveChannel`]; a user without a connection
//! is skipped and gets the email only.

use std::{
    collections::HashMap,
    sync::{
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use axum::{
    Extension,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use engine::{LiveChannel, LiveEvent, Staff};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::server::ServerState;

/// Identifies one registration, so a stale connection closing cannot remove
/// the one that replaced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionId(u64);

#[derive(Debug, Default)]
pub struct PresenceDirectory {
    connections: RwLock<HashMap<String, (ConnectionId, UnboundedSender<String>)>>,
    next_id: AtomicU64,
}

impl PresenceDirectory {
    /// Registers a connection for `user_id`, replacing any previous one.
    /// Frames pushed to the user arrive on the returned receiver.
    pub fn register(&self, user_id: &str) -> (ConnectionId, UnboundedReceiver<String>) {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = unbounded_channel();
        match self.connections.write() {
            Ok(mut connections) => {
                connections.insert(user_id.to_string(), (id, sender));
            }
            Err(err) => tracing::error!("presence directory poisoned: {err}"),
        }
        (id, receiver)
    }

    /// Removes the registration of `user_id` if it is still `connection`.
    pub fn unregister(&self, user_id: &str, connection: ConnectionId) {
        let Ok(mut connections) = self.connections.write() else {
            tracing::error!("presence directory poisoned");
            return;
        };
        if connections
            .get(user_id)
            .is_some_and(|(current, _)| *current == connection)
        {
            connections.remove(user_id);
        }
    }

    pub fn lookup(&self, user_id: &str) -> Option<UnboundedSender<String>> {
        self.connections
            .read()
            .ok()?
            .get(user_id)
            .map(|(_, sender)| sender.clone())
    }
}

impl LiveChannel for PresenceDirectory {
    fn push(&self, user_id: &str, event: &LiveEvent) -> bool {
        let Some(sender) = self.lookup(user_id) else {
            return false;
        };
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!("failed to serialize live event: {err}");
                return false;
            }
        };
        sender.send(json).is_ok()
    }
}

/// Upgrade to a websocket and keep the caller registered while it is open.
pub async fn connect(
    Extension(user): Extension<Staff>,
    State(state): State<ServerState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        let (connection, frames) = state.presence.register(&user.id);
        tracing::debug!(user = %user.id, "live connection opened");
        serve(socket, frames).await;
        state.presence.unregister(&user.id, connection);
        tracing::debug!(user = %user.id, "live connection closed");
    })
}

async fn serve(socket: WebSocket, mut frames: UnboundedReceiver<String>) {
    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(json) = frame else { break };
                if let Err(err) = sink.send(Message::Text(json.into())).await {
                    tracing::warn!("failed to send live event: {err}");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_reaches_registered_user() {
        let presence = PresenceDirectory::default();
        let (_, mut frames) = presence.register("otieno");

        let event = LiveEvent::dispatch_treated("approved".to_string(), Some("4821".to_string()));
        assert!(presence.push("otieno", &event));

        let json: serde_json::Value = serde_json::from_str(&frames.try_recv().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "dispatch-treated",
                "data": {"message": "approved", "otp": "4821"}
            })
        );
    }

    #[test]
    fn push_without_connection_is_skipped() {
        let presence = PresenceDirectory::default();
        let event = LiveEvent::dispatch_treated("rejected".to_string(), None);
        assert!(!presence.push("nobody", &event));
    }

    #[test]
    fn stale_connection_does_not_unregister_newer_one() {
        let presence = PresenceDirectory::default();
        let (first, _old) = presence.register("otieno");
        let (_second, _new) = presence.register("otieno");

        presence.unregister("otieno", first);
        assert!(presence.lookup("otieno").is_some());
    }

    #[test]
    fn closed_receiver_reports_failure() {
        let presence = PresenceDirectory::default();
        let (_, frames) = presence.register("otieno");
        drop(frames);

        let event = LiveEvent::dispatch_treated("approved".to_string(), None);
        assert!(!presence.push("otieno", &event));
    }
}
