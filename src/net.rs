use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::Message;
use uuid::Uuid;

use crate::input::RawInput;
use crate::physics::PhysicsWorld;
use crate::state::SharedGameState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientMessage {
    Input(RawInput),
    Ping,
}

pub async fn start_websocket_server(
    addr: String,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) {
    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind websocket port");
            return;
        }
    };

    info!("websocket listening on ws://{addr}");

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        tokio::spawn(handle_client(
            raw,
            Arc::clone(&state),
            Arc::clone(&physics),
            peer.to_string(),
        ));
    }
}

fn error_message(reason: &str) -> String {
    serde_json::json!({ "type": "error", "reason": reason }).to_string()
}

async fn handle_client(
    raw: TcpStream,
    state: Arc<Mutex<SharedGameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
    peer: String,
) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Player + car. Lock order is always physics, then state.
    // -------------------------------
    let player_id = Uuid::new_v4().to_string();
    {
        let mut phys = physics.lock().await;
        let mut game = state.lock().await;
        if game.add_player(&player_id, &mut phys).is_none() {
            error!(%player_id, "car spawn failed");
            let _ = tx.send(error_message("spawn failed"));
            // dropping the last sender ends the send loop
            drop(tx);
            return;
        }
        game.register_client(&player_id, tx.clone());
    }

    info!(%player_id, %peer, "player connected");

    let welcome = serde_json::json!({ "type": "welcome", "player_id": player_id });
    let _ = tx.send(welcome.to_string());

    // -------------------------------
    // 3) Receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        let text = match msg {
            Message::Text(t) => t,
            Message::Close(_) => break,
            _ => continue,
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Ping) => {
                let _ = tx.send(r#"{"type":"pong"}"#.into());
            }
            Ok(ClientMessage::Input(input)) => {
                state.lock().await.update_input(&player_id, input);
            }
            Err(e) => debug!(%player_id, error = %e, "ignored client message"),
        }
    }

    info!(%player_id, "player disconnected");
    let mut phys = physics.lock().await;
    let mut game = state.lock().await;
    game.remove_player(&player_id, &mut phys);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_message_parses_with_defaults() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"input","vertical":1.0,"handbrake":true}"#).unwrap();
        let ClientMessage::Input(input) = msg else {
            panic!("expected input");
        };
        assert_eq!(input.vertical, 1.0);
        assert!(input.handbrake);
        assert_eq!(input.stick_x, 0.0);
        assert!(!input.touch.throttle);
    }

    #[test]
    fn spawn_failure_message_is_tagged() {
        let v: serde_json::Value = serde_json::from_str(&error_message("spawn failed")).unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["reason"], "spawn failed");
    }

    #[tokio::test]
    async fn dropping_the_only_sender_ends_the_send_loop() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let _ = tx.send(error_message("spawn failed"));
        drop(tx);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn ping_and_garbage() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#),
            Ok(ClientMessage::Ping)
        ));
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"fly"}"#).is_err());
    }
}
