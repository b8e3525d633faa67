//! WebSocket handler for the page transport channel.
//!
//! One JSON text frame in, one JSON text frame out. Malformed frames get an
//! `error` reply and the connection stays open.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tingxie_core::{ClientMessage, ServerMessage, SessionId};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// GET /ws - upgrade to the page transport channel.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let connection = SessionId::new();
    info!(connection = %connection, "Client connected");

    while let Some(frame) = socket.recv().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                debug!(connection = %connection, error = %e, "WebSocket receive error");
                break;
            }
        };

        let reply = match frame {
            Message::Text(text) => respond(&state, text.as_str()),
            Message::Close(_) => break,
            // Ping/pong are answered by axum; binary frames are not part of the protocol.
            _ => continue,
        };

        let json = match reply.to_json() {
            Ok(json) => json,
            Err(e) => {
                warn!(connection = %connection, error = %e, "Failed to encode reply");
                continue;
            }
        };
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }

    info!(connection = %connection, "Client disconnected");
}

/// Answer one client frame.
pub fn respond(state: &AppState, text: &str) -> ServerMessage {
    let message = match ClientMessage::from_json(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(error = %e, "Malformed client frame");
            return ServerMessage::Error {
                message: format!("malformed message: {}", e),
            };
        }
    };

    match message {
        ClientMessage::RequestPage { page, page_size } => {
            let size = page_size
                .filter(|s| *s > 0)
                .unwrap_or_else(|| state.default_page_size());
            let word_page = state.book.page(page, size);
            debug!(
                requested = page,
                page = word_page.current_page,
                total_pages = word_page.total_pages,
                "Serving page"
            );
            ServerMessage::WordList(word_page)
        }
        ClientMessage::CheckAnswer {
            answer,
            word_index,
            current_page,
            page_size,
        } => {
            let size = page_size
                .filter(|s| *s > 0)
                .unwrap_or_else(|| state.default_page_size());
            match state
                .book
                .check_answer(&answer, word_index, current_page, size)
            {
                Ok(check) => ServerMessage::CheckResult {
                    is_correct: check.is_correct,
                    correct_word: check.correct_word,
                },
                Err(e) => ServerMessage::Error {
                    message: e.to_string(),
                },
            }
        }
        ClientMessage::Ping => ServerMessage::Pong,
    }
}
