//! Tingxie API crate - axum server for the dictation trainer.
//!
//! Serves the first page as HTML, the page transport channel over a
//! WebSocket, a dictionary proxy for on-hover translations, health, and
//! static client assets.

pub mod dictionary;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod routes;
pub mod state;
pub mod ws;

pub use dictionary::{DictionaryClient, HttpDictionary};
pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
