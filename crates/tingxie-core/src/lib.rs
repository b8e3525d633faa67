//! Tingxie core crate - configuration, errors, the shared data model, the
//! transport wire protocol, and the word list page provider.

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;
pub mod wordlist;

pub use config::TingxieConfig;
pub use error::{Result, TingxieError};
pub use protocol::{ClientMessage, ServerMessage};
pub use types::*;
pub use wordlist::{parse_word_list, WordBook, DEFAULT_PAGE_SIZE};
