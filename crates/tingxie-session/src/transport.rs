//! The page request channel seen from the session side.

use std::sync::Arc;

use async_trait::async_trait;
use tingxie_core::{WordBook, WordPage};

use crate::error::SessionError;

/// Asks the word source for one page.
///
/// Implementations clamp the page into `[1, totalPages]` and substitute the
/// default page size for 0.
#[async_trait]
pub trait PageTransport: Send + Sync {
    async fn request_page(&self, page: i64, page_size: u32) -> Result<WordPage, SessionError>;
}

/// In-process transport backed directly by a [`WordBook`].
#[derive(Debug, Clone)]
pub struct LocalTransport {
    book: Arc<WordBook>,
}

impl LocalTransport {
    pub fn new(book: Arc<WordBook>) -> Self {
        Self { book }
    }
}

#[async_trait]
impl PageTransport for LocalTransport {
    async fn request_page(&self, page: i64, page_size: u32) -> Result<WordPage, SessionError> {
        Ok(self.book.page(page, page_size))
    }
}
