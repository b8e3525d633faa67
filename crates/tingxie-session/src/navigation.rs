//! Page navigation on top of a [`PageTransport`].
//!
//! Every request stops a running pass first; a response replaces the page
//! wholesale and resets the answer log.

use tingxie_core::WordPage;
use tracing::{debug, info, warn};

use crate::controller::SessionController;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::speech::SpeechEngine;
use crate::transport::PageTransport;

impl<E, T> SessionController<E, T>
where
    E: SpeechEngine + 'static,
    T: PageTransport + 'static,
{
    /// Request `page` at the current page size and make it current.
    ///
    /// On failure or timeout the previous page stays current and a
    /// [`SessionEvent::PageRequestFailed`] is emitted.
    pub async fn load_page(&self, page: i64) -> Result<WordPage, SessionError> {
        self.stop();
        let page_size = self.page_size();
        let limit = self.inner.timing.page_request_timeout;
        debug!(session_id = %self.inner.id, page, page_size, "Requesting page");

        let result = match tokio::time::timeout(
            limit,
            self.inner.transport.request_page(page, page_size),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SessionError::PageTimeout(limit.as_millis() as u64)),
        };

        match result {
            Ok(word_page) => {
                self.apply_page(word_page.clone());
                Ok(word_page)
            }
            Err(e) => {
                warn!(session_id = %self.inner.id, page, error = %e, "Page request failed");
                self.emit(SessionEvent::PageRequestFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Replace the current page, e.g. with one pushed by the server.
    ///
    /// Stops any running pass and resets the word index and answers.
    pub fn apply_page(&self, page: WordPage) {
        let was_playing = {
            let mut data = self.lock();
            let was_playing = data.playing;
            if was_playing {
                data.playing = false;
                data.generation += 1;
                data.pending_answer = None;
            }
            data.page = page.clone();
            data.current_word_index = 0;
            data.answers.clear();
            self.inner.machine.reset();
            was_playing
        };

        if was_playing {
            self.inner.playing.send_replace(false);
            self.inner.driver.cancel();
        }
        info!(
            session_id = %self.inner.id,
            page = page.current_page,
            total_pages = page.total_pages,
            words = page.len(),
            "Page loaded"
        );
        self.emit(SessionEvent::PageLoaded { page });
    }

    /// Request the current page again.
    pub async fn reload(&self) -> Result<WordPage, SessionError> {
        let current = self.page().current_page;
        self.load_page(i64::from(current)).await
    }

    /// Go to the next page. `Ok(None)` on the last page. Autoplay stops
    /// either way.
    pub async fn next_page(&self) -> Result<Option<WordPage>, SessionError> {
        self.stop();
        let page = self.page();
        if !page.has_next() {
            return Ok(None);
        }
        self.load_page(i64::from(page.current_page) + 1).await.map(Some)
    }

    /// Go to the previous page. `Ok(None)` on page 1. Autoplay stops either
    /// way.
    pub async fn previous_page(&self) -> Result<Option<WordPage>, SessionError> {
        self.stop();
        let page = self.page();
        if !page.has_previous() {
            return Ok(None);
        }
        self.load_page(i64::from(page.current_page) - 1).await.map(Some)
    }

    /// Jump to `target`, clamped into range. `Ok(None)` if that is the
    /// current page.
    pub async fn jump_to(&self, target: i64) -> Result<Option<WordPage>, SessionError> {
        let page = self.page();
        let target = target.clamp(1, i64::from(page.total_pages.max(1)));
        if target == i64::from(page.current_page) {
            return Ok(None);
        }
        self.load_page(target).await.map(Some)
    }

    /// Change the page size (minimum 1) and go back to page 1.
    pub async fn set_page_size(&self, page_size: u32) -> Result<WordPage, SessionError> {
        let page_size = page_size.max(1);
        self.lock().page_size = page_size;
        debug!(session_id = %self.inner.id, page_size, "Page size changed");
        self.load_page(1).await
    }
}
