//! Test doubles shared by the session unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tingxie_core::WordBook;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::controller::{SessionController, SessionTiming};
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::speech::{SpeechDriver, SpeechEngine, Utterance, Voice};
use crate::transport::LocalTransport;

/// Records every utterance with the (possibly paused) tokio clock.
#[derive(Clone, Default)]
pub struct MockEngine {
    spoken: Arc<Mutex<Vec<(String, Instant)>>>,
    cancels: Arc<AtomicUsize>,
}

impl MockEngine {
    pub fn spoken(&self) -> Vec<(String, Instant)> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEngine for MockEngine {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Alex", "en-US")]
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SessionError> {
        self.spoken
            .lock()
            .unwrap()
            .push((utterance.text, Instant::now()));
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn book_transport(words: &[&str]) -> LocalTransport {
    let book = WordBook::new(words.iter().map(|w| w.to_string()).collect());
    LocalTransport::new(Arc::new(book))
}

/// A controller with `words` loaded as page 1.
pub async fn controller_with_words(
    words: &[&str],
) -> (SessionController<MockEngine, LocalTransport>, MockEngine) {
    let engine = MockEngine::default();
    let ctrl = SessionController::new(
        SpeechDriver::new(engine.clone()),
        book_transport(words),
        SessionTiming::default(),
    );
    ctrl.load_page(1).await.unwrap();
    (ctrl, engine)
}

/// Wait for the first event matching `pred`, skipping everything else.
pub async fn next_matching<F>(
    rx: &mut broadcast::Receiver<SessionEvent>,
    pred: F,
) -> SessionEvent
where
    F: Fn(&SessionEvent) -> bool,
{
    let wait = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(600), wait)
        .await
        .expect("expected event never arrived")
}

/// Wait until the controller opens the answer slot for word `index`.
pub async fn awaiting_answer(rx: &mut broadcast::Receiver<SessionEvent>, index: usize) {
    next_matching(rx, |e| {
        matches!(e, SessionEvent::AwaitingAnswer { index: i } if *i == index)
    })
    .await;
}
