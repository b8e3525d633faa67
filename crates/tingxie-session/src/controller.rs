//! The autoplay dictation session.
//!
//! A [`SessionController`] owns one client's page, answer log and playback
//! settings. `start()` spawns a single task (a "pass") that walks the page:
//! speak each word `repeat_count` times with timed gaps, wait for a typed
//! answer, grade it, pause, move on, and summarize at the end of the page.
//!
//! Stopping is cooperative. Every pass carries a generation number; `stop()`
//! bumps the generation, drops the pending answer slot and flips the `playing`
//! watch so any timer the pass is parked on returns early. A pass that wakes
//! up under a stale generation exits without touching state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tingxie_core::config::PlaybackSettings;
use tingxie_core::{AnswerRecord, PlaybackConfig, SessionId, WordPage, DEFAULT_PAGE_SIZE};
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::grader;
use crate::speech::{SpeechDriver, SpeechEngine};
use crate::state::{SessionPhase, StateMachine};
use crate::summary::Summary;
use crate::transport::PageTransport;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Fixed delays around the per-word cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    /// Pause after grading before the next word is played.
    pub advance_delay: Duration,
    /// Pause after the last word before the summary is shown.
    pub summary_delay: Duration,
    /// Upper bound on a page request round trip.
    pub page_request_timeout: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            advance_delay: Duration::from_millis(1000),
            summary_delay: Duration::from_millis(1000),
            page_request_timeout: Duration::from_millis(10_000),
        }
    }
}

impl SessionTiming {
    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self {
            advance_delay: Duration::from_millis(settings.advance_delay_ms),
            summary_delay: Duration::from_millis(settings.summary_delay_ms),
            page_request_timeout: Duration::from_millis(settings.page_request_timeout_ms),
        }
    }
}

/// Read-only view of the session for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub current_page: u32,
    pub current_word_index: usize,
    pub is_playing: bool,
    pub answers: Vec<AnswerRecord>,
}

/// What happened to a call to [`SessionController::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Handed to the pass for grading.
    Accepted,
    /// Blank or whitespace-only; nothing changed.
    Ignored,
    /// No word is waiting for an answer.
    NotAwaiting,
}

pub(crate) struct SessionData {
    pub(crate) page: WordPage,
    pub(crate) page_size: u32,
    pub(crate) current_word_index: usize,
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) playback: PlaybackConfig,
    pub(crate) pending_answer: Option<oneshot::Sender<String>>,
    pub(crate) generation: u64,
    pub(crate) playing: bool,
}

pub(crate) struct Inner<E, T> {
    pub(crate) id: SessionId,
    pub(crate) driver: SpeechDriver<E>,
    pub(crate) transport: T,
    pub(crate) timing: SessionTiming,
    pub(crate) machine: StateMachine,
    pub(crate) data: Mutex<SessionData>,
    pub(crate) playing: watch::Sender<bool>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
}

/// One client's dictation session. Cheap to clone; clones share state.
pub struct SessionController<E, T> {
    pub(crate) inner: Arc<Inner<E, T>>,
}

impl<E, T> Clone for SessionController<E, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E, T> SessionController<E, T>
where
    E: SpeechEngine + 'static,
    T: PageTransport + 'static,
{
    pub fn new(driver: SpeechDriver<E>, transport: T, timing: SessionTiming) -> Self {
        let (playing, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                id: SessionId::new(),
                driver,
                transport,
                timing,
                machine: StateMachine::new(),
                data: Mutex::new(SessionData {
                    page: WordPage::empty(),
                    page_size: DEFAULT_PAGE_SIZE,
                    current_word_index: 0,
                    answers: Vec::new(),
                    playback: PlaybackConfig::default(),
                    pending_answer: None,
                    generation: 0,
                    playing: false,
                }),
                playing,
                events,
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.machine.current()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    pub fn page(&self) -> WordPage {
        self.lock().page.clone()
    }

    pub fn page_size(&self) -> u32 {
        self.lock().page_size
    }

    pub fn playback(&self) -> PlaybackConfig {
        self.lock().playback
    }

    /// Change repeat count and interval. Takes effect from the next word.
    pub fn set_playback(&self, playback: PlaybackConfig) {
        let playback = PlaybackConfig::new(playback.total_interval_ms, playback.repeat_count);
        debug!(
            session_id = %self.inner.id,
            total_interval_ms = playback.total_interval_ms,
            repeat_count = playback.repeat_count,
            "Playback settings changed"
        );
        self.lock().playback = playback;
    }

    pub fn snapshot(&self) -> SessionState {
        let data = self.lock();
        SessionState {
            current_page: data.page.current_page,
            current_word_index: data.current_word_index,
            is_playing: data.playing,
            answers: data.answers.clone(),
        }
    }

    /// Start autoplay from the first word of the current page.
    ///
    /// Returns `Ok(false)` without doing anything if a pass is already
    /// running. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<bool, SessionError> {
        let (generation, page, word_count) = {
            let mut data = self.lock();
            if data.playing {
                debug!(session_id = %self.inner.id, "Autoplay already running");
                return Ok(false);
            }
            if data.page.is_empty() {
                return Err(SessionError::EmptyPage);
            }

            self.inner.machine.transition(SessionPhase::Playing(0))?;
            data.current_word_index = 0;
            data.answers.clear();
            data.pending_answer = None;
            data.generation += 1;
            data.playing = true;
            (data.generation, data.page.current_page, data.page.len())
        };

        self.inner.playing.send_replace(true);
        info!(
            session_id = %self.inner.id,
            page,
            word_count,
            "Autoplay started"
        );
        self.emit(SessionEvent::PlaybackStarted { page, word_count });

        tokio::spawn(self.clone().run_pass(generation));
        Ok(true)
    }

    /// Stop the running pass. Returns false if nothing was playing.
    pub fn stop(&self) -> bool {
        let (answered, summary) = {
            let mut data = self.lock();
            if !data.playing {
                return false;
            }
            data.playing = false;
            data.generation += 1;
            data.pending_answer = None;
            if let Err(e) = self.inner.machine.transition(SessionPhase::Stopped) {
                warn!(session_id = %self.inner.id, error = %e, "Unexpected phase on stop");
            }
            let summary = (!data.answers.is_empty()).then(|| Summary::from_answers(&data.answers));
            (data.answers.len(), summary)
        };

        self.inner.playing.send_replace(false);
        self.inner.driver.cancel();
        info!(session_id = %self.inner.id, answered, "Autoplay stopped");
        self.emit(SessionEvent::PlaybackStopped { answered, summary });
        true
    }

    /// The single play/stop control. Returns whether autoplay is now running.
    pub fn toggle(&self) -> Result<bool, SessionError> {
        if self.stop() {
            Ok(false)
        } else {
            self.start()
        }
    }

    /// Offer an answer for the word currently waiting for one.
    pub fn submit(&self, answer: &str) -> SubmitOutcome {
        if answer.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }
        let slot = self.lock().pending_answer.take();
        match slot {
            Some(tx) => match tx.send(answer.to_string()) {
                Ok(()) => SubmitOutcome::Accepted,
                Err(_) => SubmitOutcome::NotAwaiting,
            },
            None => SubmitOutcome::NotAwaiting,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.inner
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    fn is_current(&self, generation: u64) -> bool {
        let data = self.lock();
        data.playing && data.generation == generation
    }

    /// Word to play next, or `None` if this pass is no longer current.
    fn current_word(&self, generation: u64) -> Option<(usize, String, PlaybackConfig)> {
        let data = self.lock();
        if !data.playing || data.generation != generation {
            return None;
        }
        let index = data.current_word_index;
        let word = data.page.words.get(index)?.clone();
        Some((index, word, data.playback))
    }

    /// Sleep for `duration` unless the pass is stopped first. Returns whether
    /// the pass should continue.
    async fn pause(
        &self,
        stop_rx: &mut watch::Receiver<bool>,
        duration: Duration,
        generation: u64,
    ) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => self.is_current(generation),
            _ = stopped(stop_rx) => false,
        }
    }

    async fn run_pass(self, generation: u64) {
        let mut stop_rx = self.inner.playing.subscribe();
        let id = self.inner.id;

        loop {
            let Some((index, word, playback)) = self.current_word(generation) else {
                return;
            };
            debug!(session_id = %id, index, word = %word, "Playing word");
            self.emit(SessionEvent::WordStarted { index });

            for repeat in 0..playback.repeat_count {
                if !self.is_current(generation) {
                    return;
                }
                self.emit(SessionEvent::Utterance {
                    index,
                    repeat: repeat + 1,
                    of: playback.repeat_count,
                });
                self.inner.driver.speak(&word).await;

                let last = repeat + 1 == playback.repeat_count;
                if !last && !self.pause(&mut stop_rx, playback.gap(), generation).await {
                    return;
                }
            }

            let answer_rx = {
                let mut data = self.lock();
                if !data.playing || data.generation != generation {
                    return;
                }
                if let Err(e) = self
                    .inner
                    .machine
                    .transition(SessionPhase::AwaitingAnswer(index))
                {
                    warn!(session_id = %id, error = %e, "Autoplay pass aborted");
                    return;
                }
                let (tx, rx) = oneshot::channel();
                data.pending_answer = Some(tx);
                rx
            };
            self.emit(SessionEvent::AwaitingAnswer { index });

            let answer = tokio::select! {
                answer = answer_rx => match answer {
                    Ok(answer) => answer,
                    Err(_) => return,
                },
                _ = stopped(&mut stop_rx) => return,
            };

            let (record, finished) = {
                let mut data = self.lock();
                if !data.playing || data.generation != generation {
                    return;
                }
                let machine = &self.inner.machine;
                if let Err(e) = machine.transition(SessionPhase::Grading(index)) {
                    warn!(session_id = %id, error = %e, "Autoplay pass aborted");
                    return;
                }
                let record = grader::record(&word, &answer);
                data.answers.push(record.clone());
                data.current_word_index = index + 1;
                let finished = data.current_word_index >= data.page.len();
                let next = if finished {
                    SessionPhase::PageComplete
                } else {
                    SessionPhase::Advancing
                };
                if let Err(e) = machine.transition(next) {
                    warn!(session_id = %id, error = %e, "Autoplay pass aborted");
                    return;
                }
                (record, finished)
            };

            info!(
                session_id = %id,
                index,
                word = %record.word,
                correct = record.is_correct,
                "Answer graded"
            );
            let feedback = grader::feedback(&record);
            self.emit(SessionEvent::AnswerGraded {
                index,
                record,
                feedback,
            });

            if finished {
                if self
                    .pause(&mut stop_rx, self.inner.timing.summary_delay, generation)
                    .await
                {
                    self.complete_page(generation);
                }
                return;
            }

            if !self
                .pause(&mut stop_rx, self.inner.timing.advance_delay, generation)
                .await
            {
                return;
            }

            {
                let data = self.lock();
                if !data.playing || data.generation != generation {
                    return;
                }
                if let Err(e) = self.inner.machine.transition(SessionPhase::Playing(index + 1)) {
                    warn!(session_id = %id, error = %e, "Autoplay pass aborted");
                    return;
                }
            }
        }
    }

    fn complete_page(&self, generation: u64) {
        let summary = {
            let mut data = self.lock();
            if !data.playing || data.generation != generation {
                return;
            }
            let summary = Summary::for_page(&data.page.words, &data.answers);
            if let Err(e) = self.inner.machine.transition(SessionPhase::Idle) {
                warn!(session_id = %self.inner.id, error = %e, "Unexpected phase at page end");
                self.inner.machine.reset();
            }
            data.playing = false;
            summary
        };

        self.inner.playing.send_replace(false);
        info!(
            session_id = %self.inner.id,
            correct = summary.correct_count,
            total = summary.total_count,
            accuracy = summary.accuracy,
            "Page complete"
        );
        self.emit(SessionEvent::PageCompleted { summary });
    }
}

/// Resolves once the `playing` flag is false.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|playing| !*playing).await;
}
