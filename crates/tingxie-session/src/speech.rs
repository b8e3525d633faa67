//! Speech driver: voice selection and one-utterance-at-a-time playback.
//!
//! The [`SpeechEngine`] trait is the seam to whatever synthesizer the host
//! provides. [`SpeechDriver`] picks a voice from the engine's runtime voice
//! list by ranked preference, applies fixed synthesis parameters, and cancels
//! any utterance still playing before it starts the next one.

use std::time::Duration;

use async_trait::async_trait;
use tingxie_core::config::SpeechConfig;
use tracing::{debug, warn};

use crate::error::SessionError;

/// A synthesis voice as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP 47 language tag, e.g. `en-US`.
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// One request to speak a word.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` means the engine's default voice.
    pub voice: Option<Voice>,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

/// Host speech synthesizer.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Voices currently available. May change at runtime.
    fn voices(&self) -> Vec<Voice>;

    /// Speak the utterance, resolving when the engine reports it finished
    /// (or was cancelled).
    async fn speak(&self, utterance: Utterance) -> Result<(), SessionError>;

    /// Stop whatever is currently being spoken. No-op when silent.
    fn cancel(&self);
}

/// Synthesis parameters applied to every utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechParams {
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechParams {
    fn default() -> Self {
        Self {
            lang: "en-US".to_string(),
            rate: 0.85,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// Pick a voice: first preferred name (substring match, in priority order),
/// then an `en-US` voice that is not a Microsoft voice, then any English
/// voice. `None` leaves the choice to the engine.
pub fn select_voice(voices: &[Voice], preferred: &[String]) -> Option<Voice> {
    preferred
        .iter()
        .find_map(|name| voices.iter().find(|v| v.name.contains(name.as_str())))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.lang == "en-US" && !v.name.contains("Microsoft"))
        })
        .or_else(|| voices.iter().find(|v| v.lang.contains("en")))
        .cloned()
}

/// How a call to [`SpeechDriver::speak`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Finished,
    TimedOut,
    Failed,
}

/// Wraps a [`SpeechEngine`] with voice selection, fixed parameters and an
/// optional per-utterance time limit.
pub struct SpeechDriver<E> {
    engine: E,
    preferred_voices: Vec<String>,
    params: SpeechParams,
    timeout: Option<Duration>,
}

impl<E: SpeechEngine> SpeechDriver<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            preferred_voices: SpeechConfig::default().preferred_voices,
            params: SpeechParams::default(),
            timeout: None,
        }
    }

    /// Build a driver from the `[speech]` config section.
    pub fn from_config(engine: E, config: &SpeechConfig) -> Self {
        let timeout = (config.utterance_timeout_ms > 0)
            .then(|| Duration::from_millis(config.utterance_timeout_ms));
        Self {
            engine,
            preferred_voices: config.preferred_voices.clone(),
            params: SpeechParams {
                rate: config.rate,
                pitch: config.pitch,
                volume: config.volume,
                ..SpeechParams::default()
            },
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Build the utterance for `word` against the engine's current voices.
    pub fn utterance(&self, word: &str) -> Utterance {
        let voice = select_voice(&self.engine.voices(), &self.preferred_voices);
        Utterance {
            text: word.to_string(),
            voice,
            lang: self.params.lang.clone(),
            rate: self.params.rate,
            pitch: self.params.pitch,
            volume: self.params.volume,
        }
    }

    /// Speak `word` once, cancelling anything still playing first.
    ///
    /// Never returns an error: engine failures and timeouts are logged and
    /// reported through the outcome so the caller can carry on.
    pub async fn speak(&self, word: &str) -> SpeechOutcome {
        let utterance = self.utterance(word);
        debug!(
            word = %word,
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            "Speaking"
        );

        self.engine.cancel();
        let spoken = self.engine.speak(utterance);

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, spoken).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        word = %word,
                        timeout_ms = limit.as_millis() as u64,
                        "Utterance timed out"
                    );
                    self.engine.cancel();
                    return SpeechOutcome::TimedOut;
                }
            },
            None => spoken.await,
        };

        match result {
            Ok(()) => SpeechOutcome::Finished,
            Err(e) => {
                warn!(word = %word, error = %e, "Speech synthesis failed");
                SpeechOutcome::Failed
            }
        }
    }

    /// Stop the current utterance, if any.
    pub fn cancel(&self) {
        self.engine.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Microsoft David", "en-US"),
            Voice::new("Daniel", "en-GB"),
            Voice::new("Karen", "en-US"),
            Voice::new("Ting-Ting", "zh-CN"),
        ]
    }

    fn default_prefs() -> Vec<String> {
        SpeechConfig::default().preferred_voices
    }

    #[test]
    fn test_select_preferred_voice_by_rank() {
        let mut list = voices();
        list.push(Voice::new("Alex", "en-US"));
        list.push(Voice::new("Samantha", "en-US"));
        let chosen = select_voice(&list, &default_prefs()).unwrap();
        assert_eq!(chosen.name, "Samantha");
    }

    #[test]
    fn test_select_preferred_voice_substring() {
        let mut list = voices();
        list.push(Voice::new("Google US English (Network)", "en-US"));
        let chosen = select_voice(&list, &default_prefs()).unwrap();
        assert_eq!(chosen.name, "Google US English (Network)");
    }

    #[test]
    fn test_fallback_skips_microsoft_en_us() {
        let chosen = select_voice(&voices(), &default_prefs()).unwrap();
        assert_eq!(chosen.name, "Karen");
    }

    #[test]
    fn test_fallback_any_english() {
        let list = vec![
            Voice::new("Microsoft David", "en-US"),
            Voice::new("Ting-Ting", "zh-CN"),
        ];
        let chosen = select_voice(&list, &default_prefs()).unwrap();
        assert_eq!(chosen.name, "Microsoft David");
    }

    #[test]
    fn test_no_english_voice_uses_default() {
        let list = vec![Voice::new("Ting-Ting", "zh-CN")];
        assert!(select_voice(&list, &default_prefs()).is_none());
        assert!(select_voice(&[], &default_prefs()).is_none());
    }

    #[derive(Default)]
    struct RecordingEngine {
        spoken: Mutex<Vec<Utterance>>,
        cancels: AtomicUsize,
        fail: bool,
        hang: bool,
    }

    #[async_trait]
    impl SpeechEngine for RecordingEngine {
        fn voices(&self) -> Vec<Voice> {
            vec![Voice::new("Samantha", "en-US")]
        }

        async fn speak(&self, utterance: Utterance) -> Result<(), SessionError> {
            self.spoken.lock().unwrap().push(utterance);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(SessionError::Speech("synth crashed".into()));
            }
            Ok(())
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_speak_applies_fixed_params() {
        let driver = SpeechDriver::new(RecordingEngine::default());
        assert_eq!(driver.speak("apple").await, SpeechOutcome::Finished);

        let spoken = driver.engine().spoken.lock().unwrap();
        let utt = &spoken[0];
        assert_eq!(utt.text, "apple");
        assert_eq!(utt.lang, "en-US");
        assert!((utt.rate - 0.85).abs() < f32::EPSILON);
        assert!((utt.pitch - 1.0).abs() < f32::EPSILON);
        assert!((utt.volume - 1.0).abs() < f32::EPSILON);
        assert_eq!(utt.voice.as_ref().unwrap().name, "Samantha");
    }

    #[tokio::test]
    async fn test_speak_cancels_before_starting() {
        let driver = SpeechDriver::new(RecordingEngine::default());
        driver.speak("one").await;
        driver.speak("two").await;
        assert_eq!(driver.engine().cancels.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_not_raised() {
        let engine = RecordingEngine {
            fail: true,
            ..Default::default()
        };
        let driver = SpeechDriver::new(engine);
        assert_eq!(driver.speak("apple").await, SpeechOutcome::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_engine_times_out() {
        let engine = RecordingEngine {
            hang: true,
            ..Default::default()
        };
        let driver = SpeechDriver::new(engine).with_timeout(Some(Duration::from_secs(2)));
        assert_eq!(driver.speak("apple").await, SpeechOutcome::TimedOut);
        // cancel before speak + cancel after timeout
        assert_eq!(driver.engine().cancels.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_config_zero_timeout_disables_limit() {
        let config = SpeechConfig {
            utterance_timeout_ms: 0,
            rate: 1.2,
            ..Default::default()
        };
        let driver = SpeechDriver::from_config(RecordingEngine::default(), &config);
        assert!(driver.timeout.is_none());
        assert!((driver.utterance("x").rate - 1.2).abs() < f32::EPSILON);
    }
}
