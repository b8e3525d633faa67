//! Speech engine backed by a command-line synthesizer.
//!
//! Each utterance runs the configured program once with the word as the last
//! argument. `espeak`/`espeak-ng` and macOS `say` get rate, pitch and volume
//! flags derived from the utterance; any other program only receives the
//! configured arguments and the text.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tingxie_core::config::SpeechConfig;
use tingxie_session::{SessionError, SpeechEngine, Utterance, Voice};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Words per minute at rate 1.0 for both espeak and say.
const BASE_WPM: f32 = 175.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Synth {
    Espeak,
    Say,
    Other,
}

impl Synth {
    fn detect(program: &str) -> Self {
        let stem = Path::new(program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match stem {
            "espeak" | "espeak-ng" => Synth::Espeak,
            "say" => Synth::Say,
            _ => Synth::Other,
        }
    }
}

pub struct CommandSpeechEngine {
    program: String,
    args: Vec<String>,
    synth: Synth,
    voices: Vec<Voice>,
    current: Mutex<Option<oneshot::Sender<()>>>,
}

impl CommandSpeechEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        Self {
            synth: Synth::detect(&program),
            program,
            args,
            voices: Vec::new(),
            current: Mutex::new(None),
        }
    }

    /// Build from the `[speech]` section and ask the synthesizer for its voices.
    pub async fn from_config(config: &SpeechConfig) -> Self {
        let mut engine = Self::new(config.command.clone(), config.args.clone());
        engine.voices = engine.discover_voices().await;
        info!(
            program = %engine.program,
            voices = engine.voices.len(),
            "Speech engine ready"
        );
        engine
    }

    async fn discover_voices(&self) -> Vec<Voice> {
        let list_args: &[&str] = match self.synth {
            Synth::Espeak => &["--voices"],
            Synth::Say => &["-v", "?"],
            Synth::Other => return Vec::new(),
        };
        match Command::new(&self.program)
            .args(list_args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                parse_voice_list(self.synth, &String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                warn!(program = %self.program, status = %output.status, "Voice listing failed");
                Vec::new()
            }
            Err(e) => {
                warn!(program = %self.program, error = %e, "Speech synthesizer not available");
                Vec::new()
            }
        }
    }

    /// Full argument list for one utterance.
    fn command_line(&self, utterance: &Utterance) -> Vec<String> {
        let mut args = self.args.clone();
        match self.synth {
            Synth::Espeak => {
                let voice = utterance
                    .voice
                    .as_ref()
                    .map(|v| v.lang.as_str())
                    .unwrap_or(utterance.lang.as_str());
                args.extend([
                    "-v".to_string(),
                    voice.to_lowercase(),
                    "-s".to_string(),
                    format!("{}", (BASE_WPM * utterance.rate).round() as i32),
                    "-p".to_string(),
                    format!("{}", (50.0 * utterance.pitch).round().clamp(0.0, 99.0) as i32),
                    "-a".to_string(),
                    format!("{}", (100.0 * utterance.volume).round().clamp(0.0, 200.0) as i32),
                ]);
            }
            Synth::Say => {
                if let Some(voice) = &utterance.voice {
                    args.extend(["-v".to_string(), voice.name.clone()]);
                }
                args.extend([
                    "-r".to_string(),
                    format!("{}", (BASE_WPM * utterance.rate).round() as i32),
                ]);
            }
            Synth::Other => {}
        }
        args.push(utterance.text.clone());
        args
    }

    fn lock_current(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SpeechEngine for CommandSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    async fn speak(&self, utterance: Utterance) -> Result<(), SessionError> {
        let args = self.command_line(&utterance);
        debug!(program = %self.program, args = ?args, "Spawning synthesizer");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SessionError::Speech(format!("failed to run {}: {}", self.program, e)))?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        // Replacing a previous sender also cancels that utterance.
        *self.lock_current() = Some(cancel_tx);

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|e| {
                    SessionError::Speech(format!("{} did not finish: {}", self.program, e))
                })?;
                if status.success() {
                    Ok(())
                } else {
                    Err(SessionError::Speech(format!("{} exited with {}", self.program, status)))
                }
            }
            _ = cancel_rx => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                debug!(word = %utterance.text, "Utterance cancelled");
                Ok(())
            }
        }
    }

    fn cancel(&self) {
        if let Some(tx) = self.lock_current().take() {
            let _ = tx.send(());
        }
    }
}

/// Parse `espeak --voices` or `say -v ?` output.
fn parse_voice_list(synth: Synth, output: &str) -> Vec<Voice> {
    match synth {
        // " 5  en-us          --/M      English_(America)  gmw/en-US"
        Synth::Espeak => output
            .lines()
            .skip(1)
            .filter_map(|line| {
                let cols: Vec<&str> = line.split_whitespace().collect();
                match cols.as_slice() {
                    [_pty, lang, _gender, name, ..] => Some(Voice::new(*name, *lang)),
                    _ => None,
                }
            })
            .collect(),
        // "Bad News            en_US    # The light you see..."
        Synth::Say => output
            .lines()
            .filter_map(|line| {
                let head = line.split('#').next()?.trim_end();
                let (name, lang) = head.rsplit_once(char::is_whitespace)?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Voice::new(name, lang.replace('_', "-")))
            })
            .collect(),
        Synth::Other => Vec::new(),
    }
}
