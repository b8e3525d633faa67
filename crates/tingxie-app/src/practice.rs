//! Terminal dictation session.
//!
//! Renders [`SessionEvent`]s as text and turns typed lines into session
//! commands. Lines starting with `:` are commands; anything else is an answer
//! for the word currently awaiting one.

use std::error::Error;
use std::fmt::Write as _;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tingxie_api::handlers::star_mask;
use tingxie_api::HttpDictionary;
use tingxie_core::{PlaybackConfig, TingxieConfig, WordBook, WordPage};
use tingxie_session::{
    LocalTransport, PageTransport, SessionController, SessionError, SessionEvent, SessionTiming,
    SpeechDriver, SpeechEngine, SubmitOutcome, TranslationCache, TranslationLookup,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::cli::PracticeArgs;
use crate::prefs::Prefs;
use crate::remote::{DictionaryLookup, HttpTranslationLookup, WsTransport};
use crate::tts::CommandSpeechEngine;

const HELP: &str = "\
命令:
  :play          开始 / 暂停听写
  :stop          停止听写
  :next  :prev   下一页 / 上一页
  :page N        跳转到第 N 页
  :size N        每页单词数
  :interval S    每个单词的播放时长 (秒)
  :times N       每个单词的播放次数
  :words         显示 / 隐藏单词
  :def WORD      查看释义
  :help          显示帮助
  :quit          退出
其他输入作为当前单词的答案提交。";

// =============================================================================
// Input
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Toggle,
    Stop,
    Next,
    Previous,
    Page(i64),
    Size(u32),
    Interval(i64),
    Times(i64),
    ToggleWords,
    Define(String),
    Help,
    Quit,
    Answer(String),
    Invalid(String),
}

/// Parse one typed line. `None` for blank lines.
pub fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Some(Input::Answer(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.collect::<Vec<_>>().join(" ");

    let input = match (name.as_str(), arg.as_str()) {
        ("play" | "p", "") => Input::Toggle,
        ("stop" | "s", "") => Input::Stop,
        ("next" | "n", "") => Input::Next,
        ("prev" | "previous", "") => Input::Previous,
        ("page", n) => n_or_usage(n, Input::Page, ":page N"),
        ("size", n) => n.parse().map(Input::Size).unwrap_or_else(|_| usage(":size N")),
        ("interval", s) => n_or_usage(s, Input::Interval, ":interval S"),
        ("times", n) => n_or_usage(n, Input::Times, ":times N"),
        ("words" | "w", "") => Input::ToggleWords,
        ("def" | "d", "") => usage(":def WORD"),
        ("def" | "d", word) => Input::Define(word.to_string()),
        ("help" | "h" | "?", _) => Input::Help,
        ("quit" | "q" | "exit", _) => Input::Quit,
        _ => Input::Invalid(format!("未知命令: {} (输入 :help 查看帮助)", line)),
    };
    Some(input)
}

fn usage(form: &str) -> Input {
    Input::Invalid(format!("用法: {}", form))
}

fn n_or_usage(arg: &str, wrap: fn(i64) -> Input, form: &str) -> Input {
    arg.parse().map(wrap).unwrap_or_else(|_| usage(form))
}

// =============================================================================
// Rendering
// =============================================================================

/// Turns session events into terminal output.
pub struct Presenter {
    page: WordPage,
    words_hidden: bool,
}

impl Presenter {
    pub fn new(words_hidden: bool) -> Self {
        Self {
            page: WordPage::empty(),
            words_hidden,
        }
    }

    pub fn set_words_hidden(&mut self, hidden: bool) {
        self.words_hidden = hidden;
    }

    /// Header plus numbered word list, masked when words are hidden.
    pub fn render_page(&self) -> String {
        let mut out = format!(
            "第 {} 页 / 共 {} 页",
            self.page.current_page, self.page.total_pages
        );
        if self.page.is_empty() {
            out.push_str("\n  (本页没有单词)");
        }
        for (i, word) in self.page.words.iter().enumerate() {
            let shown = if self.words_hidden {
                star_mask(word)
            } else {
                word.clone()
            };
            let _ = write!(out, "\n  {:>2}. {}", i + 1, shown);
        }
        out
    }

    pub fn render(&mut self, event: &SessionEvent) -> String {
        match event {
            SessionEvent::PageLoaded { page } => {
                self.page = page.clone();
                self.render_page()
            }
            SessionEvent::PageRequestFailed { reason } => format!("加载页面失败: {}", reason),
            SessionEvent::PlaybackStarted { page, word_count } => {
                format!("开始听写第 {} 页, 共 {} 个单词", page, word_count)
            }
            SessionEvent::WordStarted { index } => {
                format!("▶ 第 {}/{} 个单词", index + 1, self.page.len())
            }
            SessionEvent::Utterance { repeat, of, .. } => format!("  播放 {}/{}", repeat, of),
            SessionEvent::AwaitingAnswer { .. } => "请输入答案:".to_string(),
            SessionEvent::AnswerGraded { feedback, .. } => format!("  {}", feedback),
            SessionEvent::PlaybackStopped { answered, summary } => {
                let mut out = format!("听写已停止, 已作答 {} 个单词", answered);
                if let Some(summary) = summary {
                    let _ = write!(out, "\n{}", summary);
                }
                out
            }
            SessionEvent::PageCompleted { summary } => summary.to_string(),
        }
    }
}

// =============================================================================
// Session
// =============================================================================

enum Step {
    Continue(Option<String>),
    Quit,
}

struct Practice<E, T, L> {
    controller: SessionController<E, T>,
    translations: TranslationCache<L>,
    presenter: Presenter,
    prefs: Prefs,
    prefs_path: PathBuf,
}

impl<E, T, L> Practice<E, T, L>
where
    E: SpeechEngine + 'static,
    T: PageTransport + 'static,
    L: TranslationLookup,
{
    fn new(
        controller: SessionController<E, T>,
        translations: TranslationCache<L>,
        prefs_path: PathBuf,
    ) -> Self {
        let prefs = Prefs::load_or_default(&prefs_path);
        Self {
            controller,
            translations,
            presenter: Presenter::new(prefs.words_hidden),
            prefs,
            prefs_path,
        }
    }

    async fn handle(&mut self, input: Input) -> Step {
        let ctrl = &self.controller;
        let message = match input {
            Input::Toggle => match ctrl.toggle() {
                Ok(_) => None,
                Err(SessionError::EmptyPage) => Some("本页没有单词".to_string()),
                Err(e) => Some(e.to_string()),
            },
            Input::Stop => (!ctrl.stop()).then(|| "当前没有在听写".to_string()),
            Input::Next => boundary(ctrl.next_page().await, "已经是最后一页"),
            Input::Previous => boundary(ctrl.previous_page().await, "已经是第一页"),
            Input::Page(n) => boundary(ctrl.jump_to(n).await, "已经在这一页"),
            Input::Size(n) => {
                if let Err(e) = ctrl.set_page_size(n).await {
                    debug!(error = %e, "Page size change failed");
                }
                None
            }
            Input::Interval(secs) => {
                let times = i64::from(ctrl.playback().repeat_count);
                Some(self.apply_playback(PlaybackConfig::from_user_input(secs, times)))
            }
            Input::Times(times) => {
                let secs = (ctrl.playback().total_interval_ms / 1000) as i64;
                Some(self.apply_playback(PlaybackConfig::from_user_input(secs, times)))
            }
            Input::ToggleWords => {
                self.prefs.words_hidden = !self.prefs.words_hidden;
                self.presenter.set_words_hidden(self.prefs.words_hidden);
                if let Err(e) = self.prefs.save(&self.prefs_path) {
                    warn!(
                        path = %self.prefs_path.display(),
                        error = %e,
                        "Failed to save preferences"
                    );
                }
                Some(self.presenter.render_page())
            }
            Input::Define(word) => {
                let text = self.translations.get(&word).await;
                Some(if text.is_empty() {
                    format!("{}: 暂无释义", word)
                } else {
                    format!("{}\n{}", word, text)
                })
            }
            Input::Help => Some(HELP.to_string()),
            Input::Quit => {
                ctrl.stop();
                return Step::Quit;
            }
            Input::Answer(answer) => match ctrl.submit(&answer) {
                SubmitOutcome::Accepted | SubmitOutcome::Ignored => None,
                SubmitOutcome::NotAwaiting => {
                    Some("请等待单词播放完毕后再作答".to_string())
                }
            },
            Input::Invalid(message) => Some(message),
        };
        Step::Continue(message)
    }

    fn apply_playback(&self, playback: PlaybackConfig) -> String {
        self.controller.set_playback(playback);
        let applied = self.controller.playback();
        format!(
            "播放设置: 每个单词 {} 秒, 重复 {} 次",
            applied.total_interval_ms / 1000,
            applied.repeat_count
        )
    }

    async fn run(
        mut self,
        mut events: broadcast::Receiver<SessionEvent>,
        mut lines: mpsc::UnboundedReceiver<String>,
    ) -> Result<(), Box<dyn Error>> {
        println!("{}", HELP);
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) => println!("{}", self.presenter.render(&event)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Display fell behind the session");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                line = lines.recv() => {
                    let Some(line) = line else {
                        self.controller.stop();
                        break;
                    };
                    let Some(input) = parse_input(&line) else { continue };
                    match self.handle(input).await {
                        Step::Continue(Some(message)) => println!("{}", message),
                        Step::Continue(None) => {}
                        Step::Quit => break,
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    self.controller.stop();
                    break;
                }
            }
        }
        info!(session_id = %self.controller.id(), "Practice session ended");
        Ok(())
    }
}

fn boundary(result: Result<Option<WordPage>, SessionError>, at_edge: &str) -> Option<String> {
    match result {
        Ok(Some(_)) => None,
        Ok(None) => Some(at_edge.to_string()),
        // Already reported through PageRequestFailed.
        Err(e) => {
            debug!(error = %e, "Navigation failed");
            None
        }
    }
}

/// Forward stdin lines from a dedicated thread. Blocking reads stay off the
/// runtime so shutdown does not wait on the terminal.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

async fn start<E, T, L>(
    controller: SessionController<E, T>,
    translations: TranslationCache<L>,
    config: &TingxieConfig,
    first_page: i64,
) -> Result<(), Box<dyn Error>>
where
    E: SpeechEngine + 'static,
    T: PageTransport + 'static,
    L: TranslationLookup,
{
    let events = controller.subscribe();
    controller.set_playback(config.playback.playback());
    controller.set_page_size(config.server.default_page_size).await?;
    if first_page != 1 {
        if let Err(e) = controller.jump_to(first_page).await {
            debug!(error = %e, "Initial page jump failed");
        }
    }

    let prefs_path = Prefs::path_in(&config.general.data_dir);
    Practice::new(controller, translations, prefs_path)
        .run(events, spawn_stdin_reader())
        .await
}

/// Run a terminal session, against a server when `--server` is given and
/// against the local word list otherwise.
pub async fn run(config: &TingxieConfig, args: &PracticeArgs) -> Result<(), Box<dyn Error>> {
    let engine = CommandSpeechEngine::from_config(&config.speech).await;
    let driver = SpeechDriver::from_config(engine, &config.speech);
    let timing = SessionTiming::from_settings(&config.playback);

    match &args.server {
        Some(url) => {
            info!(server = %url, "Starting remote practice session");
            let timeout = Duration::from_secs(config.dictionary.timeout_secs.max(1));
            let lookup = HttpTranslationLookup::for_server(url, timeout)?;
            let controller = SessionController::new(driver, WsTransport::new(url.clone()), timing);
            start(controller, TranslationCache::new(lookup), config, args.page).await
        }
        None => {
            let path = Path::new(&config.server.word_list);
            let book = WordBook::load(path)?;
            info!(path = %path.display(), words = book.len(), "Starting local practice session");
            let lookup = DictionaryLookup(HttpDictionary::new(&config.dictionary)?);
            let transport = LocalTransport::new(Arc::new(book));
            let controller = SessionController::new(driver, transport, timing);
            start(controller, TranslationCache::new(lookup), config, args.page).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tingxie_session::{Utterance, Voice};

    struct SilentEngine;

    #[async_trait]
    impl SpeechEngine for SilentEngine {
        fn voices(&self) -> Vec<Voice> {
            Vec::new()
        }
        async fn speak(&self, _utterance: Utterance) -> Result<(), SessionError> {
            Ok(())
        }
        fn cancel(&self) {}
    }

    struct NoLookup;

    #[async_trait]
    impl TranslationLookup for NoLookup {
        async fn lookup(&self, word: &str) -> Result<String, SessionError> {
            match word {
                "apple" => Ok("noun: A round fruit.".to_string()),
                _ => Err(SessionError::Translation("offline".to_string())),
            }
        }
    }

    async fn practice(
        words: usize,
        prefs_path: PathBuf,
    ) -> Practice<SilentEngine, LocalTransport, NoLookup> {
        let book = WordBook::new((0..words).map(|i| format!("word{}", i)).collect());
        let controller = SessionController::new(
            SpeechDriver::new(SilentEngine),
            LocalTransport::new(Arc::new(book)),
            SessionTiming::default(),
        );
        controller.set_page_size(20).await.unwrap();
        Practice::new(controller, TranslationCache::new(NoLookup), prefs_path)
    }

    fn message(step: Step) -> Option<String> {
        match step {
            Step::Continue(message) => message,
            Step::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("   "), None);
        assert_eq!(parse_input(":play"), Some(Input::Toggle));
        assert_eq!(parse_input(":NEXT"), Some(Input::Next));
        assert_eq!(parse_input(":page 3"), Some(Input::Page(3)));
        assert_eq!(parse_input(":page -2"), Some(Input::Page(-2)));
        assert_eq!(parse_input(":size 10"), Some(Input::Size(10)));
        assert_eq!(parse_input(":interval 9"), Some(Input::Interval(9)));
        assert_eq!(parse_input(":times 0"), Some(Input::Times(0)));
        assert_eq!(parse_input(":def ice cream"), Some(Input::Define("ice cream".to_string())));
        assert_eq!(parse_input(":q"), Some(Input::Quit));
    }

    #[test]
    fn test_parse_answers_and_errors() {
        assert_eq!(parse_input("  Apple "), Some(Input::Answer("Apple".to_string())));
        assert!(matches!(parse_input(":page x"), Some(Input::Invalid(_))));
        assert!(matches!(parse_input(":size -1"), Some(Input::Invalid(_))));
        assert!(matches!(parse_input(":def"), Some(Input::Invalid(_))));
        assert!(matches!(parse_input(":dance"), Some(Input::Invalid(_))));
    }

    #[test]
    fn test_render_page_masks_hidden_words() {
        let mut presenter = Presenter::new(false);
        let page = WordPage {
            words: vec!["apple".into(), "kiwi".into()],
            current_page: 2,
            total_pages: 5,
        };
        let shown = presenter.render(&SessionEvent::PageLoaded { page });
        assert!(shown.starts_with("第 2 页 / 共 5 页"));
        assert!(shown.contains(" 1. apple"));
        assert!(shown.contains(" 2. kiwi"));

        presenter.set_words_hidden(true);
        let hidden = presenter.render_page();
        assert!(hidden.contains(" 1. *****"));
        assert!(hidden.contains(" 2. ****"));
        assert!(!hidden.contains("apple"));
    }

    #[test]
    fn test_render_progress_events() {
        let mut presenter = Presenter::new(false);
        let page = WordPage {
            words: vec!["a".into(), "b".into(), "c".into()],
            current_page: 1,
            total_pages: 1,
        };
        presenter.render(&SessionEvent::PageLoaded { page });
        assert_eq!(
            presenter.render(&SessionEvent::WordStarted { index: 1 }),
            "▶ 第 2/3 个单词"
        );
        assert_eq!(
            presenter.render(&SessionEvent::PlaybackStopped { answered: 0, summary: None }),
            "听写已停止, 已作答 0 个单词"
        );
    }

    #[tokio::test]
    async fn test_toggle_words_persists_preference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        let mut session = practice(3, path.clone()).await;
        session.presenter.page = session.controller.page();

        let out = message(session.handle(Input::ToggleWords).await).unwrap();
        assert!(out.contains("*****"));
        assert!(Prefs::load_or_default(&path).words_hidden);

        // A new session picks the preference up.
        let session = practice(3, path).await;
        assert!(session.prefs.words_hidden);
    }

    #[tokio::test]
    async fn test_navigation_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = practice(45, dir.path().join("prefs.json")).await;

        assert_eq!(
            message(session.handle(Input::Previous).await).as_deref(),
            Some("已经是第一页")
        );
        assert_eq!(message(session.handle(Input::Next).await), None);
        assert_eq!(session.controller.page().current_page, 2);

        assert_eq!(message(session.handle(Input::Page(99)).await), None);
        assert_eq!(session.controller.page().current_page, 3);
        assert_eq!(
            message(session.handle(Input::Next).await).as_deref(),
            Some("已经是最后一页")
        );

        assert_eq!(message(session.handle(Input::Size(10)).await), None);
        assert_eq!(session.controller.page().current_page, 1);
        assert_eq!(session.controller.page().total_pages, 5);
    }

    #[tokio::test]
    async fn test_playback_commands_clamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = practice(3, dir.path().join("prefs.json")).await;

        let out = message(session.handle(Input::Times(0)).await).unwrap();
        assert_eq!(out, "播放设置: 每个单词 6 秒, 重复 1 次");
        let out = message(session.handle(Input::Interval(9)).await).unwrap();
        assert_eq!(out, "播放设置: 每个单词 9 秒, 重复 1 次");
        assert_eq!(session.controller.playback(), PlaybackConfig::new(9_000, 1));
    }

    #[tokio::test]
    async fn test_answer_outside_window_and_definitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = practice(3, dir.path().join("prefs.json")).await;

        assert_eq!(
            message(session.handle(Input::Answer("word0".into())).await).as_deref(),
            Some("请等待单词播放完毕后再作答")
        );
        assert_eq!(
            message(session.handle(Input::Define("apple".into())).await).as_deref(),
            Some("apple\n【noun】 A round fruit.")
        );
        assert_eq!(
            message(session.handle(Input::Define("pear".into())).await).as_deref(),
            Some("pear: 暂无释义")
        );
        assert!(matches!(session.handle(Input::Quit).await, Step::Quit));
    }
}
