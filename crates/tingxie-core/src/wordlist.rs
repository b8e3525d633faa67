//! Word list parsing and pagination.
//!
//! A word list file is free text with a header line containing `Word List`.
//! Every following line contributes its first token (before whitespace, `/`
//! or `[`, i.e. before any phonetic transcription) as a word. A trailing `*`
//! marker is stripped and blank lines are skipped.
//!
//! [`WordBook`] slices the parsed list into fixed-size pages.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{error, info};

use crate::error::{Result, TingxieError};
use crate::types::WordPage;

/// Page size used when a request does not carry one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Marker that precedes the first word in a word list file.
const HEADER_MARKER: &str = "Word List";

fn token_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s/\[]").expect("static regex"))
}

/// Parse the contents of a word list file.
///
/// Returns an error if the `Word List` header is missing.
pub fn parse_word_list(content: &str) -> Result<Vec<String>> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines
        .iter()
        .position(|line| line.contains(HEADER_MARKER))
        .map(|i| i + 1)
        .ok_or_else(|| {
            TingxieError::WordList(format!("header line '{}' not found", HEADER_MARKER))
        })?;

    let words: Vec<String> = lines[start..]
        .iter()
        .filter_map(|line| {
            let token = token_separator().split(line.trim()).next().unwrap_or("");
            let word = token.strip_suffix('*').unwrap_or(token);
            (!word.is_empty()).then(|| word.to_string())
        })
        .collect();

    info!(
        total_lines = lines.len(),
        header_line = start,
        parsed = words.len(),
        "Word list parsed"
    );
    Ok(words)
}

/// Result of grading a submission against the master list by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionCheck {
    pub is_correct: bool,
    pub correct_word: String,
}

/// The master word list, sliced into pages on demand.
#[derive(Debug, Clone, Default)]
pub struct WordBook {
    words: Vec<String>,
}

impl WordBook {
    pub fn new(words: Vec<String>) -> Self {
        Self { words }
    }

    /// Load and parse a word list file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let words = parse_word_list(&content)?;
        Ok(Self::new(words))
    }

    /// Load a word list file, falling back to an empty book on any failure.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(book) => {
                if book.is_empty() {
                    error!(path = %path.display(), "Word list contains no words");
                }
                book
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read word list");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Normalize a requested page size; 0 means "use the default".
    pub fn effective_page_size(page_size: u32) -> u32 {
        if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        }
    }

    /// Number of pages for the given page size. Never less than 1.
    pub fn total_pages(&self, page_size: u32) -> u32 {
        let size = Self::effective_page_size(page_size) as usize;
        let pages = self.words.len().div_ceil(size);
        pages.clamp(1, u32::MAX as usize) as u32
    }

    /// Clamp a requested page number into `[1, total_pages]`.
    pub fn clamp_page(&self, page: i64, page_size: u32) -> u32 {
        let total = self.total_pages(page_size) as i64;
        page.clamp(1, total) as u32
    }

    /// Return the requested page, clamping the page number into range.
    pub fn page(&self, page: i64, page_size: u32) -> WordPage {
        let size = Self::effective_page_size(page_size);
        let current_page = self.clamp_page(page, size);
        let start = (current_page as usize - 1) * size as usize;
        let end = (start + size as usize).min(self.words.len());
        let words = self.words.get(start..end).unwrap_or_default().to_vec();

        WordPage {
            words,
            current_page,
            total_pages: self.total_pages(size),
        }
    }

    /// Grade an answer against the word at `(page, index)` in the master list.
    pub fn check_answer(
        &self,
        answer: &str,
        word_index: usize,
        current_page: u32,
        page_size: u32,
    ) -> Result<PositionCheck> {
        let size = Self::effective_page_size(page_size) as usize;
        let page = current_page.max(1) as usize;
        let missing = || {
            TingxieError::Pagination(format!(
                "no word at index {} of page {} (page size {})",
                word_index, page, size
            ))
        };
        let actual = (page - 1)
            .checked_mul(size)
            .and_then(|start| start.checked_add(word_index))
            .ok_or_else(missing)?;
        let word = self.words.get(actual).ok_or_else(missing)?;

        Ok(PositionCheck {
            is_correct: answer.trim().to_lowercase() == word.to_lowercase(),
            correct_word: word.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn book(n: usize) -> WordBook {
        WordBook::new((0..n).map(|i| format!("word{}", i)).collect())
    }

    #[test]
    fn test_parse_word_list() {
        let content = "Intro text\nmore intro\nCore Word List\n\
                       abandon /əˈbændən/ v. give up\n\
                       ability* [əˈbɪlɪti] n.\n\
                       \n\
                       able adj.\n";
        let words = parse_word_list(content).unwrap();
        assert_eq!(words, vec!["abandon", "ability", "able"]);
    }

    #[test]
    fn test_parse_word_list_slash_without_space() {
        let words = parse_word_list("Word List\nabout/əˈbaʊt/\n").unwrap();
        assert_eq!(words, vec!["about"]);
    }

    #[test]
    fn test_parse_word_list_missing_header() {
        let result = parse_word_list("apple\nbanana\n");
        assert!(matches!(result, Err(TingxieError::WordList(_))));
    }

    #[test]
    fn test_parse_word_list_only_header() {
        let words = parse_word_list("Word List\n\n   \n").unwrap();
        assert!(words.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Word List\napple\nbanana\n").unwrap();
        let book = WordBook::load(file.path()).unwrap();
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_load_or_empty_missing_file() {
        let book = WordBook::load_or_empty(Path::new("/nonexistent/wordlist.txt"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(book(45).total_pages(20), 3);
        assert_eq!(book(40).total_pages(20), 2);
        assert_eq!(book(1).total_pages(20), 1);
    }

    #[test]
    fn test_total_pages_empty_book_is_one() {
        assert_eq!(book(0).total_pages(20), 1);
    }

    #[test]
    fn test_page_request_beyond_last_clamps() {
        let page = book(45).page(4, 20);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.words.len(), 5);
        assert_eq!(page.words[0], "word40");
    }

    #[test]
    fn test_page_request_below_first_clamps() {
        let page = book(45).page(-3, 20);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.words[0], "word0");
    }

    #[test]
    fn test_every_page_is_bounded() {
        let b = book(57);
        for size in [1u32, 7, 20, 57, 100] {
            for p in 1..=b.total_pages(size) {
                let page = b.page(p as i64, size);
                assert!(!page.words.is_empty());
                assert!(page.words.len() <= size as usize);
                assert!(page.current_page >= 1 && page.current_page <= page.total_pages);
            }
        }
    }

    #[test]
    fn test_zero_page_size_uses_default() {
        let page = book(45).page(1, 0);
        assert_eq!(page.words.len(), DEFAULT_PAGE_SIZE as usize);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_empty_book_page() {
        let page = book(0).page(5, 20);
        assert!(page.words.is_empty());
        assert_eq!(page.current_page, 1);
    }

    #[test]
    fn test_check_answer_by_position() {
        let b = WordBook::new(vec!["Apple".into(), "banana".into(), "cherry".into()]);
        let check = b.check_answer("  apple ", 0, 1, 2).unwrap();
        assert!(check.is_correct);
        assert_eq!(check.correct_word, "Apple");

        let check = b.check_answer("cheri", 0, 2, 2).unwrap();
        assert!(!check.is_correct);
        assert_eq!(check.correct_word, "cherry");
    }

    #[test]
    fn test_check_answer_out_of_range() {
        let b = book(3);
        assert!(b.check_answer("x", 5, 1, 20).is_err());
    }

    #[test]
    fn test_check_answer_huge_index_is_pagination_error() {
        let b = WordBook::new(vec!["apple".into(), "pear".into()]);
        let err = b.check_answer("apple", usize::MAX, 2, 20).unwrap_err();
        assert!(matches!(err, TingxieError::Pagination(_)));

        let err = b.check_answer("apple", usize::MAX - 19, 2, 20).unwrap_err();
        assert!(matches!(err, TingxieError::Pagination(_)));
    }
}
