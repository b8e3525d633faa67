//! Answer grading: exact match after trimming, ignoring case.

use tingxie_core::AnswerRecord;

/// Normalize a word or submission for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Returns true if `answer` matches `expected` ignoring case and surrounding
/// whitespace on both sides.
pub fn grade(answer: &str, expected: &str) -> bool {
    normalize(answer) == normalize(expected)
}

/// Grade a submission and build the record that goes into the answer log.
pub fn record(expected: &str, answer: &str) -> AnswerRecord {
    AnswerRecord {
        word: expected.to_string(),
        user_answer: answer.trim().to_string(),
        is_correct: grade(answer, expected),
    }
}

/// Short feedback line shown after each graded word.
pub fn feedback(record: &AnswerRecord) -> String {
    if record.is_correct {
        "正确! ✓".to_string()
    } else {
        format!("错误! ✗ 正确答案是: {}", record.word)
    }
}
