//! Per-page dictation summary.
//!
//! [`Summary::for_page`] lines the page's words up with the answer log by
//! index; words the pass never reached appear as unanswered and count as
//! incorrect. Accuracy is therefore always measured against the full page.

use std::fmt;

use serde::Serialize;
use tingxie_core::AnswerRecord;

/// One line of the summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRow {
    /// 1-based position on the page.
    pub index: usize,
    pub expected_word: String,
    pub submitted_answer: String,
    pub correct: bool,
}

/// Expected vs. submitted answers for one page plus aggregate accuracy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    pub correct_count: usize,
    pub total_count: usize,
    /// Percentage rounded to one decimal. 0.0 when there is nothing to grade.
    pub accuracy: f64,
}

impl Summary {
    /// Summarize a page: every word gets a row, answered or not.
    pub fn for_page(words: &[String], answers: &[AnswerRecord]) -> Self {
        let records = words
            .iter()
            .enumerate()
            .map(|(i, word)| {
                answers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| AnswerRecord::unanswered(word))
            })
            .collect::<Vec<_>>();
        Self::from_answers(&records)
    }

    /// Summarize only the answers that were given.
    pub fn from_answers(answers: &[AnswerRecord]) -> Self {
        let rows: Vec<SummaryRow> = answers
            .iter()
            .enumerate()
            .map(|(i, rec)| SummaryRow {
                index: i + 1,
                expected_word: rec.word.clone(),
                submitted_answer: rec.user_answer.clone(),
                correct: rec.is_correct,
            })
            .collect();

        let correct_count = rows.iter().filter(|r| r.correct).count();
        let total_count = rows.len();

        Self {
            rows,
            correct_count,
            total_count,
            accuracy: accuracy(correct_count, total_count),
        }
    }

    /// `"95.0% (19/20)"`
    pub fn stats_line(&self) -> String {
        format!(
            "{:.1}% ({}/{})",
            self.accuracy, self.correct_count, self.total_count
        )
    }
}

fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = correct as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "本页听写总结")?;
        writeln!(f, "{:<4} {:<20} {:<20} 结果", "序号", "正确单词", "你的答案")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<6} {:<24} {:<24} {}",
                row.index,
                row.expected_word,
                row.submitted_answer,
                if row.correct { "✓" } else { "✗" }
            )?;
        }
        write!(f, "正确率: {}", self.stats_line())
    }
}
