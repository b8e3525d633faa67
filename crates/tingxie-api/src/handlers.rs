//! Route handler functions for the HTTP endpoints.

use std::fmt::Write as _;

use axum::extract::{Path, Query, State};
use axum::response::Html;
use axum::Json;
use serde::{Deserialize, Serialize};
use tingxie_core::WordPage;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query parameter / response types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct IndexParams {
    /// Raw so that garbage like `?page=abc` falls back to page 1.
    pub page: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub word_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranslationResponse {
    pub translation: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET / - render the requested page (fixed default page size) as HTML.
pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Html<String> {
    let requested = params
        .page
        .as_deref()
        .and_then(|p| p.trim().parse::<i64>().ok())
        .filter(|p| *p != 0)
        .unwrap_or(1);
    let page = state.book.page(requested, state.default_page_size());
    Html(render_index(&page, state.book.len()))
}

/// GET /health - liveness plus a few counters.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        word_count: state.book.len(),
    })
}

/// GET /translate/{word} - proxy to the upstream dictionary.
pub async fn translate(
    State(state): State<AppState>,
    Path(word): Path<String>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let word = word.trim();
    if word.is_empty() {
        return Err(ApiError::BadRequest("word must not be empty".to_string()));
    }

    match state.dictionary.define(word).await {
        Ok(translation) => {
            info!(word = %word, lines = translation.lines().count(), "Translation served");
            Ok(Json(TranslationResponse { translation }))
        }
        Err(e) => {
            warn!(word = %word, error = %e, "Translation lookup failed");
            Err(e.into())
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A mask of `*` the same length as the word.
pub fn star_mask(word: &str) -> String {
    "*".repeat(word.chars().count())
}

/// Render the dictation page. The client script takes over from here.
pub fn render_index(page: &WordPage, total_words: usize) -> String {
    let mut items = String::new();
    for (i, word) in page.words.iter().enumerate() {
        let _ = writeln!(
            items,
            r#"      <li class="word-item" data-index="{i}" data-word="{w}"><span class="word-text">{w}</span><span class="word-mask">{m}</span></li>"#,
            i = i,
            w = escape_html(word),
            m = star_mask(word),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
  <meta charset="utf-8">
  <title>单词听写</title>
  <link rel="stylesheet" href="/css/style.css">
</head>
<body data-current-page="{current}" data-total-pages="{total}" data-page-size="{size}">
  <header>
    <h1>单词听写</h1>
    <p class="page-info">第 {current} 页 / 共 {total} 页 · 共 {words} 个单词</p>
  </header>
  <main>
    <ul id="wordList">
{items}    </ul>
  </main>
  <script src="/js/script.js"></script>
</body>
</html>
"#,
        current = page.current_page,
        total = page.total_pages,
        size = page.words.len(),
        words = total_words,
        items = items,
    )
}
