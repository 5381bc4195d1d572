//! Boundaries to the external LLM collaborators.
//!
//! Responses arrive as raw model text. Everything here decodes that text
//! into typed records and turns undecodable responses into placeholders,
//! so a bad response never reaches the core as an error.

pub mod extraction;
pub mod root_cause;

use std::sync::LazyLock;

use regex::Regex;

static FENCED_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

/// Body of the first fenced code block, or the trimmed text when unfenced.
pub fn strip_code_blocks(response: &str) -> &str {
    let text = response.trim();
    match FENCED_BLOCK_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str(),
        None => text,
    }
}
