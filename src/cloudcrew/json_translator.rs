//! Parsing JSON out of a text block that may carry fenced-code delimiters.
//!
//! Model replies frequently wrap structured output in a three-backtick fence,
//! with or without a leading `json` language tag, instead of returning the
//! bare object. [`extract_json`] strips the delimiters positionally; [`translate`] feeds
//! the result to `serde_json` and turns any failure into `None` rather than
//! an error, since an unparsable reply must never abort a session.
//!
//! The scanning is purely textual: it does not balance braces or handle
//! nested fences, so a fence-like token inside a string value will mis-parse.
//! That is an accepted limitation of the format, not something this module
//! tries to fix.

use serde::de::DeserializeOwned;

const FENCE: &str = "```";
const JSON_TAG: &str = "json";

/// Return the substring of `text` that should be handed to a JSON parser.
///
/// - No opening fence: the entire text is treated as raw JSON.
/// - Opening fence followed by a case-insensitive `json` tag: both are skipped.
/// - No closing fence: the remainder of the text is the body.
///
/// The result is trimmed of surrounding whitespace, which makes the function
/// idempotent on already-bare JSON.
pub fn extract_json(text: &str) -> &str {
    let start = match text.find(FENCE) {
        Some(idx) => idx + FENCE.len(),
        None => return text.trim(),
    };

    // Accommodate the "json" language tag, if present.
    let start = match text.get(start..start + JSON_TAG.len()) {
        Some(tag) if tag.eq_ignore_ascii_case(JSON_TAG) => start + JSON_TAG.len(),
        _ => start,
    };

    let end = match text[start..].find(FENCE) {
        Some(idx) => start + idx,
        None => text.len(),
    };

    text[start..end].trim()
}

/// Deserialize a possibly-fenced JSON reply into `T`.
///
/// Returns `None` when the input is empty or whitespace-only, and `None`
/// when the extracted body fails to parse. Callers that need forward
/// progress (the speaker selector in particular) treat `None` as "use the
/// fallback" rather than as an error.
pub fn translate<T: DeserializeOwned>(text: &str) -> Option<T> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(extract_json(text)).ok()
}
