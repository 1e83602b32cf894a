//! Reading scores and identifiers out of free-form text.
//!
//! Nothing in here fails: unreadable input falls back to a neutral score or
//! to no identifier at all.

use crate::models::{clamp_score, NEUTRAL_SCORE};
use once_cell::sync::Lazy;
use regex::Regex;

static SCORE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[01](?:\.\d+)?").expect("valid score pattern"));

static WALLET_OR_TX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[a-fA-F0-9]{6,}").expect("valid address pattern"));

static TOKEN_SYMBOL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2,10}\b").expect("valid token pattern"));

/// Extract the score from the first line of an analyzer response.
///
/// Only the text before the first line break is searched, for the first
/// `0`/`1` optionally followed by a fraction. Missing or unparsable values
/// yield [`NEUTRAL_SCORE`]; the result is always clamped to [0, 1].
pub fn extract_score(text: &str) -> f64 {
    let first_line = text.split('\n').next().unwrap_or_default();

    let value = SCORE_PATTERN
        .find(first_line)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(NEUTRAL_SCORE);

    clamp_score(value)
}

/// Everything after the first line break, or an empty string.
pub fn extract_rationale(text: &str) -> &str {
    text.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
}

/// First hex address or transaction hash in the query (`0x` plus at least six hex digits).
pub fn first_wallet_or_tx(query: &str) -> Option<&str> {
    WALLET_OR_TX_PATTERN.find(query).map(|m| m.as_str())
}

/// First standalone run of 2 to 10 uppercase letters, read as a token symbol.
pub fn first_token_symbol(query: &str) -> Option<&str> {
    TOKEN_SYMBOL_PATTERN.find(query).map(|m| m.as_str())
}
