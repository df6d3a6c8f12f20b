//! Text censoring module
//!
//! Masks undesirable words in post titles and bodies at display time.
//! Matching is case-insensitive and respects word boundaries; letters of a
//! matched word are replaced with `*` while any other characters are kept.
//! Stored content is never modified.

use once_cell::sync::Lazy;
use regex::Regex;

/// Undesirable words, lowercase. Adjust as needed.
const DENY_LIST: &[&str] = &[
    "редиска",
    "дурак",
    "идиот",
    "плохой",
    "плохое",
    "плохая",
];

static CENSOR_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = DENY_LIST
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b({alternation})\b")).expect("censor pattern is valid")
});

static LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-zА-Яа-яЁё]").expect("letter pattern is valid"));

/// Replace letters of undesirable words in the given text with `*`.
///
/// Empty input passes through unchanged.
pub fn censor(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    CENSOR_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            LETTER_RE.replace_all(&caps[0], "*").into_owned()
        })
        .into_owned()
}
