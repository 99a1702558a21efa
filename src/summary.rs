// src/summary.rs
//! Extractive summaries: select and truncate existing text, never generate.
//!
//! Strategy, in order:
//! 1. first sentence of the body, as-is when it fits;
//! 2. otherwise the clause containing the first key-phrase hit
//!    ("trying to …", "want to …", "please …", …), in pattern order;
//! 3. otherwise truncate at the last whitespace boundary that keeps the
//!    text within 97 chars, plus `...`.
//!
//! The result is always at most `MAX_SUMMARY_CHARS` characters. A
//! model-produced summary is an alternate `Summarizer` implementation,
//! not a replacement for this invariant.

use once_cell::sync::Lazy;

pub const MAX_SUMMARY_CHARS: usize = 100;

/// Ordered key-phrase patterns; the first one found in the body wins.
static KEY_PHRASES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "trying to",
        "want to",
        "need to",
        "interested in",
        "would like to",
        "can you",
        "please ",
        "how do i",
    ]
});

/// Summary strategy seam. The default is extractive; a generative
/// implementation can be plugged in via configuration without touching
/// the decision engine.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, body: &str) -> String;
}

/// The deterministic default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractiveSummarizer;

impl Summarizer for ExtractiveSummarizer {
    fn summarize(&self, body: &str) -> String {
        extract_summary(body)
    }
}

/// Extract a bounded summary from `body`. Empty body yields an empty
/// summary.
pub fn extract_summary(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let first = first_sentence(trimmed);
    if char_len(&first) <= MAX_SUMMARY_CHARS {
        return first;
    }

    if let Some(clause) = key_phrase_clause(trimmed) {
        if char_len(&clause) <= MAX_SUMMARY_CHARS {
            return clause;
        }
        return truncate_at_whitespace(&clause);
    }

    truncate_at_whitespace(&first)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Up to and including the first sentence terminator; the whole text when
/// there is none.
fn first_sentence(text: &str) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            break;
        }
    }
    collapse_ws(out.trim())
}

/// Clause containing the first key-phrase hit: from the phrase start to
/// the next clause terminator.
fn key_phrase_clause(text: &str) -> Option<String> {
    // ASCII folding keeps byte offsets aligned with `text`.
    let lower = text.to_ascii_lowercase();
    for phrase in KEY_PHRASES.iter() {
        if let Some(byte_start) = lower.find(phrase) {
            let rest = &text[byte_start..];
            let mut clause = String::new();
            for ch in rest.chars() {
                if matches!(ch, '.' | '!' | '?' | ';' | '\n') {
                    break;
                }
                clause.push(ch);
            }
            let clause = collapse_ws(clause.trim());
            if !clause.is_empty() {
                return Some(clause);
            }
        }
    }
    None
}

/// Cut at the last whitespace boundary within the first 97 chars and
/// append an ellipsis marker; hard cut when the text has no spaces.
fn truncate_at_whitespace(text: &str) -> String {
    let limit = MAX_SUMMARY_CHARS - 3;
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= limit {
        let mut s: String = chars.into_iter().collect();
        s.push_str("...");
        return s;
    }

    let head = &chars[..limit];
    let cut = head
        .iter()
        .rposition(|c| c.is_whitespace())
        .unwrap_or(limit);
    let mut s: String = chars[..cut].iter().collect();
    let trimmed = s.trim_end().to_string();
    s = trimmed;
    s.push_str("...");
    s
}

fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !last_space && !out.is_empty() {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_yields_empty_summary() {
        assert_eq!(extract_summary(""), "");
        assert_eq!(extract_summary("   \n "), "");
    }

    #[test]
    fn short_first_sentence_used_as_is() {
        let s = extract_summary("Thank you so much for the scholarship! It changed my life.");
        assert_eq!(s, "Thank you so much for the scholarship!");
    }

    #[test]
    fn key_phrase_clause_picked_for_long_first_sentence() {
        let body = "After a great many years of quiet reflection on everything this institution has meant to our whole family across three generations, I would like to increase my annual gift, effective January.";
        let s = extract_summary(body);
        assert!(s.starts_with("would like to increase"), "got: {s}");
        assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[test]
    fn key_phrase_order_is_fixed() {
        // Both "want to" and "please" occur; "want to" is earlier in the
        // pattern list so it wins even though "please" appears first in
        // the text. The first sentence must exceed the limit to reach the
        // key-phrase step.
        let body = "Please forgive the very long preamble that follows here, because what I really mean to say after all these winding years is that I want to help current students, not to complain about anything at all";
        let s = extract_summary(body);
        assert!(s.starts_with("want to help"), "got: {s}");
    }

    #[test]
    fn truncation_lands_on_whitespace_with_marker() {
        let body = "wordwithoutanybreaks ".repeat(12);
        let s = extract_summary(&body);
        assert!(s.ends_with("..."));
        assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
        assert!(!s.trim_end_matches("...").ends_with(' '));
    }

    #[test]
    fn summary_never_exceeds_limit() {
        let bodies = [
            "a".repeat(500),
            "no terminator at all just words ".repeat(20),
            format!("{} with a tail.", "x".repeat(150)),
            "Trying to reach someone about the alumni fund because nobody has answered my calls for three weeks and I am getting rather annoyed with the whole process".to_string(),
        ];
        for b in bodies {
            let s = extract_summary(&b);
            assert!(
                s.chars().count() <= MAX_SUMMARY_CHARS,
                "len {} for body {:.40}...",
                s.chars().count(),
                b
            );
        }
    }

    #[test]
    fn multibyte_bodies_truncate_on_char_boundaries() {
        let body = "čřžýáí ".repeat(30);
        let s = extract_summary(&body);
        assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
    }

    #[test]
    fn summarizer_trait_default_is_extractive() {
        let s = ExtractiveSummarizer.summarize("Short note.");
        assert_eq!(s, "Short note.");
    }
}
