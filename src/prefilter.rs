// src/prefilter.rs
//! Pre-filter: rejects administrative noise before it consumes
//! classification work.
//!
//! Policy is an explicit ordered rule list (first match rejects), with one
//! exception evaluated before everything else: if the message contains any
//! real-feedback allow-list keyword it is kept no matter which reject rule
//! would fire. Dropping real feedback is costlier than classifying noise,
//! so ties favor keep.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::PrefilterConfig;
use crate::message::{normalize, Message};

/// Why a message was rejected. Surfaced for observability; never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AddressUpdate,
    AutoReply,
    ForwardedChain,
    EmptyOrLinkOnly,
    TechnicalSupport,
    EventLogistics,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::AddressUpdate => "address_update",
            RejectReason::AutoReply => "auto_reply",
            RejectReason::ForwardedChain => "forwarded_chain",
            RejectReason::EmptyOrLinkOnly => "empty_or_link_only",
            RejectReason::TechnicalSupport => "technical_support",
            RejectReason::EventLogistics => "event_logistics",
        }
    }
}

/// Pre-filter verdict: keep or drop, plus the matched reason when dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Screen {
    pub keep: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl Screen {
    fn kept() -> Self {
        Screen { keep: true, reason: None }
    }
    fn rejected(reason: RejectReason) -> Self {
        Screen { keep: false, reason: Some(reason) }
    }
}

/// One reject rule: a tagged predicate. Keeping these as data (not nested
/// conditionals) keeps the priority order auditable and testable rule by
/// rule.
#[derive(Debug, Clone)]
struct RejectRule {
    reason: RejectReason,
    check: RuleCheck,
}

#[derive(Debug, Clone)]
enum RuleCheck {
    /// Any phrase is a substring of the normalized text.
    AnyPhrase(Vec<String>),
    /// Quoted-header blocks / repeated Fwd: markers.
    ForwardedChain { markers: Vec<String>, min_markers: usize },
    /// Body empty or only URLs/signature noise left after stripping.
    EmptyOrLinkOnly { min_body_chars: usize },
}

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bhttps?://\S+|\bwww\.\S+").expect("url regex"));

static SIGNATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(sent from my|sent via|get outlook)").expect("signature regex"));

/// Header-block shapes that mark a forwarded thread even when the marker
/// count alone stays low.
static CHAIN_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?is)from:.*\n.*sent:.*\n.*to:",
        r"(?i)begin forwarded message",
        r"(?i)-{4,} forwarded message",
        r"(?im)^on .{1,120} wrote:$",
        r"(?i)from:.*<.*@.*>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("chain regex"))
    .collect()
});

#[derive(Debug, Clone)]
pub struct PreFilter {
    allow: Vec<String>,
    rules: Vec<RejectRule>,
}

impl PreFilter {
    pub fn from_config(cfg: &PrefilterConfig) -> Self {
        let norm_list = |v: &[String]| v.iter().map(|p| normalize(p)).collect::<Vec<_>>();

        let rules = vec![
            RejectRule {
                reason: RejectReason::AddressUpdate,
                check: RuleCheck::AnyPhrase(norm_list(&cfg.address_updates)),
            },
            RejectRule {
                reason: RejectReason::AutoReply,
                check: RuleCheck::AnyPhrase(norm_list(&cfg.admin_updates)),
            },
            RejectRule {
                reason: RejectReason::ForwardedChain,
                check: RuleCheck::ForwardedChain {
                    markers: norm_list(&cfg.forwarded_markers),
                    min_markers: cfg.min_chain_markers,
                },
            },
            RejectRule {
                reason: RejectReason::EmptyOrLinkOnly,
                check: RuleCheck::EmptyOrLinkOnly { min_body_chars: cfg.min_body_chars },
            },
            RejectRule {
                reason: RejectReason::TechnicalSupport,
                check: RuleCheck::AnyPhrase(norm_list(&cfg.technical_support)),
            },
            RejectRule {
                reason: RejectReason::EventLogistics,
                check: RuleCheck::AnyPhrase(norm_list(&cfg.event_inquiries)),
            },
        ];

        Self { allow: norm_list(&cfg.allow), rules }
    }

    /// Decide keep/drop for one message.
    pub fn screen(&self, msg: &Message) -> Screen {
        let text = msg.normalized_text();

        // Allow-list override first: real feedback is kept even when a
        // reject rule would match. Subject participates, so an empty body
        // with a feedback-bearing subject survives.
        if self.allow.iter().any(|kw| text.contains(kw.as_str())) {
            return Screen::kept();
        }

        for rule in &self.rules {
            if self.rule_matches(&rule.check, msg, &text) {
                return Screen::rejected(rule.reason);
            }
        }

        Screen::kept()
    }

    fn rule_matches(&self, check: &RuleCheck, msg: &Message, text: &str) -> bool {
        match check {
            RuleCheck::AnyPhrase(phrases) => {
                phrases.iter().any(|p| !p.is_empty() && text.contains(p.as_str()))
            }
            RuleCheck::ForwardedChain { markers, min_markers } => {
                is_forwarded_chain(&msg.body, text, markers, *min_markers)
            }
            RuleCheck::EmptyOrLinkOnly { min_body_chars } => {
                is_empty_or_link_only(&msg.body, *min_body_chars)
            }
        }
    }
}

fn is_forwarded_chain(raw_body: &str, norm_text: &str, markers: &[String], min_markers: usize) -> bool {
    if CHAIN_RES.iter().any(|re| re.is_match(raw_body)) {
        return true;
    }

    // Multiple From:/Sent: header lines mean a quoted thread.
    let from_lines = raw_body
        .lines()
        .filter(|l| l.trim_start().to_ascii_lowercase().starts_with("from:"))
        .count();
    let sent_lines = raw_body
        .lines()
        .filter(|l| l.trim_start().to_ascii_lowercase().starts_with("sent:"))
        .count();
    if from_lines > 1 || sent_lines > 1 {
        return true;
    }

    // Marker density: a handful of "fwd:"/"original message"/header tokens
    // scattered through the text.
    let hits: usize = markers
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| norm_text.matches(m.as_str()).count())
        .sum();
    hits >= min_markers
}

fn is_empty_or_link_only(raw_body: &str, min_body_chars: usize) -> bool {
    let without_urls = URL_RE.replace_all(raw_body, "");
    let without_sig = SIGNATURE_RE.replace_all(&without_urls, "");

    // Essentially empty: almost nothing left once whitespace goes.
    let compact: String = without_sig.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.chars().count() < 20 {
        return true;
    }

    // Link-only: too little prose once URLs are stripped.
    without_sig.trim().chars().count() < min_body_chars
}
