//! message.rs — Input/output entities for the classification core.
//!
//! `Message` is the immutable input unit (one inbound feedback email).
//! `ScoreVector` is the intermediate produced by the signal scorer.
//! `ClassificationResult` is the final shape handed to the row builder,
//! including a short `reasons` audit trail for explainability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One inbound feedback message. Missing subject/body are treated as empty
/// strings, never as errors; classification always proceeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub sender_email: String,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl Message {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            sender_name: String::new(),
            sender_email: String::new(),
            received_at: Utc::now(),
        }
    }

    /// Subject and body joined for matching, HTML entities decoded,
    /// lowercased, whitespace collapsed.
    pub fn normalized_text(&self) -> String {
        let joined = format!("{} {}", self.subject, self.body);
        normalize(&html_escape::decode_html_entities(&joined))
    }

    /// Body alone, decoded and normalized. The decision engine's phrase
    /// cues look only at the body, never the subject.
    pub fn normalized_body(&self) -> String {
        normalize(&html_escape::decode_html_entities(&self.body))
    }
}

/// Lowercase + collapse runs of whitespace into single spaces.
pub fn normalize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_space = false;
    for ch in input.chars() {
        let lc = ch.to_ascii_lowercase();
        if lc.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(lc);
            last_space = false;
        }
    }
    out.trim().to_string()
}

/// Closed label set the scorer works against. Scores are independent;
/// several labels may be high at once (mixed emotion).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Positive,
    Negative,
    DonationInquiry,
    Withdrawal,
    PausedGiving,
    ResumedGiving,
    RemovedBequest,
    AddedBequest,
}

impl Label {
    pub const ALL: [Label; 8] = [
        Label::Positive,
        Label::Negative,
        Label::DonationInquiry,
        Label::Withdrawal,
        Label::PausedGiving,
        Label::ResumedGiving,
        Label::RemovedBequest,
        Label::AddedBequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Positive => "positive",
            Label::Negative => "negative",
            Label::DonationInquiry => "donation_inquiry",
            Label::Withdrawal => "withdrawal",
            Label::PausedGiving => "paused_giving",
            Label::ResumedGiving => "resumed_giving",
            Label::RemovedBequest => "removed_bequest",
            Label::AddedBequest => "added_bequest",
        }
    }

    /// Inverse of `as_str`, for mapping external scorer responses back.
    pub fn parse(s: &str) -> Option<Label> {
        Label::ALL.iter().copied().find(|l| l.as_str() == s)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-label confidences in [0,1]. Absent labels read as 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreVector {
    scores: BTreeMap<Label, f32>,
}

impl ScoreVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: Label) -> f32 {
        *self.scores.get(&label).unwrap_or(&0.0)
    }

    pub fn set(&mut self, label: Label, score: f32) {
        self.scores.insert(label, clamp01(score));
    }

    /// Keyword hits are authoritative floors: never lower an existing score.
    pub fn raise_floor(&mut self, label: Label, score: f32) {
        let cur = self.get(label);
        if score > cur {
            self.set(label, score);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, f32)> + '_ {
        self.scores.iter().map(|(l, s)| (*l, *s))
    }
}

/// Overall emotional valence of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        })
    }
}

/// Actionable category of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PositiveIntent,
    NegativeIntent,
    DonateIntent,
    WithdrawalIntent,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::PositiveIntent => "positive_intent",
            Intent::NegativeIntent => "negative_intent",
            Intent::DonateIntent => "donate_intent",
            Intent::WithdrawalIntent => "withdrawal_intent",
        })
    }
}

/// Fundraising sub-category of intent. `None` for messages with no giving
/// action. Paused/removed are the negative actions; resumed/added the
/// positive ones. Both pairs carry hard sentiment overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GivingStatus {
    PausedGiving,
    ResumedGiving,
    RemovedBequest,
    AddedBequest,
    None,
}

impl GivingStatus {
    pub fn is_negative_action(&self) -> bool {
        matches!(self, GivingStatus::PausedGiving | GivingStatus::RemovedBequest)
    }

    pub fn is_positive_action(&self) -> bool {
        matches!(self, GivingStatus::ResumedGiving | GivingStatus::AddedBequest)
    }
}

impl fmt::Display for GivingStatus {
    /// Human-facing sink strings ("No" for the empty case, matching the
    /// review sheet convention).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GivingStatus::PausedGiving => "Paused giving",
            GivingStatus::ResumedGiving => "Resumed giving",
            GivingStatus::RemovedBequest => "Removed bequest",
            GivingStatus::AddedBequest => "Added bequest",
            GivingStatus::None => "No",
        })
    }
}

/// Final classification handed to the row builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub sentiment: Sentiment,
    pub intent: Intent,
    pub giving_status: GivingStatus,
    /// Extractive, at most 100 chars.
    pub summary: String,
    /// Short, human-readable audit trail (which rules fired and why).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
}

impl ClassificationResult {
    /// Safest default: the degraded outcome when nothing scores at all.
    pub fn neutral_default() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            intent: Intent::PositiveIntent,
            giving_status: GivingStatus::None,
            summary: String::new(),
            reasons: Vec::new(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.push(reason.into());
        self
    }
}

pub(crate) fn clamp01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}
