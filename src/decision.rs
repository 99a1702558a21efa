// src/decision.rs
//! Decision engine: turns a `ScoreVector` into sentiment, intent, and
//! giving status using fixed thresholds, an ordered priority chain, and
//! two non-negotiable overrides.
//!
//! The priority chain is an explicit list of tagged rules evaluated first
//! match wins (`INTENT_RULES`), not nested conditionals, so the order is
//! auditable and each rule is testable on its own:
//! 1. continuation phrase → suppress withdrawal, fall through
//! 2. withdrawal score    → withdrawal_intent (paused / removed bequest)
//! 3. donation score      → donate_intent (added bequest / resumed giving)
//! 4. sentiment fallback  → negative_intent / positive_intent
//!
//! Hard overrides run last: paused/removed giving forces Negative,
//! resumed/added giving forces Positive, whatever the raw text scored.
//! Polite withdrawal language must never read as positive.

use crate::config::{ClassifyConfig, KeywordConfig, ThresholdConfig};
use crate::message::{normalize, GivingStatus, Intent, Label, ScoreVector, Sentiment};

/// Raw positive/negative presence before the enum collapse. Mixed emotion
/// stays observable here (and in the reasons) even though the published
/// field is three-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentimentSignals {
    pub positive: bool,
    pub negative: bool,
}

/// Engine output, pre-summary.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub sentiment: Sentiment,
    pub intent: Intent,
    pub giving_status: GivingStatus,
    pub reasons: Vec<String>,
}

/// The ordered priority chain. Evaluation order is this array's order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRule {
    ContinuationOverride,
    WithdrawalSignal,
    DonationSignal,
    SentimentFallback,
}

pub const INTENT_RULES: [IntentRule; 4] = [
    IntentRule::ContinuationOverride,
    IntentRule::WithdrawalSignal,
    IntentRule::DonationSignal,
    IntentRule::SentimentFallback,
];

/// Everything a rule may look at.
pub struct RuleCtx<'a> {
    pub scores: &'a ScoreVector,
    /// Normalized body. Continuation phrases and sub-keyword cues look
    /// only at the body, never the subject.
    pub body: &'a str,
    pub thresholds: &'a ThresholdConfig,
    pub keywords: &'a KeywordConfig,
    pub sentiment: Sentiment,
    pub withdrawal_suppressed: bool,
}

/// First phrase from `phrases` found in `text`, if any.
fn first_hit<'a>(text: &str, phrases: &'a [String]) -> Option<&'a str> {
    phrases
        .iter()
        .map(|p| p.as_str())
        .find(|p| !p.is_empty() && text.contains(&normalize(p)))
}

/// Apply one rule. `Some(..)` ends the chain; `None` falls through.
/// `ContinuationOverride` only mutates the context (suppression flag).
pub fn apply_rule(
    rule: IntentRule,
    ctx: &mut RuleCtx<'_>,
    reasons: &mut Vec<String>,
) -> Option<(Intent, GivingStatus)> {
    match rule {
        IntentRule::ContinuationOverride => {
            if let Some(phrase) = first_hit(ctx.body, &ctx.keywords.continuation) {
                ctx.withdrawal_suppressed = true;
                reasons.push(format!("withdrawal suppressed: continuation phrase \"{phrase}\""));
            }
            None
        }
        IntentRule::WithdrawalSignal => {
            let score = ctx.scores.get(Label::Withdrawal);
            if ctx.withdrawal_suppressed || score < ctx.thresholds.withdrawn_threshold {
                return None;
            }
            // Sub-keywords split a bequest change from a pause. A plain
            // stop ("cancel my monthly donation") defaults to paused.
            let status = if first_hit(ctx.body, &ctx.keywords.removed_bequest).is_some()
                || ctx.scores.get(Label::RemovedBequest) >= ctx.thresholds.withdrawn_threshold
            {
                GivingStatus::RemovedBequest
            } else {
                GivingStatus::PausedGiving
            };
            reasons.push(format!("withdrawal signal at {score:.2} -> {status}"));
            Some((Intent::WithdrawalIntent, status))
        }
        IntentRule::DonationSignal => {
            let score = ctx.scores.get(Label::DonationInquiry);
            if score < ctx.thresholds.intent_threshold {
                return None;
            }
            let status = if first_hit(ctx.body, &ctx.keywords.added_bequest).is_some()
                || ctx.scores.get(Label::AddedBequest) >= ctx.thresholds.intent_threshold
            {
                GivingStatus::AddedBequest
            } else if first_hit(ctx.body, &ctx.keywords.resumed_giving).is_some()
                || ctx.scores.get(Label::ResumedGiving) >= ctx.thresholds.intent_threshold
            {
                GivingStatus::ResumedGiving
            } else {
                GivingStatus::None
            };
            reasons.push(format!("donation signal at {score:.2}"));
            Some((Intent::DonateIntent, status))
        }
        IntentRule::SentimentFallback => {
            let intent = if ctx.sentiment == Sentiment::Negative {
                Intent::NegativeIntent
            } else {
                Intent::PositiveIntent
            };
            Some((intent, GivingStatus::None))
        }
    }
}

/// Presence at the sentiment threshold (inclusive); negative dominates a
/// mixed result; neither present is Neutral. A winner below the
/// neutral-confidence bar gets a review hint in `reasons`.
pub fn derive_sentiment(
    scores: &ScoreVector,
    t: &ThresholdConfig,
    reasons: &mut Vec<String>,
) -> (Sentiment, SentimentSignals) {
    let pos_score = scores.get(Label::Positive);
    let neg_score = scores.get(Label::Negative);
    let signals = SentimentSignals {
        positive: pos_score >= t.sentiment_threshold,
        negative: neg_score >= t.sentiment_threshold,
    };

    let sentiment = match (signals.positive, signals.negative) {
        (true, false) => Sentiment::Positive,
        (false, true) => Sentiment::Negative,
        (true, true) => {
            // Complaints must not be silently classified positive.
            reasons.push("mixed sentiment, negative dominates".to_string());
            Sentiment::Negative
        }
        (false, false) => Sentiment::Neutral,
    };

    if sentiment != Sentiment::Neutral && pos_score.max(neg_score) < t.neutral_confidence {
        reasons.push("low confidence, flag for review".to_string());
    }

    (sentiment, signals)
}

/// The hard overrides. A negative giving action forces Negative, a
/// positive one forces Positive. Business rule, not a confidence call.
pub fn apply_giving_override(
    sentiment: Sentiment,
    status: GivingStatus,
    reasons: &mut Vec<String>,
) -> Sentiment {
    if status.is_negative_action() {
        if sentiment != Sentiment::Negative {
            reasons.push(format!("sentiment forced Negative by {status}"));
        }
        return Sentiment::Negative;
    }
    if status.is_positive_action() {
        if sentiment != Sentiment::Positive {
            reasons.push(format!("sentiment forced Positive by {status}"));
        }
        return Sentiment::Positive;
    }
    sentiment
}

/// Full derivation for one message. Pure: same scores + body + config
/// always yield the same result.
pub fn decide(scores: &ScoreVector, normalized_body: &str, cfg: &ClassifyConfig) -> Derived {
    let mut reasons = Vec::new();
    let (sentiment, _signals) = derive_sentiment(scores, &cfg.thresholds, &mut reasons);

    let mut ctx = RuleCtx {
        scores,
        body: normalized_body,
        thresholds: &cfg.thresholds,
        keywords: &cfg.keywords,
        sentiment,
        withdrawal_suppressed: false,
    };

    let mut outcome = None;
    for rule in INTENT_RULES {
        if let Some(hit) = apply_rule(rule, &mut ctx, &mut reasons) {
            outcome = Some(hit);
            break;
        }
    }
    // The fallback rule always matches; reaching here without an outcome
    // would mean the chain lost its terminal rule.
    let (intent, giving_status) = outcome.unwrap_or((Intent::PositiveIntent, GivingStatus::None));

    let sentiment = apply_giving_override(sentiment, giving_status, &mut reasons);

    Derived { sentiment, intent, giving_status, reasons }
}
