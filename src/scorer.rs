// src/scorer.rs
//! Signal scoring: per-label confidences for a message.
//!
//! Two interchangeable strategies behind one trait:
//! - `KeywordScorer`: deterministic trigger-phrase matching; 1.0 on any
//!   case-insensitive substring hit, 0.0 otherwise. Zero dependencies,
//!   never fails.
//! - an injected probabilistic scorer (zero-shot style; see `zero_shot`),
//!   which may fail (network/timeout).
//!
//! `LayeredScorer` combines them: keyword hits set authoritative score
//! floors; the probabilistic path fills in labels with no literal hit.
//! If the probabilistic call errors, we fall back to keyword-only scores
//! silently (warn-level log). Classification never hard-fails here.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::KeywordConfig;
use crate::message::{normalize, Label, ScoreVector};

/// Scoring seam: `(text, labels) -> {label: confidence in [0,1]}`.
#[async_trait]
pub trait SignalScorer: Send + Sync {
    async fn score(&self, text: &str, labels: &[Label]) -> anyhow::Result<ScoreVector>;

    /// Strategy name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Deterministic trigger-phrase scorer.
#[derive(Debug, Clone)]
pub struct KeywordScorer {
    triggers: BTreeMap<Label, Vec<String>>,
}

impl KeywordScorer {
    pub fn from_config(cfg: &KeywordConfig) -> Self {
        let mut triggers = BTreeMap::new();
        for label in Label::ALL {
            let phrases = cfg
                .for_label(label)
                .iter()
                .map(|p| normalize(p))
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>();
            triggers.insert(label, phrases);
        }
        Self { triggers }
    }

    /// Synchronous core; the trait impl just wraps this.
    pub fn score_text(&self, normalized_text: &str, labels: &[Label]) -> ScoreVector {
        let mut out = ScoreVector::new();
        for label in labels {
            let hit = self
                .triggers
                .get(label)
                .map(|phrases| phrases.iter().any(|p| normalized_text.contains(p.as_str())))
                .unwrap_or(false);
            out.set(*label, if hit { 1.0 } else { 0.0 });
        }
        out
    }
}

#[async_trait]
impl SignalScorer for KeywordScorer {
    async fn score(&self, text: &str, labels: &[Label]) -> anyhow::Result<ScoreVector> {
        Ok(self.score_text(&normalize(text), labels))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Keyword floors + optional probabilistic fill.
pub struct LayeredScorer {
    keyword: KeywordScorer,
    probabilistic: Option<Arc<dyn SignalScorer>>,
}

impl LayeredScorer {
    pub fn new(keyword: KeywordScorer, probabilistic: Option<Arc<dyn SignalScorer>>) -> Self {
        Self { keyword, probabilistic }
    }

    pub fn keyword_only(cfg: &KeywordConfig) -> Self {
        Self::new(KeywordScorer::from_config(cfg), None)
    }

    /// Score every requested label. Keyword hits are authoritative; the
    /// probabilistic scorer only ever raises labels the keywords left at
    /// zero. Probabilistic failure degrades to the keyword vector.
    pub async fn score(&self, text: &str, labels: &[Label]) -> ScoreVector {
        let mut scores = self.keyword.score_text(&normalize(text), labels);

        let Some(prob) = &self.probabilistic else {
            return scores;
        };

        // Only ask the model about labels with no literal hit.
        let open: Vec<Label> = labels.iter().copied().filter(|l| scores.get(*l) < 1.0).collect();
        if open.is_empty() {
            return scores;
        }

        match prob.score(text, &open).await {
            Ok(model_scores) => {
                for (label, s) in model_scores.iter() {
                    scores.raise_floor(label, s);
                }
            }
            Err(e) => {
                metrics::counter!("scorer_fallback_total").increment(1);
                warn!(scorer = prob.name(), error = %e, "probabilistic scorer unavailable, keyword fallback");
            }
        }
        scores
    }
}
