// src/config.rs
//! Triage configuration: thresholds, keyword lists, pre-filter lists, and
//! the advisory staff directory. One TOML document, compiled-in defaults,
//! path override via `CLASSIFY_CONFIG_PATH`, per-threshold overrides via
//! env vars. Thresholds outside [0,1] are a startup error, never a
//! per-message one.

use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::message::Label;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/classify.toml");

pub const ENV_CONFIG_PATH: &str = "CLASSIFY_CONFIG_PATH";
pub const ENV_SENTIMENT_THRESHOLD: &str = "SENTIMENT_THRESHOLD";
pub const ENV_INTENT_THRESHOLD: &str = "INTENT_THRESHOLD";
pub const ENV_WITHDRAWN_THRESHOLD: &str = "WITHDRAWN_THRESHOLD";

fn default_neutral_confidence() -> f32 {
    0.50
}

/// Decision thresholds. All inclusive (>=).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThresholdConfig {
    pub sentiment_threshold: f32,
    pub intent_threshold: f32,
    pub withdrawn_threshold: f32,
    #[serde(default = "default_neutral_confidence")]
    pub neutral_confidence: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            sentiment_threshold: 0.25,
            intent_threshold: 0.20,
            withdrawn_threshold: 0.18,
            neutral_confidence: 0.50,
        }
    }
}

impl ThresholdConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, v) in [
            ("sentiment_threshold", self.sentiment_threshold),
            ("intent_threshold", self.intent_threshold),
            ("withdrawn_threshold", self.withdrawn_threshold),
            ("neutral_confidence", self.neutral_confidence),
        ] {
            if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                anyhow::bail!("threshold `{name}` must be in [0,1], got {v}");
            }
        }
        Ok(())
    }
}

/// Trigger-phrase lists, one per label, plus the continuation phrases that
/// suppress withdrawal.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordConfig {
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub donation_inquiry: Vec<String>,
    #[serde(default)]
    pub withdrawal: Vec<String>,
    #[serde(default)]
    pub paused_giving: Vec<String>,
    #[serde(default)]
    pub resumed_giving: Vec<String>,
    #[serde(default)]
    pub removed_bequest: Vec<String>,
    #[serde(default)]
    pub added_bequest: Vec<String>,
    #[serde(default)]
    pub continuation: Vec<String>,
}

impl KeywordConfig {
    pub fn for_label(&self, label: Label) -> &[String] {
        match label {
            Label::Positive => &self.positive,
            Label::Negative => &self.negative,
            Label::DonationInquiry => &self.donation_inquiry,
            Label::Withdrawal => &self.withdrawal,
            Label::PausedGiving => &self.paused_giving,
            Label::ResumedGiving => &self.resumed_giving,
            Label::RemovedBequest => &self.removed_bequest,
            Label::AddedBequest => &self.added_bequest,
        }
    }
}

fn default_min_body_chars() -> usize {
    50
}
fn default_min_chain_markers() -> usize {
    3
}

/// Pre-filter reject lists and the real-feedback allow-list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefilterConfig {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub address_updates: Vec<String>,
    #[serde(default)]
    pub admin_updates: Vec<String>,
    #[serde(default)]
    pub technical_support: Vec<String>,
    #[serde(default)]
    pub event_inquiries: Vec<String>,
    #[serde(default)]
    pub forwarded_markers: Vec<String>,
    #[serde(default = "default_min_body_chars")]
    pub min_body_chars: usize,
    #[serde(default = "default_min_chain_markers")]
    pub min_chain_markers: usize,
}

/// Advisory staff routing table keyed by sender email.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffConfig {
    #[serde(default)]
    pub assignments: HashMap<String, String>,
}

/// Root of `config/classify.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub prefilter: PrefilterConfig,
    #[serde(default)]
    pub staff: StaffConfig,
}

impl Default for ClassifyConfig {
    /// Compiled-in defaults. The bundled TOML is part of the binary, so a
    /// parse failure here is a build defect, not a runtime condition.
    fn default() -> Self {
        ClassifyConfig::from_toml_str(DEFAULT_CONFIG_TOML).expect("bundled classify.toml is valid")
    }
}

impl ClassifyConfig {
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: ClassifyConfig = toml::from_str(toml_str)?;
        cfg.thresholds.validate()?;
        Ok(cfg)
    }

    /// Resolve and load the active config:
    /// 1. `CLASSIFY_CONFIG_PATH` file if set, else compiled-in defaults;
    /// 2. per-threshold env overrides;
    /// 3. validation (fatal on out-of-range).
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => {
                let path = PathBuf::from(path);
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("read classify config at {}", path.display()))?;
                ClassifyConfig::from_toml_str(&content)?
            }
            Err(_) => ClassifyConfig::default(),
        };

        cfg.apply_env_overrides()?;
        cfg.thresholds.validate()?;
        Ok(cfg)
    }

    /// Active config file path, if any (used by the hot-reload watcher).
    pub fn active_path() -> Option<PathBuf> {
        std::env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        for (env, slot) in [
            (ENV_SENTIMENT_THRESHOLD, &mut self.thresholds.sentiment_threshold),
            (ENV_INTENT_THRESHOLD, &mut self.thresholds.intent_threshold),
            (ENV_WITHDRAWN_THRESHOLD, &mut self.thresholds.withdrawn_threshold),
        ] {
            if let Ok(raw) = std::env::var(env) {
                let v: f32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{env} must be a float, got `{raw}`"))?;
                *slot = v;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_defaults_parse_and_validate() {
        let cfg = ClassifyConfig::default();
        assert!((cfg.thresholds.sentiment_threshold - 0.25).abs() < 1e-6);
        assert!((cfg.thresholds.intent_threshold - 0.20).abs() < 1e-6);
        assert!((cfg.thresholds.withdrawn_threshold - 0.18).abs() < 1e-6);
        assert!((cfg.thresholds.neutral_confidence - 0.50).abs() < 1e-6);
        assert!(!cfg.keywords.withdrawal.is_empty());
        assert!(!cfg.prefilter.allow.is_empty());
    }

    #[test]
    fn out_of_range_threshold_is_fatal() {
        let toml_str = r#"
[thresholds]
sentiment_threshold = 1.5
intent_threshold = 0.2
withdrawn_threshold = 0.18
"#;
        let err = ClassifyConfig::from_toml_str(toml_str).unwrap_err();
        assert!(err.to_string().contains("sentiment_threshold"));
    }

    #[test]
    fn negative_threshold_is_fatal() {
        let toml_str = r#"
[thresholds]
sentiment_threshold = 0.25
intent_threshold = -0.1
withdrawn_threshold = 0.18
"#;
        assert!(ClassifyConfig::from_toml_str(toml_str).is_err());
    }

    #[test]
    fn keyword_lists_address_all_labels() {
        let cfg = ClassifyConfig::default();
        for label in Label::ALL {
            assert!(
                !cfg.keywords.for_label(label).is_empty(),
                "no trigger phrases for {label}"
            );
        }
    }
}
