// src/zero_shot.rs
//! Zero-shot scorer adapter: provider abstraction + file cache + daily
//! limit. The core never sees the model; it sees a `SignalScorer` that may
//! fail, and failure always degrades to the keyword strategy upstream.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::message::{Label, ScoreVector};
use crate::scorer::SignalScorer;

// ------------------------------------------------------------
// Config
// ------------------------------------------------------------

/// Loaded from `config/ai.json`. Reading/parsing failures fall back to the
/// disabled default; a missing scorer is a degraded mode, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroShotConfig {
    pub enabled: bool,
    /// "hosted" is the only real provider; anything else is disabled.
    pub provider: Option<String>,
    /// Inference endpoint for the hosted provider.
    pub endpoint: Option<String>,
    /// Optional per-day call limit; defaults to 200 if absent.
    pub daily_limit: Option<u32>,
}

impl Default for ZeroShotConfig {
    fn default() -> Self {
        Self { enabled: false, provider: None, endpoint: None, daily_limit: Some(200) }
    }
}

pub fn load_zero_shot_config() -> ZeroShotConfig {
    let path = Path::new("config/ai.json");
    match fs::read_to_string(path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ZeroShotConfig::default(),
    }
}

/// Factory: build a scorer according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock scorer.
/// * `enabled == false` (or an unknown provider) returns `None`; the
///   pipeline then runs keyword-only.
pub fn build_scorer_from_config(config: &ZeroShotConfig) -> Option<Arc<dyn SignalScorer>> {
    if std::env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        let mock = MockProvider { fixed: vec![(Label::Negative, 0.55)] };
        let scorer =
            CachingScorer::new(mock, default_cache_dir(), config.daily_limit.unwrap_or(200));
        return Some(Arc::new(scorer));
    }

    if !config.enabled {
        return None;
    }

    match config.provider.as_deref() {
        Some("hosted") => {
            let provider = HostedProvider::new(config.endpoint.as_deref());
            let scorer = CachingScorer::new(
                provider,
                default_cache_dir(),
                config.daily_limit.unwrap_or(200),
            );
            Some(Arc::new(scorer))
        }
        _ => None,
    }
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does the *real* remote call. Separated so the same
/// caching wrapper serves production and tests.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn fetch(&self, text: &str, labels: &[Label]) -> Option<ScoreVector>;
    fn name(&self) -> &'static str;
}

/// Hosted zero-shot classification endpoint (HF-inference style contract:
/// candidate labels in, parallel label/score arrays out). Requires
/// `ZERO_SHOT_API_KEY`.
pub struct HostedProvider {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

const DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/facebook/bart-large-mnli";

/// Transformer-family models cap input length; keep requests bounded.
const MAX_MODEL_INPUT_CHARS: usize = 512;

impl HostedProvider {
    pub fn new(endpoint_override: Option<&str>) -> Self {
        let api_key = std::env::var("ZERO_SHOT_API_KEY").unwrap_or_default();
        let http = reqwest::Client::builder()
            .user_agent("feedback-triage/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        let endpoint = endpoint_override.unwrap_or(DEFAULT_ENDPOINT).to_string();
        Self { http, api_key, endpoint }
    }
}

#[async_trait]
impl Provider for HostedProvider {
    async fn fetch(&self, text: &str, labels: &[Label]) -> Option<ScoreVector> {
        if self.api_key.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Params<'a> {
            candidate_labels: Vec<&'a str>,
            multi_label: bool,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
            parameters: Params<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            labels: Vec<String>,
            scores: Vec<f32>,
        }

        let input: String = text.chars().take(MAX_MODEL_INPUT_CHARS).collect();
        let req = Req {
            inputs: &input,
            parameters: Params {
                candidate_labels: labels.iter().map(|l| l.as_str()).collect(),
                // Labels are independent; several may be high at once.
                multi_label: true,
            },
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .ok()?;

        if !resp.status().is_success() {
            return None;
        }
        let body: Resp = resp.json().await.ok()?;

        let mut out = ScoreVector::new();
        for (name, score) in body.labels.iter().zip(body.scores.iter()) {
            if let Some(label) = Label::parse(name) {
                out.set(label, *score);
            }
        }
        Some(out)
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: Vec<(Label, f32)>,
}

#[async_trait]
impl Provider for MockProvider {
    async fn fetch(&self, _text: &str, labels: &[Label]) -> Option<ScoreVector> {
        let mut out = ScoreVector::new();
        for (label, score) in &self.fixed {
            if labels.contains(label) {
                out.set(*label, *score);
            }
        }
        Some(out)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// File cache plus a daily call budget. Cache hits do not consume budget;
/// only successful real calls increment the counter.
pub struct CachingScorer<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingScorer<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir);
        let counter = Arc::new(Mutex::new(load_daily_counter(&cache_dir).unwrap_or_default()));
        Self { inner, cache_dir, daily_limit_max, counter }
    }

    async fn score_impl(&self, text: &str, labels: &[Label]) -> anyhow::Result<ScoreVector> {
        // 1) Daily budget.
        {
            let mut g = self.counter.lock().expect("poisoned counter");
            if g.is_expired() {
                g.reset_to_today();
                let _ = save_daily_counter(&self.cache_dir, &g);
            }
            if g.count >= self.daily_limit_max {
                anyhow::bail!("zero-shot daily limit reached ({})", self.daily_limit_max);
            }
        }

        // 2) Cache lookup.
        let key = cache_key(text, labels);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Ok(hit);
        }

        // 3) Real call.
        match self.inner.fetch(text, labels).await {
            Some(scores) => {
                let _ = write_cache_file(&self.cache_dir, &key, &scores);
                let mut g = self.counter.lock().expect("poisoned counter");
                g.count = g.count.saturating_add(1);
                let _ = save_daily_counter(&self.cache_dir, &g);
                Ok(scores)
            }
            None => anyhow::bail!("zero-shot provider `{}` returned nothing", self.inner.name()),
        }
    }
}

#[async_trait]
impl<P: Provider> SignalScorer for CachingScorer<P> {
    async fn score(&self, text: &str, labels: &[Label]) -> anyhow::Result<ScoreVector> {
        self.score_impl(text, labels).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/zero-shot")
}

fn cache_key(text: &str, labels: &[Label]) -> String {
    // DefaultHasher is sufficient for cache keys; no new crates needed.
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    for l in labels {
        l.as_str().hash(&mut hasher);
    }
    format!("{:016x}", hasher.finish())
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<ScoreVector> {
    let path = cache_path(dir, key);
    let mut file = fs::File::open(path).ok()?;
    let mut buf = String::new();
    file.read_to_string(&mut buf).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &ScoreVector) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self { date: today(), count: 0 }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let p = counter_path(dir);
    let s = fs::read_to_string(p)?;
    let dc: DailyCounter =
        serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(dc)
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
