// src/classify.rs
//! Pipeline assembly: pre-filter → signal scorer → decision engine →
//! summary. One message in, one `ClassificationResult` out; the call never
//! fails (scorer trouble degrades to keyword-only, empty fields classify
//! as-is). Batch processing fans out under an injected concurrency limit.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use crate::config::ClassifyConfig;
use crate::decision::decide;
use crate::dedup::{DedupParams, NearDuplicateFilter};
use crate::message::{ClassificationResult, Label, Message};
use crate::prefilter::{PreFilter, Screen};
use crate::row::{build_row, ResultRow, StaffDirectory, StaffLookup};
use crate::scorer::{KeywordScorer, LayeredScorer, SignalScorer};
use crate::summary::{ExtractiveSummarizer, Summarizer};

/// Assembled pipeline. Stateless across messages; every message passes
/// through independently.
pub struct Classifier {
    config: ClassifyConfig,
    prefilter: PreFilter,
    scorer: LayeredScorer,
    summarizer: Box<dyn Summarizer>,
}

impl Classifier {
    /// Validates thresholds up front: a bad config is fatal here, never
    /// per-message.
    pub fn new(
        config: ClassifyConfig,
        probabilistic: Option<Arc<dyn SignalScorer>>,
    ) -> anyhow::Result<Self> {
        config.thresholds.validate()?;
        let prefilter = PreFilter::from_config(&config.prefilter);
        let scorer =
            LayeredScorer::new(KeywordScorer::from_config(&config.keywords), probabilistic);
        Ok(Self { config, prefilter, scorer, summarizer: Box::new(ExtractiveSummarizer) })
    }

    /// Swap in an alternate summary strategy (e.g. a model-backed one).
    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    pub fn staff_directory(&self) -> StaffDirectory {
        StaffDirectory::from_assignments(&self.config.staff.assignments)
    }

    /// Pre-filter verdict for one message.
    pub fn screen(&self, msg: &Message) -> Screen {
        let screen = self.prefilter.screen(msg);
        if let Some(reason) = screen.reason {
            metrics::counter!("messages_rejected_total", "reason" => reason.as_str())
                .increment(1);
        }
        metrics::counter!("messages_screened_total").increment(1);
        screen
    }

    /// Classify one message. Infallible by design: the worst outcome is
    /// the neutral default with an empty summary.
    pub async fn classify(&self, msg: &Message) -> ClassificationResult {
        let decoded = html_escape::decode_html_entities(
            &format!("{} {}", msg.subject, msg.body),
        )
        .into_owned();

        let scores = self.scorer.score(&decoded, &Label::ALL).await;
        let derived = decide(&scores, &msg.normalized_body(), &self.config);

        let decoded_body = html_escape::decode_html_entities(&msg.body).into_owned();
        let summary = self.summarizer.summarize(&decoded_body);

        let result = ClassificationResult {
            sentiment: derived.sentiment,
            intent: derived.intent,
            giving_status: derived.giving_status,
            summary,
            reasons: derived.reasons,
        };

        metrics::counter!("messages_classified_total", "sentiment" => result.sentiment.to_string())
            .increment(1);
        if dev_logging_enabled() {
            // Never log raw message text; hashed id only.
            debug!(
                target: "triage",
                id = %anon_hash(&msg.body),
                sentiment = %result.sentiment,
                intent = %result.intent,
                giving_status = %result.giving_status,
                "classified"
            );
        }
        result
    }

    /// Full batch path: near-duplicate suppression → screening →
    /// classification fanned out under `concurrency` → sink rows, in input
    /// order. No message can abort the batch.
    pub async fn process_batch(
        self: Arc<Self>,
        messages: Vec<Message>,
        concurrency: usize,
        staff: Option<&dyn StaffLookup>,
    ) -> Vec<ResultRow> {
        let mut dedup = NearDuplicateFilter::new(DedupParams::default());
        let messages = dedup.filter_batch(messages);

        let kept: Vec<Message> = messages
            .into_iter()
            .filter(|m| self.screen(m).keep)
            .collect();

        let sem = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
        let mut tasks = tokio::task::JoinSet::new();
        for (idx, msg) in kept.into_iter().enumerate() {
            let classifier = Arc::clone(&self);
            let sem = Arc::clone(&sem);
            tasks.spawn(async move {
                // Closed only on runtime shutdown; treat as skip.
                let _permit = sem.acquire_owned().await;
                let result = classifier.classify(&msg).await;
                (idx, msg, result)
            });
        }

        let mut classified = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(item) => classified.push(item),
                Err(e) => warn!(error = %e, "classification task failed, message skipped"),
            }
        }
        classified.sort_by_key(|(idx, _, _)| *idx);

        classified
            .into_iter()
            .map(|(_, msg, result)| build_row(&msg, &result, staff))
            .collect()
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// Threadsafe handle that can hot-reload the underlying classifier in
/// dev/local. Enable with CLASSIFY_HOT_RELOAD=1; active only in a debug
/// build or when APP_ENV is "local"/"development"/"dev".
#[derive(Clone)]
pub struct ClassifierHandle {
    inner: Arc<RwLock<Arc<Classifier>>>,
    probabilistic: Option<Arc<dyn SignalScorer>>,
}

impl ClassifierHandle {
    pub fn new(classifier: Classifier, probabilistic: Option<Arc<dyn SignalScorer>>) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(classifier))), probabilistic }
    }

    /// Current pipeline. Cheap (Arc clone); safe to hold across awaits.
    pub fn current(&self) -> Arc<Classifier> {
        self.inner.read().expect("classifier lock").clone()
    }

    fn replace(&self, classifier: Classifier) {
        *self.inner.write().expect("classifier lock") = Arc::new(classifier);
    }
}

fn dev_logging_enabled() -> bool {
    let on = std::env::var("TRIAGE_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("APP_ENV").unwrap_or_default().to_ascii_lowercase().as_str(),
        "local" | "development" | "dev"
    )
}

/// Short anonymized id for log lines (first 6 bytes of a SHA-256 digest).
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn hot_reload_enabled() -> bool {
    let want = std::env::var("CLASSIFY_HOT_RELOAD").ok().map(|v| v == "1").unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("APP_ENV").unwrap_or_default().to_ascii_lowercase().as_str(),
        "local" | "development" | "dev"
    )
}

/// Poll `path` for mtime changes and swap in a rebuilt classifier. Std
/// threads only; no extra crates.
pub fn start_hot_reload_thread(handle: ClassifierHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match std::fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        match std::fs::read_to_string(&path)
                            .map_err(anyhow::Error::from)
                            .and_then(|s| ClassifyConfig::from_toml_str(&s))
                            .and_then(|cfg| {
                                Classifier::new(cfg, handle.probabilistic.clone())
                            }) {
                            Ok(next) => {
                                handle.replace(next);
                                info!(path = %path.display(), "classify config reloaded");
                            }
                            Err(e) => {
                                warn!(error = %e, "classify config reload failed, keeping previous");
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}
