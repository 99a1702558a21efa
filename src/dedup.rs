// src/dedup.rs
//! Near-duplicate suppression for batch processing.
//!
//! Mass-mail campaigns land dozens of near-identical bodies within
//! minutes; classifying each one wastes scorer budget and floods the
//! review sheet. This sliding-window filter drops a message when any
//! remembered body within the time window is similar enough
//! (normalized Levenshtein via `strsim`).
//!
//! Stream API: `should_drop(ts, text)` remembers accepted items. Batch
//! helper keeps only non-dropped messages, in order.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

use crate::message::{normalize, Message};

#[derive(Clone, Debug)]
pub struct DedupParams {
    /// Max number of remembered bodies.
    pub window_size: usize,
    /// Similarity in [0,1]; at or above counts as a near-duplicate.
    pub similarity_threshold: f64,
    /// Only items newer than this many seconds are compared.
    pub time_window_secs: i64,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            window_size: 128,
            similarity_threshold: 0.90,
            time_window_secs: 10 * 60,
        }
    }
}

#[derive(Clone, Debug)]
struct SeenItem {
    ts: DateTime<Utc>,
    text: String,
}

#[derive(Debug)]
pub struct NearDuplicateFilter {
    params: DedupParams,
    window: VecDeque<SeenItem>,
}

impl NearDuplicateFilter {
    pub fn new(mut params: DedupParams) -> Self {
        if params.window_size == 0 {
            params.window_size = 1;
        }
        params.similarity_threshold = params.similarity_threshold.clamp(0.0, 1.0);
        if params.time_window_secs <= 0 {
            params.time_window_secs = 1;
        }
        let cap = params.window_size;
        Self { params, window: VecDeque::with_capacity(cap) }
    }

    pub fn params(&self) -> &DedupParams {
        &self.params
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Decide whether the body observed at `ts` duplicates a recent one.
    /// Accepted items are remembered.
    pub fn should_drop(&mut self, ts: DateTime<Utc>, text: &str) -> bool {
        let norm = normalize(text);
        self.evict_old(ts);

        for item in self.window.iter().rev() {
            let sim = strsim::normalized_levenshtein(&norm, &item.text);
            if sim >= self.params.similarity_threshold {
                return true;
            }
        }

        self.remember(ts, norm);
        false
    }

    /// Keeps only messages whose bodies are not near-duplicates, in order.
    pub fn filter_batch(&mut self, messages: Vec<Message>) -> Vec<Message> {
        messages
            .into_iter()
            .filter(|m| !self.should_drop(m.received_at, &m.body))
            .collect()
    }

    fn remember(&mut self, ts: DateTime<Utc>, norm_text: String) {
        if self.window.len() == self.params.window_size {
            self.window.pop_front();
        }
        self.window.push_back(SeenItem { ts, text: norm_text });
    }

    fn evict_old(&mut self, now: DateTime<Utc>) {
        let horizon = Duration::seconds(self.params.time_window_secs);
        while let Some(front) = self.window.front() {
            if now.signed_duration_since(front.ts) > horizon {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }
}
