// tests/batch_pipeline.rs
//
// The whole batch path: near-duplicate suppression, screening,
// bounded fan-out, row building, and the idempotent sinks.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use feedback_triage::classify::Classifier;
use feedback_triage::config::ClassifyConfig;
use feedback_triage::message::{GivingStatus, Label, Message, ScoreVector, Sentiment};
use feedback_triage::row::{StaffDirectory, StaffLookup};
use feedback_triage::scorer::SignalScorer;
use feedback_triage::sink::{MemorySink, RowSink};

fn msg(name: &str, email: &str, subject: &str, body: &str, minute: u32) -> Message {
    Message {
        subject: subject.into(),
        body: body.into(),
        sender_name: name.into(),
        sender_email: email.into(),
        received_at: Utc.with_ymd_and_hms(2026, 1, 14, 9, minute, 0).unwrap(),
    }
}

fn classifier() -> Arc<Classifier> {
    Arc::new(Classifier::new(ClassifyConfig::default(), None).unwrap())
}

#[tokio::test]
async fn batch_yields_rows_in_input_order() {
    let c = classifier();
    let batch = vec![
        msg("Ada", "ada@example.edu", "", "Thank you so much for the scholarship! It changed my life.", 0),
        msg("Ben", "ben@example.edu", "", "Please cancel my monthly donation effective immediately.", 1),
        msg("Cam", "cam@example.edu", "", "Can I increase my donation to $100?", 2),
    ];
    let rows = c.process_batch(batch, 2, None).await;
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].alum_email, "ada@example.edu");
    assert_eq!(rows[0].sentiment, Sentiment::Positive);
    assert_eq!(rows[1].alum_email, "ben@example.edu");
    assert_eq!(rows[1].sentiment, Sentiment::Negative);
    assert_eq!(rows[1].giving_status, GivingStatus::PausedGiving);
    assert_eq!(rows[2].alum_email, "cam@example.edu");
}

#[tokio::test]
async fn administrative_noise_is_dropped_before_classification() {
    let c = classifier();
    let batch = vec![
        msg("Ada", "ada@example.edu", "Out of office", "This is an automatic reply. I am away until Monday and shall answer all messages upon my return to the office.", 0),
        msg("Ben", "ben@example.edu", "", "I'm worried about the new data privacy policy and how student records are shared with outside parties.", 1),
    ];
    let rows = c.process_batch(batch, 4, None).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].alum_email, "ben@example.edu");
}

#[tokio::test]
async fn near_duplicate_bodies_collapse_to_one_row() {
    let c = classifier();
    let form_letter = "I am deeply disappointed by the decision to eliminate the music program and urge you to reverse it.";
    let batch = vec![
        msg("Ada", "ada@example.edu", "", form_letter, 0),
        msg("Ben", "ben@example.edu", "", form_letter, 1),
        msg("Cam", "cam@example.edu", "", "Thank you for the wonderful mentorship program, it has been a delight.", 2),
    ];
    let rows = c.process_batch(batch, 4, None).await;
    assert_eq!(rows.len(), 2, "second copy of the form letter is suppressed");
    assert_eq!(rows[0].alum_email, "ada@example.edu");
    assert_eq!(rows[1].alum_email, "cam@example.edu");
}

#[tokio::test]
async fn staff_directory_assigns_rows() {
    let c = classifier();
    let mut assignments = HashMap::new();
    assignments.insert("ada@example.edu".to_string(), "Grace".to_string());
    let staff = StaffDirectory::from_assignments(&assignments);

    let batch = vec![
        msg("Ada", "ada@example.edu", "", "I'm disappointed with the alumni portal redesign and want it on record.", 0),
        msg("Ben", "ben@example.edu", "", "I'm worried about campus parking during construction next spring.", 1),
    ];
    let rows = c.process_batch(batch, 4, Some(&staff as &dyn StaffLookup)).await;
    assert_eq!(rows[0].assigned_staff, "Grace");
    assert_eq!(rows[1].assigned_staff, "", "absent assignment is empty string");
}

#[tokio::test]
async fn scorer_failures_never_abort_the_batch() {
    struct AlwaysFailing;

    #[async_trait]
    impl SignalScorer for AlwaysFailing {
        async fn score(&self, _t: &str, _l: &[Label]) -> anyhow::Result<ScoreVector> {
            anyhow::bail!("socket closed")
        }
        fn name(&self) -> &'static str {
            "always-failing"
        }
    }

    let c = Arc::new(
        Classifier::new(ClassifyConfig::default(), Some(Arc::new(AlwaysFailing))).unwrap(),
    );
    let batch = vec![
        msg("Ada", "ada@example.edu", "", "Please cancel my monthly donation effective immediately.", 0),
        msg("Ben", "ben@example.edu", "", "Thank you so much for the scholarship! It changed my life.", 1),
    ];
    let rows = c.process_batch(batch, 4, None).await;
    assert_eq!(rows.len(), 2, "keyword fallback still classifies everything");
    assert_eq!(rows[0].giving_status, GivingStatus::PausedGiving);
    assert_eq!(rows[1].sentiment, Sentiment::Positive);
}

#[tokio::test]
async fn memory_sink_append_is_idempotent_by_email() {
    let c = classifier();
    let batch = vec![
        msg("Ada", "ada@example.edu", "", "I'm disappointed with the alumni portal redesign, please take note.", 0),
    ];
    let rows = c.process_batch(batch, 1, None).await;

    let mut sink = MemorySink::new();
    assert!(sink.append(&rows[0]).unwrap());
    // The caller re-submits the same person; the sink skips the row.
    assert!(!sink.append(&rows[0]).unwrap());
    assert_eq!(sink.rows().len(), 1);
}

#[tokio::test]
async fn concurrency_limit_of_one_still_completes() {
    let c = classifier();
    // Distinct enough that the near-duplicate filter keeps them all.
    let bodies = [
        "I'm worried about parking during the construction season.",
        "The library closing at nine is a problem with evening classes.",
        "Campus safety lighting on the north path needs attention, I'm concerned.",
        "I disagree with the new meal plan pricing for graduate students.",
        "Advising appointments take three weeks to get; that's unacceptable.",
        "Housing assignments for transfer students felt arbitrary, a complaint I must raise.",
        "I love the renovated boathouse, wonderful work by everyone involved.",
        "The athletics fee increase deserves an explanation; I'm frustrated by the silence.",
    ];
    let batch: Vec<Message> = bodies
        .iter()
        .enumerate()
        .map(|(i, body)| msg("Alum", &format!("alum{i}@example.edu"), "", body, i as u32))
        .collect();
    let rows = c.process_batch(batch, 1, None).await;
    assert_eq!(rows.len(), 8);
}
