// src/row.rs
//! Result record builder: maps a classified message into the fixed-width
//! row shape the review sink consumes. Pure, no side effects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::message::{ClassificationResult, GivingStatus, Message, Sentiment};

/// Sink-facing projection of one accepted message. Never mutated after
/// creation; the sink owns persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub alum_name: String,
    pub alum_email: String,
    pub sentiment: Sentiment,
    pub giving_status: GivingStatus,
    /// Empty string, not absent; the sink schema is fixed-width.
    pub assigned_staff: String,
    pub summary: String,
}

/// Advisory staff-assignment collaborator. Absence must never block
/// classification.
pub trait StaffLookup: Send + Sync {
    fn lookup(&self, email: &str) -> Option<String>;
}

/// Static, config-backed directory keyed by sender email
/// (case-insensitive).
#[derive(Debug, Clone, Default)]
pub struct StaffDirectory {
    assignments: HashMap<String, String>,
}

impl StaffDirectory {
    pub fn from_assignments(assignments: &HashMap<String, String>) -> Self {
        let assignments = assignments
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        Self { assignments }
    }
}

impl StaffLookup for StaffDirectory {
    fn lookup(&self, email: &str) -> Option<String> {
        self.assignments.get(&email.to_ascii_lowercase()).cloned()
    }
}

/// Assemble the sink row for one message.
pub fn build_row(
    msg: &Message,
    result: &ClassificationResult,
    staff: Option<&dyn StaffLookup>,
) -> ResultRow {
    let assigned_staff = staff
        .and_then(|s| s.lookup(&msg.sender_email))
        .unwrap_or_default();

    ResultRow {
        date: msg.received_at.format("%Y-%m-%d").to_string(),
        alum_name: msg.sender_name.clone(),
        alum_email: msg.sender_email.clone(),
        sentiment: result.sentiment,
        giving_status: result.giving_status,
        assigned_staff,
        summary: result.summary.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Intent;
    use chrono::TimeZone;

    fn msg() -> Message {
        Message {
            subject: "Feedback".into(),
            body: "body".into(),
            sender_name: "Ada Alum".into(),
            sender_email: "Ada@Example.edu".into(),
            received_at: chrono::Utc.with_ymd_and_hms(2026, 1, 14, 9, 30, 0).unwrap(),
        }
    }

    fn result() -> ClassificationResult {
        ClassificationResult {
            sentiment: Sentiment::Negative,
            intent: Intent::NegativeIntent,
            giving_status: GivingStatus::None,
            summary: "body".into(),
            reasons: vec![],
        }
    }

    #[test]
    fn builds_date_and_identity() {
        let row = build_row(&msg(), &result(), None);
        assert_eq!(row.date, "2026-01-14");
        assert_eq!(row.alum_name, "Ada Alum");
        assert_eq!(row.alum_email, "Ada@Example.edu");
    }

    #[test]
    fn missing_staff_is_empty_string_not_absent() {
        let row = build_row(&msg(), &result(), None);
        assert_eq!(row.assigned_staff, "");
    }

    #[test]
    fn staff_lookup_is_case_insensitive() {
        let mut m = HashMap::new();
        m.insert("ada@example.edu".to_string(), "Grace".to_string());
        let dir = StaffDirectory::from_assignments(&m);
        let row = build_row(&msg(), &result(), Some(&dir));
        assert_eq!(row.assigned_staff, "Grace");
    }

    #[test]
    fn unknown_email_stays_unassigned() {
        let dir = StaffDirectory::from_assignments(&HashMap::new());
        let row = build_row(&msg(), &result(), Some(&dir));
        assert_eq!(row.assigned_staff, "");
    }
}
