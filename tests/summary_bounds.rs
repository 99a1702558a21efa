// tests/summary_bounds.rs
//
// The extractive summary invariant: at most 100 chars, deterministic,
// built only from text that was already there.

use feedback_triage::summary::{extract_summary, MAX_SUMMARY_CHARS};

#[test]
fn first_sentence_within_limit_is_verbatim() {
    let s = extract_summary("Please cancel my monthly donation effective immediately. More detail follows.");
    assert_eq!(s, "Please cancel my monthly donation effective immediately.");
}

#[test]
fn key_phrase_clause_rescues_a_rambling_opener() {
    let body = "Having spent the better part of two decades attending every single homecoming weekend and serving twice on the regional chapter board without ever once being asked for my opinion on anything of substance, I need to know who actually reads these messages.";
    let s = extract_summary(body);
    assert!(s.starts_with("need to know"), "got: {s}");
    assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
}

#[test]
fn ellipsis_marker_counts_toward_the_limit() {
    let body = "word ".repeat(60);
    let s = extract_summary(&body);
    assert!(s.ends_with("..."));
    assert!(s.chars().count() <= MAX_SUMMARY_CHARS);
}

#[test]
fn limit_holds_across_adversarial_bodies() {
    let bodies: Vec<String> = vec![
        String::new(),
        " ".repeat(300),
        "x".repeat(1000),
        "One short sentence.".to_string(),
        "No terminator whatsoever just an endless stream of words ".repeat(10),
        format!("Unicode padding: {} and then a point.", "říšžťčý ".repeat(40)),
        "please PLEASE please help me understand the annual report because the numbers in section four do not add up at all and nobody returns my calls".to_string(),
    ];
    for body in &bodies {
        let s = extract_summary(body);
        assert!(
            s.chars().count() <= MAX_SUMMARY_CHARS,
            "summary too long ({}) for body starting {:?}",
            s.chars().count(),
            body.chars().take(30).collect::<String>()
        );
    }
}

#[test]
fn extraction_is_deterministic() {
    let body = "Trying to reach someone about the annual fund because nobody has answered my calls for three weeks now.";
    assert_eq!(extract_summary(body), extract_summary(body));
}

#[test]
fn summary_is_a_substring_of_the_body_modulo_marker() {
    let body = "I want to help current students with housing costs, and I have a concrete proposal that the housing office should hear about before the trustees meet in March because afterwards it will be too late.";
    let s = extract_summary(body);
    let core = s.trim_end_matches("...");
    let squashed_body = body.split_whitespace().collect::<Vec<_>>().join(" ");
    assert!(
        squashed_body.contains(core.trim_end()),
        "extractive summary must come from the body: {core}"
    );
}
