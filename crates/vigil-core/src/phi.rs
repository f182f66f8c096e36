//! PHI detection heuristics.
//!
//! Best-effort pattern scan for obvious patient identifiers. Only the
//! category label and the field it was found in are recorded; the matched
//! substring itself never leaves this module.

use std::sync::LazyLock;

use regex::Regex;

use crate::intake::Intake;
use crate::text::dedupe;

/// PHI pattern names in scan order.
pub const PATTERN_NAMES: &[&str] = &["email", "phone", "ssn", "mrn", "dob"];

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "email",
            Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap(),
        ),
        (
            "phone",
            Regex::new(r"(\+?1[\s.-]?)?(\(\d{3}\)|\d{3})[\s.-]\d{3}[\s.-]?\d{4}").unwrap(),
        ),
        ("ssn", Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
        (
            "mrn",
            Regex::new(r"(?i)\b(mrn|medical\s*record\s*(number|no\.?))\b\s*[:#-]?\s*\d{5,}\b")
                .unwrap(),
        ),
        (
            "dob",
            Regex::new(
                r"(?i)\b(dob|date\s*of\s*birth)\b\s*[:#-]?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}[/-]\d{1,2}[/-]\d{1,2})\b",
            )
            .unwrap(),
        ),
    ]
});

/// Return the names of PHI patterns matching `text`, in scan order.
#[must_use]
pub fn detect(text: &str) -> Vec<&'static str> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    PATTERNS
        .iter()
        .filter(|(_, pat)| pat.is_match(text))
        .map(|(name, _)| *name)
        .collect()
}

/// Scan every textual intake field and return `field:pattern_name` pairs.
///
/// Field order is fixed: chief complaint, history, prior notes, image
/// descriptions. The result is deduplicated and never contains matched text.
#[must_use]
pub fn scan_intake(intake: &Intake) -> Vec<String> {
    let mut hits = Vec::new();
    let mut scan = |field: &str, text: &str| {
        for name in detect(text) {
            hits.push(format!("{field}:{name}"));
        }
    };
    scan("chief_complaint", &intake.chief_complaint);
    scan("history", &intake.history);
    for note in &intake.prior_notes {
        scan("prior_notes", note);
    }
    for desc in &intake.image_descriptions {
        scan("image_descriptions", desc);
    }
    dedupe(hits)
}
