//! Canonical symptom and risk-factor catalogs.
//!
//! Extraction is substring-based over normalized text (see
//! [`crate::text::normalize_for_matching`]) with a word-window negation
//! check. Output order is catalog declaration order, which keeps every
//! downstream consumer deterministic.

use crate::text::is_negated;

/// One catalog entry: a canonical token and the keywords that map to it.
pub struct CatalogEntry {
    /// Canonical token emitted into `StructuredIntake`.
    pub token: &'static str,
    /// Normalized keywords matched as substrings.
    pub keywords: &'static [&'static str],
}

/// Symptom catalog, in declaration order.
pub const SYMPTOMS: &[CatalogEntry] = &[
    CatalogEntry {
        token: "chest_pain",
        keywords: &[
            "chest pain",
            "chest tightness",
            "tightness in chest",
            "chest pressure",
            "crushing chest",
        ],
    },
    CatalogEntry {
        token: "dyspnea",
        keywords: &[
            "shortness of breath",
            "short of breath",
            "dyspnea",
            "can't catch breath",
            "cannot catch breath",
            "difficulty breathing",
            "trouble breathing",
        ],
    },
    CatalogEntry {
        token: "cough",
        keywords: &["cough"],
    },
    CatalogEntry {
        token: "fever",
        keywords: &["fever", "febrile", "chills"],
    },
    CatalogEntry {
        token: "severe_headache",
        keywords: &["severe headache", "worst headache", "thunderclap headache"],
    },
    CatalogEntry {
        token: "headache",
        keywords: &["headache", "head pain"],
    },
    CatalogEntry {
        token: "dizziness",
        keywords: &["dizziness", "dizzy", "lightheaded", "light-headed"],
    },
    CatalogEntry {
        token: "syncope",
        keywords: &[
            "syncope",
            "fainted",
            "fainting",
            "passed out",
            "blacked out",
            "near-syncope",
        ],
    },
    CatalogEntry {
        token: "nausea",
        keywords: &["nausea", "nauseous", "nauseated"],
    },
    CatalogEntry {
        token: "vomiting",
        keywords: &["vomiting", "vomited", "throwing up"],
    },
    CatalogEntry {
        token: "abdominal_pain",
        keywords: &["abdominal pain", "stomach pain", "belly pain"],
    },
    CatalogEntry {
        token: "rash",
        keywords: &["rash", "hives"],
    },
    CatalogEntry {
        token: "blurred_vision",
        keywords: &["blurred vision", "blurry vision", "double vision"],
    },
    CatalogEntry {
        token: "slurred_speech",
        keywords: &["slurred speech", "slurring words", "speech slurred"],
    },
    CatalogEntry {
        token: "facial_droop",
        keywords: &["facial droop", "face drooping", "droopy face", "face droop"],
    },
    CatalogEntry {
        token: "unilateral_weakness",
        keywords: &[
            "weakness one side",
            "one-sided weakness",
            "right arm weakness",
            "left arm weakness",
            "right leg weakness",
            "left leg weakness",
            "arm weakness",
            "leg weakness",
            "hemiparesis",
        ],
    },
    CatalogEntry {
        token: "aphasia",
        keywords: &[
            "word-finding difficulty",
            "can't find words",
            "trouble speaking",
            "aphasia",
        ],
    },
    CatalogEntry {
        token: "altered_mental_status",
        keywords: &[
            "confusion",
            "confused",
            "altered mental status",
            "disoriented",
            "lethargic",
            "unresponsive",
        ],
    },
    CatalogEntry {
        token: "hematemesis",
        keywords: &["vomiting blood", "hematemesis", "coffee-ground emesis"],
    },
    CatalogEntry {
        token: "melena",
        keywords: &["melena", "black tarry stool", "bloody stool", "blood in stool"],
    },
    CatalogEntry {
        token: "vaginal_bleeding",
        keywords: &["vaginal bleeding", "pregnancy bleeding"],
    },
    CatalogEntry {
        token: "palpitations",
        keywords: &["palpitations", "heart racing", "racing heart"],
    },
    CatalogEntry {
        token: "sore_throat",
        keywords: &["sore throat", "throat pain"],
    },
];

/// Risk-factor catalog, in declaration order.
pub const RISK_FACTORS: &[CatalogEntry] = &[
    CatalogEntry {
        token: "diabetes",
        keywords: &["diabetes", "diabetic", "t1dm", "t2dm"],
    },
    CatalogEntry {
        token: "hypertension",
        keywords: &["hypertension", "high blood pressure", "htn"],
    },
    CatalogEntry {
        token: "ckd",
        keywords: &["ckd", "chronic kidney disease", "renal failure"],
    },
    CatalogEntry {
        token: "copd",
        keywords: &["copd", "emphysema", "chronic bronchitis"],
    },
    CatalogEntry {
        token: "asthma",
        keywords: &["asthma", "asthmatic"],
    },
    CatalogEntry {
        token: "cancer",
        keywords: &["cancer", "malignancy", "chemotherapy"],
    },
    CatalogEntry {
        token: "immunocompromise",
        keywords: &[
            "immunosuppressed",
            "immunocompromised",
            "transplant recipient",
            "on steroids",
        ],
    },
    CatalogEntry {
        token: "pregnancy",
        keywords: &["pregnant", "pregnancy", "weeks pregnant", "gravid"],
    },
    CatalogEntry {
        token: "anticoagulation",
        keywords: &[
            "warfarin",
            "apixaban",
            "rivaroxaban",
            "eliquis",
            "xarelto",
            "anticoagulant",
            "blood thinner",
        ],
    },
    CatalogEntry {
        token: "prior_mi",
        keywords: &["prior mi", "previous heart attack", "history of mi", "heart attack"],
    },
    CatalogEntry {
        token: "prior_stroke",
        keywords: &["prior stroke", "previous stroke", "history of stroke", "prior tia"],
    },
    CatalogEntry {
        token: "smoker",
        keywords: &["smoker", "smokes", "pack-year"],
    },
];

/// Symptom tokens whose presence makes the core vitals mandatory
/// (heart rate, systolic BP, SpO2, temperature).
pub const VITALS_REQUIRED_SYMPTOMS: &[&str] = &[
    "chest_pain",
    "dyspnea",
    "syncope",
    "altered_mental_status",
    "fever",
    "palpitations",
    "hematemesis",
    "melena",
];

/// Extract canonical tokens from normalized text.
///
/// A token is present when any of its keywords occurs at least once without
/// a negation cue in the preceding `negation_window` words. Output follows
/// catalog declaration order and is deduplicated.
#[must_use]
pub fn extract_tokens(
    normalized_text: &str,
    catalog: &[CatalogEntry],
    negation_window: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    for entry in catalog {
        let hit = entry.keywords.iter().any(|kw| {
            normalized_text
                .match_indices(kw)
                .any(|(idx, _)| !is_negated(&normalized_text[..idx], negation_window))
        });
        if hit {
            out.push(entry.token.to_string());
        }
    }
    out
}

/// Whether a symptom token is a known catalog token.
#[must_use]
pub fn is_known_symptom(token: &str) -> bool {
    SYMPTOMS.iter().any(|e| e.token == token)
}

/// Whether a risk-factor token is a known catalog token.
#[must_use]
pub fn is_known_risk_factor(token: &str) -> bool {
    RISK_FACTORS.iter().any(|e| e.token == token)
}
