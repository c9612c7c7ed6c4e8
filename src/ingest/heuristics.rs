// src/ingest/heuristics.rs
//! Tunable heuristic data for the ingestion pipeline
//!
//! Recruiting workbooks are human-authored: the header row floats, column
//! names drift, and some rows collapse several fields into one free-text
//! cell. Everything the pipeline uses to cope with that lives here as named
//! data so it can be tuned (and tested) without touching control flow.

use regex::Regex;
use std::sync::OnceLock;

/// How many leading rows are scanned for the header row
pub const HEADER_SCAN_ROWS: usize = 20;

/// Minimum number of distinct keyword hits for a row to qualify as the header
pub const HEADER_KEYWORD_THRESHOLD: usize = 2;

/// Domain keywords matched (as substrings) against normalized header cells
pub const HEADER_KEYWORDS: &[&str] = &[
    "name",
    "email",
    "phone",
    "contact",
    "mobile",
    "experience",
    "age",
];

// Column-name synonyms, matched against normalized header cells.
// First synonym with a non-blank cell in the row wins.
pub const NAME_SYNONYMS: &[&str] = &[
    "name",
    "candidate",
    "fullname",
    "applicantname",
    "candidatesname",
];
pub const EMAIL_SYNONYMS: &[&str] = &["email", "emailaddress", "eaddress"];
pub const PHONE_SYNONYMS: &[&str] = &["phone", "phonenumber", "contact", "mobile", "cell"];
pub const EXPERIENCE_SYNONYMS: &[&str] = &[
    "experienceyears",
    "yearsofexperience",
    "experience",
    "totalexperience",
    "yearsexperience",
];
pub const PREVIOUS_EXPERIENCE_SYNONYMS: &[&str] = &[
    "previousexperience",
    "pastexperience",
    "previousemployer",
    "lastcompany",
];
pub const AGE_SYNONYMS: &[&str] = &["age", "candidateage", "ageyrs"];

/// A mapped "name" longer than this is assumed to be mis-mapped composite
/// text and may be overridden by the fallback extractor
pub const NAME_OVERRIDE_MAX_LEN: usize = 50;

/// Image formats the browser cannot render; embedded metafiles are skipped
pub const SKIPPED_IMAGE_FORMATS: &[&str] = &["emf", "wmf", "x-emf", "x-wmf"];

/// Normalize a cell for header matching: case-fold, strip non-alphanumerics
pub fn normalize_cell(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// First `local@domain.tld` substring
pub fn email_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap()
    })
}

/// Optional leading `+` followed by a 9-16 char run of digits/dashes/spaces.
/// The run may open on the whitespace after a `Phone:` label, so matches are
/// trimmed before use.
pub fn phone_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\+?[0-9 \-]{9,16}").unwrap())
}

/// Text after a `Name:` label, up to the next known label or end of string
pub fn name_label_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Name:\s*(.+?)\s*(?:Age:|Location:|University:|Degree:|$)").unwrap()
    })
}

/// Digits (optional decimal) after an `Age:` label
pub fn age_label_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Age:\s*([0-9]+(?:\.[0-9]+)?)").unwrap())
}
