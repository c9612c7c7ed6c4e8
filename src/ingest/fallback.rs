// src/ingest/fallback.rs
//! Composite-text recovery for rows that defeat the tabular mapping
//!
//! Some workbooks carry whole candidate profiles as one labelled free-text
//! blob ("Name: Jane Doe Age: 29 Phone: ...") instead of tabular cells. When
//! the structured mapping failed to produce a contact field and the row text
//! carries a label colon, each pattern takes an independent shot at the
//! concatenated row text. Extracted values only ever fill absent fields; the
//! single exception is the overlong-name override.

use calamine::Data;

use super::fields::CandidateDraft;
use super::heuristics::{
    age_label_pattern, email_pattern, name_label_pattern, phone_pattern, NAME_OVERRIDE_MAX_LEN,
};
use super::workbook::cell_text;

/// Concatenate a row's non-blank cells into one text blob
pub fn row_text(row: &[Data]) -> String {
    row.iter()
        .map(cell_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<String>>()
        .join(" ")
}

/// The fallback only runs when a contact field is still missing and the row
/// text looks like a labelled blob rather than tabular data
pub fn should_attempt(draft: &CandidateDraft, text: &str) -> bool {
    (draft.email.is_none() || draft.phone.is_none()) && text.contains(':')
}

/// Run the pattern extractions over the row text, filling absent fields
pub fn apply(draft: &mut CandidateDraft, text: &str) {
    if draft.email.is_none() {
        if let Some(m) = email_pattern().find(text) {
            draft.email = Some(m.as_str().to_string());
        }
    }

    if draft.phone.is_none() {
        if let Some(m) = phone_pattern().find(text) {
            let value = m.as_str().trim();
            if value.chars().any(|c| c.is_ascii_digit()) {
                draft.phone = Some(value.to_string());
            }
        }
    }

    let name_missing_or_suspect = match &draft.name {
        None => true,
        // An overlong mapped "name" is almost always a mis-mapped blob cell
        Some(name) => name.chars().count() > NAME_OVERRIDE_MAX_LEN,
    };
    if name_missing_or_suspect {
        if let Some(caps) = name_label_pattern().captures(text) {
            let value = caps[1].trim();
            if !value.is_empty() {
                draft.name = Some(value.to_string());
            }
        }
    }

    if draft.age.is_none() {
        if let Some(caps) = age_label_pattern().captures(text) {
            draft.age = Some(caps[1].to_string());
        }
    }
}
