// src/ingest/fields.rs
//! Column-synonym mapping from raw rows to candidate drafts

use calamine::Data;

use super::header::HeaderMap;
use super::heuristics::{
    AGE_SYNONYMS, EMAIL_SYNONYMS, EXPERIENCE_SYNONYMS, NAME_SYNONYMS, PHONE_SYNONYMS,
    PREVIOUS_EXPERIENCE_SYNONYMS,
};
use super::workbook::cell_text;

/// Working record built from one raw row. Every field stays optional until
/// the fallback extractor and reconciliation have run; values are kept as
/// text until coercion.
#[derive(Debug, Default, Clone)]
pub struct CandidateDraft {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience_years: Option<String>,
    pub previous_experience: Option<String>,
    pub age: Option<String>,
}

/// True when every cell in the raw row is blank
pub fn row_is_blank(row: &[Data]) -> bool {
    row.iter().all(|c| cell_text(c).is_empty())
}

/// Map one data row through the header's synonym-resolved columns.
///
/// For each canonical field the first synonym with a non-blank cell wins;
/// fields with no resolvable column stay absent.
pub fn map_row(header: &HeaderMap, row: &[Data]) -> CandidateDraft {
    CandidateDraft {
        name: field_value(header, row, NAME_SYNONYMS),
        email: field_value(header, row, EMAIL_SYNONYMS),
        phone: field_value(header, row, PHONE_SYNONYMS),
        experience_years: field_value(header, row, EXPERIENCE_SYNONYMS),
        previous_experience: field_value(header, row, PREVIOUS_EXPERIENCE_SYNONYMS),
        age: field_value(header, row, AGE_SYNONYMS),
    }
}

fn field_value(header: &HeaderMap, row: &[Data], synonyms: &[&str]) -> Option<String> {
    for syn in synonyms {
        if let Some(pos) = header.columns.iter().position(|col| col == syn) {
            let value = row.get(pos).map(cell_text).unwrap_or_default();
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}
