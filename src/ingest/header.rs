// src/ingest/header.rs
//! Header row detection
//!
//! Recruiting sheets routinely open with titles, logos and blank padding
//! before the actual field headers. The locator scans a bounded window of
//! leading rows and picks the first one whose normalized cells hit enough
//! domain keywords.

use calamine::Data;

use super::heuristics::{normalize_cell, HEADER_KEYWORDS, HEADER_KEYWORD_THRESHOLD, HEADER_SCAN_ROWS};
use super::workbook::cell_text;

/// Resolved header row: its sheet index and normalized column names
#[derive(Debug, Clone)]
pub struct HeaderMap {
    /// 0-indexed sheet row the header was found on
    pub row_index: usize,
    /// Normalized (lowercase, alphanumeric-only) cell per column position
    pub columns: Vec<String>,
}

/// Scan the first `HEADER_SCAN_ROWS` rows for the field-header row.
///
/// The first row (top to bottom) whose cells match at least
/// `HEADER_KEYWORD_THRESHOLD` distinct keywords wins; ties resolve to the
/// earliest row, not the best match.
pub fn locate_header(rows: &[Vec<Data>]) -> Option<HeaderMap> {
    for (row_index, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let normalized: Vec<String> = row.iter().map(|c| normalize_cell(&cell_text(c))).collect();

        let hits = HEADER_KEYWORDS
            .iter()
            .filter(|kw| normalized.iter().any(|cell| cell.contains(*kw)))
            .count();

        if hits >= HEADER_KEYWORD_THRESHOLD {
            return Some(HeaderMap {
                row_index,
                columns: normalized,
            });
        }
    }
    None
}
