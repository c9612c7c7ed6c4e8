// src/ingest/reconcile.rs
//! Per-row reconciliation against the candidate store
//!
//! Each row resolves to one tagged decision so the duplicate/merge branches
//! stay independently testable. IO (the email lookup, the insert, the photo
//! patch) happens in the pipeline; this module only decides.

use super::fields::CandidateDraft;

/// Minimal view of an already-stored candidate, as the decision needs it
#[derive(Debug, Clone)]
pub struct ExistingCandidate {
    pub id: String,
    pub has_photo: bool,
}

/// Terminal outcome for one data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDecision {
    /// Stage the draft as a new record
    Insert,
    /// Patch only the photo onto an existing photoless record
    PatchPhoto { candidate_id: String },
    /// Entirely blank row; skipped silently
    SkipBlank,
    /// Recognized boilerplate (footer/branding); skipped silently
    SkipNoise,
    /// Required fields missing; skipped with a recorded error
    SkipMissingFields { found: Vec<&'static str> },
    /// Email already stored and this row contributes nothing new
    SkipDuplicate { email: String },
}

/// Boilerplate detector: rows with neither a name nor an email are treated
/// as footer/branding noise and skipped without an error.
///
/// This is a known heuristic limitation: a legitimate phone-only row with no
/// name is indistinguishable from branding text and will be dropped silently.
pub fn is_noise_row(draft: &CandidateDraft) -> bool {
    draft.name.is_none() && draft.email.is_none()
}

/// Decide the outcome for one row.
///
/// `existing` is the store's record for the draft's email (when the draft has
/// one); `has_image` says whether an embedded image anchors to this row.
pub fn decide(
    draft: &CandidateDraft,
    row_blank: bool,
    existing: Option<&ExistingCandidate>,
    has_image: bool,
) -> RowDecision {
    if row_blank {
        return RowDecision::SkipBlank;
    }

    if is_noise_row(draft) {
        return RowDecision::SkipNoise;
    }

    if draft.name.is_none() || (draft.email.is_none() && draft.phone.is_none()) {
        let mut found = Vec::new();
        if draft.name.is_some() {
            found.push("name");
        }
        if draft.email.is_some() {
            found.push("email");
        }
        if draft.phone.is_some() {
            found.push("phone");
        }
        return RowDecision::SkipMissingFields { found };
    }

    match existing {
        None => RowDecision::Insert,
        Some(record) if !record.has_photo && has_image => RowDecision::PatchPhoto {
            candidate_id: record.id.clone(),
        },
        Some(_) => RowDecision::SkipDuplicate {
            email: draft.email.clone().unwrap_or_default(),
        },
    }
}

/// Coerce a numeric field (experience years, age); non-numeric and absent
/// values both default to 0.
pub fn coerce_number(raw: Option<&str>) -> f64 {
    raw.and_then(|v| v.trim().parse::<f64>().ok()).unwrap_or(0.0)
}
