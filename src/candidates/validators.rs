// src/candidates/validators.rs

use super::models::*;
use crate::common::{ValidationResult, Validator};
use std::collections::HashSet;

/// Candidate lifecycle statuses accepted by the review workflow
pub const CANDIDATE_STATUSES: &[&str] = &[
    "pending",
    "reviewed",
    "interview-scheduled",
    "rejected",
    "hired",
];

// ============================================================================
// Candidate Validators
// ============================================================================

pub struct CandidateValidator;

impl Validator<CreateCandidateRequest> for CandidateValidator {
    fn validate(&self, data: &CreateCandidateRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.name.trim().is_empty() {
            result.add_error("name", "Name is required");
        } else if data.name.len() > 200 {
            result.add_error("name", "Name must be less than 200 characters");
        }

        let has_email = data
            .email
            .as_deref()
            .map(|e| !e.trim().is_empty())
            .unwrap_or(false);
        let has_phone = data
            .phone
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false);
        if !has_email && !has_phone {
            result.add_error("contact", "An email or a phone number is required");
        }

        if has_email {
            let email = data.email.as_deref().unwrap_or_default();
            if !email.contains('@') {
                result.add_error("email", "Email must be valid");
            }
        }

        if let Some(age) = data.age {
            if !(0.0..=100.0).contains(&age) {
                result.add_error("age", "Age must be between 0 and 100");
            }
        }

        if let Some(experience) = data.experience_years {
            if !(0.0..=60.0).contains(&experience) {
                result.add_error(
                    "experience_years",
                    "Experience must be between 0 and 60 years",
                );
            }
        }

        result
    }
}

impl Validator<UpdateCandidateStatusRequest> for CandidateValidator {
    fn validate(&self, data: &UpdateCandidateStatusRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !CANDIDATE_STATUSES.contains(&data.status.as_str()) {
            result.add_error("status", "Invalid candidate status");
        }

        result
    }
}

impl Validator<CandidateFilters> for CandidateValidator {
    fn validate(&self, data: &CandidateFilters) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(status) = &data.status {
            if !CANDIDATE_STATUSES.contains(&status.as_str()) {
                result.add_error("status", "Invalid candidate status filter");
            }
        }

        if let Some(sort_by) = &data.sort_by {
            let valid_sort_fields =
                HashSet::from(["created_at", "name", "status", "experience_years", "age"]);
            if !valid_sort_fields.contains(sort_by.as_str()) {
                result.add_error("sort_by", "Invalid sort field");
            }
        }

        if let Some(sort_order) = &data.sort_order {
            let valid_orders = HashSet::from(["asc", "desc"]);
            if !valid_orders.contains(sort_order.as_str()) {
                result.add_error("sort_order", "Sort order must be 'asc' or 'desc'");
            }
        }

        result
    }
}

// ============================================================================
// Interview Validators
// ============================================================================

pub struct InterviewValidator;

impl Validator<CreateInterviewRequest> for InterviewValidator {
    fn validate(&self, data: &CreateInterviewRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.scheduled_at.trim().is_empty() {
            result.add_error("scheduled_at", "Scheduled date is required");
        }

        if data.duration_minutes <= 0 {
            result.add_error("duration_minutes", "Duration must be greater than 0");
        }

        if data.duration_minutes > 480 {
            result.add_error(
                "duration_minutes",
                "Duration must not exceed 480 minutes (8 hours)",
            );
        }

        if let Some(notes) = &data.notes {
            if notes.len() > 1000 {
                result.add_error("notes", "Notes must be less than 1000 characters");
            }
        }

        result
    }
}
