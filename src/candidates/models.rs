// src/candidates/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Candidate Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience_years: Option<f64>,
    pub previous_experience: Option<String>,
    pub age: Option<f64>,
    pub photo_path: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCandidateRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub experience_years: Option<f64>,
    pub previous_experience: Option<String>,
    pub age: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCandidateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct CandidateFilters {
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// ============================================================================
// Interview Models
// ============================================================================

#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Interview {
    pub id: String,
    pub candidate_id: String,
    pub scheduled_at: String,
    pub duration_minutes: i64,
    pub interviewer: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateInterviewRequest {
    pub scheduled_at: String,
    pub duration_minutes: i64,
    pub interviewer: Option<String>,
    pub notes: Option<String>,
}

// ============================================================================
// Import Models
// ============================================================================

/// Response body for one bulk upload
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub added: i64,
    pub errors: Vec<String>,
}
