// src/candidates/handlers/interviews.rs

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::auth::AuthedUser;
use crate::candidates::models::{Candidate, CreateInterviewRequest, Interview};
use crate::candidates::validators::InterviewValidator;
use crate::common::{generate_interview_id, ApiError, AppState, Validator};

/// POST /api/candidates/:id/interviews - Schedule an interview
///
/// Scheduling also moves the candidate to the interview-scheduled status.
pub async fn schedule_interview(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(request): Json<CreateInterviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await;

    let validation = InterviewValidator.validate(&request);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let _candidate = sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
        .bind(&candidate_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))?;

    let interview_id = generate_interview_id();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO interviews
            (id, candidate_id, scheduled_at, duration_minutes, interviewer, notes, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&interview_id)
    .bind(&candidate_id)
    .bind(&request.scheduled_at)
    .bind(request.duration_minutes)
    .bind(&request.interviewer)
    .bind(&request.notes)
    .bind(&authed.id)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    sqlx::query("UPDATE candidates SET status = 'interview-scheduled' WHERE id = ?")
        .bind(&candidate_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    info!(
        user_id = %authed.id,
        candidate_id = %candidate_id,
        interview_id = %interview_id,
        scheduled_at = %request.scheduled_at,
        "Interview scheduled"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": interview_id,
            "candidate_id": candidate_id,
            "scheduled_at": request.scheduled_at,
            "message": "Interview scheduled successfully"
        })),
    ))
}

/// GET /api/candidates/:id/interviews - Interviews for one candidate
pub async fn get_candidate_interviews(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<Json<Vec<Interview>>, ApiError> {
    let state = state_lock.read().await;

    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews WHERE candidate_id = ? ORDER BY scheduled_at ASC",
    )
    .bind(&candidate_id)
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    Ok(Json(interviews))
}

/// GET /api/interviews - All upcoming interviews (admin)
pub async fn list_interviews(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Interview>>, ApiError> {
    if !authed.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let state = state_lock.read().await;

    let interviews = sqlx::query_as::<_, Interview>(
        "SELECT * FROM interviews ORDER BY scheduled_at ASC LIMIT 200",
    )
    .fetch_all(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    info!(
        admin_id = %authed.id,
        interview_count = interviews.len(),
        "Admin fetched interviews list"
    );

    Ok(Json(interviews))
}
