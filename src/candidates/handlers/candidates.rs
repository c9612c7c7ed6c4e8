// src/candidates/handlers/candidates.rs

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::AuthedUser;
use crate::candidates::models::{
    Candidate, CandidateFilters, CreateCandidateRequest, UpdateCandidateStatusRequest,
};
use crate::candidates::validators::CandidateValidator;
use crate::common::{generate_candidate_id, helpers, ApiError, AppState, Validator};

/// POST /api/candidates - Manually add a candidate
pub async fn create_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateCandidateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await;

    let validation = CandidateValidator.validate(&request);
    if !validation.is_valid {
        return Err(validation.into());
    }

    // Manual entry honours the same uniqueness rule as the import pipeline
    if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM candidates WHERE email = ?")
            .bind(email)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        if existing.is_some() {
            warn!(user_id = %authed.id, "Candidate creation rejected: duplicate email");
            return Err(ApiError::BadRequest("email already exists".to_string()));
        }
    }

    let candidate_id = generate_candidate_id();
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO candidates
            (id, name, email, phone, experience_years, previous_experience, age, photo_path, status, created_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, NULL, 'pending', ?, ?)
        "#,
    )
    .bind(&candidate_id)
    .bind(request.name.trim())
    .bind(&request.email)
    .bind(&request.phone)
    .bind(request.experience_years)
    .bind(&request.previous_experience)
    .bind(request.age)
    .bind(&authed.id)
    .bind(&now)
    .execute(&state.db)
    .await
    .map_err(ApiError::DatabaseError)?;

    info!(
        user_id = %authed.id,
        candidate_id = %candidate_id,
        "Candidate created manually"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": candidate_id,
            "status": "pending",
            "message": "Candidate created successfully"
        })),
    ))
}

/// GET /api/candidates - List candidates with optional filters
pub async fn list_candidates(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(filters): Query<CandidateFilters>,
) -> Result<Json<Vec<Candidate>>, ApiError> {
    let state = state_lock.read().await;

    let validation = CandidateValidator.validate(&filters);
    if !validation.is_valid {
        return Err(validation.into());
    }

    // Sort column comes from an allowlist; never interpolate raw input
    let sort_by = filters.sort_by.as_deref().unwrap_or("created_at");
    let order = if filters.sort_order.as_deref() == Some("asc") {
        "ASC"
    } else {
        "DESC"
    };

    let candidates = if let Some(status) = &filters.status {
        sqlx::query_as::<_, Candidate>(&format!(
            "SELECT * FROM candidates WHERE status = ? ORDER BY {} {} LIMIT 200",
            sort_by, order
        ))
        .bind(status)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
    } else if let Some(search) = &filters.search {
        let pattern = format!("%{}%", search);
        sqlx::query_as::<_, Candidate>(&format!(
            "SELECT * FROM candidates WHERE name LIKE ? OR email LIKE ? ORDER BY {} {} LIMIT 200",
            sort_by, order
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
    } else {
        sqlx::query_as::<_, Candidate>(&format!(
            "SELECT * FROM candidates ORDER BY {} {} LIMIT 200",
            sort_by, order
        ))
        .fetch_all(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
    };

    info!(
        user_id = %authed.id,
        candidate_count = candidates.len(),
        "Fetched candidates list"
    );

    Ok(Json(candidates))
}

/// GET /api/candidates/:id - Candidate details
pub async fn get_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<Json<Candidate>, ApiError> {
    let state = state_lock.read().await;

    let candidate = sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
        .bind(&candidate_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))?;

    Ok(Json(candidate))
}

/// PATCH /api/candidates/:id/status - Move a candidate through the workflow
pub async fn update_candidate_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
    Json(request): Json<UpdateCandidateStatusRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await;

    let validation = CandidateValidator.validate(&request);
    if !validation.is_valid {
        return Err(validation.into());
    }

    let result = sqlx::query("UPDATE candidates SET status = ? WHERE id = ?")
        .bind(&request.status)
        .bind(&candidate_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("Candidate not found".to_string()));
    }

    info!(
        user_id = %authed.id,
        candidate_id = %candidate_id,
        status = %request.status,
        "Candidate status updated"
    );

    Ok(Json(json!({
        "id": candidate_id,
        "status": request.status,
        "message": "Status updated successfully"
    })))
}

/// DELETE /api/candidates/:id - Remove a candidate (admin only)
///
/// Ingestion never deletes records; this is the explicit administrative path.
pub async fn delete_candidate(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(candidate_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !authed.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let state = state_lock.read().await;

    let candidate = sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = ?")
        .bind(&candidate_id)
        .fetch_optional(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Candidate not found".to_string()))?;

    sqlx::query("DELETE FROM interviews WHERE candidate_id = ?")
        .bind(&candidate_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    sqlx::query("DELETE FROM candidates WHERE id = ?")
        .bind(&candidate_id)
        .execute(&state.db)
        .await
        .map_err(ApiError::DatabaseError)?;

    // Best-effort blob cleanup
    if let Some(photo_path) = &candidate.photo_path {
        state.photo_store.delete(photo_path).await;
    }

    info!(
        admin_id = %authed.id,
        candidate_id = %candidate_id,
        "Candidate deleted"
    );

    Ok(Json(json!({ "message": "Candidate deleted successfully" })))
}

/// GET /uploads/photos/:filename - Serve an extracted candidate photo
pub async fn serve_photo(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await;

    let file_path = state
        .photo_store
        .serve_path(&filename)
        .ok_or_else(|| ApiError::BadRequest("Invalid photo path".to_string()))?;

    if !file_path.exists() {
        return Err(ApiError::NotFound("Photo not found".to_string()));
    }

    let content = tokio::fs::read(&file_path)
        .await
        .map_err(|_| ApiError::InternalServer("Failed to read photo".to_string()))?;

    let content_type = helpers::photo_content_type(&filename);

    Ok((
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        content,
    ))
}
