// src/candidates/handlers/import.rs
//! Bulk candidate import from an uploaded spreadsheet

use axum::{
    extract::{Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::auth::AuthedUser;
use crate::candidates::models::ImportResponse;
use crate::common::{generate_raw_id, ApiError, AppState};
use crate::ingest::{run_import, ImportError};

/// POST /api/candidates/import - Upload a workbook of candidates (admin only)
///
/// Row-level problems land in the response's error list; only a missing
/// file, an unreadable workbook, an undetectable header row, or a store
/// failure fail the request. The uploaded temp file is removed on every path.
pub async fn import_candidates(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    if !authed.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }

    let state = state_lock.read().await;

    info!(user_id = %authed.id, "User uploading candidate sheet");

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::BadRequest("Invalid multipart body".to_string()))?
    {
        if field.name() == Some("sheet") {
            let filename = field.file_name().unwrap_or("sheet.xlsx").to_string();

            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::BadRequest("Invalid file".to_string()))?;

            if !filename.ends_with(".xlsx") {
                return Err(ApiError::BadRequest(
                    "Only .xlsx files are allowed".to_string(),
                ));
            }

            // Stage the upload as a temp file for the pipeline
            let tmp_name = format!("{}.xlsx", generate_raw_id(10));
            let tmp_path = state.uploads_tmp_dir.join(&tmp_name);
            tokio::fs::write(&tmp_path, &data).await.map_err(|e| {
                error!(error = %e, "Failed to stage uploaded sheet");
                ApiError::ImportError("Failed to save uploaded file".to_string())
            })?;

            let result = run_import(&state.db, &state.photo_store, &tmp_path, &authed.id).await;

            // The temp file goes away on success and on every abort path
            if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
                warn!(error = %e, path = %tmp_path.display(), "Failed to remove temp upload");
            }

            let report = match result {
                Ok(report) => report,
                Err(ImportError::HeadersNotFound) => {
                    warn!(user_id = %authed.id, file = %filename, "Import aborted: headers not found");
                    return Err(ApiError::BadRequest(
                        "Could not find the header row in the uploaded sheet".to_string(),
                    ));
                }
                Err(ImportError::Workbook(e)) => {
                    warn!(user_id = %authed.id, error = %e, "Import aborted: unreadable workbook");
                    return Err(ApiError::BadRequest(
                        "Could not read the uploaded spreadsheet".to_string(),
                    ));
                }
                Err(ImportError::Db(e)) => {
                    return Err(ApiError::DatabaseError(e));
                }
            };

            info!(
                user_id = %authed.id,
                file = %filename,
                added = report.added,
                skipped = report.errors.len(),
                "Candidate sheet imported"
            );

            return Ok((
                StatusCode::OK,
                Json(ImportResponse {
                    message: format!("Imported {} candidate(s)", report.added),
                    added: report.added,
                    errors: report.errors,
                }),
            ));
        }
    }

    Err(ApiError::BadRequest("No sheet file provided".to_string()))
}
