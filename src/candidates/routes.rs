// src/candidates/routes.rs

use crate::candidates::handlers;
use axum::{
    routing::{get, patch, post},
    Router,
};

pub fn candidates_routes() -> Router {
    Router::new()
        // Photo serving
        .route("/uploads/photos/:filename", get(handlers::serve_photo))
        // Candidate routes
        .route(
            "/api/candidates",
            post(handlers::create_candidate).get(handlers::list_candidates),
        )
        .route("/api/candidates/import", post(handlers::import_candidates))
        .route(
            "/api/candidates/:id",
            get(handlers::get_candidate).delete(handlers::delete_candidate),
        )
        .route(
            "/api/candidates/:id/status",
            patch(handlers::update_candidate_status),
        )
        // Interview routes
        .route(
            "/api/candidates/:id/interviews",
            post(handlers::schedule_interview).get(handlers::get_candidate_interviews),
        )
        .route("/api/interviews", get(handlers::list_interviews))
}
