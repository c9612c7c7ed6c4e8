// Application state shared across all modules

use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::PhotoStore;

/// Application state containing database pool, photo storage, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub uploads_tmp_dir: PathBuf,
    pub jwt_secret: String,
    pub admin_emails: HashSet<String>,
    pub photo_store: Arc<PhotoStore>,
}
