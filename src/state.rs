use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db;
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db_pool: Option<PgPool>,
}

impl AppState {
    /// Builds shared state from config. The pool connects lazily so the
    /// service can boot (and serve /health) before the database is up.
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let db_pool = match config.database_url.as_deref() {
            Some(url) => Some(db::build_pool(&config, url)?),
            None => {
                tracing::warn!("DATABASE_URL is not set, running without a database");
                None
            }
        };
        Ok(Self {
            config: Arc::new(config),
            db_pool,
        })
    }

    pub fn pool(&self) -> AppResult<&PgPool> {
        self.db_pool
            .as_ref()
            .ok_or_else(|| AppError::Dependency("database is not configured".to_string()))
    }
}
