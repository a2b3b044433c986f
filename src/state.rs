//! Application state shared by every handler

use crate::{
    auth::{AuthState, JwtHandler, SessionStore},
    config::Config,
    db::Database,
    store::{Gate, TableStore},
    stream::{Broadcaster, SampleLog},
};
use anyhow::{Context, Result};
use axum::extract::FromRef;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub table: Arc<TableStore>,
    pub broadcaster: Arc<Broadcaster>,
}

impl AppState {
    /// Open the database, make sure the table file exists, wire components
    pub async fn from_config(config: &Config) -> Result<Self> {
        let db = Database::open(&config.db_path)?;

        let jwt_handler = Arc::new(JwtHandler::new(
            config.jwt_secret.clone(),
            config.token_ttl_days,
        ));
        let auth = AuthState::new(jwt_handler, SessionStore::new(db.clone()));
        info!("🔐 Authentication initialized");

        let table = Arc::new(TableStore::new(
            &config.table_path,
            &config.backup_path,
            Gate::new(config.gate_slow_hold()),
        ));
        table
            .ensure_initialized()
            .await
            .context("Failed to initialize table file")?;
        info!("📄 Table at {}", config.table_path.display());

        let broadcaster = Arc::new(Broadcaster::new(
            SampleLog::new(db),
            config.stream_interval(),
        ));

        Ok(Self {
            auth,
            table,
            broadcaster,
        })
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<TableStore> {
    fn from_ref(state: &AppState) -> Self {
        state.table.clone()
    }
}
