//! Liveness endpoint: reports whether the database answers a ping.

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn check(db: &DatabaseConnection) -> HealthInfo {
    // Failures are logged by check_connection
    let database = match crate::db::check_connection(db).await {
        Ok(()) => HealthStatus::Up,
        Err(_) => HealthStatus::Down,
    };

    HealthInfo {
        status: database,
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthInfo),
        (status = 503, description = "Database is unreachable", body = HealthInfo)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthInfo>) {
    let info = check(&state.db).await;
    let status = match info.status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(info))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn live_database_reports_up() {
        let db = crate::db::connect_in_memory().await.unwrap();
        let info = check(&db).await;
        assert_eq!(info.status, HealthStatus::Up);
        assert_eq!(info.database, HealthStatus::Up);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn closed_database_reports_down() {
        let db = crate::db::connect_in_memory().await.unwrap();
        let closed = db.clone();
        closed.close().await.unwrap();
        let info = check(&db).await;
        assert_eq!(info.status, HealthStatus::Down);
    }
}
