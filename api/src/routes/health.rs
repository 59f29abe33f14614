use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" when the database answers, "degraded" otherwise
    pub status: String,
    /// API version
    pub version: String,
    /// Whether the database is reachable
    pub database: bool,
    /// Number of subjects in the catalog (absent when the database is unreachable)
    pub subjects: Option<i64>,
}

impl HealthResponse {
    fn from_probe(subjects: Option<i64>) -> Self {
        let database = subjects.is_some();
        Self {
            status: if database { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            subjects,
        }
    }
}

/// Health check endpoint.
///
/// Counts the subject catalog as a database probe. A failed probe still
/// answers 200 with status "degraded".
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse),
    )
)]
pub async fn health_check(State(pool): State<PgPool>) -> Json<HealthResponse> {
    let subjects = match sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subjects")
        .fetch_one(&pool)
        .await
    {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Health probe failed: {}", e);
            None
        }
    };

    Json(HealthResponse::from_probe(subjects))
}
