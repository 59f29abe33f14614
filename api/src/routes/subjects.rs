use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::{models, queries};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::dec_to_f64;

/// Subject reference data as exposed by the API.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubjectResponse {
    /// Unique subject identifier
    pub id: Uuid,
    /// Subject name (e.g. "Mathématiques")
    pub name: String,
    /// Short code (e.g. "MATH")
    pub code: String,
    /// Weight of the subject in the general average
    pub coefficient: f64,
    /// Display color (presentation only)
    pub color: Option<String>,
}

impl From<&models::Subject> for SubjectResponse {
    fn from(s: &models::Subject) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            code: s.code.clone(),
            coefficient: dec_to_f64(s.coefficient),
            color: s.color.clone(),
        }
    }
}

/// List all subjects.
#[utoipa::path(
    get,
    path = "/api/v1/subjects",
    tag = "Subjects",
    responses(
        (status = 200, description = "All subjects, ordered by name", body = Vec<SubjectResponse>),
    )
)]
pub async fn list_subjects(State(pool): State<PgPool>) -> Result<Json<Vec<SubjectResponse>>, AppError> {
    let subjects = queries::list_subjects(&pool).await?;
    Ok(Json(subjects.iter().map(SubjectResponse::from).collect()))
}

/// Get one subject.
#[utoipa::path(
    get,
    path = "/api/v1/subjects/{id}",
    tag = "Subjects",
    params(
        ("id" = Uuid, Path, description = "Subject UUID"),
    ),
    responses(
        (status = 200, description = "Subject metadata", body = SubjectResponse),
        (status = 404, description = "Subject not found", body = ErrorResponse),
    )
)]
pub async fn get_subject(
    State(pool): State<PgPool>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubjectResponse>, AppError> {
    let subject = queries::get_subject(&pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Subject {} not found", id)))?;
    Ok(Json(SubjectResponse::from(&subject)))
}
