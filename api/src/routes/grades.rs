//! Grade store endpoints.
//!
//! - GET  /api/v1/students/:student_id/grades?subject_id=UUID&year=YYYY
//! - POST /api/v1/grades

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::{self, GradeType};
use crate::db::queries::{self, GradeFilter, InsertGradeParams};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{dec_to_f64, f64_to_decimal_full};
use crate::services::grading::YearWindow;

#[derive(Debug, Deserialize, IntoParams)]
pub struct GradeListQuery {
    /// Only grades of this subject
    pub subject_id: Option<Uuid>,
    /// Only grades created in this calendar year (e.g. "2024")
    pub year: Option<String>,
}

/// Request body for recording a grade.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateGradeRequest {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub class_id: Uuid,
    /// Score obtained, `0 <= value <= maxValue`
    pub value: f64,
    /// Score ceiling, `> 0`
    pub max_value: f64,
    /// Weight within the subject, `>= 0` (defaults to 1)
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(rename = "type")]
    pub grade_type: GradeType,
    pub title: String,
    pub description: Option<String>,
}

fn default_weight() -> f64 {
    1.0
}

/// Decimal places kept by the `NUMERIC(_, 2)` grade columns.
const STORED_SCALE: u32 = 2;
/// Largest `value` / `maxValue` a `NUMERIC(7, 2)` column holds.
const SCORE_LIMIT: f64 = 99_999.99;
/// Largest `weight` a `NUMERIC(5, 2)` column holds.
const WEIGHT_LIMIT: f64 = 999.99;

/// Whether `v` survives storage without rounding.
fn fits_stored_scale(v: f64) -> bool {
    f64_to_decimal_full(v).normalize().scale() <= STORED_SCALE
}

/// A recorded grade.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub class_id: Uuid,
    pub value: f64,
    pub max_value: f64,
    pub weight: f64,
    #[serde(rename = "type")]
    pub grade_type: GradeType,
    pub title: String,
    pub description: Option<String>,
    /// Creation time (ISO 8601); decides which report year the grade counts toward
    pub created_at: String,
}

impl From<&models::Grade> for GradeResponse {
    fn from(g: &models::Grade) -> Self {
        Self {
            id: g.id,
            student_id: g.student_id,
            teacher_id: g.teacher_id,
            subject_id: g.subject_id,
            class_id: g.class_id,
            value: dec_to_f64(g.value),
            max_value: dec_to_f64(g.max_value),
            weight: dec_to_f64(g.weight),
            grade_type: g.grade_type,
            title: g.title.clone(),
            description: g.description.clone(),
            created_at: g.created_at.to_rfc3339(),
        }
    }
}

/// Check the score invariants of a grade before it reaches the store.
///
/// Zero weights are accepted: such grades are kept but count for nothing.
/// Inputs must also fit their `NUMERIC` columns exactly, so nothing is
/// rounded on insert.
pub(crate) fn validate_grade_request(req: &CreateGradeRequest) -> Result<(), AppError> {
    // is_finite() first: NaN passes every range comparison below.
    if !(req.value.is_finite() && req.max_value.is_finite() && req.weight.is_finite()) {
        return Err(AppError::BadRequest(
            "value, maxValue and weight must be finite numbers".to_string(),
        ));
    }
    if ![req.value, req.max_value, req.weight]
        .into_iter()
        .all(fits_stored_scale)
    {
        return Err(AppError::BadRequest(format!(
            "value, maxValue and weight allow at most {} decimal places",
            STORED_SCALE
        )));
    }
    if req.max_value <= 0.0 {
        return Err(AppError::BadRequest("maxValue must be greater than 0".to_string()));
    }
    if req.value < 0.0 || req.value > req.max_value {
        return Err(AppError::BadRequest(format!(
            "value must be between 0 and maxValue ({})",
            req.max_value
        )));
    }
    if req.max_value > SCORE_LIMIT {
        return Err(AppError::BadRequest(format!(
            "maxValue must not exceed {}",
            SCORE_LIMIT
        )));
    }
    if req.weight < 0.0 {
        return Err(AppError::BadRequest("weight must not be negative".to_string()));
    }
    if req.weight > WEIGHT_LIMIT {
        return Err(AppError::BadRequest(format!(
            "weight must not exceed {}",
            WEIGHT_LIMIT
        )));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    Ok(())
}

/// Build the store filter from query parameters.
pub(crate) fn grade_filter(params: &GradeListQuery) -> Result<GradeFilter, AppError> {
    let mut filter = match params.year.as_deref() {
        Some(year) => YearWindow::for_label(year)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid year '{}'", year)))?
            .grade_filter(),
        None => GradeFilter::default(),
    };
    filter.subject_id = params.subject_id;
    Ok(filter)
}

/// List a student's grades, optionally narrowed to a subject and a year.
#[utoipa::path(
    get,
    path = "/api/v1/students/{student_id}/grades",
    tag = "Grades",
    params(
        ("student_id" = Uuid, Path, description = "Student UUID"),
        GradeListQuery,
    ),
    responses(
        (status = 200, description = "Grades, oldest first", body = Vec<GradeResponse>),
        (status = 400, description = "Invalid year", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
    )
)]
pub async fn list_student_grades(
    State(pool): State<PgPool>,
    Path(student_id): Path<Uuid>,
    Query(params): Query<GradeListQuery>,
) -> Result<Json<Vec<GradeResponse>>, AppError> {
    let filter = grade_filter(&params)?;
    if !queries::student_exists(&pool, student_id).await? {
        return Err(AppError::NotFound(format!("Student {} not found", student_id)));
    }
    let grades = queries::get_grades_for_student(&pool, student_id, &filter).await?;
    Ok(Json(grades.iter().map(GradeResponse::from).collect()))
}

/// Record a new grade.
#[utoipa::path(
    post,
    path = "/api/v1/grades",
    tag = "Grades",
    request_body = CreateGradeRequest,
    responses(
        (status = 201, description = "Grade recorded", body = GradeResponse),
        (status = 400, description = "Invalid score, ceiling or weight", body = ErrorResponse),
        (status = 404, description = "Student, subject or class not found", body = ErrorResponse),
    )
)]
pub async fn create_grade(
    State(pool): State<PgPool>,
    Json(req): Json<CreateGradeRequest>,
) -> Result<(StatusCode, Json<GradeResponse>), AppError> {
    validate_grade_request(&req)?;

    if !queries::student_exists(&pool, req.student_id).await? {
        return Err(AppError::NotFound(format!("Student {} not found", req.student_id)));
    }
    if queries::get_subject(&pool, req.subject_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Subject {} not found", req.subject_id)));
    }
    if !queries::class_exists(&pool, req.class_id).await? {
        return Err(AppError::NotFound(format!("Class {} not found", req.class_id)));
    }

    let grade = queries::insert_grade(
        &pool,
        InsertGradeParams {
            student_id: req.student_id,
            teacher_id: req.teacher_id,
            subject_id: req.subject_id,
            class_id: req.class_id,
            value: f64_to_decimal_full(req.value),
            max_value: f64_to_decimal_full(req.max_value),
            weight: f64_to_decimal_full(req.weight),
            grade_type: req.grade_type,
            title: req.title.trim().to_string(),
            description: req.description,
        },
    )
    .await?;

    tracing::info!(
        "Recorded grade {} for student {} in subject {}",
        grade.id,
        grade.student_id,
        grade.subject_id
    );

    Ok((StatusCode::CREATED, Json(GradeResponse::from(&grade))))
}
