//! Report card HTTP endpoints.
//!
//! - GET  /api/v1/students/:student_id/reports
//! - GET  /api/v1/classes/:class_id/reports?semester=S1&year=2024
//! - POST /api/v1/classes/:class_id/reports/close
//! - POST /api/v1/reports
//! - GET  /api/v1/reports/:report_id
//! - GET  /api/v1/reports/:report_id/download

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::{self, ReportStatus};
use crate::db::queries::{self, InsertReportParams};
use crate::db::repository::{PgStore, ReportRepository};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::{opt_dec_to_f64, opt_f64_to_decimal_2dp};
use crate::routes::grades::GradeResponse;
use crate::routes::subjects::SubjectResponse;
use crate::services::grading::{SubjectAverage, YearWindow, SCORE_SCALE};
use crate::services::render::{document_filename, render_report_html};
use crate::services::report::{
    class_report_cards, close_period, report_card, student_report_cards, AssembledReport,
    AverageSource, PeriodClose,
};

/// Shared state for report endpoints.
#[derive(Clone)]
pub struct ReportState {
    pub store: PgStore,
    /// Printed in the bulletin header.
    pub school_name: String,
}

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct PeriodQuery {
    /// Semester label (e.g. "S1")
    pub semester: String,
    /// Year label (e.g. "2024")
    pub year: String,
}

/// Request body for closing a reporting period.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClosePeriodRequest {
    /// Semester label (e.g. "S1")
    pub semester: String,
    /// Calendar year label (e.g. "2024")
    pub year: String,
}

/// Request body for creating a single report.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    /// Frozen general average. Omit to have it recomputed from live grades.
    pub average: Option<f64>,
    pub rank: Option<i32>,
    pub total_students: Option<i32>,
    pub appreciation: Option<String>,
    #[serde(default)]
    pub status: ReportStatus,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// One subject of a report card.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverageResponse {
    pub subject: SubjectResponse,
    pub grades: Vec<GradeResponse>,
    /// Weighted average on the 0–20 scale
    pub average: f64,
    /// `average × coefficient`
    pub weighted_average: f64,
}

impl From<&SubjectAverage> for SubjectAverageResponse {
    fn from(s: &SubjectAverage) -> Self {
        Self {
            subject: SubjectResponse::from(&s.subject),
            grades: s.grades.iter().map(GradeResponse::from).collect(),
            average: s.average,
            weighted_average: s.weighted_average,
        }
    }
}

/// Assembled report card.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportCardResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    /// General average: the stored value if any, otherwise recomputed live
    pub average: f64,
    /// "stored" or "live"
    pub average_source: AverageSource,
    pub rank: Option<i32>,
    pub total_students: Option<i32>,
    pub subjects: Vec<SubjectAverageResponse>,
    pub appreciation: Option<String>,
    pub status: ReportStatus,
    /// Creation time (ISO 8601)
    pub created_at: String,
}

impl From<&AssembledReport> for ReportCardResponse {
    fn from(card: &AssembledReport) -> Self {
        let r = &card.report;
        Self {
            id: r.id,
            student_id: r.student_id,
            class_id: r.class_id,
            semester: r.semester.clone(),
            year: r.year.clone(),
            average: card.average,
            average_source: card.average_source,
            rank: r.rank,
            total_students: r.total_students,
            subjects: card.subjects.iter().map(SubjectAverageResponse::from).collect(),
            appreciation: r.appreciation.clone(),
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// A persisted report record, without the grade breakdown.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    /// Stored general average, null when it is computed on read
    pub average: Option<f64>,
    pub rank: Option<i32>,
    pub total_students: Option<i32>,
    pub appreciation: Option<String>,
    pub status: ReportStatus,
    pub created_at: String,
}

impl From<&models::Report> for ReportResponse {
    fn from(r: &models::Report) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            class_id: r.class_id,
            semester: r.semester.clone(),
            year: r.year.clone(),
            average: opt_dec_to_f64(r.average),
            rank: r.rank,
            total_students: r.total_students,
            appreciation: r.appreciation.clone(),
            status: r.status,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Result of closing a reporting period.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodCloseResponse {
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    /// Students ranked (including those whose report already existed)
    pub total_students: i32,
    pub created: Vec<ReportResponse>,
    /// Students whose report for this period already existed and was left untouched
    pub skipped_student_ids: Vec<Uuid>,
}

impl From<PeriodClose> for PeriodCloseResponse {
    fn from(p: PeriodClose) -> Self {
        Self {
            class_id: p.class_id,
            semester: p.semester,
            year: p.year,
            total_students: p.total_students,
            created: p.created.iter().map(ReportResponse::from).collect(),
            skipped_student_ids: p.skipped_student_ids,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub(crate) fn validate_report_request(req: &CreateReportRequest) -> Result<(), AppError> {
    if req.semester.trim().is_empty() {
        return Err(AppError::BadRequest("semester must not be empty".to_string()));
    }
    if YearWindow::for_label(&req.year).is_none() {
        return Err(AppError::BadRequest(format!("Invalid year '{}'", req.year)));
    }
    if let Some(average) = req.average {
        if !average.is_finite() || !(0.0..=SCORE_SCALE).contains(&average) {
            return Err(AppError::BadRequest(format!(
                "average must be between 0 and {}",
                SCORE_SCALE
            )));
        }
    }
    if let Some(total) = req.total_students {
        if total < 1 {
            return Err(AppError::BadRequest(
                "totalStudents must be at least 1".to_string(),
            ));
        }
    }
    if let Some(rank) = req.rank {
        if rank < 1 {
            return Err(AppError::BadRequest("rank must be at least 1".to_string()));
        }
        if req.total_students.is_some_and(|total| rank > total) {
            return Err(AppError::BadRequest(
                "rank must not exceed totalStudents".to_string(),
            ));
        }
    }
    Ok(())
}

async fn ensure_class(store: &PgStore, class_id: Uuid) -> Result<(), AppError> {
    if queries::class_exists(store.pool(), class_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Class {} not found", class_id)))
    }
}

async fn ensure_student(store: &PgStore, student_id: Uuid) -> Result<(), AppError> {
    if queries::student_exists(store.pool(), student_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Student {} not found", student_id)))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// List a student's report cards, most recent period first.
#[utoipa::path(
    get,
    path = "/api/v1/students/{student_id}/reports",
    tag = "Reports",
    params(
        ("student_id" = Uuid, Path, description = "Student UUID"),
    ),
    responses(
        (status = 200, description = "Assembled report cards", body = Vec<ReportCardResponse>),
        (status = 404, description = "Student not found", body = ErrorResponse),
    )
)]
pub async fn list_student_reports(
    State(state): State<ReportState>,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Vec<ReportCardResponse>>, AppError> {
    ensure_student(&state.store, student_id).await?;
    let cards = student_report_cards(&state.store, student_id).await?;
    Ok(Json(cards.iter().map(ReportCardResponse::from).collect()))
}

/// List the report cards of a class for one reporting period.
#[utoipa::path(
    get,
    path = "/api/v1/classes/{class_id}/reports",
    tag = "Reports",
    params(
        ("class_id" = Uuid, Path, description = "Class UUID"),
        PeriodQuery,
    ),
    responses(
        (status = 200, description = "Assembled report cards, best rank first", body = Vec<ReportCardResponse>),
        (status = 404, description = "Class not found", body = ErrorResponse),
    )
)]
pub async fn list_class_reports(
    State(state): State<ReportState>,
    Path(class_id): Path<Uuid>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<Vec<ReportCardResponse>>, AppError> {
    ensure_class(&state.store, class_id).await?;
    let cards = class_report_cards(&state.store, class_id, &params.semester, &params.year).await?;
    Ok(Json(cards.iter().map(ReportCardResponse::from).collect()))
}

/// Close a reporting period for a class.
///
/// Computes every enrolled student's general average, ranks the class, and
/// freezes average and rank into a new draft report per student. Reports that
/// already exist for the period are left as they are.
#[utoipa::path(
    post,
    path = "/api/v1/classes/{class_id}/reports/close",
    tag = "Reports",
    params(
        ("class_id" = Uuid, Path, description = "Class UUID"),
    ),
    request_body = ClosePeriodRequest,
    responses(
        (status = 200, description = "Reports created for the period", body = PeriodCloseResponse),
        (status = 400, description = "Invalid semester or year", body = ErrorResponse),
        (status = 404, description = "Class not found", body = ErrorResponse),
    )
)]
pub async fn close_class_period(
    State(state): State<ReportState>,
    Path(class_id): Path<Uuid>,
    Json(req): Json<ClosePeriodRequest>,
) -> Result<Json<PeriodCloseResponse>, AppError> {
    ensure_class(&state.store, class_id).await?;
    let closed = close_period(&state.store, class_id, &req.semester, &req.year).await?;
    Ok(Json(PeriodCloseResponse::from(closed)))
}

/// Create a single report.
#[utoipa::path(
    post,
    path = "/api/v1/reports",
    tag = "Reports",
    request_body = CreateReportRequest,
    responses(
        (status = 201, description = "Report created", body = ReportResponse),
        (status = 400, description = "Invalid report fields", body = ErrorResponse),
        (status = 404, description = "Student or class not found", body = ErrorResponse),
        (status = 409, description = "A report already exists for this student and period", body = ErrorResponse),
    )
)]
pub async fn create_report(
    State(state): State<ReportState>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), AppError> {
    validate_report_request(&req)?;
    ensure_student(&state.store, req.student_id).await?;
    ensure_class(&state.store, req.class_id).await?;

    let semester = req.semester.trim().to_string();
    let year = req.year.trim().to_string();
    let inserted = state
        .store
        .insert_report(InsertReportParams {
            student_id: req.student_id,
            class_id: req.class_id,
            semester: semester.clone(),
            year: year.clone(),
            average: opt_f64_to_decimal_2dp(req.average),
            rank: req.rank,
            total_students: req.total_students,
            appreciation: req.appreciation,
            status: req.status,
        })
        .await?;

    let report = inserted.ok_or_else(|| {
        AppError::Conflict(format!(
            "Student {} already has a report for {} {}",
            req.student_id, semester, year
        ))
    })?;

    tracing::info!(
        "Created report {} for student {} ({} {})",
        report.id,
        report.student_id,
        report.semester,
        report.year
    );

    Ok((StatusCode::CREATED, Json(ReportResponse::from(&report))))
}

/// Get one assembled report card.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{report_id}",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID"),
    ),
    responses(
        (status = 200, description = "Assembled report card", body = ReportCardResponse),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn get_report(
    State(state): State<ReportState>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReportCardResponse>, AppError> {
    let (_student, card) = report_card(&state.store, report_id).await?;
    Ok(Json(ReportCardResponse::from(&card)))
}

/// Download a report card as an HTML bulletin.
#[utoipa::path(
    get,
    path = "/api/v1/reports/{report_id}/download",
    tag = "Reports",
    params(
        ("report_id" = Uuid, Path, description = "Report UUID"),
    ),
    responses(
        (status = 200, description = "Bulletin document", content_type = "text/html", body = String,
         headers(
             ("Content-Disposition" = String, description = "attachment; filename=\"bulletin-<report_id>.html\"")
         )),
        (status = 404, description = "Report not found", body = ErrorResponse),
    )
)]
pub async fn download_report(
    State(state): State<ReportState>,
    Path(report_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (student, card) = report_card(&state.store, report_id).await?;
    let html = render_report_html(&state.school_name, &student, &card)?;
    let disposition = format!("attachment; filename=\"{}\"", document_filename(report_id));

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        html,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::{dec, grade, report, subject};
    use crate::services::report::assemble_report;
    use std::collections::HashMap;

    fn request() -> CreateReportRequest {
        CreateReportRequest {
            student_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            semester: "S1".to_string(),
            year: "2024".to_string(),
            average: None,
            rank: None,
            total_students: None,
            appreciation: None,
            status: ReportStatus::Draft,
        }
    }

    #[test]
    fn test_validate_minimal_report() {
        assert!(validate_report_request(&request()).is_ok());
    }

    #[test]
    fn test_validate_full_report() {
        let req = CreateReportRequest {
            average: Some(16.33),
            rank: Some(3),
            total_students: Some(30),
            appreciation: Some("Très bon semestre".to_string()),
            ..request()
        };
        assert!(validate_report_request(&req).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_labels() {
        let req = CreateReportRequest {
            semester: " ".to_string(),
            ..request()
        };
        assert!(matches!(validate_report_request(&req), Err(AppError::BadRequest(_))));
        let req = CreateReportRequest {
            year: "2024-2025".to_string(),
            ..request()
        };
        assert!(matches!(validate_report_request(&req), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_validate_rejects_average_out_of_scale() {
        for average in [-0.5, 20.01, f64::NAN] {
            let req = CreateReportRequest {
                average: Some(average),
                ..request()
            };
            assert!(validate_report_request(&req).is_err(), "accepted {}", average);
        }
    }

    #[test]
    fn test_validate_rejects_inconsistent_rank() {
        let req = CreateReportRequest {
            rank: Some(0),
            ..request()
        };
        assert!(validate_report_request(&req).is_err());
        let req = CreateReportRequest {
            rank: Some(31),
            total_students: Some(30),
            ..request()
        };
        assert!(validate_report_request(&req).is_err());
        let req = CreateReportRequest {
            total_students: Some(0),
            ..request()
        };
        assert!(validate_report_request(&req).is_err());
    }

    #[test]
    fn test_create_request_defaults_status() {
        let json = serde_json::json!({
            "studentId": Uuid::new_v4(),
            "classId": Uuid::new_v4(),
            "semester": "S2",
            "year": "2024"
        });
        let req: CreateReportRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.status, ReportStatus::Draft);
        assert_eq!(req.average, None);
    }

    #[test]
    fn test_report_card_json_shape() {
        let math = subject("Mathématiques", "MATH", "3.0");
        let catalog: HashMap<Uuid, _> = [(math.id, math.clone())].into_iter().collect();
        let r = models::Report {
            average: Some(dec("16.33")),
            rank: Some(2),
            total_students: Some(25),
            ..report(Uuid::new_v4(), Uuid::new_v4(), "S1", "2024")
        };
        let card = assemble_report(r, vec![grade(math.id, "15", "20", "1")], &catalog);

        let json = serde_json::to_value(ReportCardResponse::from(&card)).unwrap();

        assert_eq!(json["semester"], "S1");
        assert_eq!(json["year"], "2024");
        assert_eq!(json["average"], 16.33);
        assert_eq!(json["averageSource"], "stored");
        assert_eq!(json["rank"], 2);
        assert_eq!(json["totalStudents"], 25);
        assert_eq!(json["status"], "DRAFT");
        assert!(json["appreciation"].is_null());
        let subject = &json["subjects"][0];
        assert_eq!(subject["subject"]["code"], "MATH");
        assert_eq!(subject["average"], 15.0);
        assert_eq!(subject["weightedAverage"], 45.0);
        assert_eq!(subject["grades"][0]["type"], "EXAM");
        assert_eq!(subject["grades"][0]["maxValue"], 20.0);
    }

    #[test]
    fn test_period_close_response_shape() {
        let class_id = Uuid::new_v4();
        let skipped = Uuid::new_v4();
        let created = models::Report {
            average: Some(dec("14.25")),
            rank: Some(1),
            total_students: Some(2),
            ..report(Uuid::new_v4(), class_id, "S1", "2024")
        };
        let response = PeriodCloseResponse::from(PeriodClose {
            class_id,
            semester: "S1".to_string(),
            year: "2024".to_string(),
            total_students: 2,
            created: vec![created],
            skipped_student_ids: vec![skipped],
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["totalStudents"], 2);
        assert_eq!(json["created"][0]["average"], 14.25);
        assert_eq!(json["skippedStudentIds"][0], skipped.to_string());
    }
}
