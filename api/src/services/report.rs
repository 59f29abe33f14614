//! Report card assembly.
//!
//! A report's general average is either the value frozen into the report or,
//! when none was stored, the live average recomputed from the student's
//! grades in the report's calendar year. The subject breakdown is always
//! computed live.

use futures::future::try_join_all;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::models::{Grade, Report, ReportStatus, StudentIdentity, Subject};
use crate::db::queries::InsertReportParams;
use crate::db::repository::{
    GradeRepository, ReportRepository, StudentRepository, SubjectRepository,
};
use crate::errors::AppError;
use crate::helpers::dec_to_f64;
use crate::services::grading::{general_average, subject_averages, SubjectAverage, YearWindow};
use crate::services::ranking::rank_students;

/// Where the displayed general average came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AverageSource {
    /// Frozen in the report at creation.
    Stored,
    /// Recomputed from current grades.
    Live,
}

/// Display-ready report card.
#[derive(Debug, Clone)]
pub struct AssembledReport {
    pub report: Report,
    pub average: f64,
    pub average_source: AverageSource,
    pub subjects: Vec<SubjectAverage>,
}

/// Outcome of closing a reporting period for a class.
#[derive(Debug, Clone)]
pub struct PeriodClose {
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    pub total_students: i32,
    pub created: Vec<Report>,
    /// Students that already had a report for this period.
    pub skipped_student_ids: Vec<Uuid>,
}

/// Assemble one report from the student's grades.
///
/// `grades` may span more than the report's year; only those created inside
/// the year window are used.
pub fn assemble_report(
    report: Report,
    grades: Vec<Grade>,
    subjects: &HashMap<Uuid, Subject>,
) -> AssembledReport {
    let in_scope: Vec<Grade> = match YearWindow::for_label(&report.year) {
        Some(window) => grades
            .into_iter()
            .filter(|g| window.contains(g.created_at))
            .collect(),
        None => {
            tracing::warn!(
                "Report {} has unparseable year '{}', assembling without grades",
                report.id,
                report.year
            );
            Vec::new()
        }
    };

    let subjects = subject_averages(in_scope, subjects);
    let (average, average_source) = match report.average {
        Some(stored) => (dec_to_f64(stored), AverageSource::Stored),
        None => (general_average(&subjects), AverageSource::Live),
    };

    AssembledReport {
        report,
        average,
        average_source,
        subjects,
    }
}

/// Fetch a student's grades for one report year. Unparseable years yield none.
async fn grades_for_year<S: GradeRepository>(
    store: &S,
    student_id: Uuid,
    year: &str,
) -> Result<Vec<Grade>, AppError> {
    match YearWindow::for_label(year) {
        Some(window) => Ok(store
            .grades_for_student(student_id, window.grade_filter())
            .await?),
        None => Ok(Vec::new()),
    }
}

/// Load metadata for every subject referenced by `grades`, in one call.
async fn subjects_for<'a, S, I>(store: &S, grades: I) -> Result<HashMap<Uuid, Subject>, AppError>
where
    S: SubjectRepository,
    I: IntoIterator<Item = &'a Grade>,
{
    let mut ids: Vec<Uuid> = grades.into_iter().map(|g| g.subject_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let subjects = store.subjects_by_ids(&ids).await?;
    Ok(subjects.into_iter().map(|s| (s.id, s)).collect())
}

/// Assemble a batch of reports, fetching each student's grades concurrently.
async fn assemble_all<S>(store: &S, reports: Vec<Report>) -> Result<Vec<AssembledReport>, AppError>
where
    S: GradeRepository + SubjectRepository,
{
    let grade_sets = try_join_all(
        reports
            .iter()
            .map(|r| grades_for_year(store, r.student_id, &r.year)),
    )
    .await?;
    let subjects = subjects_for(store, grade_sets.iter().flatten()).await?;

    Ok(reports
        .into_iter()
        .zip(grade_sets)
        .map(|(report, grades)| assemble_report(report, grades, &subjects))
        .collect())
}

/// All report cards of one student, most recent period first.
pub async fn student_report_cards<S>(
    store: &S,
    student_id: Uuid,
) -> Result<Vec<AssembledReport>, AppError>
where
    S: GradeRepository + ReportRepository + SubjectRepository,
{
    let reports = store.reports_for_student(student_id).await?;

    // Reports of the same year share one grade fetch.
    let mut grades_by_year: HashMap<String, Vec<Grade>> = HashMap::new();
    for report in &reports {
        if !grades_by_year.contains_key(&report.year) {
            let grades = grades_for_year(store, student_id, &report.year).await?;
            grades_by_year.insert(report.year.clone(), grades);
        }
    }
    let subjects = subjects_for(store, grades_by_year.values().flatten()).await?;

    tracing::debug!(
        "Assembling {} report(s) for student {}",
        reports.len(),
        student_id
    );

    Ok(reports
        .into_iter()
        .map(|report| {
            let grades = grades_by_year.get(&report.year).cloned().unwrap_or_default();
            assemble_report(report, grades, &subjects)
        })
        .collect())
}

/// One report card together with the student it belongs to.
pub async fn report_card<S>(
    store: &S,
    report_id: Uuid,
) -> Result<(StudentIdentity, AssembledReport), AppError>
where
    S: GradeRepository + ReportRepository + SubjectRepository + StudentRepository,
{
    let report = store
        .report_by_id(report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;
    let student = store
        .student_identity(report.student_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Student {} not found", report.student_id)))?;

    let grades = grades_for_year(store, report.student_id, &report.year).await?;
    let subjects = subjects_for(store, &grades).await?;
    Ok((student, assemble_report(report, grades, &subjects)))
}

/// Teacher-facing listing: every report of a class for one period, best rank first.
pub async fn class_report_cards<S>(
    store: &S,
    class_id: Uuid,
    semester: &str,
    year: &str,
) -> Result<Vec<AssembledReport>, AppError>
where
    S: GradeRepository + ReportRepository + SubjectRepository,
{
    let reports = store
        .reports_for_class_period(class_id, semester, year)
        .await?;
    assemble_all(store, reports).await
}

/// Close a reporting period: compute, rank and freeze every student's
/// general average into a new draft report.
///
/// Students that already have a report for `(semester, year)` keep it
/// untouched but still count toward the class size and the ranking.
pub async fn close_period<S>(
    store: &S,
    class_id: Uuid,
    semester: &str,
    year: &str,
) -> Result<PeriodClose, AppError>
where
    S: GradeRepository + ReportRepository + SubjectRepository + StudentRepository,
{
    let semester = semester.trim();
    let year = year.trim();
    if semester.is_empty() {
        return Err(AppError::BadRequest("semester must not be empty".to_string()));
    }
    let window = YearWindow::for_label(year)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid year '{}'", year)))?;

    let students = store.students_in_class(class_id).await?;
    let grade_sets = try_join_all(
        students
            .iter()
            .map(|s| store.grades_for_student(s.id, window.grade_filter())),
    )
    .await?;
    let subjects = subjects_for(store, grade_sets.iter().flatten()).await?;

    let averages: Vec<(Uuid, f64)> = students
        .iter()
        .zip(grade_sets)
        .map(|(student, grades)| {
            let breakdown = subject_averages(grades, &subjects);
            (student.id, general_average(&breakdown))
        })
        .collect();
    let placements = rank_students(&averages);
    let total_students = placements.len() as i32;

    let mut created = Vec::new();
    let mut skipped_student_ids = Vec::new();
    for placement in placements {
        let inserted = store
            .insert_report(InsertReportParams {
                student_id: placement.student_id,
                class_id,
                semester: semester.to_string(),
                year: year.to_string(),
                average: Some(placement.rounded_average),
                rank: Some(placement.rank),
                total_students: Some(placement.total_students),
                appreciation: None,
                status: ReportStatus::Draft,
            })
            .await?;
        match inserted {
            Some(report) => created.push(report),
            None => skipped_student_ids.push(placement.student_id),
        }
    }

    tracing::info!(
        "Closed {} {} for class {}: {} report(s) created, {} already present",
        semester,
        year,
        class_id,
        created.len(),
        skipped_student_ids.len()
    );

    Ok(PeriodClose {
        class_id,
        semester: semester.to_string(),
        year: year.to_string(),
        total_students,
        created,
        skipped_student_ids,
    })
}
