use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Grade, GradeType, Report, ReportStatus, StudentIdentity, Subject};

/// Optional filters for a student's grade listing.
///
/// The window is half-open: `created_from <= created_at < created_before`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GradeFilter {
    pub subject_id: Option<Uuid>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

/// Parameters for inserting a new grade record.
pub struct InsertGradeParams {
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub subject_id: Uuid,
    pub class_id: Uuid,
    pub value: Decimal,
    pub max_value: Decimal,
    pub weight: Decimal,
    pub grade_type: GradeType,
    pub title: String,
    pub description: Option<String>,
}

/// Parameters for inserting a new report record.
#[derive(Debug, Clone)]
pub struct InsertReportParams {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    pub average: Option<Decimal>,
    pub rank: Option<i32>,
    pub total_students: Option<i32>,
    pub appreciation: Option<String>,
    pub status: ReportStatus,
}

/// List all subjects, ordered by name.
pub async fn list_subjects(pool: &PgPool) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, name, code, coefficient, color FROM subjects ORDER BY name, code",
    )
    .fetch_all(pool)
    .await
}

/// Get a single subject by ID.
pub async fn get_subject(pool: &PgPool, id: Uuid) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>("SELECT id, name, code, coefficient, color FROM subjects WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Get the subjects matching any of the given IDs. Unknown IDs are ignored.
pub async fn get_subjects_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(
        "SELECT id, name, code, coefficient, color FROM subjects WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await
}

/// Get a student's grades, oldest first, narrowed by the optional filters.
pub async fn get_grades_for_student(
    pool: &PgPool,
    student_id: Uuid,
    filter: &GradeFilter,
) -> Result<Vec<Grade>, sqlx::Error> {
    sqlx::query_as::<_, Grade>(
        "SELECT id, student_id, teacher_id, subject_id, class_id,
                value, max_value, weight, grade_type, title, description, created_at
         FROM grades
         WHERE student_id = $1
           AND ($2::uuid IS NULL OR subject_id = $2)
           AND ($3::timestamptz IS NULL OR created_at >= $3)
           AND ($4::timestamptz IS NULL OR created_at < $4)
         ORDER BY created_at, id",
    )
    .bind(student_id)
    .bind(filter.subject_id)
    .bind(filter.created_from)
    .bind(filter.created_before)
    .fetch_all(pool)
    .await
}

/// Insert a new grade record (append-only).
pub async fn insert_grade(pool: &PgPool, params: InsertGradeParams) -> Result<Grade, sqlx::Error> {
    sqlx::query_as::<_, Grade>(
        "INSERT INTO grades (
            id, student_id, teacher_id, subject_id, class_id,
            value, max_value, weight, grade_type, title, description, created_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW()
        )
        RETURNING id, student_id, teacher_id, subject_id, class_id,
                  value, max_value, weight, grade_type, title, description, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(params.student_id)
    .bind(params.teacher_id)
    .bind(params.subject_id)
    .bind(params.class_id)
    .bind(params.value)
    .bind(params.max_value)
    .bind(params.weight)
    .bind(params.grade_type)
    .bind(&params.title)
    .bind(&params.description)
    .fetch_one(pool)
    .await
}

/// Get all reports of a student, most recent period first.
pub async fn get_reports_for_student(
    pool: &PgPool,
    student_id: Uuid,
) -> Result<Vec<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "SELECT id, student_id, class_id, semester, year, average, rank, total_students,
                appreciation, status, created_at
         FROM reports
         WHERE student_id = $1
         ORDER BY year DESC, semester DESC, created_at DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

/// Get a single report by ID.
pub async fn get_report(pool: &PgPool, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "SELECT id, student_id, class_id, semester, year, average, rank, total_students,
                appreciation, status, created_at
         FROM reports WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get the reports of a class for one reporting period, best rank first.
pub async fn get_reports_for_class_period(
    pool: &PgPool,
    class_id: Uuid,
    semester: &str,
    year: &str,
) -> Result<Vec<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "SELECT id, student_id, class_id, semester, year, average, rank, total_students,
                appreciation, status, created_at
         FROM reports
         WHERE class_id = $1 AND semester = $2 AND year = $3
         ORDER BY rank NULLS LAST, student_id",
    )
    .bind(class_id)
    .bind(semester)
    .bind(year)
    .fetch_all(pool)
    .await
}

/// Insert a report unless one already exists for `(student_id, semester, year)`.
///
/// Returns `None` when the unique key was already taken.
pub async fn insert_report(
    pool: &PgPool,
    params: InsertReportParams,
) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        "INSERT INTO reports (
            id, student_id, class_id, semester, year, average, rank, total_students,
            appreciation, status, created_at
        ) VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW()
        )
        ON CONFLICT (student_id, semester, year) DO NOTHING
        RETURNING id, student_id, class_id, semester, year, average, rank, total_students,
                  appreciation, status, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(params.student_id)
    .bind(params.class_id)
    .bind(&params.semester)
    .bind(&params.year)
    .bind(params.average)
    .bind(params.rank)
    .bind(params.total_students)
    .bind(&params.appreciation)
    .bind(params.status)
    .fetch_optional(pool)
    .await
}

/// Get a student's name and current class.
pub async fn get_student_identity(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<StudentIdentity>, sqlx::Error> {
    sqlx::query_as::<_, StudentIdentity>(
        "SELECT s.id, s.first_name, s.last_name, c.name AS class_name
         FROM students s
         LEFT JOIN classes c ON c.id = s.class_id
         WHERE s.id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Get all students currently enrolled in a class.
pub async fn get_students_in_class(
    pool: &PgPool,
    class_id: Uuid,
) -> Result<Vec<StudentIdentity>, sqlx::Error> {
    sqlx::query_as::<_, StudentIdentity>(
        "SELECT s.id, s.first_name, s.last_name, c.name AS class_name
         FROM students s
         JOIN classes c ON c.id = s.class_id
         WHERE s.class_id = $1
         ORDER BY s.last_name, s.first_name, s.id",
    )
    .bind(class_id)
    .fetch_all(pool)
    .await
}

/// Check whether a class exists (lightweight existence probe).
pub async fn class_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM classes WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Check whether a student exists.
pub async fn student_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM students WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}
