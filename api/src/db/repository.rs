//! Store abstractions consumed by the bulletin services.
//!
//! Services take `&S where S: GradeRepository + ...` instead of a pool, so the
//! aggregation code runs unchanged against Postgres (`PgStore`) or the
//! in-memory store used by unit tests.

use std::future::Future;

use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Grade, Report, StudentIdentity, Subject};
use super::queries::{self, GradeFilter, InsertReportParams};

pub trait GradeRepository: Send + Sync {
    /// Grades of one student, oldest first.
    fn grades_for_student(
        &self,
        student_id: Uuid,
        filter: GradeFilter,
    ) -> impl Future<Output = Result<Vec<Grade>, sqlx::Error>> + Send;
}

pub trait ReportRepository: Send + Sync {
    fn reports_for_student(
        &self,
        student_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Report>, sqlx::Error>> + Send;

    fn report_by_id(&self, id: Uuid)
        -> impl Future<Output = Result<Option<Report>, sqlx::Error>> + Send;

    fn reports_for_class_period(
        &self,
        class_id: Uuid,
        semester: &str,
        year: &str,
    ) -> impl Future<Output = Result<Vec<Report>, sqlx::Error>> + Send;

    /// Returns `None` if a report already exists for the same
    /// `(student_id, semester, year)`.
    fn insert_report(
        &self,
        params: InsertReportParams,
    ) -> impl Future<Output = Result<Option<Report>, sqlx::Error>> + Send;
}

pub trait SubjectRepository: Send + Sync {
    fn subjects_by_ids(
        &self,
        ids: &[Uuid],
    ) -> impl Future<Output = Result<Vec<Subject>, sqlx::Error>> + Send;
}

pub trait StudentRepository: Send + Sync {
    fn student_identity(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<StudentIdentity>, sqlx::Error>> + Send;

    fn students_in_class(
        &self,
        class_id: Uuid,
    ) -> impl Future<Output = Result<Vec<StudentIdentity>, sqlx::Error>> + Send;
}

/// Postgres-backed store. Built once at startup and cloned into handlers.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl GradeRepository for PgStore {
    async fn grades_for_student(
        &self,
        student_id: Uuid,
        filter: GradeFilter,
    ) -> Result<Vec<Grade>, sqlx::Error> {
        queries::get_grades_for_student(&self.pool, student_id, &filter).await
    }
}

impl ReportRepository for PgStore {
    async fn reports_for_student(&self, student_id: Uuid) -> Result<Vec<Report>, sqlx::Error> {
        queries::get_reports_for_student(&self.pool, student_id).await
    }

    async fn report_by_id(&self, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
        queries::get_report(&self.pool, id).await
    }

    async fn reports_for_class_period(
        &self,
        class_id: Uuid,
        semester: &str,
        year: &str,
    ) -> Result<Vec<Report>, sqlx::Error> {
        queries::get_reports_for_class_period(&self.pool, class_id, semester, year).await
    }

    async fn insert_report(
        &self,
        params: InsertReportParams,
    ) -> Result<Option<Report>, sqlx::Error> {
        queries::insert_report(&self.pool, params).await
    }
}

impl SubjectRepository for PgStore {
    async fn subjects_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Subject>, sqlx::Error> {
        queries::get_subjects_by_ids(&self.pool, ids).await
    }
}

impl StudentRepository for PgStore {
    async fn student_identity(&self, id: Uuid) -> Result<Option<StudentIdentity>, sqlx::Error> {
        queries::get_student_identity(&self.pool, id).await
    }

    async fn students_in_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<StudentIdentity>, sqlx::Error> {
        queries::get_students_in_class(&self.pool, class_id).await
    }
}
