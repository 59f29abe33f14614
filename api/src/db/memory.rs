//! In-memory store for unit tests. Mirrors the SQL semantics the services
//! rely on: half-open `created_at` windows, report uniqueness on
//! `(student_id, semester, year)`, and the listing orders.

use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::models::{Grade, Report, StudentIdentity, Subject};
use super::queries::{GradeFilter, InsertReportParams};
use super::repository::{GradeRepository, ReportRepository, StudentRepository, SubjectRepository};

#[derive(Default)]
pub struct MemoryStore {
    pub subjects: Vec<Subject>,
    pub grades: Vec<Grade>,
    /// `(class_id, student)` pairs.
    pub enrollments: Vec<(Uuid, StudentIdentity)>,
    reports: Mutex<Vec<Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report(self, report: Report) -> Self {
        self.reports.lock().unwrap().push(report);
        self
    }

    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().unwrap().clone()
    }
}

impl GradeRepository for MemoryStore {
    async fn grades_for_student(
        &self,
        student_id: Uuid,
        filter: GradeFilter,
    ) -> Result<Vec<Grade>, sqlx::Error> {
        let mut grades: Vec<Grade> = self
            .grades
            .iter()
            .filter(|g| g.student_id == student_id)
            .filter(|g| filter.subject_id.map_or(true, |id| g.subject_id == id))
            .filter(|g| filter.created_from.map_or(true, |from| g.created_at >= from))
            .filter(|g| filter.created_before.map_or(true, |before| g.created_at < before))
            .cloned()
            .collect();
        grades.sort_by_key(|g| (g.created_at, g.id));
        Ok(grades)
    }
}

impl ReportRepository for MemoryStore {
    async fn reports_for_student(&self, student_id: Uuid) -> Result<Vec<Report>, sqlx::Error> {
        let mut reports: Vec<Report> = self
            .reports()
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect();
        reports.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| b.semester.cmp(&a.semester))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(reports)
    }

    async fn report_by_id(&self, id: Uuid) -> Result<Option<Report>, sqlx::Error> {
        Ok(self.reports().into_iter().find(|r| r.id == id))
    }

    async fn reports_for_class_period(
        &self,
        class_id: Uuid,
        semester: &str,
        year: &str,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let mut reports: Vec<Report> = self
            .reports()
            .into_iter()
            .filter(|r| r.class_id == class_id && r.semester == semester && r.year == year)
            .collect();
        reports.sort_by_key(|r| (r.rank.is_none(), r.rank, r.student_id));
        Ok(reports)
    }

    async fn insert_report(
        &self,
        params: InsertReportParams,
    ) -> Result<Option<Report>, sqlx::Error> {
        let mut reports = self.reports.lock().unwrap();
        let taken = reports.iter().any(|r| {
            r.student_id == params.student_id
                && r.semester == params.semester
                && r.year == params.year
        });
        if taken {
            return Ok(None);
        }
        let report = Report {
            id: Uuid::new_v4(),
            student_id: params.student_id,
            class_id: params.class_id,
            semester: params.semester,
            year: params.year,
            average: params.average,
            rank: params.rank,
            total_students: params.total_students,
            appreciation: params.appreciation,
            status: params.status,
            created_at: Utc::now(),
        };
        reports.push(report.clone());
        Ok(Some(report))
    }
}

impl SubjectRepository for MemoryStore {
    async fn subjects_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Subject>, sqlx::Error> {
        Ok(self
            .subjects
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }
}

impl StudentRepository for MemoryStore {
    async fn student_identity(&self, id: Uuid) -> Result<Option<StudentIdentity>, sqlx::Error> {
        Ok(self
            .enrollments
            .iter()
            .map(|(_, s)| s)
            .find(|s| s.id == id)
            .cloned())
    }

    async fn students_in_class(
        &self,
        class_id: Uuid,
    ) -> Result<Vec<StudentIdentity>, sqlx::Error> {
        Ok(self
            .enrollments
            .iter()
            .filter(|(enrolled_in, _)| *enrolled_in == class_id)
            .map(|(_, s)| s.clone())
            .collect())
    }
}
