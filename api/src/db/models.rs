use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Kind of evaluation. Descriptive only, never used in averaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "grade_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradeType {
    Homework,
    Exam,
    Project,
    Presentation,
    Participation,
}

/// Lifecycle tag of a report. Only read by presentation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "report_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    #[default]
    Draft,
    Published,
}

/// Subject reference data.
#[derive(Debug, Clone, FromRow)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    /// Weight of this subject within a general average (> 0).
    pub coefficient: Decimal,
    pub color: Option<String>,
}

/// A single scored evaluation. Immutable once inserted.
#[derive(Debug, Clone, FromRow)]
pub struct Grade {
    pub id: Uuid,
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
    pub created_at: DateTime<Utc>,
}

/// Persisted bulletin snapshot for one student and one reporting period.
///
/// Grades are not linked by foreign key; they are selected at read time by
/// the calendar year of `year`.
#[derive(Debug, Clone, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub semester: String,
    pub year: String,
    /// Frozen general average. `None` means recompute from live grades.
    pub average: Option<Decimal>,
    pub rank: Option<i32>,
    pub total_students: Option<i32>,
    pub appreciation: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
}

/// Student name and class, for the bulletin header.
#[derive(Debug, Clone, FromRow)]
pub struct StudentIdentity {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub class_name: Option<String>,
}

impl StudentIdentity {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
