//! Builders for in-memory test data.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::db::models::{Grade, GradeType, Report, ReportStatus, StudentIdentity, Subject};

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap()
}

pub fn subject(name: &str, code: &str, coefficient: &str) -> Subject {
    Subject {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: code.to_string(),
        coefficient: dec(coefficient),
        color: Some("#3366ff".to_string()),
    }
}

pub fn student(first_name: &str, last_name: &str) -> StudentIdentity {
    StudentIdentity {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        class_name: Some("L3 Informatique".to_string()),
    }
}

/// A grade for an anonymous student, created in mid-2024.
pub fn grade(subject_id: Uuid, value: &str, max_value: &str, weight: &str) -> Grade {
    Grade {
        id: Uuid::new_v4(),
        student_id: Uuid::nil(),
        teacher_id: Uuid::nil(),
        subject_id,
        class_id: Uuid::nil(),
        value: dec(value),
        max_value: dec(max_value),
        weight: dec(weight),
        grade_type: GradeType::Exam,
        title: "Contrôle".to_string(),
        description: None,
        created_at: at(2024, 5, 15),
    }
}

pub fn grade_for(
    student_id: Uuid,
    subject_id: Uuid,
    value: &str,
    created_at: DateTime<Utc>,
) -> Grade {
    Grade {
        student_id,
        created_at,
        ..grade(subject_id, value, "20", "1")
    }
}

pub fn report(student_id: Uuid, class_id: Uuid, semester: &str, year: &str) -> Report {
    Report {
        id: Uuid::new_v4(),
        student_id,
        class_id,
        semester: semester.to_string(),
        year: year.to_string(),
        average: None,
        rank: None,
        total_students: None,
        appreciation: None,
        status: ReportStatus::Draft,
        created_at: at(2024, 12, 20),
    }
}
