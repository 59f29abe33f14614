//! Grade aggregation: per-subject weighted averages and the
//! coefficient-weighted general average.
//!
//! Every grade is rescaled to a 0–20 scale before weighting, so grades out of
//! 10, 20 or 100 mix freely within a subject. All functions here are pure.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::models::{Grade, Subject};
use crate::db::queries::GradeFilter;
use crate::helpers::dec_to_f64;

/// Common scale every grade is normalized to.
pub const SCORE_SCALE: f64 = 20.0;

/// Normalized average of one subject for one student and period.
#[derive(Debug, Clone)]
pub struct SubjectAverage {
    pub subject: Subject,
    pub grades: Vec<Grade>,
    /// Weighted mean on the 0–20 scale.
    pub average: f64,
    /// `average × subject.coefficient`
    pub weighted_average: f64,
}

impl SubjectAverage {
    pub fn coefficient(&self) -> f64 {
        dec_to_f64(self.subject.coefficient)
    }
}

/// Rescale a raw score to the 0–20 scale: `(value / max_value) × 20`.
pub fn normalized_score(value: f64, max_value: f64) -> f64 {
    (value / max_value) * SCORE_SCALE
}

/// Reduce one subject's grades to a weighted average.
///
/// `average = Σ(normalized_i × weight_i) / Σ(weight_i)`. When the weights sum
/// to zero (no grades, or only zero-weight grades) the average is `0`.
pub fn subject_average(subject: &Subject, grades: Vec<Grade>) -> SubjectAverage {
    let (weighted_sum, weight_total) = grades.iter().fold((0.0, 0.0), |(sum, total), g| {
        let weight = dec_to_f64(g.weight);
        let normalized = normalized_score(dec_to_f64(g.value), dec_to_f64(g.max_value));
        (sum + normalized * weight, total + weight)
    });

    let average = if weight_total > 0.0 {
        weighted_sum / weight_total
    } else {
        0.0
    };
    let weighted_average = average * dec_to_f64(subject.coefficient);

    SubjectAverage {
        subject: subject.clone(),
        grades,
        average,
        weighted_average,
    }
}

/// Group a student's grades by subject and average each group.
///
/// Only subjects with at least one grade appear. Grades whose subject is not
/// in `subjects` are dropped. Output is ordered by subject name, then code.
pub fn subject_averages(grades: Vec<Grade>, subjects: &HashMap<Uuid, Subject>) -> Vec<SubjectAverage> {
    let mut by_subject: HashMap<Uuid, Vec<Grade>> = HashMap::new();
    for grade in grades {
        by_subject.entry(grade.subject_id).or_default().push(grade);
    }

    let mut averages: Vec<SubjectAverage> = by_subject
        .into_iter()
        .filter_map(|(subject_id, grades)| match subjects.get(&subject_id) {
            Some(subject) => Some(subject_average(subject, grades)),
            None => {
                tracing::warn!(
                    "Skipping {} grade(s) for unknown subject {}",
                    grades.len(),
                    subject_id
                );
                None
            }
        })
        .collect();

    averages.sort_by(|a, b| {
        a.subject
            .name
            .cmp(&b.subject.name)
            .then_with(|| a.subject.code.cmp(&b.subject.code))
    });
    averages
}

/// Coefficient-weighted mean of subject averages.
///
/// `Σ weighted_average / Σ coefficient`, or `0` when the coefficients sum to
/// zero (which includes the empty set).
pub fn general_average(subjects: &[SubjectAverage]) -> f64 {
    let total_coefficient: f64 = subjects.iter().map(SubjectAverage::coefficient).sum();
    if total_coefficient <= 0.0 {
        return 0.0;
    }
    let points: f64 = subjects.iter().map(|s| s.weighted_average).sum();
    points / total_coefficient
}

/// Calendar-year window a report's grades are drawn from:
/// `[year-01-01T00:00:00Z, (year+1)-01-01T00:00:00Z)`.
///
/// The semester label plays no part in the window, so two reports of the
/// same year see the same grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl YearWindow {
    /// Parse a report year label such as `"2024"`.
    pub fn for_label(year: &str) -> Option<Self> {
        let year: i32 = year.trim().parse().ok()?;
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
        let end = Utc
            .with_ymd_and_hms(year.checked_add(1)?, 1, 1, 0, 0, 0)
            .single()?;
        Some(Self { start, end })
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t < self.end
    }

    pub fn grade_filter(&self) -> GradeFilter {
        GradeFilter {
            subject_id: None,
            created_from: Some(self.start),
            created_before: Some(self.end),
        }
    }
}
