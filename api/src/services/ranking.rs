//! Class rank placement for one reporting period.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::helpers::f64_to_decimal_2dp;

/// A student's placement within their class.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub student_id: Uuid,
    pub general_average: f64,
    /// The general average as frozen in the report (2 decimals).
    pub rounded_average: Decimal,
    /// 1-based competition rank ("1224").
    pub rank: i32,
    pub total_students: i32,
}

/// Rank students by general average, best first.
///
/// Averages are compared after rounding to two decimals so that students
/// showing the same average on their bulletin share a rank; the following
/// rank is skipped. Ties are listed by student id.
pub fn rank_students(averages: &[(Uuid, f64)]) -> Vec<Placement> {
    let total_students = averages.len() as i32;

    let mut entries: Vec<(Uuid, f64, Decimal)> = averages
        .iter()
        .map(|&(student_id, avg)| (student_id, avg, f64_to_decimal_2dp(avg)))
        .collect();
    entries.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    let mut placements = Vec::with_capacity(entries.len());
    let mut previous: Option<(Decimal, i32)> = None;
    for (position, (student_id, general_average, rounded_average)) in entries.into_iter().enumerate()
    {
        let rank = match previous {
            Some((prev_avg, prev_rank)) if prev_avg == rounded_average => prev_rank,
            _ => position as i32 + 1,
        };
        previous = Some((rounded_average, rank));
        placements.push(Placement {
            student_id,
            general_average,
            rounded_average,
            rank,
            total_students,
        });
    }
    placements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::dec;

    fn ids(n: usize) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = (0..n).map(|_| Uuid::new_v4()).collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank_students(&[]).is_empty());
    }

    #[test]
    fn test_rank_orders_best_first() {
        let s = ids(3);
        let placements = rank_students(&[(s[0], 11.0), (s[1], 17.25), (s[2], 14.5)]);
        let order: Vec<(Uuid, i32)> = placements.iter().map(|p| (p.student_id, p.rank)).collect();
        assert_eq!(order, vec![(s[1], 1), (s[2], 2), (s[0], 3)]);
        assert!(placements.iter().all(|p| p.total_students == 3));
    }

    #[test]
    fn test_rank_ties_share_and_skip() {
        let s = ids(4);
        let placements = rank_students(&[
            (s[0], 12.0),
            (s[1], 15.0),
            (s[2], 15.0),
            (s[3], 9.0),
        ]);
        let ranks: Vec<i32> = placements.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 1, 3, 4]);
        // Tied students listed by id
        assert_eq!(placements[0].student_id, s[1]);
        assert_eq!(placements[1].student_id, s[2]);
    }

    #[test]
    fn test_rank_ties_on_displayed_precision() {
        // 14.333.. and 14.331 both display as 14.33
        let s = ids(2);
        let placements = rank_students(&[(s[0], 43.0 / 3.0), (s[1], 14.331)]);
        assert_eq!(placements[0].rank, 1);
        assert_eq!(placements[1].rank, 1);
        assert_eq!(placements[0].rounded_average, dec("14.33"));
    }

    #[test]
    fn test_rank_zero_average_students_are_ranked() {
        let s = ids(3);
        let placements = rank_students(&[(s[0], 0.0), (s[1], 10.0), (s[2], 0.0)]);
        let ranks: Vec<i32> = placements.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2]);
        assert_eq!(placements[2].rounded_average, Decimal::ZERO);
    }

    #[test]
    fn test_rank_keeps_unrounded_average() {
        let s = ids(1);
        let placements = rank_students(&[(s[0], 121.5 / 7.0)]);
        assert!((placements[0].general_average - 121.5 / 7.0).abs() < 1e-12);
        assert_eq!(placements[0].rounded_average, dec("17.36"));
        assert_eq!(placements[0].rank, 1);
        assert_eq!(placements[0].total_students, 1);
    }
}
