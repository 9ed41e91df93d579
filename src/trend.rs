use std::collections::BTreeMap;

use crate::error::{require_finite, require_non_blank, AnalyticsError, AnalyticsResult};
use crate::models::{Grade, StudentTrend, SubjectTrend};
use crate::stats;
use crate::store::GradeStore;

/// Chronological score history per subject for one student.
///
/// Subjects with a single grade carry no trend and are left out. `speed` is the
/// improvement divided by the number of exams in the sequence, a per-measurement
/// proxy rather than a rate over time.
pub fn student_trend<S: GradeStore + ?Sized>(
    store: &S,
    student_id: &str,
) -> AnalyticsResult<StudentTrend> {
    require_non_blank(student_id, "student id")?;
    tracing::debug!(student_id, "computing student trend");

    let student = store
        .get_student(student_id)
        .ok_or_else(|| AnalyticsError::student_not_found(student_id))?;
    let grades = store.list_grades_by_student(student_id);
    if grades.is_empty() {
        return Err(AnalyticsError::NoData(format!(
            "no grades found for student {student_id}"
        )));
    }

    let mut by_subject: BTreeMap<String, Vec<Grade>> = BTreeMap::new();
    for grade in grades {
        require_finite(&grade)?;
        by_subject.entry(grade.subject.clone()).or_default().push(grade);
    }

    let subjects = by_subject
        .into_iter()
        .filter_map(|(subject, mut history)| {
            // stable: equal dates keep store order
            history.sort_by(|a, b| a.exam_date.cmp(&b.exam_date));
            subject_trend(history).map(|trend| (subject, trend))
        })
        .collect();

    Ok(StudentTrend { student, subjects })
}

fn subject_trend(history: Vec<Grade>) -> Option<SubjectTrend> {
    if history.len() < 2 {
        return None;
    }
    let first_score = history.first()?.score;
    let last_score = history.last()?.score;
    let improvement = last_score - first_score;
    let speed = improvement / history.len() as f64;

    Some(SubjectTrend {
        grades: history,
        improvement: stats::round2(improvement),
        speed: stats::round2(speed),
        first_score,
        last_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::*;

    #[test]
    fn two_exams_give_improvement_and_speed() {
        let mut book = book_with_students("c1", &["s1"]);
        book.add_grade(grade("g2", "s1", "math", 90.0, "2023-02-01", "final"))
            .unwrap();
        book.add_grade(grade("g1", "s1", "math", 80.0, "2023-01-01", "midterm"))
            .unwrap();

        let trend = student_trend(&book, "s1").unwrap();
        let math = &trend.subjects["math"];
        assert_eq!(math.improvement, 10.0);
        assert_eq!(math.speed, 5.0);
        assert_eq!(math.first_score, 80.0);
        assert_eq!(math.last_score, 90.0);
        assert_eq!(math.grades[0].exam_name, "midterm");
        assert_eq!(math.grades[1].exam_name, "final");
    }

    #[test]
    fn declining_scores_give_negative_improvement() {
        let mut book = book_with_students("c1", &["s1"]);
        for (id, score, date) in [
            ("g1", 90.0, "2023-01-01"),
            ("g2", 85.0, "2023-02-01"),
            ("g3", 80.0, "2023-03-01"),
        ] {
            book.add_grade(grade(id, "s1", "english", score, date, "monthly"))
                .unwrap();
        }
        let trend = student_trend(&book, "s1").unwrap();
        let english = &trend.subjects["english"];
        assert_eq!(english.improvement, -10.0);
        assert_eq!(english.speed, -3.33);
    }

    #[test]
    fn single_grade_subjects_are_skipped() {
        let mut book = book_with_students("c1", &["s1"]);
        book.add_grade(grade("g1", "s1", "math", 80.0, "2023-01-01", "midterm"))
            .unwrap();
        book.add_grade(grade("g2", "s1", "math", 82.0, "2023-02-01", "final"))
            .unwrap();
        book.add_grade(grade("g3", "s1", "art", 70.0, "2023-01-01", "midterm"))
            .unwrap();

        let trend = student_trend(&book, "s1").unwrap();
        assert!(trend.subjects.contains_key("math"));
        assert!(!trend.subjects.contains_key("art"));
    }

    #[test]
    fn equal_dates_keep_store_order() {
        let mut book = book_with_students("c1", &["s1"]);
        book.add_grade(grade("g1", "s1", "math", 70.0, "2023-01-01", "first"))
            .unwrap();
        book.add_grade(grade("g2", "s1", "math", 75.0, "2023-01-01", "second"))
            .unwrap();

        let trend = student_trend(&book, "s1").unwrap();
        let math = &trend.subjects["math"];
        assert_eq!(math.first_score, 70.0);
        assert_eq!(math.last_score, 75.0);
    }

    #[test]
    fn non_finite_snapshot_score_is_invalid_input() {
        let mut book = book_with_students("c1", &["s1"]);
        book.add_grade(grade("g1", "s1", "math", 70.0, "2023-01-01", "midterm"))
            .unwrap();
        book.grades
            .push(grade("g2", "s1", "math", f64::INFINITY, "2023-06-01", "final"));

        let err = student_trend(&book, "s1").unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("g2"));
    }

    #[test]
    fn missing_student_and_empty_history() {
        let book = book_with_students("c1", &["s1"]);
        assert_eq!(student_trend(&book, "ghost").unwrap_err().kind(), "not_found");
        assert_eq!(student_trend(&book, "s1").unwrap_err().kind(), "no_data");
        assert_eq!(student_trend(&book, "").unwrap_err().kind(), "invalid_input");
    }
}
