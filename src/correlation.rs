use crate::error::{require_finite, require_non_blank, AnalyticsError, AnalyticsResult};
use crate::models::SubjectCorrelation;
use crate::stats;
use crate::store::GradeStore;

/// Pearson correlation between two subjects across a class.
///
/// Each student contributes the first grade per subject in store order, and
/// only students holding both subjects are sampled.
pub fn correlate_subjects<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    subject1: &str,
    subject2: &str,
) -> AnalyticsResult<SubjectCorrelation> {
    require_non_blank(class_id, "class id")?;
    require_non_blank(subject1, "subject1")?;
    require_non_blank(subject2, "subject2")?;
    if subject1 == subject2 {
        return Err(AnalyticsError::InvalidInput(format!(
            "cannot correlate subject {subject1} with itself"
        )));
    }
    tracing::debug!(class_id, subject1, subject2, "correlating subjects");

    let class = store
        .get_class(class_id)
        .ok_or_else(|| AnalyticsError::class_not_found(class_id))?;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for student in store.list_students_by_class(class_id) {
        let grades = store.list_grades_by_student(&student.id);
        for grade in &grades {
            require_finite(grade)?;
        }
        let first = |subject: &str| grades.iter().find(|g| g.subject == subject).map(|g| g.score);
        if let (Some(x), Some(y)) = (first(subject1), first(subject2)) {
            xs.push(x);
            ys.push(y);
        }
    }

    if xs.is_empty() {
        return Err(AnalyticsError::NoData(format!(
            "no students in class {class_id} have grades in both {subject1} and {subject2}"
        )));
    }

    let coefficient = stats::pearson(&xs, &ys);
    Ok(SubjectCorrelation {
        class,
        subject1: subject1.to_string(),
        subject2: subject2.to_string(),
        coefficient: stats::round4(coefficient),
        sample_size: xs.len(),
        interpretation: interpret(coefficient),
    })
}

pub fn strength_label(coefficient: f64) -> &'static str {
    match coefficient.abs() {
        r if r >= 0.9 => "very strong",
        r if r >= 0.7 => "strong",
        r if r >= 0.5 => "moderate",
        r if r >= 0.3 => "weak",
        _ => "very weak",
    }
}

pub fn direction_label(coefficient: f64) -> &'static str {
    if coefficient > 0.0 {
        "positive correlation"
    } else if coefficient < 0.0 {
        "negative correlation"
    } else {
        "no correlation"
    }
}

pub fn interpret(coefficient: f64) -> String {
    format!(
        "{} {}",
        strength_label(coefficient),
        direction_label(coefficient)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::*;
    use crate::store::GradeBook;

    fn book_with_pairs(pairs: &[(f64, f64)]) -> GradeBook {
        let ids: Vec<String> = (0..pairs.len()).map(|i| format!("s{i}")).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut book = book_with_students("c1", &refs);
        for (i, (x, y)) in pairs.iter().enumerate() {
            let student = format!("s{i}");
            book.add_grade(grade(&format!("m{i}"), &student, "math", *x, "2023-06-15", "midterm"))
                .unwrap();
            book.add_grade(grade(&format!("p{i}"), &student, "physics", *y, "2023-06-15", "midterm"))
                .unwrap();
        }
        book
    }

    #[test]
    fn perfectly_linear_is_very_strong_positive() {
        let book = book_with_pairs(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]);
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.coefficient, 1.0);
        assert_eq!(result.sample_size, 3);
        assert_eq!(result.interpretation, "very strong positive correlation");
    }

    #[test]
    fn constant_series_saturates_to_zero() {
        let book = book_with_pairs(&[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0)]);
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.coefficient, 0.0);
        assert_eq!(result.interpretation, "very weak no correlation");
    }

    #[test]
    fn constant_fractional_scores_have_no_direction() {
        let book = book_with_pairs(&[(61.0, 80.34), (77.5, 80.34), (90.0, 80.34)]);
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.coefficient, 0.0);
        assert_eq!(result.interpretation, "very weak no correlation");
    }

    #[test]
    fn non_finite_snapshot_score_is_invalid_input() {
        let mut book = book_with_pairs(&[(1.0, 2.0), (2.0, 4.0)]);
        book.grades
            .push(grade("p-bad", "s1", "physics", f64::INFINITY, "2023-07-01", "final"));
        let err = correlate_subjects(&book, "c1", "math", "physics").unwrap_err();
        assert_eq!(err, AnalyticsError::InvalidInput("grade p-bad has a non-finite score".into()));
    }

    #[test]
    fn single_student_sample_is_zero() {
        let book = book_with_pairs(&[(80.0, 90.0)]);
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.coefficient, 0.0);
        assert_eq!(result.sample_size, 1);
    }

    #[test]
    fn first_grade_in_store_order_is_used() {
        let mut book = book_with_pairs(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]);
        // later re-entry for s0 must not replace the first math grade
        book.add_grade(grade("m-late", "s0", "math", 100.0, "2024-01-01", "final"))
            .unwrap();
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.coefficient, 1.0);
    }

    #[test]
    fn students_missing_a_subject_are_excluded() {
        let mut book = book_with_pairs(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]);
        book.add_student(student("solo", "c1")).unwrap();
        book.add_grade(grade("m-solo", "solo", "math", 50.0, "2023-06-15", "midterm"))
            .unwrap();
        let result = correlate_subjects(&book, "c1", "math", "physics").unwrap();
        assert_eq!(result.sample_size, 3);
    }

    #[test]
    fn labels_follow_thresholds() {
        assert_eq!(interpret(0.95), "very strong positive correlation");
        assert_eq!(interpret(-0.75), "strong negative correlation");
        assert_eq!(interpret(0.5), "moderate positive correlation");
        assert_eq!(interpret(-0.3), "weak negative correlation");
        assert_eq!(interpret(0.1), "very weak positive correlation");
        assert_eq!(interpret(0.0), "very weak no correlation");
    }

    #[test]
    fn error_kinds() {
        let book = book_with_pairs(&[(1.0, 2.0)]);
        assert_eq!(
            correlate_subjects(&book, "ghost", "math", "physics").unwrap_err().kind(),
            "not_found"
        );
        assert_eq!(
            correlate_subjects(&book, "c1", "math", "art").unwrap_err().kind(),
            "no_data"
        );
        assert_eq!(
            correlate_subjects(&book, "c1", "math", "math").unwrap_err().kind(),
            "invalid_input"
        );
    }
}
