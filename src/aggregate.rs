use std::collections::BTreeMap;

use crate::error::{require_finite, require_non_blank, AnalyticsError, AnalyticsResult};
use crate::models::{ClassAggregate, Grade, SubjectStats};
use crate::stats;
use crate::store::GradeStore;

/// Per-subject statistics for a class over each student's latest grade.
///
/// When `exam_name` is given only that exam's grades are considered before the
/// latest-grade collapse.
pub fn summarize_class<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    exam_name: Option<&str>,
) -> AnalyticsResult<ClassAggregate> {
    require_non_blank(class_id, "class id")?;
    if let Some(exam) = exam_name {
        require_non_blank(exam, "exam name")?;
    }
    tracing::debug!(class_id, ?exam_name, "summarizing class");

    let class = store
        .get_class(class_id)
        .ok_or_else(|| AnalyticsError::class_not_found(class_id))?;
    let students = store.list_students_by_class(class_id);
    if students.is_empty() {
        return Err(AnalyticsError::NotFound {
            entity: "Students in class",
            id: class_id.to_string(),
        });
    }

    let mut subject_scores: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for student in &students {
        let grades: Vec<Grade> = store
            .list_grades_by_student(&student.id)
            .into_iter()
            .filter(|g| exam_name.map_or(true, |exam| g.exam_name == exam))
            .collect();

        for (subject, grade) in latest_by_subject(&grades)? {
            subject_scores
                .entry(subject.to_string())
                .or_default()
                .push(grade.score);
        }
    }

    let subjects: BTreeMap<String, SubjectStats> = subject_scores
        .into_iter()
        .filter_map(|(subject, scores)| subject_stats(&scores).map(|s| (subject, s)))
        .collect();

    if subjects.is_empty() {
        return Err(AnalyticsError::NoData(format!(
            "no grades recorded for class {class_id}"
        )));
    }

    Ok(ClassAggregate {
        class,
        student_count: students.len(),
        subjects,
    })
}

/// Picks one grade per subject: the greatest `exam_date`, with the record
/// later in store order winning on equal dates.
pub fn latest_by_subject(grades: &[Grade]) -> AnalyticsResult<BTreeMap<&str, &Grade>> {
    let mut latest: BTreeMap<&str, &Grade> = BTreeMap::new();
    for grade in grades {
        require_finite(grade)?;
        match latest.get(grade.subject.as_str()) {
            Some(current) if current.exam_date > grade.exam_date => {}
            _ => {
                latest.insert(grade.subject.as_str(), grade);
            }
        }
    }
    Ok(latest)
}

fn subject_stats(scores: &[f64]) -> Option<SubjectStats> {
    let average = stats::mean(scores)?;
    let median = stats::median(scores)?;
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Some(SubjectStats {
        average: stats::round2(average),
        median,
        min,
        max,
        count: scores.len(),
    })
}
