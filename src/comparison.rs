use std::collections::HashMap;

use crate::error::{require_finite, require_non_blank, AnalyticsError, AnalyticsResult};
use crate::models::{ClassComparison, StudentComparison};
use crate::stats;
use crate::store::GradeStore;

/// How each student did on one exam relative to the class mean.
///
/// The class average blends every matching score across subjects. The
/// grade-level average has no multi-class rollup behind it and equals the
/// class average.
pub fn compare_class<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    exam_name: &str,
) -> AnalyticsResult<ClassComparison> {
    require_non_blank(class_id, "class id")?;
    require_non_blank(exam_name, "exam name")?;
    tracing::debug!(class_id, exam_name, "comparing class");

    let class = store
        .get_class(class_id)
        .ok_or_else(|| AnalyticsError::class_not_found(class_id))?;
    let grades = store.list_grades_by_class_and_exam(class_id, exam_name);
    if grades.is_empty() {
        return Err(AnalyticsError::NoData(format!(
            "no grades found for class {class_id} and exam {exam_name}"
        )));
    }

    // first-appearance order of students in the grade listing
    let mut per_student: Vec<(String, Vec<f64>)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut all_scores = Vec::with_capacity(grades.len());
    for grade in &grades {
        require_finite(grade)?;
        all_scores.push(grade.score);
        let slot = *slots.entry(grade.student_id.as_str()).or_insert_with(|| {
            per_student.push((grade.student_id.clone(), Vec::new()));
            per_student.len() - 1
        });
        per_student[slot].1.push(grade.score);
    }

    let class_average = stats::mean(&all_scores).unwrap_or(0.0);
    let grade_level_average = class_average;

    let averages: Vec<(String, f64)> = per_student
        .into_iter()
        .map(|(id, scores)| {
            let average = stats::mean(&scores).unwrap_or(0.0);
            (id, average)
        })
        .collect();

    let above_average_count = averages.iter().filter(|(_, a)| *a > class_average).count();
    let below_average_count = averages.iter().filter(|(_, a)| *a < class_average).count();

    let students: Vec<StudentComparison> = averages
        .iter()
        .filter_map(|(id, average)| {
            let student = store.get_student(id)?;
            Some(StudentComparison {
                student_id: student.id,
                student_name: student.name,
                average_score: stats::round2(*average),
                difference_from_class: stats::round2(average - class_average),
                difference_from_grade: stats::round2(average - grade_level_average),
            })
        })
        .collect();

    Ok(ClassComparison {
        class,
        exam_name: exam_name.to_string(),
        class_average: stats::round2(class_average),
        grade_level_average: stats::round2(grade_level_average),
        student_count: averages.len(),
        above_average_count,
        below_average_count,
        students,
    })
}
