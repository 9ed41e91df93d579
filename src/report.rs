use std::fmt::Write;

use crate::aggregate;
use crate::comparison;
use crate::correlation;
use crate::error::{require_non_blank, AnalyticsError, AnalyticsResult};
use crate::models::{
    Class, ClassAggregate, ClassAnalysisReport, ClassComparison, ComparisonReport,
    CorrelationReport, GradeListing, StudentTrend, StudentTrendReport, SubjectCorrelation,
};
use crate::store::GradeStore;
use crate::trend;

pub fn class_report(aggregate: ClassAggregate) -> ClassAnalysisReport {
    ClassAnalysisReport {
        class_info: aggregate.class,
        student_count: aggregate.student_count,
        subject_analysis: aggregate.subjects,
    }
}

pub fn trend_report(trend: StudentTrend) -> StudentTrendReport {
    StudentTrendReport {
        student_info: trend.student,
        subject_trends: trend.subjects,
    }
}

pub fn comparison_report(comparison: ClassComparison) -> ComparisonReport {
    ComparisonReport {
        class_info: comparison.class,
        exam_name: comparison.exam_name,
        class_average: comparison.class_average,
        grade_level_average: comparison.grade_level_average,
        student_count: comparison.student_count,
        above_average_count: comparison.above_average_count,
        below_average_count: comparison.below_average_count,
        student_details: comparison.students,
    }
}

pub fn correlation_report(correlation: SubjectCorrelation) -> CorrelationReport {
    CorrelationReport {
        class_info: correlation.class,
        subject1: correlation.subject1,
        subject2: correlation.subject2,
        correlation: correlation.coefficient,
        student_count: correlation.sample_size,
        interpretation: correlation.interpretation,
    }
}

pub fn analyze_class<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    exam_name: Option<&str>,
) -> AnalyticsResult<ClassAnalysisReport> {
    aggregate::summarize_class(store, class_id, exam_name).map(class_report)
}

pub fn analyze_student<S: GradeStore + ?Sized>(
    store: &S,
    student_id: &str,
) -> AnalyticsResult<StudentTrendReport> {
    trend::student_trend(store, student_id).map(trend_report)
}

pub fn analyze_comparison<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    exam_name: &str,
) -> AnalyticsResult<ComparisonReport> {
    comparison::compare_class(store, class_id, exam_name).map(comparison_report)
}

pub fn analyze_correlation<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    subject1: &str,
    subject2: &str,
) -> AnalyticsResult<CorrelationReport> {
    correlation::correlate_subjects(store, class_id, subject1, subject2).map(correlation_report)
}

/// A class's grades for one exam, each joined with its student's name and number.
pub fn list_exam_grades<S: GradeStore + ?Sized>(
    store: &S,
    class_id: &str,
    exam_name: &str,
) -> AnalyticsResult<Vec<GradeListing>> {
    require_non_blank(class_id, "class id")?;
    require_non_blank(exam_name, "exam name")?;
    if store.get_class(class_id).is_none() {
        return Err(AnalyticsError::class_not_found(class_id));
    }

    Ok(store
        .list_grades_by_class_and_exam(class_id, exam_name)
        .into_iter()
        .filter_map(|grade| {
            let student = store.get_student(&grade.student_id)?;
            Some(GradeListing {
                grade,
                student_name: student.name,
                student_number: student.student_number,
            })
        })
        .collect())
}

fn class_label(report_class: &Class) -> String {
    format!(
        "{} (grade {}, id {})",
        report_class.class_name, report_class.grade_level, report_class.id
    )
}

pub fn render_class_markdown(report: &ClassAnalysisReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Class Analysis");
    let _ = writeln!(
        output,
        "{} with {} enrolled students",
        class_label(&report.class_info),
        report.student_count
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "| Subject | Average | Median | Min | Max | Count |");
    let _ = writeln!(output, "|---|---|---|---|---|---|");
    for (subject, stats) in &report.subject_analysis {
        let _ = writeln!(
            output,
            "| {} | {:.2} | {} | {} | {} | {} |",
            subject, stats.average, stats.median, stats.min, stats.max, stats.count
        );
    }

    output
}

pub fn render_trend_markdown(report: &StudentTrendReport) -> String {
    let mut output = String::new();
    let student = &report.student_info;

    let _ = writeln!(output, "# Student Trend");
    let _ = writeln!(
        output,
        "{} (number {}, class {})",
        student.name, student.student_number, student.class_id
    );
    let _ = writeln!(output);

    if report.subject_trends.is_empty() {
        let _ = writeln!(output, "No subject has two or more exams yet.");
        return output;
    }

    for (subject, trend) in &report.subject_trends {
        let _ = writeln!(output, "## {subject}");
        let _ = writeln!(
            output,
            "- first {} -> last {} (improvement {:.2}, {:.2} per exam)",
            trend.first_score, trend.last_score, trend.improvement, trend.speed
        );
        for grade in &trend.grades {
            let _ = writeln!(
                output,
                "  - {} {}: {}",
                grade.exam_date, grade.exam_name, grade.score
            );
        }
    }

    output
}

pub fn render_comparison_markdown(report: &ComparisonReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Exam Comparison: {}", report.exam_name);
    let _ = writeln!(output, "{}", class_label(&report.class_info));
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Class average {:.2} (grade level {:.2}); {} above, {} below, {} students",
        report.class_average,
        report.grade_level_average,
        report.above_average_count,
        report.below_average_count,
        report.student_count
    );
    let _ = writeln!(output);

    let mut details = report.student_details.clone();
    details.sort_by(|a, b| b.average_score.total_cmp(&a.average_score));
    for detail in &details {
        let _ = writeln!(
            output,
            "- {} ({}): {:.2} ({:+.2} vs class)",
            detail.student_name, detail.student_id, detail.average_score, detail.difference_from_class
        );
    }

    output
}

pub fn render_correlation_markdown(report: &CorrelationReport) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "# Subject Correlation: {} vs {}",
        report.subject1, report.subject2
    );
    let _ = writeln!(output, "{}", class_label(&report.class_info));
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "r = {:.4} across {} students: {}",
        report.correlation, report.student_count, report.interpretation
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures::*;
    use crate::store::GradeBook;

    fn book() -> GradeBook {
        let mut book = book_with_students("c1", &["s1", "s2"]);
        book.add_grade(grade("g1", "s1", "math", 80.0, "2023-01-01", "midterm"))
            .unwrap();
        book.add_grade(grade("g2", "s1", "math", 90.0, "2023-06-01", "final"))
            .unwrap();
        book.add_grade(grade("g3", "s2", "math", 70.0, "2023-01-01", "midterm"))
            .unwrap();
        book.add_grade(grade("g4", "s2", "physics", 65.0, "2023-01-01", "midterm"))
            .unwrap();
        book.add_grade(grade("g5", "s1", "physics", 85.0, "2023-01-01", "midterm"))
            .unwrap();
        book
    }

    #[test]
    fn class_payload_uses_legacy_field_names() {
        let report = analyze_class(&book(), "c1", None).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["class_info"]["class_name"], "Class c1");
        assert_eq!(json["student_count"], 2);
        assert_eq!(json["subject_analysis"]["math"]["median"], 80.0);
        assert_eq!(json["subject_analysis"]["math"]["count"], 2);
    }

    #[test]
    fn trend_payload_carries_student_snapshot() {
        let report = analyze_student(&book(), "s1").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["student_info"]["student_id"], "no-s1");
        assert_eq!(json["subject_trends"]["math"]["improvement"], 10.0);
        assert_eq!(json["subject_trends"]["math"]["grades"][0]["exam_date"], "2023-01-01");
    }

    #[test]
    fn comparison_and_correlation_payloads() {
        let comparison = analyze_comparison(&book(), "c1", "midterm").unwrap();
        let json = serde_json::to_value(&comparison).unwrap();
        assert_eq!(json["student_details"][0]["difference_from_grade"], 7.5);
        assert_eq!(json["above_average_count"], 1);

        let correlation = analyze_correlation(&book(), "c1", "math", "physics").unwrap();
        assert_eq!(correlation.student_count, 2);
        assert_eq!(correlation.correlation, 1.0);
    }

    #[test]
    fn engine_errors_pass_through_unchanged() {
        let book = book();
        let direct = crate::trend::student_trend(&book, "ghost").unwrap_err();
        assert_eq!(analyze_student(&book, "ghost").unwrap_err(), direct);
        assert_eq!(
            analyze_comparison(&book, "c1", "quiz").unwrap_err().kind(),
            "no_data"
        );
    }

    #[test]
    fn exam_listing_joins_student_fields() {
        let listing = list_exam_grades(&book(), "c1", "midterm").unwrap();
        assert_eq!(listing.len(), 4);
        assert_eq!(listing[0].student_name, "Student s1");
        assert_eq!(listing[0].student_number, "no-s1");

        let json = serde_json::to_value(&listing[0]).unwrap();
        assert_eq!(json["subject"], "math");
        assert_eq!(json["student_number"], "no-s1");

        assert!(list_exam_grades(&book(), "c1", "quiz").unwrap().is_empty());
        assert_eq!(
            list_exam_grades(&book(), "ghost", "midterm").unwrap_err().kind(),
            "not_found"
        );
    }

    #[test]
    fn concurrent_readers_share_one_snapshot() {
        let book = book();
        let expected = analyze_class(&book, "c1", None).unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| analyze_class(&book, "c1", None).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    #[test]
    fn markdown_mentions_every_subject() {
        let report = analyze_class(&book(), "c1", None).unwrap();
        let text = render_class_markdown(&report);
        assert!(text.contains("| math |"));
        assert!(text.contains("| physics |"));

        let trend = render_trend_markdown(&analyze_student(&book(), "s1").unwrap());
        assert!(trend.contains("## math"));
        assert!(!trend.contains("## physics"));
    }
}
