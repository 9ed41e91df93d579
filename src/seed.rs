use chrono::NaiveDate;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{Class, Grade, Student};
use crate::store::GradeBook;

const CLASSES: [(&str, i32, &str); 2] = [
    ("class_1", 3, "Grade 3 Class 1"),
    ("class_2", 3, "Grade 3 Class 2"),
];

const STUDENTS: [(&str, &str, &str, &str); 3] = [
    ("student_1", "Avery Lee", "2023001", "class_1"),
    ("student_2", "Jules Moreno", "2023002", "class_1"),
    ("student_3", "Kiara Patel", "2023003", "class_1"),
];

const GRADES: [(&str, &str, &str, f64); 6] = [
    ("grade_1", "student_1", "math", 95.0),
    ("grade_2", "student_1", "chinese", 88.0),
    ("grade_3", "student_1", "english", 92.0),
    ("grade_4", "student_2", "math", 87.0),
    ("grade_5", "student_2", "chinese", 90.0),
    ("grade_6", "student_2", "english", 85.0),
];

/// Sample data set written by `seed`, for Postgres and snapshot files alike.
pub fn sample_book() -> AnalyticsResult<GradeBook> {
    let midterm = NaiveDate::from_ymd_opt(2023, 6, 15)
        .ok_or_else(|| AnalyticsError::InvalidInput("invalid seed exam date".to_string()))?;

    let mut book = GradeBook::new();
    for (id, grade_level, class_name) in CLASSES {
        book.add_class(Class {
            id: id.to_string(),
            grade_level,
            class_name: class_name.to_string(),
        })?;
    }
    for (id, name, student_number, class_id) in STUDENTS {
        book.add_student(Student {
            id: id.to_string(),
            name: name.to_string(),
            student_number: student_number.to_string(),
            class_id: class_id.to_string(),
        })?;
    }
    for (id, student_id, subject, score) in GRADES {
        book.add_grade(Grade {
            id: id.to_string(),
            student_id: student_id.to_string(),
            subject: subject.to_string(),
            score,
            exam_date: midterm,
            exam_name: "midterm".to_string(),
            teacher_id: "teacher".to_string(),
        })?;
    }
    Ok(book)
}

/// Merges the sample data into `book` with the same conflict rules as the
/// Postgres seed: classes are overwritten by id, students and grades that
/// already exist are left alone.
pub fn seed_book(book: &mut GradeBook) -> AnalyticsResult<()> {
    let sample = sample_book()?;

    for class in sample.classes {
        match book.classes.iter_mut().find(|c| c.id == class.id) {
            Some(existing) => *existing = class,
            None => {
                book.add_class(class)?;
            }
        }
    }
    for student in sample.students {
        if book.students.iter().all(|s| s.id != student.id) {
            book.add_student(student)?;
        }
    }
    for grade in sample.grades {
        if book.grades.iter().all(|g| g.id != grade.id) {
            book.add_grade(grade)?;
        }
    }
    tracing::debug!(
        classes = book.classes.len(),
        students = book.students.len(),
        grades = book.grades.len(),
        "seeded grade book"
    );
    Ok(())
}
