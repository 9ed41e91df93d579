use serde::{Deserialize, Serialize};

use crate::error::{require_finite, AnalyticsError, AnalyticsResult};
use crate::models::{Class, Grade, GradeChanges, Student};

/// Read surface the analytics engines consume. Implementations hand back owned
/// values so that one engine call always works on a consistent view.
pub trait GradeStore {
    fn get_class(&self, class_id: &str) -> Option<Class>;
    fn get_student(&self, student_id: &str) -> Option<Student>;
    fn list_students_by_class(&self, class_id: &str) -> Vec<Student>;
    /// Grades for one student in store-native order.
    fn list_grades_by_student(&self, student_id: &str) -> Vec<Grade>;
    fn list_grades_by_class_and_exam(&self, class_id: &str, exam_name: &str) -> Vec<Grade>;
}

/// In-memory data set. Every collection keeps insertion order, which is the
/// store-native order the engines rely on for tie-breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeBook {
    #[serde(default)]
    pub classes: Vec<Class>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub grades: Vec<Grade>,
}

impl GradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: Class) -> AnalyticsResult<&Class> {
        if self.classes.iter().any(|c| c.id == class.id) {
            return Err(AnalyticsError::InvalidInput(format!(
                "class {} already exists",
                class.id
            )));
        }
        self.classes.push(class);
        Ok(&self.classes[self.classes.len() - 1])
    }

    pub fn add_student(&mut self, student: Student) -> AnalyticsResult<&Student> {
        if !self.classes.iter().any(|c| c.id == student.class_id) {
            return Err(AnalyticsError::class_not_found(&student.class_id));
        }
        if self.students.iter().any(|s| s.id == student.id) {
            return Err(AnalyticsError::InvalidInput(format!(
                "student {} already exists",
                student.id
            )));
        }
        if self
            .students
            .iter()
            .any(|s| s.student_number == student.student_number)
        {
            return Err(AnalyticsError::InvalidInput(format!(
                "student number {} already in use",
                student.student_number
            )));
        }
        self.students.push(student);
        Ok(&self.students[self.students.len() - 1])
    }

    /// Returns the student with `student_id`, creating it in `class_id` when absent.
    pub fn ensure_student(
        &mut self,
        student_id: &str,
        name: &str,
        class_id: &str,
    ) -> AnalyticsResult<&Student> {
        match self.students.iter().position(|s| s.id == student_id) {
            Some(index) => Ok(&self.students[index]),
            None => self.add_student(Student {
                id: student_id.to_string(),
                name: name.to_string(),
                student_number: student_id.to_string(),
                class_id: class_id.to_string(),
            }),
        }
    }

    pub fn add_grade(&mut self, grade: Grade) -> AnalyticsResult<&Grade> {
        if !self.students.iter().any(|s| s.id == grade.student_id) {
            return Err(AnalyticsError::student_not_found(&grade.student_id));
        }
        require_finite(&grade)?;
        if self.grades.iter().any(|g| g.id == grade.id) {
            return Err(AnalyticsError::InvalidInput(format!(
                "grade {} already exists",
                grade.id
            )));
        }
        self.grades.push(grade);
        Ok(&self.grades[self.grades.len() - 1])
    }

    pub fn update_grade(&mut self, grade_id: &str, changes: GradeChanges) -> AnalyticsResult<&Grade> {
        if let Some(score) = changes.score {
            if !score.is_finite() {
                return Err(AnalyticsError::InvalidInput(
                    "score is not a finite number".to_string(),
                ));
            }
        }
        let grade = self
            .grades
            .iter_mut()
            .find(|g| g.id == grade_id)
            .ok_or_else(|| AnalyticsError::NotFound {
                entity: "Grade",
                id: grade_id.to_string(),
            })?;

        if let Some(subject) = changes.subject {
            grade.subject = subject;
        }
        if let Some(score) = changes.score {
            grade.score = score;
        }
        if let Some(exam_date) = changes.exam_date {
            grade.exam_date = exam_date;
        }
        if let Some(exam_name) = changes.exam_name {
            grade.exam_name = exam_name;
        }
        Ok(&*grade)
    }

    pub fn delete_grade(&mut self, grade_id: &str) -> Option<Grade> {
        let index = self.grades.iter().position(|g| g.id == grade_id)?;
        Some(self.grades.remove(index))
    }

    /// Checks referential integrity of a data set loaded from outside, e.g. a
    /// JSON snapshot file.
    pub fn validate(&self) -> AnalyticsResult<()> {
        for student in &self.students {
            if !self.classes.iter().any(|c| c.id == student.class_id) {
                return Err(AnalyticsError::InvalidInput(format!(
                    "student {} references unknown class {}",
                    student.id, student.class_id
                )));
            }
        }
        for grade in &self.grades {
            if !self.students.iter().any(|s| s.id == grade.student_id) {
                return Err(AnalyticsError::InvalidInput(format!(
                    "grade {} references unknown student {}",
                    grade.id, grade.student_id
                )));
            }
            require_finite(grade)?;
        }
        Ok(())
    }
}

impl GradeStore for GradeBook {
    fn get_class(&self, class_id: &str) -> Option<Class> {
        self.classes.iter().find(|c| c.id == class_id).cloned()
    }

    fn get_student(&self, student_id: &str) -> Option<Student> {
        self.students.iter().find(|s| s.id == student_id).cloned()
    }

    fn list_students_by_class(&self, class_id: &str) -> Vec<Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect()
    }

    fn list_grades_by_student(&self, student_id: &str) -> Vec<Grade> {
        self.grades
            .iter()
            .filter(|g| g.student_id == student_id)
            .cloned()
            .collect()
    }

    fn list_grades_by_class_and_exam(&self, class_id: &str, exam_name: &str) -> Vec<Grade> {
        let student_ids: std::collections::HashSet<&str> = self
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id.as_str())
            .collect();

        self.grades
            .iter()
            .filter(|g| student_ids.contains(g.student_id.as_str()) && g.exam_name == exam_name)
            .cloned()
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn students_require_existing_class() {
        let mut book = GradeBook::new();
        let err = book.add_student(student("s1", "missing")).unwrap_err();
        assert_eq!(err, AnalyticsError::class_not_found("missing"));
    }

    #[test]
    fn grades_require_existing_student_and_finite_score() {
        let mut book = book_with_students("c1", &["s1"]);
        assert!(book
            .add_grade(grade("g1", "ghost", "math", 80.0, "2023-01-01", "midterm"))
            .is_err());
        let err = book
            .add_grade(grade("g2", "s1", "math", f64::NAN, "2023-01-01", "midterm"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[test]
    fn class_and_exam_listing_scopes_to_class() {
        let mut book = book_with_students("c1", &["s1", "s2"]);
        book.add_class(class("c2")).unwrap();
        book.add_student(student("s3", "c2")).unwrap();
        book.add_grade(grade("g1", "s1", "math", 90.0, "2023-06-15", "midterm"))
            .unwrap();
        book.add_grade(grade("g2", "s2", "math", 80.0, "2023-06-15", "final"))
            .unwrap();
        book.add_grade(grade("g3", "s3", "math", 70.0, "2023-06-15", "midterm"))
            .unwrap();

        let grades = book.list_grades_by_class_and_exam("c1", "midterm");
        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].id, "g1");
    }

    #[test]
    fn update_and_delete_grade() {
        let mut book = book_with_students("c1", &["s1"]);
        book.add_grade(grade("g1", "s1", "math", 80.0, "2023-01-01", "midterm"))
            .unwrap();

        let updated = book
            .update_grade(
                "g1",
                GradeChanges {
                    score: Some(85.5),
                    ..GradeChanges::default()
                },
            )
            .unwrap();
        assert_eq!(updated.score, 85.5);
        assert_eq!(updated.subject, "math");

        assert!(book.delete_grade("g1").is_some());
        assert!(book.delete_grade("g1").is_none());
        assert!(book.update_grade("g1", GradeChanges::default()).is_err());
    }

    #[test]
    fn ensure_student_creates_once() {
        let mut book = book_with_students("c1", &[]);
        book.ensure_student("2023001", "Avery", "c1").unwrap();
        book.ensure_student("2023001", "Renamed", "c1").unwrap();
        assert_eq!(book.students.len(), 1);
        assert_eq!(book.students[0].name, "Avery");
        assert_eq!(book.students[0].student_number, "2023001");
    }

    #[test]
    fn validate_flags_dangling_references() {
        let mut book = book_with_students("c1", &["s1"]);
        assert!(book.validate().is_ok());
        book.grades
            .push(grade("g1", "ghost", "math", 1.0, "2023-01-01", "midterm"));
        assert!(book.validate().is_err());
    }

    #[test]
    fn validate_flags_non_finite_scores() {
        let mut book = book_with_students("c1", &["s1"]);
        book.grades
            .push(grade("g1", "s1", "math", f64::NAN, "2023-01-01", "midterm"));
        let err = book.validate().unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(err.to_string().contains("non-finite"));
    }
}
