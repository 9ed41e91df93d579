use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub grade_level: i32,
    pub class_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    /// External student number, serialized under the legacy `student_id` key.
    #[serde(rename = "student_id")]
    pub student_number: String,
    pub class_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub id: String,
    pub student_id: String,
    pub subject: String,
    pub score: f64,
    pub exam_date: NaiveDate,
    pub exam_name: String,
    pub teacher_id: String,
}

/// Partial update applied by `update-grade`; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct GradeChanges {
    pub subject: Option<String>,
    pub score: Option<f64>,
    pub exam_date: Option<NaiveDate>,
    pub exam_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassAggregate {
    pub class: Class,
    pub student_count: usize,
    pub subjects: BTreeMap<String, SubjectStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectTrend {
    pub grades: Vec<Grade>,
    pub improvement: f64,
    pub speed: f64,
    pub first_score: f64,
    pub last_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentTrend {
    pub student: Student,
    pub subjects: BTreeMap<String, SubjectTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentComparison {
    pub student_id: String,
    pub student_name: String,
    pub average_score: f64,
    pub difference_from_class: f64,
    pub difference_from_grade: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassComparison {
    pub class: Class,
    pub exam_name: String,
    pub class_average: f64,
    pub grade_level_average: f64,
    pub student_count: usize,
    pub above_average_count: usize,
    pub below_average_count: usize,
    pub students: Vec<StudentComparison>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectCorrelation {
    pub class: Class,
    pub subject1: String,
    pub subject2: String,
    pub coefficient: f64,
    pub sample_size: usize,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAnalysisReport {
    pub class_info: Class,
    pub student_count: usize,
    pub subject_analysis: BTreeMap<String, SubjectStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentTrendReport {
    pub student_info: Student,
    pub subject_trends: BTreeMap<String, SubjectTrend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub class_info: Class,
    pub exam_name: String,
    pub class_average: f64,
    pub grade_level_average: f64,
    pub student_count: usize,
    pub above_average_count: usize,
    pub below_average_count: usize,
    pub student_details: Vec<StudentComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    pub class_info: Class,
    pub subject1: String,
    pub subject2: String,
    pub correlation: f64,
    pub student_count: usize,
    pub interpretation: String,
}

/// A grade row enriched with the owning student's name and number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeListing {
    #[serde(flatten)]
    pub grade: Grade,
    pub student_name: String,
    pub student_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub success: bool,
    pub imported_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}
