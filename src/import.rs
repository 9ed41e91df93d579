use std::io::Read;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Grade, ImportSummary};
use crate::store::GradeBook;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "student_name",
    "student_number",
    "subject",
    "score",
    "exam_date",
    "exam_name",
];

const LEGACY_COLUMNS: [&str; 6] = ["学生姓名", "学号", "科目", "分数", "考试日期", "考试名称"];

pub const TEMPLATE: &str = "student_name,student_number,subject,score,exam_date,exam_name
Avery Lee,2023001,math,95.5,2023-10-15,midterm
Jules Moreno,2023002,math,87.0,2023-10-15,midterm
Kiara Patel,2023003,math,92.5,2023-10-15,midterm
";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImportRow {
    #[serde(alias = "学生姓名")]
    pub student_name: String,
    #[serde(alias = "学号")]
    pub student_number: String,
    #[serde(alias = "科目")]
    pub subject: String,
    #[serde(alias = "分数")]
    pub score: f64,
    #[serde(alias = "考试日期")]
    pub exam_date: NaiveDate,
    #[serde(alias = "考试名称")]
    pub exam_name: String,
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    /// Valid rows with their physical line number.
    pub rows: Vec<(u64, ImportRow)>,
    pub errors: Vec<String>,
}

impl ImportRow {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("student_name", &self.student_name),
            ("student_number", &self.student_number),
            ("subject", &self.subject),
            ("exam_name", &self.exam_name),
        ] {
            if value.is_empty() {
                return Err(format!("{field} is empty"));
            }
        }
        if !self.score.is_finite() {
            return Err("score is not a finite number".to_string());
        }
        Ok(())
    }

    pub fn into_grade(self, teacher_id: &str) -> Grade {
        Grade {
            id: Uuid::new_v4().to_string(),
            student_id: self.student_number,
            subject: self.subject,
            score: self.score,
            exam_date: self.exam_date,
            exam_name: self.exam_name,
            teacher_id: teacher_id.to_string(),
        }
    }
}

/// Parses an import file. Header problems reject the whole file; problems in a
/// data line are collected as `Line N: reason` and that line is skipped.
pub fn parse_grades<R: Read>(input: R) -> anyhow::Result<ParsedImport> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers().context("failed to read header row")?.clone();
    for (column, legacy) in REQUIRED_COLUMNS.iter().zip(LEGACY_COLUMNS) {
        if !headers.iter().any(|h| h == *column || h == legacy) {
            bail!("Missing required column: {column}");
        }
    }

    let mut parsed = ParsedImport::default();
    let mut data_lines = 0usize;
    for (index, result) in reader.records().enumerate() {
        data_lines += 1;
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(err) => {
                let line = err.position().map_or(fallback_line, |p| p.line());
                parsed.errors.push(format!("Line {line}: {err}"));
                continue;
            }
        };
        let line = record.position().map_or(fallback_line, |p| p.line());

        if record.len() != headers.len() {
            parsed.errors.push(format!("Line {line}: Column count mismatch"));
            continue;
        }

        match record
            .deserialize::<ImportRow>(Some(&headers))
            .map_err(|err| err.to_string())
            .and_then(|row| row.validate().map(|()| row))
        {
            Ok(row) => parsed.rows.push((line, row)),
            Err(reason) => parsed.errors.push(format!("Line {line}: {reason}")),
        }
    }

    if data_lines == 0 {
        bail!("Invalid file format: no data rows");
    }

    for error in &parsed.errors {
        tracing::warn!(%error, "skipping import line");
    }
    Ok(parsed)
}

/// Applies parsed rows to an in-memory grade book, creating unknown students in
/// `class_id` the way a manual grade entry does.
pub fn apply_to_book(
    book: &mut GradeBook,
    parsed: ParsedImport,
    class_id: &str,
    teacher_id: &str,
) -> ImportSummary {
    let mut summary = ImportSummary {
        success: true,
        imported_count: 0,
        errors: parsed.errors,
    };

    for (line, row) in parsed.rows {
        let outcome = book
            .ensure_student(&row.student_number, &row.student_name, class_id)
            .map(|_| ())
            .and_then(|()| book.add_grade(row.into_grade(teacher_id)).map(|_| ()));
        match outcome {
            Ok(()) => summary.imported_count += 1,
            Err(err) => summary.errors.push(format!("Line {line}: {err}")),
        }
    }

    summary
}
