use thiserror::Error;

use crate::models::Grade;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalyticsError {
    pub fn class_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "Class",
            id: id.to_string(),
        }
    }

    pub fn student_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "Student",
            id: id.to_string(),
        }
    }

    /// Stable tag surfaced in JSON error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NoData(_) => "no_data",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

pub(crate) fn require_non_blank(value: &str, field: &str) -> AnalyticsResult<()> {
    if value.trim().is_empty() {
        return Err(AnalyticsError::InvalidInput(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Rejects NaN and infinite scores, which a snapshot file can carry past
/// `GradeBook::add_grade`.
pub(crate) fn require_finite(grade: &Grade) -> AnalyticsResult<()> {
    if !grade.score.is_finite() {
        return Err(AnalyticsError::InvalidInput(format!(
            "grade {} has a non-finite score",
            grade.id
        )));
    }
    Ok(())
}
