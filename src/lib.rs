//! Grade analytics for a school grade book: class subject statistics,
//! per-student score trends, exam comparisons against the class mean and
//! cross-subject correlation.
//!
//! The engines are plain functions over a [`store::GradeStore`] snapshot and
//! return [`error::AnalyticsError`] values tagged `NotFound`, `NoData` or
//! `InvalidInput`. [`report`] turns their output into the JSON payloads the
//! command-line front end prints.

pub mod aggregate;
pub mod comparison;
pub mod config;
pub mod correlation;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod prompt;
pub mod report;
pub mod seed;
pub mod stats;
pub mod store;
pub mod trend;

pub use error::{AnalyticsError, AnalyticsResult};
pub use store::{GradeBook, GradeStore};
