use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use common::error::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackType {
    Bug,
    Feature,
    Improvement,
    Other,
}

impl FeedbackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackType::Bug => "bug",
            FeedbackType::Feature => "feature",
            FeedbackType::Improvement => "improvement",
            FeedbackType::Other => "other",
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" => Ok(FeedbackType::Bug),
            "feature" => Ok(FeedbackType::Feature),
            "improvement" => Ok(FeedbackType::Improvement),
            "other" => Ok(FeedbackType::Other),
            other => Err(AppError::Validation(format!(
                "Unknown feedback type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub user_id: Uuid,
    pub feedback_type: String,
    pub subject: String,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
}

/// Counts over every feedback entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total: i64,
    pub resolved: i64,
    pub unresolved: i64,
}

impl FeedbackStats {
    pub fn new(total: i64, resolved: i64) -> Self {
        FeedbackStats {
            total,
            resolved,
            unresolved: total - resolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_types_parse_case_insensitively() {
        assert_eq!("feature".parse::<FeedbackType>().unwrap(), FeedbackType::Feature);
        assert_eq!(" BUG ".parse::<FeedbackType>().unwrap(), FeedbackType::Bug);
        assert!(matches!(
            "invalid".parse::<FeedbackType>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unresolved_is_derived_from_total() {
        assert_eq!(
            FeedbackStats::new(5, 2),
            FeedbackStats {
                total: 5,
                resolved: 2,
                unresolved: 3
            }
        );
    }
}
