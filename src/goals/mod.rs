//! Goal records and status computation.
//!
//! A goal's status is derived, not stored: it depends on the caller's
//! reference date, so the same goal can read "In progress" today and
//! "Failed" tomorrow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod storage;

/// A goal as submitted by a client.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewGoal {
    pub title: String,
    /// Start date, `YYYY-MM-DD`.
    pub start: NaiveDate,
    /// Optional due date, `YYYY-MM-DD`.
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

/// A goal as stored.
#[derive(Debug, Clone)]
pub struct GoalRecord {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: String,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
pub enum GoalStatus {
    #[serde(rename = "In progress")]
    InProgress,
    Complete,
    Failed,
}

impl GoalStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "In progress",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Parse a client-supplied status label.
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "In progress" => Some(Self::InProgress),
            "Complete" => Some(Self::Complete),
            "Failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl GoalRecord {
    /// Status of this goal as seen on `now`.
    ///
    /// Completed goals stay Complete; a goal past its due date is Failed;
    /// anything else, including goals with no due date, is In progress.
    #[must_use]
    pub fn status_on(&self, now: NaiveDate) -> GoalStatus {
        if self.completed_at.is_some() {
            return GoalStatus::Complete;
        }
        match self.end_date {
            Some(due) if now > due => GoalStatus::Failed,
            _ => GoalStatus::InProgress,
        }
    }
}
