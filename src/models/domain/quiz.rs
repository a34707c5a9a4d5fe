use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

pub const MIN_DIFFICULTY: i32 = 1;
pub const MAX_DIFFICULTY: i32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: i32,
    pub points: i32, // not kept in sync with the question points
    pub duration: Option<i32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub user_id: String, // author
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Quiz {
    pub fn new(user_id: &str, title: &str, category: &str, difficulty: i32, points: i32) -> Self {
        Quiz {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            category: category.to_string(),
            difficulty,
            points,
            duration: None,
            start: None,
            end: None,
            user_id: user_id.to_string(),
            group_id: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Whether submissions are accepted at `now`. Unscheduled quizzes are always open.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= now && now <= end,
            _ => true,
        }
    }
}

pub fn validate_difficulty(difficulty: i32) -> AppResult<()> {
    if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&difficulty) {
        return Err(AppError::ValidationError("invalid difficulty".to_string()));
    }
    Ok(())
}

/// A schedule is either absent or a window `start < end` that has not begun yet.
pub fn validate_schedule(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    match (start, end) {
        (None, None) => Ok(()),
        (Some(start), Some(end)) if start < end && start >= now => Ok(()),
        _ => Err(AppError::ValidationError("invalid quiz schedule".to_string())),
    }
}
