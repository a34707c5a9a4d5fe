//! Filter and sort descriptions handed to the repositories.
//!
//! Each value describes filters and ordering only; adapters translate it into
//! their own query language and apply the page window themselves.

use serde::{Deserialize, Serialize};

/// Which quizzes a listing covers with respect to groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GroupScope {
    #[default]
    Any,
    /// Quizzes not attached to any group.
    Ungrouped,
    Group(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuizSortKey {
    #[default]
    Title,
    Category,
    Difficulty,
    Points,
    Duration,
    Start,
    End,
}

impl QuizSortKey {
    /// Unknown keys fall back to ordering by title.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("category") => QuizSortKey::Category,
            Some("difficulty") => QuizSortKey::Difficulty,
            Some("points") => QuizSortKey::Points,
            Some("duration") => QuizSortKey::Duration,
            Some("start") => QuizSortKey::Start,
            Some("end") => QuizSortKey::End,
            _ => QuizSortKey::Title,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            QuizSortKey::Title => "title",
            QuizSortKey::Category => "category",
            QuizSortKey::Difficulty => "difficulty",
            QuizSortKey::Points => "points",
            QuizSortKey::Duration => "duration",
            QuizSortKey::Start => "start",
            QuizSortKey::End => "end",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizQuery {
    pub author_id: Option<String>,
    pub scope: GroupScope,
    pub title_contains: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<i32>,
    pub sort: QuizSortKey,
}

/// Groups ordered by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupQuery {
    pub title_contains: Option<String>,
    pub owner_id: Option<String>,
    pub member_id: Option<String>,
}

/// Users ordered by user name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub name_contains: Option<String>,
}

/// Attempts ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptQuery {
    pub quiz_id: Option<String>,
    pub user_id: Option<String>,
    /// Restricts to these users when set; an empty list matches nothing.
    pub user_ids: Option<Vec<String>>,
    pub full_score: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeaderboardSort {
    #[default]
    UserName,
    /// Highest total first, ties by user name.
    Score,
}

impl LeaderboardSort {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("score") => LeaderboardSort::Score,
            _ => LeaderboardSort::UserName,
        }
    }
}

/// Members of a group ranked by their scores on a set of quizzes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub member_ids: Vec<String>,
    pub quiz_ids: Vec<String>,
    pub name_contains: Option<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub sort: LeaderboardSort,
}

impl LeaderboardQuery {
    pub fn accepts_score(&self, total_score: i64) -> bool {
        self.min_score.map(|min| total_score >= min).unwrap_or(true)
            && self.max_score.map(|max| total_score <= max).unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub user_name: String,
    pub total_score: i64,
    pub attempted_quizzes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizStats {
    pub max_score: Option<i32>,
    pub min_score: Option<i32>,
    pub average_score: Option<f64>,
    /// Distinct users who attempted the quiz.
    pub attempts: u64,
}

impl QuizStats {
    pub fn empty() -> Self {
        QuizStats {
            max_score: None,
            min_score: None,
            average_score: None,
            attempts: 0,
        }
    }
}

/// Case-insensitive substring match used by in-memory adapters.
pub fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}
