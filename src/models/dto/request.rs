use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::QuestionType;
use crate::models::query::{LeaderboardSort, QuizSortKey};
use crate::services::pagination::{PageQuery, PageRequest};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50))]
    pub user_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 3, max = 50))]
    pub user_name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,

    #[validate(url)]
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    #[validate(length(min = 1, max = 50))]
    pub category: String,

    pub difficulty: i32,

    #[validate(range(min = 0))]
    pub points: i32,

    #[validate(range(min = 0))]
    pub duration: Option<i32>,

    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub group_id: Option<String>,
}

/// Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,

    pub difficulty: Option<i32>,

    #[validate(range(min = 0))]
    pub points: Option<i32>,

    #[validate(range(min = 0))]
    pub duration: Option<i32>,

    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewQuestion {
    #[validate(length(min = 1, max = 1000))]
    pub statement: String,

    #[validate(range(min = 0, max = 1000))]
    pub points: i32,

    pub question_type: QuestionType,

    /// Option texts; an option's order is its index here.
    #[validate(length(min = 2))]
    pub answer_options: Vec<String>,

    pub correct_answers: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuestionsRequest {
    #[validate(length(min = 1), nested)]
    pub questions: Vec<NewQuestion>,
}

/// Options selected for one question, by order index. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmittedAnswer {
    pub options: Vec<i32>,
}

impl SubmittedAnswer {
    pub fn new(options: &[i32]) -> Self {
        SubmittedAnswer {
            options: options.to_vec(),
        }
    }

    pub fn selected(&self) -> BTreeSet<i32> {
        self.options.iter().copied().collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RenameGroupRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MembersRequest {
    #[validate(length(min = 1))]
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubscribeRequest {
    #[validate(length(min = 1))]
    pub group_id: String,
}

// List endpoints take their parameters from the query string, so every value
// arrives as text and is parsed here.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizListQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    #[serde(alias = "query")]
    pub title: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<String>,
    pub sort_by: Option<String>,
    pub group_id: Option<String>,
}

/// Filters shared by every quiz listing, before the listing picks its scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizFilter {
    pub title_contains: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<i32>,
    pub sort: QuizSortKey,
    pub group_id: Option<String>,
}

impl QuizListQuery {
    pub fn into_parts(self) -> AppResult<(QuizFilter, PageRequest)> {
        let page = self.page.into_request()?;
        let filter = QuizFilter {
            title_contains: none_if_blank(self.title),
            category: none_if_blank(self.category),
            difficulty: parse_optional(self.difficulty, "difficulty")?,
            sort: QuizSortKey::parse(self.sort_by.as_deref()),
            group_id: none_if_blank(self.group_id),
        };
        Ok((filter, page))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupListQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    #[serde(alias = "query")]
    pub title: Option<String>,
}

impl GroupListQuery {
    pub fn into_parts(self) -> AppResult<(Option<String>, PageRequest)> {
        Ok((none_if_blank(self.title), self.page.into_request()?))
    }
}

/// Listings filtered by a user-name substring: profiles and quiz attempts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserNameListQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    #[serde(alias = "query")]
    pub user_name: Option<String>,
}

impl UserNameListQuery {
    pub fn into_parts(self) -> AppResult<(Option<String>, PageRequest)> {
        Ok((none_if_blank(self.user_name), self.page.into_request()?))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardListQuery {
    #[serde(flatten)]
    pub page: PageQuery,
    #[serde(alias = "query")]
    pub user_name: Option<String>,
    pub min_score: Option<String>,
    pub max_score: Option<String>,
    pub sort_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardFilter {
    pub name_contains: Option<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub sort: LeaderboardSort,
}

impl LeaderboardListQuery {
    pub fn into_parts(self) -> AppResult<(LeaderboardFilter, PageRequest)> {
        let page = self.page.into_request()?;
        let filter = LeaderboardFilter {
            name_contains: none_if_blank(self.user_name),
            min_score: parse_optional(self.min_score, "min_score")?,
            max_score: parse_optional(self.max_score, "max_score")?,
            sort: LeaderboardSort::parse(self.sort_by.as_deref()),
        };
        Ok((filter, page))
    }
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_optional<T: std::str::FromStr>(value: Option<String>, name: &str) -> AppResult<Option<T>> {
    match none_if_blank(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::InvalidRequest(format!("{} must be an integer", name))),
    }
}
