use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{Group, Question, QuestionType, Quiz, QuizAttempt, User};

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: user.profile_picture,
            created_at: user.created_at,
        }
    }
}

/// What other users see of a profile.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfileDto {
    pub id: String,
    pub user_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
}

impl From<User> for PublicProfileDto {
    fn from(user: User) -> Self {
        PublicProfileDto {
            id: user.id,
            user_name: user.user_name,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture: user.profile_picture,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub user_name: String,
    pub owned_groups: u64,
    pub created_quizzes: u64,
    pub subscribed_groups: u64,
    pub solved_quizzes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizDto {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: i32,
    pub points: i32,
    pub duration: Option<i32>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub author_id: String,
    pub group_id: Option<String>,
}

impl From<Quiz> for QuizDto {
    fn from(quiz: Quiz) -> Self {
        QuizDto {
            id: quiz.id,
            title: quiz.title,
            category: quiz.category,
            difficulty: quiz.difficulty,
            points: quiz.points,
            duration: quiz.duration,
            start: quiz.start,
            end: quiz.end,
            author_id: quiz.user_id,
            group_id: quiz.group_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithKey {
    pub id: String,
    pub statement: String,
    pub points: i32,
    pub question_type: QuestionType,
    pub answer_options: Vec<String>,
    pub correct_answers: Vec<i32>,
}

impl From<Question> for QuestionWithKey {
    fn from(question: Question) -> Self {
        let correct_answers = question.correct_options().into_iter().collect();
        QuestionWithKey {
            id: question.id,
            statement: question.statement,
            points: question.points,
            question_type: question.question_type,
            answer_options: option_texts(question.answer_options),
            correct_answers,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionForTaking {
    pub id: String,
    pub statement: String,
    pub points: i32,
    pub question_type: QuestionType,
    pub answer_options: Vec<String>,
}

impl From<Question> for QuestionForTaking {
    fn from(question: Question) -> Self {
        QuestionForTaking {
            id: question.id,
            statement: question.statement,
            points: question.points,
            question_type: question.question_type,
            answer_options: option_texts(question.answer_options),
        }
    }
}

fn option_texts(mut options: Vec<crate::models::domain::AnswerOption>) -> Vec<String> {
    options.sort_by_key(|opt| opt.order);
    options.into_iter().map(|opt| opt.text).collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizForTaking {
    pub quiz: QuizDto,
    pub questions: Vec<QuestionForTaking>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptResult {
    pub attempt_id: String,
    pub score: i32,
    pub full_score: bool,
    /// Correct option indices per question, in question order.
    pub correct_answers: Vec<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptDto {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub score: i32,
    pub full_score: bool,
    pub created_at: DateTime<Utc>,
}

impl From<QuizAttempt> for AttemptDto {
    fn from(attempt: QuizAttempt) -> Self {
        AttemptDto {
            id: attempt.id,
            quiz_id: attempt.quiz_id,
            user_id: attempt.user_id,
            user_name: None,
            score: attempt.score,
            full_score: attempt.full_score,
            created_at: attempt.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDto {
    pub id: String,
    pub title: String,
    pub owner_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    pub member_count: usize,
}

impl From<Group> for GroupDto {
    fn from(group: Group) -> Self {
        GroupDto {
            id: group.id,
            title: group.title,
            owner_id: group.owner_id,
            owner_name: None,
            member_count: group.member_ids.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedIdsResponse {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
