use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub score: i32,
    pub full_score: bool,
    pub created_at: DateTime<Utc>,
}

/// One selected option of one question; a question answered with k options
/// yields k rows.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserAnswer {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub answer: i32,
}

impl QuizAttempt {
    pub fn new(quiz_id: &str, user_id: &str, score: i32, full_score: bool) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz_id.to_string(),
            user_id: user_id.to_string(),
            score,
            full_score,
            created_at: Utc::now(),
        }
    }
}

impl UserAnswer {
    pub fn new(attempt_id: &str, question_id: &str, answer: i32) -> Self {
        UserAnswer {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt_id.to_string(),
            question_id: question_id.to_string(),
            answer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_attempt_serialization_preserves_grading_fields() {
        let attempt = QuizAttempt::new("quiz-1", "user-1", 7, true);

        let json = serde_json::to_string(&attempt).expect("attempt should serialize");
        let parsed: QuizAttempt = serde_json::from_str(&json).expect("attempt should deserialize");

        assert_eq!(parsed.score, 7);
        assert!(parsed.full_score);
        assert_eq!(parsed.quiz_id, "quiz-1");
    }

    #[test]
    fn user_answer_references_its_attempt() {
        let attempt = QuizAttempt::new("quiz-1", "user-1", 0, false);
        let answer = UserAnswer::new(&attempt.id, "q-1", 2);

        assert_eq!(answer.attempt_id, attempt.id);
        assert_eq!(answer.answer, 2);
        assert_ne!(answer.id, attempt.id);
    }
}
