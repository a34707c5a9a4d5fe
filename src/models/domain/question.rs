use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub statement: String,
    pub points: i32,
    pub question_type: QuestionType,
    pub order: i32,
    pub answer_options: Vec<AnswerOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnswerOption {
    pub text: String,
    pub order: i32,
    pub is_correct: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Copy)]
pub enum QuestionType {
    #[serde(rename = "TFQ")]
    TrueFalse,
    #[serde(rename = "SCQ")]
    SingleChoice,
    #[serde(rename = "MCQ")]
    MultipleChoice,
}

impl QuestionType {
    /// Checks an author-supplied answer key against the option count.
    ///
    /// TrueFalse and SingleChoice take exactly one correct index, TrueFalse
    /// only over its two options. MultipleChoice takes at least one and strictly
    /// fewer correct indices than there are options.
    pub fn validate_answer_key(&self, option_count: usize, correct: &[i32]) -> AppResult<()> {
        let invalid = || AppError::ValidationError("invalid answer option".to_string());

        let key: BTreeSet<i32> = correct.iter().copied().collect();
        if key.len() != correct.len() {
            return Err(invalid());
        }
        if key
            .iter()
            .any(|&index| index < 0 || index as usize >= option_count)
        {
            return Err(invalid());
        }

        match self {
            QuestionType::TrueFalse => {
                if option_count != 2 || key.len() != 1 {
                    return Err(invalid());
                }
            }
            QuestionType::SingleChoice => {
                if key.len() != 1 {
                    return Err(invalid());
                }
            }
            QuestionType::MultipleChoice => {
                if key.is_empty() || key.len() >= option_count {
                    return Err(invalid());
                }
            }
        }
        Ok(())
    }
}

impl Question {
    /// Order indices of the options flagged correct.
    pub fn correct_options(&self) -> BTreeSet<i32> {
        self.answer_options
            .iter()
            .filter(|opt| opt.is_correct)
            .map(|opt| opt.order)
            .collect()
    }
}
