use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{Question, Quiz, QuizAttempt, UserAnswer},
        dto::{
            request::SubmittedAnswer,
            response::{AttemptDto, AttemptResult},
        },
        query::{AttemptQuery, QuizStats, UserQuery},
    },
    repositories::{QuestionRepository, QuizAttemptRepository, QuizRepository, UserRepository},
    services::pagination::{Page, PageRequest, Paginator},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeResult {
    pub score: i32,
    pub full_score: bool,
    /// Correct option indices per question, in question order.
    pub correct_options: Vec<BTreeSet<i32>>,
}

pub struct QuizAttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    users: Arc<dyn UserRepository>,
    paginator: Paginator,
}

impl QuizAttemptService {
    pub fn new(
        attempts: Arc<dyn QuizAttemptRepository>,
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        users: Arc<dyn UserRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            attempts,
            quizzes,
            questions,
            users,
            paginator,
        }
    }

    /// Grade submitted answers against the quiz's questions, position by position.
    ///
    /// A question earns its points only when the selected set equals the correct
    /// set exactly. There is no partial credit.
    pub fn grade_attempt(
        questions: &[Question],
        submitted_answers: &[SubmittedAnswer],
    ) -> AppResult<GradeResult> {
        if questions.len() != submitted_answers.len() {
            return Err(AppError::AnswerCountMismatch {
                expected: questions.len(),
                actual: submitted_answers.len(),
            });
        }

        let mut score: i32 = 0;
        let mut full_score = true;
        let mut correct_options = Vec::with_capacity(questions.len());

        for (question, answer) in questions.iter().zip(submitted_answers) {
            let correct = question.correct_options();
            if answer.selected() == correct {
                score = score.checked_add(question.points).ok_or_else(|| {
                    AppError::InternalError("Attempt score overflows i32".to_string())
                })?;
            } else {
                full_score = false;
            }
            correct_options.push(correct);
        }

        Ok(GradeResult {
            score,
            full_score,
            correct_options,
        })
    }

    /// One row per distinct selected option, in question order.
    fn answer_rows(
        attempt_id: &str,
        questions: &[Question],
        submitted_answers: &[SubmittedAnswer],
    ) -> Vec<UserAnswer> {
        questions
            .iter()
            .zip(submitted_answers)
            .flat_map(|(question, answer)| {
                answer
                    .selected()
                    .into_iter()
                    .map(|option| UserAnswer::new(attempt_id, &question.id, option))
            })
            .collect()
    }

    async fn get_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id)))
    }

    pub async fn submit_attempt(
        &self,
        quiz_id: &str,
        user_id: &str,
        submitted_answers: Vec<SubmittedAnswer>,
    ) -> AppResult<AttemptResult> {
        let quiz = self.get_quiz(quiz_id).await?;
        if !quiz.is_open_at(Utc::now()) {
            return Err(AppError::Forbidden(format!(
                "Quiz '{}' is not accepting submissions",
                quiz.title
            )));
        }

        let questions = self.questions.find_by_quiz(quiz_id).await?;
        let grade = Self::grade_attempt(&questions, &submitted_answers)?;

        let attempt = QuizAttempt::new(quiz_id, user_id, grade.score, grade.full_score);
        let rows = Self::answer_rows(&attempt.id, &questions, &submitted_answers);
        let attempt = self.attempts.create_with_answers(attempt, rows).await?;

        Ok(AttemptResult {
            attempt_id: attempt.id,
            score: grade.score,
            full_score: grade.full_score,
            correct_answers: grade
                .correct_options
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
        })
    }

    /// The caller's own attempts at one quiz, newest first.
    pub async fn list_my_attempts(
        &self,
        user_id: &str,
        quiz_id: &str,
        page: PageRequest,
    ) -> AppResult<Page<AttemptDto>> {
        let query = AttemptQuery {
            quiz_id: Some(quiz_id.to_string()),
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };

        let total = self.attempts.count(&query).await?;
        if total == 0 {
            return Err(AppError::NotFound(format!(
                "No attempts at quiz '{}'",
                quiz_id
            )));
        }

        let attempts = self.attempts.clone();
        let page = self
            .paginator
            .paginate(total, page, |window| async move {
                attempts.list(&query, window).await
            })
            .await?;
        Ok(page.map(AttemptDto::from))
    }

    /// Every attempt at a quiz the author owns, optionally narrowed by user name.
    pub async fn list_quiz_attempts(
        &self,
        author_id: &str,
        quiz_id: &str,
        user_name: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<AttemptDto>> {
        let quiz = self.get_quiz(quiz_id).await?;
        if quiz.user_id != author_id {
            return Err(AppError::NotFound(format!(
                "Quiz with id '{}' not found",
                quiz_id
            )));
        }

        let user_ids = match user_name {
            Some(name) => Some(
                self.users
                    .find_ids(&UserQuery {
                        name_contains: Some(name),
                    })
                    .await?,
            ),
            None => None,
        };
        let query = AttemptQuery {
            quiz_id: Some(quiz_id.to_string()),
            user_ids,
            ..Default::default()
        };

        let total = self.attempts.count(&query).await?;
        let attempts = self.attempts.clone();
        let page = self
            .paginator
            .paginate(total, page, |window| async move {
                attempts.list(&query, window).await
            })
            .await?;

        let mut ids: Vec<String> = page.items.iter().map(|a| a.user_id.clone()).collect();
        ids.sort();
        ids.dedup();
        let names: HashMap<String, String> = self
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user.user_name))
            .collect();

        Ok(page.map(|attempt| {
            let user_name = names.get(&attempt.user_id).cloned();
            AttemptDto {
                user_name,
                ..AttemptDto::from(attempt)
            }
        }))
    }

    pub async fn quiz_stats(&self, quiz_id: &str) -> AppResult<QuizStats> {
        self.get_quiz(quiz_id).await?;
        self.attempts.quiz_stats(quiz_id).await
    }
}
