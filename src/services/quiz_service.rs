use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            quiz::{validate_difficulty, validate_schedule},
            AnswerOption, Question, Quiz,
        },
        dto::{
            request::{AddQuestionsRequest, CreateQuizRequest, QuizFilter, UpdateQuizRequest},
            response::{QuestionWithKey, QuizDto, QuizForTaking},
        },
        query::{GroupScope, QuizQuery},
    },
    repositories::{GroupRepository, QuestionRepository, QuizRepository, UserRepository},
    services::pagination::{Page, PageRequest, Paginator},
};

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    questions: Arc<dyn QuestionRepository>,
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    paginator: Paginator,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        questions: Arc<dyn QuestionRepository>,
        groups: Arc<dyn GroupRepository>,
        users: Arc<dyn UserRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            quizzes,
            questions,
            groups,
            users,
            paginator,
        }
    }

    fn not_found(quiz_id: &str) -> AppError {
        AppError::NotFound(format!("Quiz with id '{}' not found", quiz_id))
    }

    async fn get_quiz(&self, quiz_id: &str) -> AppResult<Quiz> {
        self.quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or_else(|| Self::not_found(quiz_id))
    }

    /// Quizzes of other authors are reported as missing.
    async fn owned_quiz(&self, author_id: &str, quiz_id: &str) -> AppResult<Quiz> {
        let quiz = self.get_quiz(quiz_id).await?;
        if quiz.user_id != author_id {
            return Err(Self::not_found(quiz_id));
        }
        Ok(quiz)
    }

    async fn ensure_title_free(&self, title: &str) -> AppResult<()> {
        if self.quizzes.find_by_title(title).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Quiz with title '{}' already exists",
                title
            )));
        }
        Ok(())
    }

    async fn ensure_group_owned(&self, author_id: &str, group_id: &str) -> AppResult<()> {
        match self.groups.find_by_id(group_id).await? {
            Some(group) if group.owner_id == author_id => Ok(()),
            _ => Err(AppError::NotFound(format!(
                "Group with id '{}' not found",
                group_id
            ))),
        }
    }

    pub async fn create_quiz(&self, author_id: &str, request: CreateQuizRequest) -> AppResult<Quiz> {
        request.validate()?;
        validate_difficulty(request.difficulty)?;
        validate_schedule(request.start, request.end, Utc::now())?;
        self.ensure_title_free(&request.title).await?;
        if let Some(group_id) = &request.group_id {
            self.ensure_group_owned(author_id, group_id).await?;
        }

        let quiz = Quiz {
            duration: request.duration,
            start: request.start,
            end: request.end,
            group_id: request.group_id,
            ..Quiz::new(
                author_id,
                &request.title,
                &request.category,
                request.difficulty,
                request.points,
            )
        };
        let quiz = self.quizzes.create(quiz).await?;
        log::info!("Quiz {} created by {}", quiz.id, author_id);
        Ok(quiz)
    }

    pub async fn update_quiz(
        &self,
        author_id: &str,
        quiz_id: &str,
        request: UpdateQuizRequest,
    ) -> AppResult<QuizDto> {
        request.validate()?;
        let mut quiz = self.owned_quiz(author_id, quiz_id).await?;

        if let Some(title) = request.title {
            if title != quiz.title {
                self.ensure_title_free(&title).await?;
                quiz.title = title;
            }
        }
        if let Some(category) = request.category {
            quiz.category = category;
        }
        if let Some(difficulty) = request.difficulty {
            validate_difficulty(difficulty)?;
            quiz.difficulty = difficulty;
        }
        if let Some(points) = request.points {
            quiz.points = points;
        }
        if let Some(duration) = request.duration {
            quiz.duration = Some(duration);
        }
        if request.start.is_some() || request.end.is_some() {
            let start = request.start.or(quiz.start);
            let end = request.end.or(quiz.end);
            validate_schedule(start, end, Utc::now())?;
            quiz.start = start;
            quiz.end = end;
        }
        if let Some(group_id) = request.group_id {
            self.ensure_group_owned(author_id, &group_id).await?;
            quiz.group_id = Some(group_id);
        }

        let quiz = self.quizzes.update(quiz).await?;
        Ok(QuizDto::from(quiz))
    }

    pub async fn delete_quiz(&self, author_id: &str, quiz_id: &str) -> AppResult<()> {
        self.owned_quiz(author_id, quiz_id).await?;
        self.quizzes.delete_cascade(quiz_id).await
    }

    pub async fn get_owned_quiz(&self, author_id: &str, quiz_id: &str) -> AppResult<QuizDto> {
        let quiz = self.owned_quiz(author_id, quiz_id).await?;
        Ok(QuizDto::from(quiz))
    }

    async fn list(&self, query: QuizQuery, page: PageRequest) -> AppResult<Page<QuizDto>> {
        let total = self.quizzes.count(&query).await?;
        let quizzes = self.quizzes.clone();
        let page = self
            .paginator
            .paginate(total, page, |window| async move {
                quizzes.list(&query, window).await
            })
            .await?;
        Ok(page.map(QuizDto::from))
    }

    fn query(filter: QuizFilter, author_id: Option<String>, scope: GroupScope) -> QuizQuery {
        QuizQuery {
            author_id,
            scope,
            title_contains: filter.title_contains,
            category: filter.category,
            difficulty: filter.difficulty,
            sort: filter.sort,
        }
    }

    /// Quizzes outside any group, or those of one group when the filter names it.
    pub async fn list_public_quizzes(
        &self,
        filter: QuizFilter,
        page: PageRequest,
    ) -> AppResult<Page<QuizDto>> {
        let scope = match filter.group_id.clone() {
            Some(group_id) => GroupScope::Group(group_id),
            None => GroupScope::Ungrouped,
        };
        self.list(Self::query(filter, None, scope), page).await
    }

    pub async fn list_owned_quizzes(
        &self,
        author_id: &str,
        filter: QuizFilter,
        page: PageRequest,
    ) -> AppResult<Page<QuizDto>> {
        let scope = filter
            .group_id
            .clone()
            .map(GroupScope::Group)
            .unwrap_or_default();
        self.list(Self::query(filter, Some(author_id.to_string()), scope), page)
            .await
    }

    pub async fn list_user_quizzes(
        &self,
        user_id: &str,
        filter: QuizFilter,
        page: PageRequest,
    ) -> AppResult<Page<QuizDto>> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "User with id '{}' not found",
                user_id
            )));
        }
        self.list(
            Self::query(filter, Some(user_id.to_string()), GroupScope::Any),
            page,
        )
        .await
    }

    pub async fn list_group_quizzes(
        &self,
        group_id: &str,
        filter: QuizFilter,
        page: PageRequest,
    ) -> AppResult<Page<QuizDto>> {
        if self.groups.find_by_id(group_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Group with id '{}' not found",
                group_id
            )));
        }
        self.list(
            Self::query(filter, None, GroupScope::Group(group_id.to_string())),
            page,
        )
        .await
    }

    /// Appends questions after the existing ones. Either every question passes
    /// authoring checks and all are stored, or none is.
    pub async fn add_questions(
        &self,
        author_id: &str,
        quiz_id: &str,
        request: AddQuestionsRequest,
    ) -> AppResult<Vec<String>> {
        request.validate()?;
        self.owned_quiz(author_id, quiz_id).await?;

        for new in &request.questions {
            new.question_type
                .validate_answer_key(new.answer_options.len(), &new.correct_answers)?;
        }

        let first_order = self.questions.count_by_quiz(quiz_id).await? as i32;
        let now = Utc::now();
        let questions: Vec<Question> = request
            .questions
            .into_iter()
            .enumerate()
            .map(|(position, new)| Question {
                id: uuid::Uuid::new_v4().to_string(),
                quiz_id: quiz_id.to_string(),
                statement: new.statement,
                points: new.points,
                question_type: new.question_type,
                order: first_order + position as i32,
                answer_options: new
                    .answer_options
                    .into_iter()
                    .enumerate()
                    .map(|(index, text)| AnswerOption {
                        text,
                        order: index as i32,
                        is_correct: new.correct_answers.contains(&(index as i32)),
                    })
                    .collect(),
                created_at: Some(now),
            })
            .collect();

        let created = self.questions.create_many(questions).await?;
        Ok(created.into_iter().map(|q| q.id).collect())
    }

    pub async fn get_questions_with_key(
        &self,
        author_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuestionWithKey>> {
        self.owned_quiz(author_id, quiz_id).await?;
        let questions = self.questions.find_by_quiz(quiz_id).await?;
        Ok(questions.into_iter().map(QuestionWithKey::from).collect())
    }

    pub async fn get_questions_for_taking(&self, quiz_id: &str) -> AppResult<QuizForTaking> {
        let quiz = self.get_quiz(quiz_id).await?;
        let questions = self.questions.find_by_quiz(quiz_id).await?;
        Ok(QuizForTaking {
            quiz: QuizDto::from(quiz),
            questions: questions.into_iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{Group, QuestionType};
    use crate::models::dto::request::NewQuestion;
    use crate::repositories::{
        group_repository::MockGroupRepository, question_repository::MockQuestionRepository,
        quiz_repository::MockQuizRepository, user_repository::MockUserRepository,
    };

    fn service(
        quizzes: MockQuizRepository,
        questions: MockQuestionRepository,
        groups: MockGroupRepository,
    ) -> QuizService {
        QuizService::new(
            Arc::new(quizzes),
            Arc::new(questions),
            Arc::new(groups),
            Arc::new(MockUserRepository::new()),
            Paginator::default(),
        )
    }

    fn create_request(title: &str) -> CreateQuizRequest {
        CreateQuizRequest {
            title: title.to_string(),
            category: "rust".to_string(),
            difficulty: 3,
            points: 10,
            duration: None,
            start: None,
            end: None,
            group_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_quiz_rejects_duplicate_title() {
        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_title()
            .returning(|title| Ok(Some(Quiz::new("other", title, "rust", 1, 1))));
        quizzes.expect_create().times(0);

        let svc = service(quizzes, MockQuestionRepository::new(), MockGroupRepository::new());
        let result = svc.create_quiz("author", create_request("Ownership")).await;

        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_quiz_requires_owned_group() {
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_find_by_title().returning(|_| Ok(None));
        quizzes.expect_create().times(0);

        let mut groups = MockGroupRepository::new();
        groups
            .expect_find_by_id()
            .returning(|_| Ok(Some(Group::new("Someone else's", "stranger"))));

        let svc = service(quizzes, MockQuestionRepository::new(), groups);
        let mut request = create_request("Borrowing");
        request.group_id = Some("g-1".to_string());

        let result = svc.create_quiz("author", request).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_create_quiz_rejects_bad_difficulty() {
        let svc = service(
            MockQuizRepository::new(),
            MockQuestionRepository::new(),
            MockGroupRepository::new(),
        );
        let mut request = create_request("Macros");
        request.difficulty = 7;

        let result = svc.create_quiz("author", request).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    fn new_question(question_type: QuestionType, options: usize, correct: &[i32]) -> NewQuestion {
        NewQuestion {
            statement: "Which apply?".to_string(),
            points: 2,
            question_type,
            answer_options: (0..options).map(|i| format!("option {}", i)).collect(),
            correct_answers: correct.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_add_questions_is_all_or_nothing() {
        let quiz = Quiz::new("author", "Closures", "rust", 2, 4);
        let quiz_id = quiz.id.clone();

        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        let mut questions = MockQuestionRepository::new();
        questions.expect_create_many().times(0);

        let svc = service(quizzes, questions, MockGroupRepository::new());
        let request = AddQuestionsRequest {
            questions: vec![
                new_question(QuestionType::SingleChoice, 3, &[1]),
                new_question(QuestionType::MultipleChoice, 3, &[0, 1, 2]),
            ],
        };

        let result = svc.add_questions("author", &quiz_id, request).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_add_questions_appends_after_existing() {
        let quiz = Quiz::new("author", "Iterators", "rust", 2, 4);
        let quiz_id = quiz.id.clone();

        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        let mut questions = MockQuestionRepository::new();
        questions.expect_count_by_quiz().returning(|_| Ok(2));
        questions
            .expect_create_many()
            .withf(|qs| {
                qs.len() == 1
                    && qs[0].order == 2
                    && qs[0].correct_options() == std::collections::BTreeSet::from([1])
            })
            .returning(Ok);

        let svc = service(quizzes, questions, MockGroupRepository::new());
        let request = AddQuestionsRequest {
            questions: vec![new_question(QuestionType::TrueFalse, 2, &[1])],
        };

        let ids = svc.add_questions("author", &quiz_id, request).await.unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_other_authors_quiz_is_not_found() {
        let quiz = Quiz::new("author", "Modules", "rust", 1, 1);
        let quiz_id = quiz.id.clone();

        let mut quizzes = MockQuizRepository::new();
        quizzes
            .expect_find_by_id()
            .returning(move |_| Ok(Some(quiz.clone())));
        quizzes.expect_delete_cascade().times(0);

        let svc = service(quizzes, MockQuestionRepository::new(), MockGroupRepository::new());
        let result = svc.delete_quiz("intruder", &quiz_id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
