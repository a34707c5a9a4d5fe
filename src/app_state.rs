use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        GroupRepository, MongoGroupRepository, MongoQuestionRepository,
        MongoQuizAttemptRepository, MongoQuizRepository, MongoUserRepository, QuestionRepository,
        QuizAttemptRepository, QuizRepository, UserRepository,
    },
    services::{GroupService, Paginator, QuizAttemptService, QuizService, UserService},
};

/// One handle per aggregate. The services share them.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub quizzes: Arc<dyn QuizRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub quiz_service: Arc<QuizService>,
    pub group_service: Arc<GroupService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub config: Arc<Config>,
    pub db: Option<Database>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let users = Arc::new(MongoUserRepository::new(&db));
        users.ensure_indexes().await?;
        let groups = Arc::new(MongoGroupRepository::new(&db));
        groups.ensure_indexes().await?;
        let quizzes = Arc::new(MongoQuizRepository::new(&db));
        quizzes.ensure_indexes().await?;
        let questions = Arc::new(MongoQuestionRepository::new(&db));
        questions.ensure_indexes().await?;
        let attempts = Arc::new(MongoQuizAttemptRepository::new(&db));
        attempts.ensure_indexes().await?;

        let repositories = Repositories {
            users,
            groups,
            quizzes,
            questions,
            attempts,
        };

        Ok(Self {
            db: Some(db),
            ..Self::from_repositories(config, repositories)
        })
    }

    /// Wires the services over any repository implementation. No database
    /// handle is attached, so readiness reports the store as detached.
    pub fn from_repositories(config: Config, repositories: Repositories) -> Self {
        let paginator = Paginator::from_config(&config);
        let Repositories {
            users,
            groups,
            quizzes,
            questions,
            attempts,
        } = repositories;

        let user_service = Arc::new(UserService::new(
            users.clone(),
            groups.clone(),
            quizzes.clone(),
            attempts.clone(),
            paginator,
        ));
        let quiz_service = Arc::new(QuizService::new(
            quizzes.clone(),
            questions.clone(),
            groups.clone(),
            users.clone(),
            paginator,
        ));
        let group_service = Arc::new(GroupService::new(
            groups,
            users.clone(),
            quizzes.clone(),
            attempts.clone(),
            paginator,
        ));
        let attempt_service = Arc::new(QuizAttemptService::new(
            attempts, quizzes, questions, users, paginator,
        ));

        Self {
            user_service,
            quiz_service,
            group_service,
            attempt_service,
            config: Arc::new(config),
            db: None,
        }
    }
}
