#![allow(dead_code)]

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use quickie_server::{
    app_state::{AppState, Repositories},
    auth::JwtService,
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{Group, Question, Quiz, QuizAttempt, User, UserAnswer},
        query::{
            contains_ignore_case, AttemptQuery, GroupQuery, GroupScope, LeaderboardEntry,
            LeaderboardQuery, LeaderboardSort, QuizQuery, QuizSortKey, QuizStats, UserQuery,
        },
    },
    repositories::{
        GroupRepository, QuestionRepository, QuizAttemptRepository, QuizRepository,
        UserRepository,
    },
    services::pagination::PageWindow,
};

#[derive(Default)]
pub struct Tables {
    pub users: HashMap<String, User>,
    pub groups: HashMap<String, Group>,
    pub quizzes: HashMap<String, Quiz>,
    pub questions: Vec<Question>,
    pub attempts: Vec<QuizAttempt>,
    pub answers: Vec<UserAnswer>,
}

impl Tables {
    fn delete_attempts_where(&mut self, keep: impl Fn(&QuizAttempt) -> bool) {
        let removed: BTreeSet<String> = self
            .attempts
            .iter()
            .filter(|a| !keep(a))
            .map(|a| a.id.clone())
            .collect();
        self.attempts.retain(|a| !removed.contains(&a.id));
        self.answers.retain(|a| !removed.contains(&a.attempt_id));
    }

    fn delete_quiz(&mut self, quiz_id: &str) {
        self.quizzes.remove(quiz_id);
        self.questions.retain(|q| q.quiz_id != quiz_id);
        self.delete_attempts_where(|a| a.quiz_id != quiz_id);
    }

    fn delete_group(&mut self, group_id: &str) {
        self.groups.remove(group_id);
        let quiz_ids: Vec<String> = self
            .quizzes
            .values()
            .filter(|q| q.group_id.as_deref() == Some(group_id))
            .map(|q| q.id.clone())
            .collect();
        for quiz_id in quiz_ids {
            self.delete_quiz(&quiz_id);
        }
    }
}

/// Every repository over one set of maps. Multi-row writes happen under a
/// single write lock, so readers never see them half done.
#[derive(Default)]
pub struct InMemoryStore {
    pub tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every later write fail before anything is stored.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    fn check_writable(&self) -> AppResult<()> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(AppError::DatabaseError("injected write failure".to_string()));
        }
        Ok(())
    }

    pub async fn insert_user(&self, user_name: &str) -> User {
        let user = User::new(user_name, &format!("{}@example.com", user_name));
        self.tables
            .write()
            .await
            .users
            .insert(user.id.clone(), user.clone());
        user
    }

    pub async fn insert_quiz(&self, quiz: Quiz) -> Quiz {
        self.tables
            .write()
            .await
            .quizzes
            .insert(quiz.id.clone(), quiz.clone());
        quiz
    }

    pub async fn insert_group(&self, group: Group) -> Group {
        self.tables
            .write()
            .await
            .groups
            .insert(group.id.clone(), group.clone());
        group
    }

    pub async fn insert_attempt(&self, quiz_id: &str, user_id: &str, score: i32) -> QuizAttempt {
        let attempt = QuizAttempt::new(quiz_id, user_id, score, false);
        self.tables.write().await.attempts.push(attempt.clone());
        attempt
    }
}

pub fn repositories(store: &Arc<InMemoryStore>) -> Repositories {
    Repositories {
        users: store.clone(),
        groups: store.clone(),
        quizzes: store.clone(),
        questions: store.clone(),
        attempts: store.clone(),
    }
}

pub fn test_state(store: &Arc<InMemoryStore>) -> AppState {
    AppState::from_repositories(Config::test_config(), repositories(store))
}

pub fn jwt_service() -> JwtService {
    let config = Config::test_config();
    JwtService::new(&config.jwt_secret, config.jwt_expiration_hours)
}

pub fn bearer(user: &User) -> String {
    let token = jwt_service().create_token(user).expect("token");
    format!("Bearer {}", token)
}

fn windowed<T: Clone>(items: Vec<T>, window: PageWindow) -> Vec<T> {
    window.slice(&items)
}

fn user_matches(user: &User, query: &UserQuery) -> bool {
    contains_ignore_case(&user.user_name, query.name_contains.as_deref())
}

fn sorted_users(tables: &Tables, query: &UserQuery) -> Vec<User> {
    let mut users: Vec<User> = tables
        .users
        .values()
        .filter(|u| user_matches(u, query))
        .cloned()
        .collect();
    users.sort_by(|a, b| a.user_name.cmp(&b.user_name).then_with(|| a.id.cmp(&b.id)));
    users
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> AppResult<User> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.user_name == user.user_name || u.email == user.email)
        {
            return Err(AppError::AlreadyExists(format!(
                "User '{}' already exists",
                user.user_name
            )));
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_by_user_name(&self, user_name: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.user_name == user_name).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(ids.iter().filter_map(|id| tables.users.get(id).cloned()).collect())
    }

    async fn update(&self, user: User) -> AppResult<User> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AppError::NotFound(format!("User '{}' not found", user.id))),
        }
    }

    async fn count(&self, query: &UserQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().filter(|u| user_matches(u, query)).count() as u64)
    }

    async fn list(&self, query: &UserQuery, window: PageWindow) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(windowed(sorted_users(&tables, query), window))
    }

    async fn find_ids(&self, query: &UserQuery) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(sorted_users(&tables, query).into_iter().map(|u| u.id).collect())
    }

    async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.users.remove(id);
        tables.delete_attempts_where(|a| a.user_id != id);

        let quiz_ids: Vec<String> = tables
            .quizzes
            .values()
            .filter(|q| q.user_id == id)
            .map(|q| q.id.clone())
            .collect();
        for quiz_id in quiz_ids {
            tables.delete_quiz(&quiz_id);
        }

        let group_ids: Vec<String> = tables
            .groups
            .values()
            .filter(|g| g.owner_id == id)
            .map(|g| g.id.clone())
            .collect();
        for group_id in group_ids {
            tables.delete_group(&group_id);
        }

        for group in tables.groups.values_mut() {
            group.member_ids.retain(|m| m != id);
        }
        Ok(())
    }
}

fn group_matches(group: &Group, query: &GroupQuery) -> bool {
    contains_ignore_case(&group.title, query.title_contains.as_deref())
        && query.owner_id.as_ref().map_or(true, |o| &group.owner_id == o)
        && query.member_id.as_ref().map_or(true, |m| group.has_member(m))
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn create(&self, group: Group) -> AppResult<Group> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Group>> {
        Ok(self.tables.read().await.groups.get(id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.title == title).cloned())
    }

    async fn rename(&self, id: &str, title: &str) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Group '{}' not found", id)))?;
        group.title = title.to_string();
        Ok(())
    }

    async fn count(&self, query: &GroupQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().filter(|g| group_matches(g, query)).count() as u64)
    }

    async fn list(&self, query: &GroupQuery, window: PageWindow) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables
            .groups
            .values()
            .filter(|g| group_matches(g, query))
            .cloned()
            .collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(windowed(groups, window))
    }

    async fn add_members(&self, id: &str, user_ids: &[String]) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Group '{}' not found", id)))?;
        for user_id in user_ids {
            if !group.has_member(user_id) {
                group.member_ids.push(user_id.clone());
            }
        }
        Ok(())
    }

    async fn remove_members(&self, id: &str, user_ids: &[String]) -> AppResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let group = tables
            .groups
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Group '{}' not found", id)))?;
        group.member_ids.retain(|m| !user_ids.contains(m));
        Ok(())
    }

    async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        self.check_writable()?;
        self.tables.write().await.delete_group(id);
        Ok(())
    }
}

fn quiz_matches(quiz: &Quiz, query: &QuizQuery) -> bool {
    let in_scope = match &query.scope {
        GroupScope::Any => true,
        GroupScope::Ungrouped => quiz.group_id.is_none(),
        GroupScope::Group(id) => quiz.group_id.as_ref() == Some(id),
    };
    in_scope
        && query.author_id.as_ref().map_or(true, |a| &quiz.user_id == a)
        && contains_ignore_case(&quiz.title, query.title_contains.as_deref())
        && query.category.as_ref().map_or(true, |c| &quiz.category == c)
        && query.difficulty.map_or(true, |d| quiz.difficulty == d)
}

fn compare_quizzes(a: &Quiz, b: &Quiz, sort: QuizSortKey) -> Ordering {
    let primary = match sort {
        QuizSortKey::Title => a.title.cmp(&b.title),
        QuizSortKey::Category => a.category.cmp(&b.category),
        QuizSortKey::Difficulty => a.difficulty.cmp(&b.difficulty),
        QuizSortKey::Points => a.points.cmp(&b.points),
        QuizSortKey::Duration => a.duration.cmp(&b.duration),
        QuizSortKey::Start => a.start.cmp(&b.start),
        QuizSortKey::End => a.end.cmp(&b.end),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

fn sorted_quizzes(tables: &Tables, query: &QuizQuery) -> Vec<Quiz> {
    let mut quizzes: Vec<Quiz> = tables
        .quizzes
        .values()
        .filter(|q| quiz_matches(q, query))
        .cloned()
        .collect();
    quizzes.sort_by(|a, b| compare_quizzes(a, b, query.sort));
    quizzes
}

#[async_trait]
impl QuizRepository for InMemoryStore {
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(quiz)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        Ok(self.tables.read().await.quizzes.get(id).cloned())
    }

    async fn find_by_title(&self, title: &str) -> AppResult<Option<Quiz>> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.values().find(|q| q.title == title).cloned())
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        match tables.quizzes.get_mut(&quiz.id) {
            Some(existing) => {
                *existing = quiz.clone();
                Ok(quiz)
            }
            None => Err(AppError::NotFound(format!("Quiz '{}' not found", quiz.id))),
        }
    }

    async fn count(&self, query: &QuizQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.quizzes.values().filter(|q| quiz_matches(q, query)).count() as u64)
    }

    async fn list(&self, query: &QuizQuery, window: PageWindow) -> AppResult<Vec<Quiz>> {
        let tables = self.tables.read().await;
        Ok(windowed(sorted_quizzes(&tables, query), window))
    }

    async fn find_ids(&self, query: &QuizQuery) -> AppResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(sorted_quizzes(&tables, query).into_iter().map(|q| q.id).collect())
    }

    async fn delete_cascade(&self, id: &str) -> AppResult<()> {
        self.check_writable()?;
        self.tables.write().await.delete_quiz(id);
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryStore {
    async fn find_by_quiz(&self, quiz_id: &str) -> AppResult<Vec<Question>> {
        let tables = self.tables.read().await;
        let mut questions: Vec<Question> = tables
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order);
        Ok(questions)
    }

    async fn count_by_quiz(&self, quiz_id: &str) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().filter(|q| q.quiz_id == quiz_id).count() as u64)
    }

    async fn create_many(&self, questions: Vec<Question>) -> AppResult<Vec<Question>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.questions.extend(questions.iter().cloned());
        Ok(questions)
    }
}

fn attempt_matches(attempt: &QuizAttempt, query: &AttemptQuery) -> bool {
    query.quiz_id.as_ref().map_or(true, |q| &attempt.quiz_id == q)
        && query.user_id.as_ref().map_or(true, |u| &attempt.user_id == u)
        && query
            .user_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&attempt.user_id))
        && query.full_score.map_or(true, |f| attempt.full_score == f)
}

fn leaderboard_rows(tables: &Tables, query: &LeaderboardQuery) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<LeaderboardEntry> = query
        .member_ids
        .iter()
        .filter_map(|id| tables.users.get(id))
        .filter(|user| contains_ignore_case(&user.user_name, query.name_contains.as_deref()))
        .map(|user| {
            let attempts: Vec<&QuizAttempt> = tables
                .attempts
                .iter()
                .filter(|a| a.user_id == user.id && query.quiz_ids.contains(&a.quiz_id))
                .collect();
            let attempted: BTreeSet<&str> = attempts.iter().map(|a| a.quiz_id.as_str()).collect();
            LeaderboardEntry {
                user_id: user.id.clone(),
                user_name: user.user_name.clone(),
                total_score: attempts.iter().map(|a| i64::from(a.score)).sum(),
                attempted_quizzes: attempted.len() as i64,
            }
        })
        .filter(|row| query.accepts_score(row.total_score))
        .collect();

    match query.sort {
        LeaderboardSort::UserName => rows.sort_by(|a, b| {
            a.user_name
                .cmp(&b.user_name)
                .then_with(|| a.user_id.cmp(&b.user_id))
        }),
        LeaderboardSort::Score => rows.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.user_name.cmp(&b.user_name))
        }),
    }
    rows
}

#[async_trait]
impl QuizAttemptRepository for InMemoryStore {
    async fn create_with_answers(
        &self,
        attempt: QuizAttempt,
        answers: Vec<UserAnswer>,
    ) -> AppResult<QuizAttempt> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        tables.attempts.push(attempt.clone());
        tables.answers.extend(answers);
        Ok(attempt)
    }

    async fn find_answers(&self, attempt_id: &str) -> AppResult<Vec<UserAnswer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }

    async fn count(&self, query: &AttemptQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| attempt_matches(a, query))
            .count() as u64)
    }

    async fn list(&self, query: &AttemptQuery, window: PageWindow) -> AppResult<Vec<QuizAttempt>> {
        let tables = self.tables.read().await;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| attempt_matches(a, query))
            .cloned()
            .collect();
        attempts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(windowed(attempts, window))
    }

    async fn count_distinct_quizzes(&self, query: &AttemptQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        let quizzes: BTreeSet<&str> = tables
            .attempts
            .iter()
            .filter(|a| attempt_matches(a, query))
            .map(|a| a.quiz_id.as_str())
            .collect();
        Ok(quizzes.len() as u64)
    }

    async fn quiz_stats(&self, quiz_id: &str) -> AppResult<QuizStats> {
        let tables = self.tables.read().await;
        let scores: Vec<&QuizAttempt> = tables
            .attempts
            .iter()
            .filter(|a| a.quiz_id == quiz_id)
            .collect();
        if scores.is_empty() {
            return Ok(QuizStats::empty());
        }

        let users: BTreeSet<&str> = scores.iter().map(|a| a.user_id.as_str()).collect();
        let total: i64 = scores.iter().map(|a| i64::from(a.score)).sum();
        Ok(QuizStats {
            max_score: scores.iter().map(|a| a.score).max(),
            min_score: scores.iter().map(|a| a.score).min(),
            average_score: Some(total as f64 / scores.len() as f64),
            attempts: users.len() as u64,
        })
    }

    async fn leaderboard_count(&self, query: &LeaderboardQuery) -> AppResult<u64> {
        let tables = self.tables.read().await;
        Ok(leaderboard_rows(&tables, query).len() as u64)
    }

    async fn leaderboard(
        &self,
        query: &LeaderboardQuery,
        window: PageWindow,
    ) -> AppResult<Vec<LeaderboardEntry>> {
        let tables = self.tables.read().await;
        Ok(windowed(leaderboard_rows(&tables, query), window))
    }
}
