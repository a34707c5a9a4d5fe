use std::sync::Arc;

use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::User,
        dto::{
            request::{CreateUserRequest, UpdateProfileRequest},
            response::{ProfileStats, PublicProfileDto, UserDto},
        },
        query::{AttemptQuery, GroupQuery, QuizQuery, UserQuery},
    },
    repositories::{GroupRepository, QuizAttemptRepository, QuizRepository, UserRepository},
    services::pagination::{Page, PageRequest, Paginator},
};

pub struct UserService {
    users: Arc<dyn UserRepository>,
    groups: Arc<dyn GroupRepository>,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    paginator: Paginator,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        groups: Arc<dyn GroupRepository>,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        paginator: Paginator,
    ) -> Self {
        Self {
            users,
            groups,
            quizzes,
            attempts,
            paginator,
        }
    }

    async fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id '{}' not found", user_id)))
    }

    async fn ensure_user_name_free(&self, user_name: &str) -> AppResult<()> {
        if self.users.find_by_user_name(user_name).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "User with user name '{}' already exists",
                user_name
            )));
        }
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str) -> AppResult<()> {
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "User with email '{}' already exists",
                email
            )));
        }
        Ok(())
    }

    pub async fn register_user(&self, request: CreateUserRequest) -> AppResult<UserDto> {
        request.validate()?;
        self.ensure_user_name_free(&request.user_name).await?;
        self.ensure_email_free(&request.email).await?;

        let user = self.users.create(User::from_request(request)).await?;
        log::info!("Registered user {}", user.id);
        Ok(UserDto::from(user))
    }

    pub async fn get_profile(&self, user_id: &str) -> AppResult<UserDto> {
        Ok(UserDto::from(self.get_user(user_id).await?))
    }

    pub async fn get_public_profile(&self, user_id: &str) -> AppResult<PublicProfileDto> {
        Ok(PublicProfileDto::from(self.get_user(user_id).await?))
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> AppResult<UserDto> {
        request.validate()?;
        let mut user = self.get_user(user_id).await?;

        if let Some(user_name) = request.user_name {
            if user_name != user.user_name {
                self.ensure_user_name_free(&user_name).await?;
                user.user_name = user_name;
            }
        }
        if let Some(email) = request.email {
            if email != user.email {
                self.ensure_email_free(&email).await?;
                user.email = email;
            }
        }
        if request.first_name.is_some() {
            user.first_name = request.first_name;
        }
        if request.last_name.is_some() {
            user.last_name = request.last_name;
        }
        if request.profile_picture.is_some() {
            user.profile_picture = request.profile_picture;
        }

        let user = self.users.update(user).await?;
        Ok(UserDto::from(user))
    }

    pub async fn delete_user(&self, user_id: &str) -> AppResult<()> {
        self.get_user(user_id).await?;
        self.users.delete_cascade(user_id).await
    }

    pub async fn list_users(
        &self,
        user_name: Option<String>,
        page: PageRequest,
    ) -> AppResult<Page<PublicProfileDto>> {
        let query = UserQuery {
            name_contains: user_name,
        };
        let total = self.users.count(&query).await?;
        let users = self.users.clone();
        let page = self
            .paginator
            .paginate(total, page, |window| async move {
                users.list(&query, window).await
            })
            .await?;
        Ok(page.map(PublicProfileDto::from))
    }

    pub async fn profile_stats(&self, user_id: &str) -> AppResult<ProfileStats> {
        let user = self.get_user(user_id).await?;

        let owned_groups = self
            .groups
            .count(&GroupQuery {
                owner_id: Some(user_id.to_string()),
                ..Default::default()
            })
            .await?;
        let subscribed_groups = self
            .groups
            .count(&GroupQuery {
                member_id: Some(user_id.to_string()),
                ..Default::default()
            })
            .await?;
        let created_quizzes = self
            .quizzes
            .count(&QuizQuery {
                author_id: Some(user_id.to_string()),
                ..Default::default()
            })
            .await?;
        let solved_quizzes = self
            .attempts
            .count_distinct_quizzes(&AttemptQuery {
                user_id: Some(user_id.to_string()),
                full_score: Some(true),
                ..Default::default()
            })
            .await?;

        Ok(ProfileStats {
            user_name: user.user_name,
            owned_groups,
            created_quizzes,
            subscribed_groups,
            solved_quizzes,
        })
    }
}
