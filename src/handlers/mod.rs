pub mod attempt_handler;
pub mod group_handler;
pub mod health_handler;
pub mod quiz_handler;
pub mod user_handler;

use actix_web::{error, web};

use crate::{auth::AuthMiddleware, errors::AppError};

pub const API_PREFIX: &str = "/api/v1";

/// Mounts every route under `/api/v1`. Everything below `/me` requires a
/// bearer token, as do attempt submission and the caller's own attempts.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _| {
        error::Error::from(AppError::InvalidRequest(err.to_string()))
    }))
    .app_data(web::JsonConfig::default().error_handler(|err, _| {
        error::Error::from(AppError::InvalidRequest(err.to_string()))
    }))
    .service(
        web::scope(API_PREFIX)
            .service(health_handler::health_check)
            .service(health_handler::health_check_ready)
            .service(user_handler::register_user)
            .service(
                web::scope("/me")
                    .wrap(AuthMiddleware)
                    .service(user_handler::get_me)
                    .service(user_handler::update_me)
                    .service(user_handler::delete_me)
                    .service(user_handler::get_my_stats)
                    .service(quiz_handler::list_my_quizzes)
                    .service(quiz_handler::create_quiz)
                    .service(quiz_handler::get_my_quiz)
                    .service(quiz_handler::update_quiz)
                    .service(quiz_handler::delete_quiz)
                    .service(quiz_handler::get_questions_with_key)
                    .service(quiz_handler::add_questions)
                    .service(attempt_handler::list_quiz_attempts)
                    .service(group_handler::list_my_groups)
                    .service(group_handler::create_group)
                    .service(group_handler::get_my_group)
                    .service(group_handler::rename_group)
                    .service(group_handler::delete_group)
                    .service(group_handler::list_members)
                    .service(group_handler::add_members)
                    .service(group_handler::remove_members)
                    .service(group_handler::list_subscriptions)
                    .service(group_handler::subscribe)
                    .service(group_handler::unsubscribe),
            )
            .service(quiz_handler::list_public_quizzes)
            .service(quiz_handler::get_quiz_for_taking)
            .service(quiz_handler::get_quiz_stats)
            .service(attempt_handler::submit_attempt)
            .service(attempt_handler::list_my_attempts)
            .service(quiz_handler::list_user_quizzes)
            .service(quiz_handler::list_group_quizzes)
            .service(group_handler::list_groups)
            .service(group_handler::group_leaderboard)
            .service(user_handler::list_profiles)
            .service(user_handler::get_public_profile)
            .service(user_handler::get_profile_stats),
    );
}
