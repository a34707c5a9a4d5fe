use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{AuthMiddleware, AuthenticatedUser},
    errors::AppError,
    models::dto::request::{SubmitAttemptRequest, UserNameListQuery},
    services::pagination::PageQuery,
};

#[post("/quizzes/{id}/attempts", wrap = "AuthMiddleware")]
async fn submit_attempt(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    request: web::Json<SubmitAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let result = state
        .attempt_service
        .submit_attempt(&quiz_id, auth.id(), request.into_inner().answers)
        .await?;
    log::info!(
        "User {} scored {} on quiz {}",
        auth.id(),
        result.score,
        quiz_id
    );
    Ok(HttpResponse::Created().json(result))
}

#[get("/quizzes/{id}/attempts", wrap = "AuthMiddleware")]
async fn list_my_attempts(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    query: web::Query<PageQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let page = query.into_inner().into_request()?;
    let attempts = state
        .attempt_service
        .list_my_attempts(auth.id(), &quiz_id, page)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}

/// Every attempt on one of the caller's quizzes. Mounted under `/me`.
#[get("/quizzes/{id}/attempts")]
async fn list_quiz_attempts(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    query: web::Query<UserNameListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (user_name, page) = query.into_inner().into_parts()?;
    let attempts = state
        .attempt_service
        .list_quiz_attempts(auth.id(), &quiz_id, user_name, page)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}
