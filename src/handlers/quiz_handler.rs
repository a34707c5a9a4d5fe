use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{AddQuestionsRequest, CreateQuizRequest, QuizListQuery, UpdateQuizRequest},
        response::{CreatedIdsResponse, CreatedResponse},
    },
};

#[get("/quizzes")]
async fn list_public_quizzes(
    state: web::Data<Arc<AppState>>,
    query: web::Query<QuizListQuery>,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query.into_inner().into_parts()?;
    let quizzes = state.quiz_service.list_public_quizzes(filter, page).await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

/// The quiz with its questions and options, without the answer key.
#[get("/quizzes/{id}")]
async fn get_quiz_for_taking(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_questions_for_taking(&quiz_id).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[get("/quizzes/{id}/stats")]
async fn get_quiz_stats(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let stats = state.attempt_service.quiz_stats(&quiz_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

#[get("/profiles/{id}/quizzes")]
async fn list_user_quizzes(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
    query: web::Query<QuizListQuery>,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query.into_inner().into_parts()?;
    let quizzes = state
        .quiz_service
        .list_user_quizzes(&user_id, filter, page)
        .await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[get("/groups/{id}/quizzes")]
async fn list_group_quizzes(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    query: web::Query<QuizListQuery>,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query.into_inner().into_parts()?;
    let quizzes = state
        .quiz_service
        .list_group_quizzes(&group_id, filter, page)
        .await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

// Authoring routes, mounted under `/me`.

#[get("/quizzes")]
async fn list_my_quizzes(
    state: web::Data<Arc<AppState>>,
    query: web::Query<QuizListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query.into_inner().into_parts()?;
    let quizzes = state
        .quiz_service
        .list_owned_quizzes(auth.id(), filter, page)
        .await?;
    Ok(HttpResponse::Ok().json(quizzes))
}

#[post("/quizzes")]
async fn create_quiz(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .create_quiz(auth.id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id: quiz.id }))
}

#[get("/quizzes/{id}")]
async fn get_my_quiz(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state.quiz_service.get_owned_quiz(auth.id(), &quiz_id).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[put("/quizzes/{id}")]
async fn update_quiz(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    request: web::Json<UpdateQuizRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let quiz = state
        .quiz_service
        .update_quiz(auth.id(), &quiz_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(quiz))
}

#[delete("/quizzes/{id}")]
async fn delete_quiz(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.quiz_service.delete_quiz(auth.id(), &quiz_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/quizzes/{id}/questions")]
async fn get_questions_with_key(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let questions = state
        .quiz_service
        .get_questions_with_key(auth.id(), &quiz_id)
        .await?;
    Ok(HttpResponse::Ok().json(questions))
}

#[post("/quizzes/{id}/questions")]
async fn add_questions(
    state: web::Data<Arc<AppState>>,
    quiz_id: web::Path<String>,
    request: web::Json<AddQuestionsRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let ids = state
        .quiz_service
        .add_questions(auth.id(), &quiz_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(CreatedIdsResponse { ids }))
}
