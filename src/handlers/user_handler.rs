use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{CreateUserRequest, UpdateProfileRequest, UserNameListQuery},
};

#[post("/users")]
async fn register_user(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state.user_service.register_user(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[get("/profiles")]
async fn list_profiles(
    state: web::Data<Arc<AppState>>,
    query: web::Query<UserNameListQuery>,
) -> Result<HttpResponse, AppError> {
    let (user_name, page) = query.into_inner().into_parts()?;
    let profiles = state.user_service.list_users(user_name, page).await?;
    Ok(HttpResponse::Ok().json(profiles))
}

#[get("/profiles/{id}")]
async fn get_public_profile(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let profile = state.user_service.get_public_profile(&user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[get("/profiles/{id}/stats")]
async fn get_profile_stats(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let stats = state.user_service.profile_stats(&user_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

// Routes below are mounted under the authenticated `/me` scope.

#[get("")]
async fn get_me(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = state.user_service.get_profile(auth.id()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[put("")]
async fn update_me(
    state: web::Data<Arc<AppState>>,
    request: web::Json<UpdateProfileRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let profile = state
        .user_service
        .update_profile(auth.id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[delete("")]
async fn delete_me(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.user_service.delete_user(auth.id()).await?;
    log::info!("User {} deleted their account", auth.id());
    Ok(HttpResponse::NoContent().finish())
}

#[get("/stats")]
async fn get_my_stats(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let stats = state.user_service.profile_stats(auth.id()).await?;
    Ok(HttpResponse::Ok().json(stats))
}
