use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{
            CreateGroupRequest, GroupListQuery, LeaderboardListQuery, MembersRequest,
            RenameGroupRequest, SubscribeRequest, UserNameListQuery,
        },
        response::{CreatedResponse, MessageResponse},
    },
};

#[get("/groups")]
async fn list_groups(
    state: web::Data<Arc<AppState>>,
    query: web::Query<GroupListQuery>,
) -> Result<HttpResponse, AppError> {
    let (title, page) = query.into_inner().into_parts()?;
    let groups = state.group_service.list_groups(title, page).await?;
    Ok(HttpResponse::Ok().json(groups))
}

#[get("/groups/{id}/leaderboard")]
async fn group_leaderboard(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    query: web::Query<LeaderboardListQuery>,
) -> Result<HttpResponse, AppError> {
    let (filter, page) = query.into_inner().into_parts()?;
    let leaderboard = state
        .group_service
        .group_leaderboard(&group_id, filter, page)
        .await?;
    Ok(HttpResponse::Ok().json(leaderboard))
}

// Owner and subscriber routes, mounted under `/me`.

#[get("/groups")]
async fn list_my_groups(
    state: web::Data<Arc<AppState>>,
    query: web::Query<GroupListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (title, page) = query.into_inner().into_parts()?;
    let groups = state
        .group_service
        .list_owned_groups(auth.id(), title, page)
        .await?;
    Ok(HttpResponse::Ok().json(groups))
}

#[post("/groups")]
async fn create_group(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateGroupRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let group = state
        .group_service
        .create_group(auth.id(), request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id: group.id }))
}

#[get("/groups/{id}")]
async fn get_my_group(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let group = state
        .group_service
        .get_owned_group(auth.id(), &group_id)
        .await?;
    Ok(HttpResponse::Ok().json(group))
}

#[put("/groups/{id}")]
async fn rename_group(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    request: web::Json<RenameGroupRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state
        .group_service
        .rename_group(auth.id(), &group_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Group renamed".to_string(),
    }))
}

#[delete("/groups/{id}")]
async fn delete_group(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.group_service.delete_group(auth.id(), &group_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[get("/groups/{id}/members")]
async fn list_members(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    query: web::Query<UserNameListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (user_name, page) = query.into_inner().into_parts()?;
    let members = state
        .group_service
        .list_members(auth.id(), &group_id, user_name, page)
        .await?;
    Ok(HttpResponse::Ok().json(members))
}

#[post("/groups/{id}/members")]
async fn add_members(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    request: web::Json<MembersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state
        .group_service
        .add_members(auth.id(), &group_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Members added".to_string(),
    }))
}

#[delete("/groups/{id}/members")]
async fn remove_members(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    request: web::Json<MembersRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state
        .group_service
        .remove_members(auth.id(), &group_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Members removed".to_string(),
    }))
}

#[get("/subscriptions")]
async fn list_subscriptions(
    state: web::Data<Arc<AppState>>,
    query: web::Query<GroupListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (title, page) = query.into_inner().into_parts()?;
    let groups = state
        .group_service
        .list_subscribed_groups(auth.id(), title, page)
        .await?;
    Ok(HttpResponse::Ok().json(groups))
}

#[post("/subscriptions")]
async fn subscribe(
    state: web::Data<Arc<AppState>>,
    request: web::Json<SubscribeRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;
    state
        .group_service
        .subscribe(auth.id(), &request.group_id)
        .await?;
    Ok(HttpResponse::Created().json(MessageResponse {
        message: "Subscribed".to_string(),
    }))
}

#[delete("/subscriptions/{group_id}")]
async fn unsubscribe(
    state: web::Data<Arc<AppState>>,
    group_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.group_service.unsubscribe(auth.id(), &group_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
