//! Account endpoints under `/api/user`.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use ut_core::query::UserQuery;
use ut_core::services::{AdminUserPatch, LoginInput, ProfilePatch, RegisterInput};
use uuid::Uuid;

use super::{envelope, paged};
use crate::error::{ApiError, ApiResult};
use crate::forms::FormData;
use crate::session::{AdminUser, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockBody {
    pub is_blocked: Option<bool>,
}

pub async fn register(state: web::Data<AppState>, body: web::Json<RegisterInput>) -> ApiResult<HttpResponse> {
    let (user, token) = state.users.register(body.into_inner()).await?;
    Ok(HttpResponse::Created()
        .cookie(state.session.cookie(&token))
        .json(envelope(json!({ "message": "Account created", "user": user }))))
}

pub async fn login(state: web::Data<AppState>, body: web::Json<LoginInput>) -> ApiResult<HttpResponse> {
    let (user, token) = state.users.login(body.into_inner()).await?;
    Ok(HttpResponse::Ok()
        .cookie(state.session.cookie(&token))
        .json(envelope(json!({ "user": user }))))
}

pub async fn is_auth(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let user = state.users.profile(auth.0.id).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "user": user }))))
}

pub async fn logout(state: web::Data<AppState>, _auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(state.session.removal())
        .json(envelope(json!({ "message": "user is logged out" })))
}

/// Multipart: `name`, `mobile`, `currentCollege`, optional `avatar` file.
pub async fn update_me(state: web::Data<AppState>, auth: AuthUser, payload: Multipart) -> ApiResult<HttpResponse> {
    let mut form = FormData::collect(payload, state.max_upload_bytes, &[("avatar", 1)]).await?;
    let patch = ProfilePatch {
        name: form.text("name"),
        mobile: form.text("mobile"),
        current_college: form.text("currentCollege"),
    };
    let avatar = form.take_file("avatar");
    let user = state.users.update_me(&auth.actor(), patch, avatar).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Profile updated", "user": user }))))
}

pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<UserQuery>,
) -> ApiResult<HttpResponse> {
    let page = state.users.list_users(&query).await?;
    Ok(HttpResponse::Ok().json(paged("users", page)?))
}

pub async fn set_blocked(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<BlockBody>,
) -> ApiResult<HttpResponse> {
    let blocked = body
        .is_blocked
        .ok_or_else(|| ApiError::invalid("isBlocked", "is required"))?;
    let user = state.users.set_blocked(&admin.actor(), path.into_inner(), blocked).await?;
    let message = if blocked { "User blocked" } else { "User unblocked" };
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": message, "user": user }))))
}

pub async fn admin_update(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<AdminUserPatch>,
) -> ApiResult<HttpResponse> {
    let user = state
        .users
        .admin_update(&admin.actor(), path.into_inner(), body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "User updated", "user": user }))))
}

pub async fn delete_user(state: web::Data<AppState>, admin: AdminUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    state.users.delete_user(&admin.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "User deleted" }))))
}
