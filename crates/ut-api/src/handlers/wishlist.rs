//! Wishlist endpoints under `/api/wishlist`. Always the caller's own list.

use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use super::envelope;
use crate::error::ApiResult;
use crate::session::AuthUser;
use crate::state::AppState;

pub async fn get(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let wishlist = state.wishlist.get_or_create(auth.0.id).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "wishlist": wishlist }))))
}

pub async fn add(state: web::Data<AppState>, auth: AuthUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let wishlist = state.wishlist.add(auth.0.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Item added to wishlist", "wishlist": wishlist }))))
}

pub async fn remove(state: web::Data<AppState>, auth: AuthUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let wishlist = state.wishlist.remove(auth.0.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Item removed from wishlist", "wishlist": wishlist }))))
}

pub async fn clear(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let wishlist = state.wishlist.clear(auth.0.id).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Wishlist cleared", "wishlist": wishlist }))))
}

pub async fn check(state: web::Data<AppState>, auth: AuthUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let is_in_wishlist = state.wishlist.contains(auth.0.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "isInWishlist": is_in_wishlist }))))
}

pub async fn count(state: web::Data<AppState>, auth: AuthUser) -> ApiResult<HttpResponse> {
    let count = state.wishlist.count(auth.0.id).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "count": count }))))
}
