//! College directory endpoints under `/api/college`.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use ut_core::services::{CollegePatch, NewCollege};
use uuid::Uuid;

use super::envelope;
use crate::error::ApiResult;
use crate::forms::FormData;
use crate::session::AdminUser;
use crate::state::AppState;

const COLLEGE_FILES: &[(&str, usize)] = &[("logo", 1), ("image", 1)];

#[derive(Debug, Default, Deserialize)]
pub struct CollegeListQuery {
    /// `true` limits the list to active colleges (signup dropdowns).
    pub active: Option<String>,
}

/// Multipart: text fields plus optional `logo` and `image` files.
pub async fn add(state: web::Data<AppState>, _admin: AdminUser, payload: Multipart) -> ApiResult<HttpResponse> {
    let mut form = FormData::collect(payload, state.max_upload_bytes, COLLEGE_FILES).await?;
    let input = NewCollege {
        code: form.text("code"),
        name: form.text("name"),
        short_name: form.text("shortName"),
        slug: form.text("slug"),
        city: form.text("city"),
        state: form.text("state"),
        country: form.text("country"),
    };
    let logo = form.take_file("logo");
    let banner = form.take_file("image");

    let college = state.colleges.create(input, logo, banner).await?;
    Ok(HttpResponse::Created().json(envelope(json!({ "message": "College added successfully", "college": college }))))
}

pub async fn list(state: web::Data<AppState>, query: web::Query<CollegeListQuery>) -> ApiResult<HttpResponse> {
    let active_only = query.active.as_deref().map(str::trim) == Some("true");
    let colleges = state.colleges.list(active_only).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "colleges": colleges }))))
}

pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let college = state.colleges.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "college": college }))))
}

pub async fn update(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = FormData::collect(payload, state.max_upload_bytes, COLLEGE_FILES).await?;
    let patch = CollegePatch {
        code: form.text("code"),
        name: form.text("name"),
        short_name: form.text("shortName"),
        slug: form.text("slug"),
        city: form.text("city"),
        state: form.text("state"),
        country: form.text("country"),
        is_active: form.text("isActive"),
    };
    let logo = form.take_file("logo");
    let banner = form.take_file("image");

    let college = state.colleges.update(path.into_inner(), patch, logo, banner).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "College updated successfully", "college": college }))))
}

pub async fn remove(state: web::Data<AppState>, _admin: AdminUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    state.colleges.delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "College removed successfully" }))))
}
