//! Listing endpoints under `/api/item`.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use ut_core::query::{AdminItemQuery, ItemQuery};
use ut_core::services::{ItemPatch, NewItem, MAX_ITEM_IMAGES};
use uuid::Uuid;

use super::{envelope, paged};
use crate::error::{ApiError, ApiResult};
use crate::forms::FormData;
use crate::session::{AdminUser, AuthUser, MaybeUser};
use crate::state::AppState;

const IMAGES_FIELD: &str = "images";
const IMAGE_LIMITS: &[(&str, usize)] = &[(IMAGES_FIELD, MAX_ITEM_IMAGES)];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyItemsQuery {
    pub status: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody {
    pub is_active: Option<bool>,
}

impl ToggleBody {
    fn required(&self) -> ApiResult<bool> {
        self.is_active
            .ok_or_else(|| ApiError::invalid("isActive", "is required"))
    }
}

pub async fn list(state: web::Data<AppState>, query: web::Query<ItemQuery>) -> ApiResult<HttpResponse> {
    let page = state.items.list(&query).await?;
    Ok(HttpResponse::Ok().json(paged("items", page)?))
}

pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    let item = state.items.get_by_id(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "item": item }))))
}

/// Multipart listing form. A sixth `images` file rejects the request.
pub async fn add(state: web::Data<AppState>, caller: MaybeUser, payload: Multipart) -> ApiResult<HttpResponse> {
    let mut form = FormData::collect(payload, state.max_upload_bytes, IMAGE_LIMITS).await?;
    let input = NewItem {
        title: form.text("title"),
        description: form.text("description"),
        category: form.text("category"),
        condition: form.text("condition"),
        listing_type: form.text("listingType"),
        price: form.text("price"),
        rent_price: form.text("rentPrice"),
        rent_unit: form.text("rentUnit"),
        security_deposit: form.text("securityDeposit"),
        tags: form.tags("tags"),
    };
    let images = form.take_files(IMAGES_FIELD);
    let actor = caller.0.as_ref().map(|user| user.actor());

    let item = state.items.create(actor.as_ref(), input, images).await?;
    Ok(HttpResponse::Created().json(envelope(json!({ "message": "Item listed successfully", "item": item }))))
}

pub async fn my_items(
    state: web::Data<AppState>,
    auth: AuthUser,
    query: web::Query<MyItemsQuery>,
) -> ApiResult<HttpResponse> {
    let items = state
        .items
        .my_items(&auth.actor(), query.status.as_deref(), query.is_active.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "items": items }))))
}

pub async fn update(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let mut form = FormData::collect(payload, state.max_upload_bytes, IMAGE_LIMITS).await?;
    let patch = ItemPatch {
        title: form.text("title"),
        description: form.text("description"),
        category: form.text("category"),
        condition: form.text("condition"),
        status: form.text("status"),
        price: form.text("price"),
        rent_price: form.text("rentPrice"),
        rent_unit: form.text("rentUnit"),
        security_deposit: form.text("securityDeposit"),
        tags: form.tags("tags"),
        remove_images: form.list("removeImages"),
    };
    let images = form.take_files(IMAGES_FIELD);

    let item = state
        .items
        .update(path.into_inner(), patch, images, &auth.actor())
        .await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Item updated successfully", "item": item }))))
}

pub async fn remove(state: web::Data<AppState>, auth: AuthUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    state.items.soft_delete(path.into_inner(), &auth.actor()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Item deleted successfully" }))))
}

pub async fn toggle_active(
    state: web::Data<AppState>,
    auth: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ToggleBody>,
) -> ApiResult<HttpResponse> {
    let is_active = state
        .items
        .toggle_active(path.into_inner(), body.required()?, &auth.actor())
        .await?;
    Ok(HttpResponse::Ok().json(visibility_body(is_active)))
}

pub async fn admin_list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<AdminItemQuery>,
) -> ApiResult<HttpResponse> {
    let page = state.items.admin_list(&query).await?;
    Ok(HttpResponse::Ok().json(paged("items", page)?))
}

pub async fn admin_toggle_active(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
    body: web::Json<ToggleBody>,
) -> ApiResult<HttpResponse> {
    let is_active = state
        .items
        .admin_set_active(path.into_inner(), body.required()?)
        .await?;
    Ok(HttpResponse::Ok().json(visibility_body(is_active)))
}

pub async fn admin_remove(state: web::Data<AppState>, _admin: AdminUser, path: web::Path<Uuid>) -> ApiResult<HttpResponse> {
    state.items.admin_delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(envelope(json!({ "message": "Item permanently removed" }))))
}

fn visibility_body(is_active: bool) -> serde_json::Value {
    let message = if is_active { "Item is now visible" } else { "Item is now hidden" };
    envelope(json!({ "message": message, "isActive": is_active }))
}
