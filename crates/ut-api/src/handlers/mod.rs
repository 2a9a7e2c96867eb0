//! # ut-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! services. Every handler answers with the `{success: true, ...}` envelope
//! or an [`ApiError`](crate::error::ApiError).

pub mod colleges;
pub mod health;
pub mod items;
pub mod users;
pub mod wishlist;

use serde::Serialize;
use serde_json::{json, Map, Value};
use ut_core::query::Paginated;

use crate::error::{ApiError, ApiResult};

/// `{"success": true}` merged with the payload's fields.
pub(crate) fn envelope(payload: Value) -> Value {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    if let Value::Object(fields) = payload {
        body.extend(fields);
    }
    Value::Object(body)
}

/// A page of results under `key`, with the pagination numbers beside it.
pub(crate) fn paged<T: Serialize>(key: &str, page: Paginated<T>) -> ApiResult<Value> {
    let items = serde_json::to_value(&page.items).map_err(|err| ApiError(ut_core::AppError::internal(err)))?;
    let mut body = json!({
        "page": page.page,
        "limit": page.limit,
        "total": page.total,
        "pages": page.pages,
    });
    body[key] = items;
    Ok(envelope(body))
}
