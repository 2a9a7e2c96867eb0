//! # Services
//!
//! Orchestration between the ports. Each service owns `Arc`s to the ports it
//! needs and is cheap to clone into every HTTP worker.

pub mod colleges;
pub mod items;
pub mod users;
pub mod wishlist;

pub use colleges::{CollegePatch, CollegeService, NewCollege};
pub use items::{ItemPatch, ItemService, NewItem, TagsInput, MAX_ITEM_IMAGES};
pub use users::{AdminUserPatch, LoginInput, ProfilePatch, RegisterInput, UserService};
pub use wishlist::WishlistService;

use crate::error::{AppError, Result};
use crate::models::Upload;
use crate::traits::MediaStore;

/// Stores each upload and returns the URLs of those that succeeded.
/// A failed upload is logged and dropped; it never fails the batch.
pub(crate) async fn store_uploads(media: &dyn MediaStore, uploads: Vec<Upload>) -> Vec<String> {
    let mut urls = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let filename = upload.filename.clone().unwrap_or_default();
        match media.save_upload(upload.data, &upload.content_type).await {
            Ok(media_id) => urls.push(media.get_url(&media_id)),
            Err(err) => tracing::warn!(%filename, error = %err, "dropping failed image upload"),
        }
    }
    urls
}

/// Stores a single optional upload (logo, banner, avatar).
pub(crate) async fn store_single(media: &dyn MediaStore, field: &str, upload: Option<Upload>) -> Result<Option<String>> {
    let Some(upload) = upload else {
        return Ok(None);
    };
    let media_id = media
        .save_upload(upload.data, &upload.content_type)
        .await
        .map_err(|err| {
            tracing::warn!(field, error = %err, "upload rejected");
            AppError::invalid(field, "file could not be stored as an image")
        })?;
    Ok(Some(media.get_url(&media_id)))
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn clean(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Required trimmed value.
pub(crate) fn required(field: &str, raw: Option<&str>) -> Result<String> {
    clean(raw).ok_or_else(|| AppError::invalid(field, "is required"))
}

/// A non-negative finite amount in a form field.
pub(crate) fn parse_amount(field: &str, raw: Option<&str>) -> Result<f64> {
    let raw = raw.map(str::trim).unwrap_or_default();
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(AppError::invalid(field, "must be a non-negative number")),
    }
}
