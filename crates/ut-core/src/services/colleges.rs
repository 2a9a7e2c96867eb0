//! # College Directory
//!
//! CRUD over institutions with three independently unique keys. Keys are
//! normalized first (code upper-case, slug lower-case), checked explicitly,
//! and the storage unique index catches anything that slips past the check.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{clean, required, store_single};
use crate::error::{AppError, Result};
use crate::models::{College, Upload};
use crate::traits::{CollegeKey, CollegeRepo, MediaStore};

pub const DEFAULT_COUNTRY: &str = "India";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollege {
    pub code: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub slug: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegePatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub slug: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub is_active: Option<String>,
}

#[derive(Clone)]
pub struct CollegeService {
    colleges: Arc<dyn CollegeRepo>,
    media: Arc<dyn MediaStore>,
}

impl CollegeService {
    pub fn new(colleges: Arc<dyn CollegeRepo>, media: Arc<dyn MediaStore>) -> Self {
        Self { colleges, media }
    }

    pub async fn create(&self, input: NewCollege, logo: Option<Upload>, banner: Option<Upload>) -> Result<College> {
        let code = required("code", input.code.as_deref())?.to_uppercase();
        let name = required("name", input.name.as_deref())?;
        let slug = required("slug", input.slug.as_deref())?.to_lowercase();

        self.ensure_free(CollegeKey::Code, &code, None).await?;
        self.ensure_free(CollegeKey::Slug, &slug, None).await?;
        self.ensure_free(CollegeKey::Name, &name, None).await?;

        let logo_url = store_single(self.media.as_ref(), "logo", logo).await?;
        let image_url = store_single(self.media.as_ref(), "image", banner).await?;

        let now = Utc::now();
        let college = College {
            id: Uuid::now_v7(),
            code,
            name,
            short_name: clean(input.short_name.as_deref()),
            slug,
            city: clean(input.city.as_deref()),
            state: clean(input.state.as_deref()),
            country: clean(input.country.as_deref()).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
            logo_url,
            image_url,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.colleges.insert_college(&college).await?;
        tracing::info!(college_id = %college.id, code = %college.code, "college added");
        Ok(college)
    }

    /// Sorted by name. `active_only` serves signup dropdowns.
    pub async fn list(&self, active_only: bool) -> Result<Vec<College>> {
        self.colleges.list_colleges(active_only).await
    }

    pub async fn get(&self, id: Uuid) -> Result<College> {
        self.colleges
            .get_college(id)
            .await?
            .ok_or_else(|| AppError::not_found("College", id))
    }

    /// Partial update. A missing logo or banner file keeps the stored URL.
    pub async fn update(&self, id: Uuid, patch: CollegePatch, logo: Option<Upload>, banner: Option<Upload>) -> Result<College> {
        let mut college = self.get(id).await?;

        if let Some(raw) = patch.code.as_deref() {
            let code = required("code", Some(raw))?.to_uppercase();
            self.ensure_free(CollegeKey::Code, &code, Some(id)).await?;
            college.code = code;
        }
        if let Some(raw) = patch.name.as_deref() {
            let name = required("name", Some(raw))?;
            self.ensure_free(CollegeKey::Name, &name, Some(id)).await?;
            college.name = name;
        }
        if let Some(raw) = patch.slug.as_deref() {
            let slug = required("slug", Some(raw))?.to_lowercase();
            self.ensure_free(CollegeKey::Slug, &slug, Some(id)).await?;
            college.slug = slug;
        }
        if let Some(raw) = patch.short_name.as_deref() {
            college.short_name = clean(Some(raw));
        }
        if let Some(raw) = patch.city.as_deref() {
            college.city = clean(Some(raw));
        }
        if let Some(raw) = patch.state.as_deref() {
            college.state = clean(Some(raw));
        }
        if let Some(raw) = patch.country.as_deref() {
            college.country = clean(Some(raw)).unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        }
        if let Some(raw) = patch.is_active.as_deref() {
            college.is_active = raw.trim() == "true";
        }

        if let Some(url) = store_single(self.media.as_ref(), "logo", logo).await? {
            college.logo_url = Some(url);
        }
        if let Some(url) = store_single(self.media.as_ref(), "image", banner).await? {
            college.image_url = Some(url);
        }

        college.updated_at = Utc::now();
        self.colleges.update_college(&college).await?;
        tracing::info!(college_id = %id, "college updated");
        Ok(college)
    }

    /// Unconditional delete. Users and items that reference the college keep
    /// the dangling id and render without a college projection.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.colleges.delete_college(id).await? {
            return Err(AppError::not_found("College", id));
        }
        tracing::info!(college_id = %id, "college removed");
        Ok(())
    }

    async fn ensure_free(&self, key: CollegeKey, value: &str, exclude: Option<Uuid>) -> Result<()> {
        if self.colleges.college_key_taken(key, value, exclude).await? {
            return Err(AppError::conflict("College", key.field()));
        }
        Ok(())
    }
}
