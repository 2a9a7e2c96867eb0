//! The college directory, fetched once and refreshed on demand.

use reqwest::Method;
use serde::Deserialize;
use ut_core::models::{College, Upload};
use ut_core::services::{CollegePatch, NewCollege};
use uuid::Uuid;

use crate::api::{ApiClient, FormBuilder};
use crate::error::Result;
use crate::state::LoadState;

#[derive(Debug, Deserialize)]
struct CollegesBody {
    colleges: Vec<College>,
}

#[derive(Debug, Deserialize)]
struct CollegeBody {
    college: College,
}

#[derive(Debug, Default)]
pub struct CollegeCache {
    list: Vec<College>,
    status: LoadState,
}

impl CollegeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn colleges(&self) -> &[College] {
        &self.list
    }

    pub fn status(&self) -> &LoadState {
        &self.status
    }

    pub fn find(&self, id: Uuid) -> Option<&College> {
        self.list.iter().find(|college| college.id == id)
    }

    pub async fn refetch(&mut self, api: &ApiClient) -> Result<&[College]> {
        let result = api.get::<CollegesBody>("api/college/list").await;
        let body = self.status.track(result)?;
        self.list = body.colleges;
        Ok(&self.list)
    }

    /// Fetches only when nothing has been loaded yet.
    pub async fn ensure_loaded(&mut self, api: &ApiClient) -> Result<&[College]> {
        if self.status.is_loaded() {
            return Ok(&self.list);
        }
        self.refetch(api).await
    }

    pub async fn create(
        &mut self,
        api: &ApiClient,
        input: NewCollege,
        logo: Option<Upload>,
        banner: Option<Upload>,
    ) -> Result<College> {
        let form = college_form(
            FormBuilder::new()
                .text("code", input.code)
                .text("name", input.name)
                .text("shortName", input.short_name)
                .text("slug", input.slug)
                .text("city", input.city)
                .text("state", input.state)
                .text("country", input.country),
            logo,
            banner,
        )?;
        let body: CollegeBody = api.send_form(Method::POST, "api/college/add", form).await?;
        self.upsert(body.college.clone());
        Ok(body.college)
    }

    pub async fn update(
        &mut self,
        api: &ApiClient,
        id: Uuid,
        patch: CollegePatch,
        logo: Option<Upload>,
        banner: Option<Upload>,
    ) -> Result<College> {
        let form = college_form(
            FormBuilder::new()
                .text("code", patch.code)
                .text("name", patch.name)
                .text("shortName", patch.short_name)
                .text("slug", patch.slug)
                .text("city", patch.city)
                .text("state", patch.state)
                .text("country", patch.country)
                .text("isActive", patch.is_active),
            logo,
            banner,
        )?;
        let path = format!("api/college/update/{id}");
        let body: CollegeBody = api.send_form(Method::PUT, &path, form).await?;
        self.upsert(body.college.clone());
        Ok(body.college)
    }

    pub async fn remove(&mut self, api: &ApiClient, id: Uuid) -> Result<()> {
        let path = format!("api/college/remove/{id}");
        api.send_empty::<serde_json::Value>(Method::DELETE, &path).await?;
        self.list.retain(|college| college.id != id);
        Ok(())
    }

    /// Keeps the list in the server's name order.
    fn upsert(&mut self, college: College) {
        match self.list.iter_mut().find(|existing| existing.id == college.id) {
            Some(existing) => *existing = college,
            None => self.list.push(college),
        }
        self.list.sort_by(|a, b| a.name.cmp(&b.name));
    }
}

fn college_form(
    builder: FormBuilder,
    logo: Option<Upload>,
    banner: Option<Upload>,
) -> Result<reqwest::multipart::Form> {
    let mut builder = builder;
    if let Some(logo) = logo {
        builder = builder.file("logo", logo)?;
    }
    if let Some(banner) = banner {
        builder = builder.file("image", banner)?;
    }
    Ok(builder.build())
}
