//! The signed-in user, mirrored from `/api/user/*`.

use reqwest::Method;
use serde::Deserialize;
use ut_core::models::{Upload, UserProfile};
use ut_core::services::{LoginInput, ProfilePatch, RegisterInput};

use crate::api::{ApiClient, FormBuilder};
use crate::error::Result;
use crate::state::LoadState;

#[derive(Debug, Deserialize)]
struct UserBody {
    user: UserProfile,
}

#[derive(Debug, Default)]
pub struct AuthCache {
    user: Option<UserProfile>,
    /// True until the first identity check has finished.
    booting: bool,
    status: LoadState,
}

impl AuthCache {
    pub fn new() -> Self {
        Self {
            booting: true,
            ..Self::default()
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_booting(&self) -> bool {
        self.booting
    }

    pub fn status(&self) -> &LoadState {
        &self.status
    }

    pub fn clear_error(&mut self) {
        if self.status.error().is_some() {
            self.status = LoadState::Idle;
        }
    }

    /// Resolves the session cookie into a user. Any failure means "signed out".
    pub async fn check(&mut self, api: &ApiClient) -> Option<&UserProfile> {
        let result = api.get::<UserBody>("api/user/is-auth").await;
        self.booting = false;
        self.user = match result {
            Ok(body) => Some(body.user),
            Err(err) => {
                tracing::debug!(error = %err, "no active session");
                None
            }
        };
        self.user.as_ref()
    }

    pub async fn register(&mut self, api: &ApiClient, input: &RegisterInput) -> Result<&UserProfile> {
        let result = api
            .send_json::<UserBody, _>(Method::POST, "api/user/register", input)
            .await;
        let body = self.status.track(result)?;
        Ok(self.user.insert(body.user))
    }

    /// Logs in, then re-reads the identity so the cache holds the same shape
    /// as a fresh `check`.
    pub async fn login(&mut self, api: &ApiClient, email: &str, password: &str) -> Result<&UserProfile> {
        let input = LoginInput {
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let result = match api
            .send_json::<UserBody, _>(Method::POST, "api/user/login", &input)
            .await
        {
            Ok(_) => api.get::<UserBody>("api/user/is-auth").await,
            Err(err) => Err(err),
        };
        let body = self.status.track(result)?;
        Ok(self.user.insert(body.user))
    }

    pub async fn logout(&mut self, api: &ApiClient) -> Result<()> {
        api.send_empty::<serde_json::Value>(Method::POST, "api/user/logout").await?;
        self.user = None;
        Ok(())
    }

    pub async fn update_profile(
        &mut self,
        api: &ApiClient,
        patch: ProfilePatch,
        avatar: Option<Upload>,
    ) -> Result<&UserProfile> {
        let mut form = FormBuilder::new()
            .text("name", patch.name)
            .text("mobile", patch.mobile)
            .text("currentCollege", patch.current_college);
        if let Some(avatar) = avatar {
            form = form.file("avatar", avatar)?;
        }
        let result = api
            .send_form::<UserBody>(Method::PATCH, "api/user/me", form.build())
            .await;
        let body = self.status.track(result)?;
        Ok(self.user.insert(body.user))
    }
}
