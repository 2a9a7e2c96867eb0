//! # Accounts
//!
//! Registration, login, session resolution, self-service profile edits, and
//! the admin moderation operations on users.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{clean, required, store_single};
use crate::error::{AppError, Result};
use crate::models::{Actor, Role, Upload, User, UserProfile};
use crate::query::{parse_id, Paginated, UserQuery};
use crate::traits::{AuthProvider, CollegeRepo, MediaStore, UserKey, UserRepo, WishlistRepo};

pub const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=30;
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<String>,
    pub permanent_college: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Fields a user may change about themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub current_college: Option<String>,
}

/// Fields an administrator may override on any account.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPatch {
    pub name: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<String>,
    pub current_college: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepo>,
    colleges: Arc<dyn CollegeRepo>,
    wishlists: Arc<dyn WishlistRepo>,
    auth: Arc<dyn AuthProvider>,
    media: Arc<dyn MediaStore>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        colleges: Arc<dyn CollegeRepo>,
        wishlists: Arc<dyn WishlistRepo>,
        auth: Arc<dyn AuthProvider>,
        media: Arc<dyn MediaStore>,
    ) -> Self {
        Self {
            users,
            colleges,
            wishlists,
            auth,
            media,
        }
    }

    /// Creates a student or faculty account and returns it with a fresh
    /// session token. The current college starts equal to the permanent one.
    pub async fn register(&self, input: RegisterInput) -> Result<(UserProfile, String)> {
        let username = required("username", input.username.as_deref())?.to_lowercase();
        let name = required("name", input.name.as_deref())?;
        let email = required("email", input.email.as_deref())?.to_lowercase();
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::invalid("password", "is required"))?;
        let mobile = required("mobile", input.mobile.as_deref())?;
        let college_raw = required("permanentCollege", input.permanent_college.as_deref())?;

        if !USERNAME_CHARS.contains(&username.chars().count()) {
            return Err(AppError::invalid("username", "must be between 3 and 30 characters"));
        }
        if !email.contains('@') {
            return Err(AppError::invalid("email", "is not a valid email address"));
        }
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }
        let role = match clean(input.role.as_deref()) {
            None => Role::Student,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|e| AppError::invalid("role", e.to_string()))?,
        };
        if role == Role::Admin {
            return Err(AppError::invalid("role", "admin accounts cannot be self-registered"));
        }
        let college_id = self.existing_college("permanentCollege", &college_raw).await?;

        for (key, value) in [(UserKey::Username, &username), (UserKey::Email, &email), (UserKey::Mobile, &mobile)] {
            self.ensure_free(key, value, None).await?;
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username,
            name,
            email,
            mobile,
            role,
            password_hash: self.auth.hash_password(&password).await?,
            avatar_url: None,
            permanent_college_id: college_id,
            current_college_id: Some(college_id),
            is_blocked: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");

        let token = self.auth.issue_token(user.id)?;
        Ok((self.profile_of(user).await?, token))
    }

    pub async fn login(&self, input: LoginInput) -> Result<(UserProfile, String)> {
        let email = required("email", input.email.as_deref())?.to_lowercase();
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::invalid("password", "is required"))?;

        let mut user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !self.auth.verify_password(&password, &user.password_hash).await {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(AppError::InvalidCredentials);
        }
        if user.is_blocked {
            return Err(AppError::Blocked);
        }

        user.last_login_at = Some(Utc::now());
        self.users.update_user(&user).await?;
        let token = self.auth.issue_token(user.id)?;
        Ok((self.profile_of(user).await?, token))
    }

    /// The auth gate: token to live, unblocked user.
    pub async fn resolve_session(&self, token: &str) -> Result<User> {
        let user_id = self.auth.verify_token(token)?;
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(AppError::InvalidSession)?;
        if user.is_blocked {
            return Err(AppError::Blocked);
        }
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<UserProfile> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User", user_id))?;
        self.profile_of(user).await
    }

    /// Self-service edit. Role, block state, and permanent college are not
    /// reachable from here.
    pub async fn update_me(&self, actor: &Actor, patch: ProfilePatch, avatar: Option<Upload>) -> Result<UserProfile> {
        let mut user = self
            .users
            .get_user(actor.id)
            .await?
            .ok_or(AppError::InvalidSession)?;

        if let Some(raw) = patch.name.as_deref() {
            user.name = required("name", Some(raw))?;
        }
        if let Some(raw) = patch.mobile.as_deref() {
            let mobile = required("mobile", Some(raw))?;
            self.ensure_free(UserKey::Mobile, &mobile, Some(user.id)).await?;
            user.mobile = mobile;
        }
        if let Some(raw) = patch.current_college.as_deref() {
            user.current_college_id = Some(self.existing_college("currentCollege", raw).await?);
        }
        if let Some(url) = store_single(self.media.as_ref(), "avatar", avatar).await? {
            user.avatar_url = Some(url);
        }

        user.updated_at = Utc::now();
        self.users.update_user(&user).await?;
        self.profile_of(user).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<Paginated<User>> {
        let (criteria, page) = query.criteria()?;
        let (users, total) = self.users.list_users(&criteria, page).await?;
        Ok(Paginated::new(users, total, page))
    }

    pub async fn set_blocked(&self, actor: &Actor, id: Uuid, blocked: bool) -> Result<User> {
        if actor.id == id {
            return Err(AppError::invalid("id", "you cannot block yourself"));
        }
        let mut user = self.load(id).await?;
        user.is_blocked = blocked;
        user.updated_at = Utc::now();
        self.users.update_user(&user).await?;
        tracing::info!(user_id = %id, blocked, admin = %actor.id, "block state changed");
        Ok(user)
    }

    pub async fn admin_update(&self, actor: &Actor, id: Uuid, patch: AdminUserPatch) -> Result<UserProfile> {
        let mut user = self.load(id).await?;

        if let Some(raw) = patch.name.as_deref() {
            user.name = required("name", Some(raw))?;
        }
        if let Some(raw) = patch.mobile.as_deref() {
            let mobile = required("mobile", Some(raw))?;
            self.ensure_free(UserKey::Mobile, &mobile, Some(user.id)).await?;
            user.mobile = mobile;
        }
        if let Some(raw) = clean(patch.role.as_deref()) {
            user.role = raw
                .parse::<Role>()
                .map_err(|e| AppError::invalid("role", e.to_string()))?;
        }
        if let Some(raw) = patch.current_college.as_deref() {
            user.current_college_id = Some(self.existing_college("currentCollege", raw).await?);
        }
        if let Some(raw) = patch.avatar_url.as_deref() {
            user.avatar_url = clean(Some(raw));
        }

        user.updated_at = Utc::now();
        self.users.update_user(&user).await?;
        tracing::info!(user_id = %id, admin = %actor.id, "profile overridden by admin");
        self.profile_of(user).await
    }

    /// Hard delete, taking the user's wishlist with it. Listings stay.
    pub async fn delete_user(&self, actor: &Actor, id: Uuid) -> Result<()> {
        if actor.id == id {
            return Err(AppError::invalid("id", "you cannot delete yourself"));
        }
        if !self.users.delete_user(id).await? {
            return Err(AppError::not_found("User", id));
        }
        self.wishlists.delete_wishlist(id).await?;
        tracing::info!(user_id = %id, admin = %actor.id, "user deleted");
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    async fn ensure_free(&self, key: UserKey, value: &str, exclude: Option<Uuid>) -> Result<()> {
        if self.users.user_key_taken(key, value, exclude).await? {
            return Err(AppError::conflict("User", key.field()));
        }
        Ok(())
    }

    async fn existing_college(&self, field: &str, raw: &str) -> Result<Uuid> {
        let id = parse_id(field, Some(raw))?.ok_or_else(|| AppError::invalid(field, "is required"))?;
        match self.colleges.get_college(id).await? {
            Some(_) => Ok(id),
            None => Err(AppError::invalid(field, "unknown college")),
        }
    }

    async fn profile_of(&self, user: User) -> Result<UserProfile> {
        let permanent = self.colleges.get_college(user.permanent_college_id).await?;
        let current = match user.current_college_id {
            Some(id) if id == user.permanent_college_id => permanent.clone(),
            Some(id) => self.colleges.get_college(id).await?,
            None => None,
        };
        Ok(UserProfile {
            permanent_college: permanent.as_ref().map(|c| c.summary()),
            current_college: current.as_ref().map(|c| c.summary()),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockAuthProvider, MockCollegeRepo, MockMediaStore, MockUserRepo, MockWishlistRepo};

    fn service(users: MockUserRepo, auth: MockAuthProvider) -> UserService {
        UserService::new(
            Arc::new(users),
            Arc::new(MockCollegeRepo::new()),
            Arc::new(MockWishlistRepo::new()),
            Arc::new(auth),
            Arc::new(MockMediaStore::new()),
        )
    }

    fn admin() -> Actor {
        Actor {
            id: Uuid::now_v7(),
            role: Role::Admin,
            current_college: None,
        }
    }

    #[tokio::test]
    async fn login_without_password_is_a_validation_error() {
        let svc = service(MockUserRepo::new(), MockAuthProvider::new());
        let err = svc
            .login(LoginInput {
                email: Some("a@b.edu".into()),
                password: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, AppError::invalid("password", "is required"));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_the_same() {
        let mut users = MockUserRepo::new();
        users.expect_find_user_by_email().returning(|_| Ok(None));
        let svc = service(users, MockAuthProvider::new());
        let err = svc
            .login(LoginInput {
                email: Some("ghost@b.edu".into()),
                password: Some("secret1".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AppError::InvalidCredentials);
    }

    #[tokio::test]
    async fn self_block_and_self_delete_are_rejected() {
        let mut users = MockUserRepo::new();
        users.expect_update_user().never();
        users.expect_delete_user().never();
        let svc = service(users, MockAuthProvider::new());
        let me = admin();

        assert!(matches!(
            svc.set_blocked(&me, me.id, true).await,
            Err(AppError::ValidationError { .. })
        ));
        assert!(matches!(svc.delete_user(&me, me.id).await, Err(AppError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn blocked_user_session_is_refused() {
        let blocked_id = Uuid::now_v7();
        let mut auth = MockAuthProvider::new();
        auth.expect_verify_token().returning(move |_| Ok(blocked_id));
        let mut users = MockUserRepo::new();
        users.expect_get_user().returning(|id| {
            Ok(Some(User {
                id,
                username: "blocked".into(),
                name: "Blocked".into(),
                email: "b@b.edu".into(),
                mobile: "1".into(),
                role: Role::Student,
                password_hash: String::new(),
                avatar_url: None,
                permanent_college_id: Uuid::now_v7(),
                current_college_id: None,
                is_blocked: true,
                last_login_at: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }))
        });
        let svc = service(users, auth);
        assert_eq!(svc.resolve_session("tok").await.unwrap_err(), AppError::Blocked);
    }

    #[tokio::test]
    async fn admin_role_cannot_be_self_registered() {
        let svc = service(MockUserRepo::new(), MockAuthProvider::new());
        let err = svc
            .register(RegisterInput {
                username: Some("root".into()),
                name: Some("Root".into()),
                email: Some("root@b.edu".into()),
                password: Some("secret1".into()),
                mobile: Some("999".into()),
                role: Some("admin".into()),
                permanent_college: Some(Uuid::now_v7().to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError { ref field, .. } if field == "role"));
    }
}
