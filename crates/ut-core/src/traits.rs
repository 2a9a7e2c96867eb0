//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.
//! Repositories speak `AppError` so that storage-level uniqueness failures
//! arrive at the services already translated into `Conflict`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{College, Item, ItemView, Projection, User, Wishlist};
use crate::query::{ItemCriteria, PageRequest, UserCriteria};

/// User fields that carry a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserKey {
    Username,
    Email,
    Mobile,
}

impl UserKey {
    pub fn field(&self) -> &'static str {
        match self {
            UserKey::Username => "username",
            UserKey::Email => "email",
            UserKey::Mobile => "mobile",
        }
    }
}

/// College fields that carry a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollegeKey {
    Code,
    Name,
    Slug,
}

impl CollegeKey {
    pub fn field(&self) -> &'static str {
        match self {
            CollegeKey::Code => "code",
            CollegeKey::Name => "name",
            CollegeKey::Slug => "slug",
        }
    }
}

/// Persistence contract for accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// True when another user (not `exclude`) already holds `value` for `key`.
    async fn user_key_taken(&self, key: UserKey, value: &str, exclude: Option<Uuid>) -> Result<bool>;
    async fn update_user(&self, user: &User) -> Result<()>;
    /// Hard delete; returns false when no row matched.
    async fn delete_user(&self, id: Uuid) -> Result<bool>;
    async fn list_users(&self, criteria: &UserCriteria, page: PageRequest) -> Result<(Vec<User>, u64)>;
}

/// Persistence contract for the college directory.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CollegeRepo: Send + Sync {
    async fn insert_college(&self, college: &College) -> Result<()>;
    async fn get_college(&self, id: Uuid) -> Result<Option<College>>;
    /// Sorted by name.
    async fn list_colleges(&self, active_only: bool) -> Result<Vec<College>>;
    /// Case-insensitive for slugs.
    async fn college_key_taken(&self, key: CollegeKey, value: &str, exclude: Option<Uuid>) -> Result<bool>;
    async fn update_college(&self, college: &College) -> Result<()>;
    async fn delete_college(&self, id: Uuid) -> Result<bool>;
}

/// Persistence contract for listings.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn insert_item(&self, item: &Item) -> Result<()>;
    async fn get_item(&self, id: Uuid) -> Result<Option<Item>>;
    async fn get_item_view(&self, id: Uuid, projection: Projection) -> Result<Option<ItemView>>;
    /// Newest first. `None` page returns every match; the count is always
    /// the full match count.
    async fn find_items(&self, criteria: &ItemCriteria, page: Option<PageRequest>) -> Result<(Vec<ItemView>, u64)>;
    /// Populates `ids` in the given order, skipping ids with no row.
    async fn item_views(&self, ids: &[Uuid]) -> Result<Vec<ItemView>>;
    async fn update_item(&self, item: &Item) -> Result<()>;
    /// Atomic `views + 1`; returns false when no row matched.
    async fn increment_views(&self, id: Uuid) -> Result<bool>;
    async fn set_item_active(&self, id: Uuid, active: bool) -> Result<bool>;
    async fn delete_item(&self, id: Uuid) -> Result<bool>;
}

/// Persistence contract for wishlists. Set semantics live in the service.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait WishlistRepo: Send + Sync {
    async fn get_wishlist(&self, user_id: Uuid) -> Result<Option<Wishlist>>;
    /// Insert or replace the whole document.
    async fn save_wishlist(&self, wishlist: &Wishlist) -> Result<()>;
    async fn delete_wishlist(&self, user_id: Uuid) -> Result<()>;
}

/// Media storage contract for handling uploads and thumbnails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns a media_id.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    /// Returns the public URL of the original media.
    fn get_url(&self, media_id: &str) -> String;
    /// Returns the public URL of the thumbnail.
    fn get_thumbnail_url(&self, media_id: &str) -> String;
}

/// Credential and session-token contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a salted hash suitable for storage.
    async fn hash_password(&self, password: &str) -> Result<String>;

    /// Verifies if a provided password matches a stored hash.
    async fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// Signs a session token naming `user_id`.
    fn issue_token(&self, user_id: Uuid) -> Result<String>;

    /// Checks signature and expiry, returning the user id the token names.
    fn verify_token(&self, token: &str) -> Result<Uuid>;
}
