//! # Wishlist
//!
//! A per-user set of bookmarked items. Membership is checked before every
//! insert; duplicates are rejected with `AlreadyExists` rather than ignored.
//! Add and remove are read-modify-write on the whole document without a
//! version check, so two concurrent adds of the same item can both succeed.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Wishlist, WishlistView};
use crate::traits::{ItemRepo, WishlistRepo};

#[derive(Clone)]
pub struct WishlistService {
    wishlists: Arc<dyn WishlistRepo>,
    items: Arc<dyn ItemRepo>,
}

impl WishlistService {
    pub fn new(wishlists: Arc<dyn WishlistRepo>, items: Arc<dyn ItemRepo>) -> Self {
        Self { wishlists, items }
    }

    /// Returns the populated wishlist, creating an empty one on first access.
    pub async fn get_or_create(&self, user_id: Uuid) -> Result<WishlistView> {
        let wishlist = self.load_or_create(user_id).await?;
        self.populate(wishlist).await
    }

    pub async fn add(&self, user_id: Uuid, item_id: Uuid) -> Result<WishlistView> {
        let item = self
            .items
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Item", item_id))?;
        if !item.is_on_offer() {
            return Err(AppError::Unavailable("item is not available".into()));
        }

        let mut wishlist = match self.wishlists.get_wishlist(user_id).await? {
            Some(existing) => existing,
            None => Wishlist::empty(user_id),
        };
        if wishlist.contains(item_id) {
            return Err(AppError::AlreadyExists("item in wishlist".into()));
        }
        wishlist.items.push(item_id);
        wishlist.updated_at = Utc::now();
        self.wishlists.save_wishlist(&wishlist).await?;
        tracing::debug!(%user_id, %item_id, "wishlist add");

        self.populate(wishlist).await
    }

    pub async fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<WishlistView> {
        let mut wishlist = self
            .wishlists
            .get_wishlist(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("Wishlist", user_id))?;
        if !wishlist.contains(item_id) {
            return Err(AppError::NotInWishlist);
        }
        wishlist.items.retain(|id| *id != item_id);
        wishlist.updated_at = Utc::now();
        self.wishlists.save_wishlist(&wishlist).await?;
        tracing::debug!(%user_id, %item_id, "wishlist remove");

        self.populate(wishlist).await
    }

    /// Empties the wishlist. Succeeds whether or not one existed.
    pub async fn clear(&self, user_id: Uuid) -> Result<WishlistView> {
        let mut wishlist = self.load_or_create(user_id).await?;
        if !wishlist.items.is_empty() {
            wishlist.items.clear();
            wishlist.updated_at = Utc::now();
            self.wishlists.save_wishlist(&wishlist).await?;
        }
        self.populate(wishlist).await
    }

    /// Membership on the raw document; no population.
    pub async fn contains(&self, user_id: Uuid, item_id: Uuid) -> Result<bool> {
        Ok(self
            .wishlists
            .get_wishlist(user_id)
            .await?
            .is_some_and(|wishlist| wishlist.contains(item_id)))
    }

    /// Entry count on the raw document, dangling references included.
    pub async fn count(&self, user_id: Uuid) -> Result<usize> {
        Ok(self
            .wishlists
            .get_wishlist(user_id)
            .await?
            .map_or(0, |wishlist| wishlist.items.len()))
    }

    async fn load_or_create(&self, user_id: Uuid) -> Result<Wishlist> {
        if let Some(existing) = self.wishlists.get_wishlist(user_id).await? {
            return Ok(existing);
        }
        let wishlist = Wishlist::empty(user_id);
        self.wishlists.save_wishlist(&wishlist).await?;
        Ok(wishlist)
    }

    async fn populate(&self, wishlist: Wishlist) -> Result<WishlistView> {
        let items = self.items.item_views(&wishlist.items).await?;
        Ok(WishlistView {
            user_id: wishlist.user_id,
            items,
            created_at: wishlist.created_at,
            updated_at: wishlist.updated_at,
        })
    }
}
