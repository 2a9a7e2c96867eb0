//! # ut-client
//!
//! Typed client for the UniTrade REST API. Each cache mirrors one slice of
//! server state (auth, colleges, items, wishlist) and is refreshed
//! explicitly; nothing refetches behind the caller's back.

pub mod api;
pub mod auth;
pub mod colleges;
pub mod error;
pub mod items;
pub mod state;
pub mod wishlist;

pub use api::{ApiClient, FormBuilder};
pub use auth::AuthCache;
pub use colleges::CollegeCache;
pub use error::{ClientError, Result};
pub use items::{FeedMeta, ItemCache};
pub use state::LoadState;
pub use wishlist::WishlistCache;

/// One signed-in session: the transport plus every cache.
#[derive(Debug)]
pub struct Session {
    pub api: ApiClient,
    pub auth: AuthCache,
    pub colleges: CollegeCache,
    pub items: ItemCache,
    pub wishlist: WishlistCache,
}

impl Session {
    pub fn connect(base_url: &str) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(base_url)?,
            auth: AuthCache::new(),
            colleges: CollegeCache::new(),
            items: ItemCache::new(),
            wishlist: WishlistCache::new(),
        })
    }

    /// Forgets everything tied to the signed-in user.
    pub fn reset_user_state(&mut self) {
        self.items = ItemCache::new();
        self.wishlist = WishlistCache::new();
    }
}
