//! Shared application state handed to every actix worker.

use std::sync::Arc;

use ut_core::services::{CollegeService, ItemService, UserService, WishlistService};
use ut_core::traits::{AuthProvider, CollegeRepo, ItemRepo, MediaStore, UserRepo, WishlistRepo};

use crate::session::SessionPolicy;

/// The plugin implementations the binary selected at compile time.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepo>,
    pub colleges: Arc<dyn CollegeRepo>,
    pub items: Arc<dyn ItemRepo>,
    pub wishlists: Arc<dyn WishlistRepo>,
    pub media: Arc<dyn MediaStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Ports {
    /// One store implementing every repository port.
    pub fn from_store<R>(store: Arc<R>, media: Arc<dyn MediaStore>, auth: Arc<dyn AuthProvider>) -> Self
    where
        R: UserRepo + CollegeRepo + ItemRepo + WishlistRepo + 'static,
    {
        Self {
            users: store.clone(),
            colleges: store.clone(),
            items: store.clone(),
            wishlists: store,
            media,
            auth,
        }
    }
}

/// State shared across all Actix-web workers.
pub struct AppState {
    pub users: UserService,
    pub items: ItemService,
    pub colleges: CollegeService,
    pub wishlist: WishlistService,
    pub session: SessionPolicy,
    /// Per-file ceiling for multipart uploads.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(ports: Ports, session: SessionPolicy, max_upload_bytes: usize) -> Self {
        Self {
            users: UserService::new(
                ports.users.clone(),
                ports.colleges.clone(),
                ports.wishlists.clone(),
                ports.auth.clone(),
                ports.media.clone(),
            ),
            items: ItemService::new(ports.items.clone(), ports.media.clone()),
            colleges: CollegeService::new(ports.colleges.clone(), ports.media.clone()),
            wishlist: WishlistService::new(ports.wishlists.clone(), ports.items.clone()),
            session,
            max_upload_bytes,
        }
    }
}
