//! The caller's wishlist, mirrored from `/api/wishlist/*`. Every mutation
//! replaces the cache with the populated wishlist the server returns.

use reqwest::Method;
use serde::Deserialize;
use ut_core::models::WishlistView;
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::Result;
use crate::state::LoadState;

#[derive(Debug, Deserialize)]
struct WishlistBody {
    wishlist: WishlistView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckBody {
    is_in_wishlist: bool,
}

#[derive(Debug, Deserialize)]
struct CountBody {
    count: usize,
}

#[derive(Debug, Default)]
pub struct WishlistCache {
    wishlist: Option<WishlistView>,
    status: LoadState,
}

impl WishlistCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wishlist(&self) -> Option<&WishlistView> {
        self.wishlist.as_ref()
    }

    pub fn status(&self) -> &LoadState {
        &self.status
    }

    /// Local membership test against the last fetched wishlist.
    pub fn contains(&self, item_id: Uuid) -> bool {
        self.wishlist
            .as_ref()
            .is_some_and(|list| list.items.iter().any(|view| view.item.id == item_id))
    }

    pub fn len(&self) -> usize {
        self.wishlist.as_ref().map_or(0, |list| list.items.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn refetch(&mut self, api: &ApiClient) -> Result<&WishlistView> {
        let result = api.get::<WishlistBody>("api/wishlist").await;
        let body = self.status.track(result)?;
        Ok(self.wishlist.insert(body.wishlist))
    }

    pub async fn add(&mut self, api: &ApiClient, item_id: Uuid) -> Result<&WishlistView> {
        let path = format!("api/wishlist/add/{item_id}");
        let body: WishlistBody = api.send_empty(Method::POST, &path).await?;
        Ok(self.wishlist.insert(body.wishlist))
    }

    pub async fn remove(&mut self, api: &ApiClient, item_id: Uuid) -> Result<&WishlistView> {
        let path = format!("api/wishlist/remove/{item_id}");
        let body: WishlistBody = api.send_empty(Method::DELETE, &path).await?;
        Ok(self.wishlist.insert(body.wishlist))
    }

    pub async fn clear(&mut self, api: &ApiClient) -> Result<&WishlistView> {
        let body: WishlistBody = api.send_empty(Method::DELETE, "api/wishlist/clear").await?;
        Ok(self.wishlist.insert(body.wishlist))
    }

    /// Asks the server, bypassing the cache.
    pub async fn check(&self, api: &ApiClient, item_id: Uuid) -> Result<bool> {
        let path = format!("api/wishlist/check/{item_id}");
        let body: CheckBody = api.get(&path).await?;
        Ok(body.is_in_wishlist)
    }

    /// Server-side count, bypassing the cache.
    pub async fn count(&self, api: &ApiClient) -> Result<usize> {
        let body: CountBody = api.get("api/wishlist/count").await?;
        Ok(body.count)
    }
}
