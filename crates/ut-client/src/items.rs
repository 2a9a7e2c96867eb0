//! Feed, item detail and "my items" caches over `/api/item/*`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use ut_core::models::{ItemView, Upload};
use ut_core::query::{ItemQuery, Paginated, DEFAULT_PAGE_LIMIT};
use ut_core::services::{ItemPatch, NewItem, TagsInput, MAX_ITEM_IMAGES};
use uuid::Uuid;

use crate::api::{ApiClient, FormBuilder};
use crate::error::{ClientError, Result};
use crate::state::LoadState;

#[derive(Debug, Deserialize)]
struct ItemBody {
    item: ItemView,
}

#[derive(Debug, Deserialize)]
struct ItemsBody {
    items: Vec<ItemView>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityBody {
    is_active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityRequest {
    is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedMeta {
    pub page: u32,
    pub pages: u64,
    pub total: u64,
    pub limit: u32,
}

impl Default for FeedMeta {
    fn default() -> Self {
        Self {
            page: 1,
            pages: 1,
            total: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Default)]
pub struct ItemCache {
    feed: Vec<ItemView>,
    feed_meta: FeedMeta,
    feed_status: LoadState,
    by_id: HashMap<Uuid, ItemView>,
    item_status: LoadState,
    mine: Vec<ItemView>,
}

impl ItemCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> &[ItemView] {
        &self.feed
    }

    pub fn feed_meta(&self) -> FeedMeta {
        self.feed_meta
    }

    pub fn feed_status(&self) -> &LoadState {
        &self.feed_status
    }

    pub fn item(&self, id: Uuid) -> Option<&ItemView> {
        self.by_id.get(&id)
    }

    pub fn item_status(&self) -> &LoadState {
        &self.item_status
    }

    pub fn mine(&self) -> &[ItemView] {
        &self.mine
    }

    pub fn clear_feed(&mut self) {
        self.feed.clear();
        self.feed_meta = FeedMeta::default();
        self.feed_status = LoadState::Idle;
    }

    pub async fn fetch_feed(&mut self, api: &ApiClient, query: &ItemQuery) -> Result<&[ItemView]> {
        let result = api.get_with::<Paginated<ItemView>, _>("api/item/list", query).await;
        let page = self.feed_status.track(result)?;
        self.apply_feed(page);
        Ok(&self.feed)
    }

    /// One page of available items in a college's feed.
    pub async fn fetch_college_feed(
        &mut self,
        api: &ApiClient,
        college: Uuid,
        page: u32,
        limit: u32,
    ) -> Result<&[ItemView]> {
        let query = ItemQuery {
            college: Some(college.to_string()),
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
            status: Some("available".to_string()),
            ..ItemQuery::default()
        };
        self.fetch_feed(api, &query).await
    }

    pub async fn fetch_item(&mut self, api: &ApiClient, id: Uuid) -> Result<&ItemView> {
        let path = format!("api/item/get/{id}");
        let result = api.get::<ItemBody>(&path).await;
        let body = self.item_status.track(result)?;
        let cached = match self.by_id.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(body.item);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(body.item),
        };
        Ok(cached)
    }

    pub async fn fetch_mine(&mut self, api: &ApiClient) -> Result<&[ItemView]> {
        let body: ItemsBody = api.get("api/item/my-items").await?;
        self.mine = body.items;
        Ok(&self.mine)
    }

    /// Lists a new item. More than five images are refused before upload.
    pub async fn create(&mut self, api: &ApiClient, input: NewItem, images: Vec<Upload>) -> Result<ItemView> {
        if images.len() > MAX_ITEM_IMAGES {
            return Err(ClientError::Rejected(format!(
                "at most {MAX_ITEM_IMAGES} images can be uploaded"
            )));
        }
        let form = FormBuilder::new()
            .text("title", input.title)
            .text("description", input.description)
            .text("category", input.category)
            .text("condition", input.condition)
            .text("listingType", input.listing_type)
            .text("price", input.price)
            .text("rentPrice", input.rent_price)
            .text("rentUnit", input.rent_unit)
            .text("securityDeposit", input.security_deposit)
            .text("tags", input.tags.as_ref().map(tags_text))
            .files("images", images)?
            .build();
        let body: ItemBody = api.send_form(Method::POST, "api/item/add", form).await?;
        self.mine.insert(0, body.item.clone());
        Ok(body.item)
    }

    pub async fn update(&mut self, api: &ApiClient, id: Uuid, patch: ItemPatch, images: Vec<Upload>) -> Result<ItemView> {
        let form = FormBuilder::new()
            .text("title", patch.title)
            .text("description", patch.description)
            .text("category", patch.category)
            .text("condition", patch.condition)
            .text("status", patch.status)
            .text("price", patch.price)
            .text("rentPrice", patch.rent_price)
            .text("rentUnit", patch.rent_unit)
            .text("securityDeposit", patch.security_deposit)
            .text("tags", patch.tags.as_ref().map(tags_text))
            .texts("removeImages", &patch.remove_images)
            .files("images", images)?
            .build();
        let path = format!("api/item/update/{id}");
        let body: ItemBody = api.send_form(Method::PUT, &path, form).await?;
        self.replace(body.item.clone());
        Ok(body.item)
    }

    /// Soft delete: the item leaves the feed but stays in "my items" as hidden.
    pub async fn remove(&mut self, api: &ApiClient, id: Uuid) -> Result<()> {
        let path = format!("api/item/remove/{id}");
        api.send_empty::<serde_json::Value>(Method::DELETE, &path).await?;
        self.set_visibility(id, false);
        Ok(())
    }

    pub async fn toggle_active(&mut self, api: &ApiClient, id: Uuid, is_active: bool) -> Result<bool> {
        let path = format!("api/item/toggle-active/{id}");
        let body: VisibilityBody = api
            .send_json(Method::PATCH, &path, &VisibilityRequest { is_active })
            .await?;
        self.set_visibility(id, body.is_active);
        Ok(body.is_active)
    }

    fn apply_feed(&mut self, page: Paginated<ItemView>) {
        self.feed_meta = FeedMeta {
            page: page.page,
            pages: page.pages,
            total: page.total,
            limit: page.limit,
        };
        self.feed = page.items;
    }

    fn replace(&mut self, view: ItemView) {
        let id = view.item.id;
        for slot in self.feed.iter_mut().chain(self.mine.iter_mut()) {
            if slot.item.id == id {
                *slot = view.clone();
            }
        }
        if let Some(cached) = self.by_id.get_mut(&id) {
            *cached = view;
        }
    }

    /// The public feed only ever shows active items.
    fn set_visibility(&mut self, id: Uuid, is_active: bool) {
        for view in self.mine.iter_mut() {
            if view.item.id == id {
                view.item.is_active = is_active;
            }
        }
        if !is_active {
            self.feed.retain(|view| view.item.id != id);
            self.by_id.remove(&id);
        }
    }
}

fn tags_text(tags: &TagsInput) -> String {
    tags.normalize().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ut_core::models::{Category, Condition, Item, ItemStatus, Pricing};

    fn view(title: &str) -> ItemView {
        let now = Utc::now();
        ItemView {
            item: Item {
                id: Uuid::now_v7(),
                title: title.to_string(),
                description: None,
                category: Category::Books,
                condition: Condition::Good,
                pricing: Pricing::Sell { price: 100.0 },
                image_urls: vec![],
                seller_id: Uuid::now_v7(),
                college_id: Uuid::now_v7(),
                is_active: true,
                status: ItemStatus::Available,
                views: 0,
                tags: vec![],
                created_at: now,
                updated_at: now,
            },
            seller: None,
            college: None,
        }
    }

    #[test]
    fn feed_page_replaces_items_and_meta() {
        let mut cache = ItemCache::new();
        let items = vec![view("a"), view("b")];
        cache.apply_feed(Paginated {
            items,
            total: 22,
            page: 2,
            pages: 2,
            limit: 20,
        });
        assert_eq!(cache.feed().len(), 2);
        assert_eq!(cache.feed_meta().total, 22);

        cache.clear_feed();
        assert!(cache.feed().is_empty());
        assert_eq!(cache.feed_meta(), FeedMeta::default());
    }

    #[test]
    fn hiding_an_item_drops_it_from_the_feed_but_not_from_mine() {
        let mut cache = ItemCache::new();
        let item = view("lamp");
        let id = item.item.id;
        cache.feed = vec![item.clone()];
        cache.mine = vec![item.clone()];
        cache.by_id.insert(id, item);

        cache.set_visibility(id, false);
        assert!(cache.feed().is_empty());
        assert!(cache.item(id).is_none());
        assert_eq!(cache.mine().len(), 1);
        assert!(!cache.mine()[0].item.is_active);
    }

    #[test]
    fn updated_item_is_replaced_everywhere_it_is_cached() {
        let mut cache = ItemCache::new();
        let original = view("old title");
        let id = original.item.id;
        cache.feed = vec![original.clone()];
        cache.by_id.insert(id, original.clone());

        let mut updated = original;
        updated.item.title = "new title".to_string();
        cache.replace(updated);

        assert_eq!(cache.feed()[0].item.title, "new title");
        assert_eq!(cache.item(id).unwrap().item.title, "new title");
    }

    #[tokio::test]
    async fn six_images_are_refused_without_a_request() {
        // Nothing listens on this port; a request would fail with a transport error.
        let api = ApiClient::new("http://127.0.0.1:9").unwrap();
        let images = (0..6)
            .map(|i| Upload {
                filename: Some(format!("{i}.png")),
                content_type: "image/png".to_string(),
                data: vec![1, 2, 3],
            })
            .collect();
        let err = ItemCache::new()
            .create(&api, NewItem::default(), images)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
    }

    #[test]
    fn tags_are_sent_as_one_comma_separated_field() {
        let tags = TagsInput::List(vec![" calculus ".into(), "".into(), "maths".into()]);
        assert_eq!(tags_text(&tags), "calculus,maths");
    }
}
