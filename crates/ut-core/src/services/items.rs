//! # Item Directory
//!
//! Create, list, fetch, update, and retire listings. Listing creation pins the
//! seller's current college; the feed only ever shows active items of the
//! requested (default `available`) status.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::{clean, parse_amount, required, store_uploads};
use crate::error::{AppError, Result};
use crate::models::{
    Actor, Category, Condition, Item, ItemStatus, ItemView, ListingType, Pricing, Projection, RentUnit, Upload,
};
use crate::query::{AdminItemQuery, ItemCriteria, ItemQuery, Paginated};
use crate::traits::{ItemRepo, MediaStore};

pub const MAX_ITEM_IMAGES: usize = 5;
pub const MAX_TITLE_CHARS: usize = 80;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Tags arrive either as one comma-separated string or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    /// Trimmed, non-empty tags in input order. Duplicates are kept.
    pub fn normalize(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            TagsInput::Csv(csv) => csv.split(',').collect(),
            TagsInput::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Listing form as submitted. Numbers stay textual until validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub listing_type: Option<String>,
    pub price: Option<String>,
    pub rent_price: Option<String>,
    pub rent_unit: Option<String>,
    pub security_deposit: Option<String>,
    pub tags: Option<TagsInput>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    pub rent_price: Option<String>,
    pub rent_unit: Option<String>,
    pub security_deposit: Option<String>,
    pub tags: Option<TagsInput>,
    #[serde(default)]
    pub remove_images: Vec<String>,
}

#[derive(Clone)]
pub struct ItemService {
    items: Arc<dyn ItemRepo>,
    media: Arc<dyn MediaStore>,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemRepo>, media: Arc<dyn MediaStore>) -> Self {
        Self { items, media }
    }

    /// Creates a listing owned by `actor` in the actor's current college.
    pub async fn create(&self, actor: Option<&Actor>, input: NewItem, uploads: Vec<Upload>) -> Result<ItemView> {
        let title = required("title", input.title.as_deref())?;
        let category = required("category", input.category.as_deref())?;
        let listing_type = required("listingType", input.listing_type.as_deref())?;
        let actor = actor.ok_or(AppError::AuthRequired)?;

        let listing_type: ListingType = parse_field("listingType", &listing_type)?;
        let pricing = match listing_type {
            ListingType::Sell => Pricing::Sell {
                price: parse_amount("price", input.price.as_deref())?,
            },
            ListingType::Rent => Pricing::Rent {
                rent_price: parse_amount("rentPrice", input.rent_price.as_deref())?,
                rent_unit: parse_rent_unit(input.rent_unit.as_deref())?,
                security_deposit: match clean(input.security_deposit.as_deref()) {
                    Some(raw) => parse_amount("securityDeposit", Some(&raw))?,
                    None => 0.0,
                },
            },
        };
        let college_id = actor.current_college.ok_or(AppError::MissingCollege)?;
        if uploads.len() > MAX_ITEM_IMAGES {
            return Err(AppError::invalid(
                "images",
                format!("at most {MAX_ITEM_IMAGES} images can be uploaded"),
            ));
        }

        let now = Utc::now();
        let item = Item {
            id: Uuid::now_v7(),
            title: check_title(title)?,
            description: check_description(clean(input.description.as_deref()))?,
            category: parse_field::<Category>("category", &category)?,
            condition: match clean(input.condition.as_deref()) {
                Some(raw) => parse_field("condition", &raw)?,
                None => Condition::default(),
            },
            pricing,
            image_urls: Vec::new(),
            seller_id: actor.id,
            college_id,
            is_active: true,
            status: ItemStatus::Available,
            views: 0,
            tags: input.tags.as_ref().map(TagsInput::normalize).unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let image_count = uploads.len();
        let image_urls = store_uploads(self.media.as_ref(), uploads).await;
        let item = Item { image_urls, ..item };

        self.items.insert_item(&item).await?;
        tracing::info!(item_id = %item.id, seller = %actor.id, images = item.image_urls.len(), requested = image_count, "item listed");

        self.view(item.id, Projection::Listing).await
    }

    /// The college feed: active items only, status defaulting to available.
    pub async fn list(&self, query: &ItemQuery) -> Result<Paginated<ItemView>> {
        let (criteria, page) = query.feed_criteria()?;
        let (items, total) = self.items.find_items(&criteria, Some(page)).await?;
        Ok(Paginated::new(items, total, page))
    }

    /// Detail fetch. Every call counts as a view, including repeat fetches
    /// and fetches of hidden items.
    pub async fn get_by_id(&self, id: Uuid) -> Result<ItemView> {
        if !self.items.increment_views(id).await? {
            return Err(AppError::not_found("Item", id));
        }
        let view = self
            .items
            .get_item_view(id, Projection::Detail)
            .await?
            .ok_or_else(|| AppError::not_found("Item", id))?;
        if !view.item.is_active {
            return Err(AppError::Unavailable("this item is no longer available".into()));
        }
        Ok(view)
    }

    /// Everything the seller has listed, hidden items included unless filtered.
    pub async fn my_items(&self, actor: &Actor, status: Option<&str>, is_active: Option<&str>) -> Result<Vec<ItemView>> {
        let criteria = ItemCriteria {
            seller: Some(actor.id),
            status: clean(status).map(|raw| parse_field("status", &raw)).transpose()?,
            is_active: clean(is_active).map(|raw| raw == "true"),
            ..ItemCriteria::default()
        };
        let (items, _) = self.items.find_items(&criteria, None).await?;
        Ok(items)
    }

    /// Partial update by the seller or an admin. Pricing fields only apply to
    /// the branch the listing already has; the listing type never changes.
    pub async fn update(&self, id: Uuid, patch: ItemPatch, uploads: Vec<Upload>, actor: &Actor) -> Result<ItemView> {
        let mut item = self.load_owned(id, actor, true, "you can only update your own items").await?;

        if let Some(title) = patch.title.as_deref() {
            item.title = check_title(title.trim().to_string())?;
        }
        if let Some(description) = patch.description.as_deref() {
            item.description = check_description(clean(Some(description)))?;
        }
        if let Some(raw) = clean(patch.category.as_deref()) {
            item.category = parse_field("category", &raw)?;
        }
        if let Some(raw) = clean(patch.condition.as_deref()) {
            item.condition = parse_field("condition", &raw)?;
        }
        if let Some(raw) = clean(patch.status.as_deref()) {
            item.status = parse_field("status", &raw)?;
        }

        match &mut item.pricing {
            Pricing::Sell { price } => {
                if let Some(raw) = patch.price.as_deref() {
                    *price = parse_amount("price", Some(raw))?;
                }
            }
            Pricing::Rent {
                rent_price,
                rent_unit,
                security_deposit,
            } => {
                if let Some(raw) = patch.rent_price.as_deref() {
                    *rent_price = parse_amount("rentPrice", Some(raw))?;
                }
                if patch.rent_unit.is_some() {
                    *rent_unit = parse_rent_unit(patch.rent_unit.as_deref())?;
                }
                if let Some(raw) = patch.security_deposit.as_deref() {
                    *security_deposit = parse_amount("securityDeposit", Some(raw))?;
                }
            }
        }

        if let Some(tags) = &patch.tags {
            item.tags = tags.normalize();
        }

        if !patch.remove_images.is_empty() {
            item.image_urls.retain(|url| !patch.remove_images.contains(url));
        }
        if !uploads.is_empty() {
            let added = store_uploads(self.media.as_ref(), uploads).await;
            item.image_urls.extend(added);
        }
        item.image_urls.truncate(MAX_ITEM_IMAGES);

        item.updated_at = Utc::now();
        self.items.update_item(&item).await?;
        tracing::info!(item_id = %item.id, actor = %actor.id, "item updated");

        self.view(item.id, Projection::Listing).await
    }

    /// Hides the listing. Never removes the row; repeating it is harmless.
    pub async fn soft_delete(&self, id: Uuid, actor: &Actor) -> Result<()> {
        let item = self.load_owned(id, actor, true, "you can only delete your own items").await?;
        if item.is_active {
            self.items.set_item_active(id, false).await?;
        }
        tracing::info!(item_id = %id, actor = %actor.id, "item soft-deleted");
        Ok(())
    }

    /// Seller-only visibility switch. Admins use [`ItemService::admin_set_active`].
    pub async fn toggle_active(&self, id: Uuid, is_active: bool, actor: &Actor) -> Result<bool> {
        self.load_owned(id, actor, false, "you can only modify your own items").await?;
        self.items.set_item_active(id, is_active).await?;
        Ok(is_active)
    }

    /// Moderation listing: hidden and traded items included.
    pub async fn admin_list(&self, query: &AdminItemQuery) -> Result<Paginated<ItemView>> {
        let (criteria, page) = query.criteria()?;
        let (items, total) = self.items.find_items(&criteria, Some(page)).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn admin_set_active(&self, id: Uuid, is_active: bool) -> Result<bool> {
        if !self.items.set_item_active(id, is_active).await? {
            return Err(AppError::not_found("Item", id));
        }
        tracing::info!(item_id = %id, is_active, "item visibility forced by admin");
        Ok(is_active)
    }

    /// Physical removal. Wishlist entries pointing at it become dangling and
    /// are skipped when wishlists are populated.
    pub async fn admin_delete(&self, id: Uuid) -> Result<()> {
        if !self.items.delete_item(id).await? {
            return Err(AppError::not_found("Item", id));
        }
        tracing::info!(item_id = %id, "item hard-deleted by admin");
        Ok(())
    }

    async fn load_owned(&self, id: Uuid, actor: &Actor, admin_override: bool, denial: &str) -> Result<Item> {
        let item = self
            .items
            .get_item(id)
            .await?
            .ok_or_else(|| AppError::not_found("Item", id))?;
        let allowed = item.seller_id == actor.id || (admin_override && actor.is_admin());
        if !allowed {
            return Err(AppError::Forbidden(denial.to_string()));
        }
        Ok(item)
    }

    async fn view(&self, id: Uuid, projection: Projection) -> Result<ItemView> {
        self.items
            .get_item_view(id, projection)
            .await?
            .ok_or_else(|| AppError::not_found("Item", id))
    }
}

fn parse_field<T>(field: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr<Err = crate::models::UnknownVariant>,
{
    raw.trim().parse().map_err(|e: crate::models::UnknownVariant| AppError::invalid(field, e.to_string()))
}

fn parse_rent_unit(raw: Option<&str>) -> Result<RentUnit> {
    clean(raw)
        .and_then(|unit| unit.parse().ok())
        .ok_or_else(|| AppError::invalid("rentUnit", "must be one of day, week, month"))
}

fn check_title(title: String) -> Result<String> {
    if title.is_empty() {
        return Err(AppError::invalid("title", "is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::invalid("title", format!("must be at most {MAX_TITLE_CHARS} characters")));
    }
    Ok(title)
}

fn check_description(description: Option<String>) -> Result<Option<String>> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_CHARS => Err(AppError::invalid(
            "description",
            format!("must be at most {MAX_DESCRIPTION_CHARS} characters"),
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::traits::{MockItemRepo, MockMediaStore};

    fn actor(role: Role, college: Option<Uuid>) -> Actor {
        Actor {
            id: Uuid::now_v7(),
            role,
            current_college: college,
        }
    }

    fn rent_item(seller: Uuid) -> Item {
        Item {
            id: Uuid::now_v7(),
            title: "Cycle".into(),
            description: None,
            category: Category::Cycles,
            condition: Condition::Good,
            pricing: Pricing::Rent {
                rent_price: 50.0,
                rent_unit: RentUnit::Day,
                security_deposit: 0.0,
            },
            image_urls: vec!["/u/1".into(), "/u/2".into()],
            seller_id: seller,
            college_id: Uuid::now_v7(),
            is_active: true,
            status: ItemStatus::Available,
            views: 0,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(items: MockItemRepo) -> ItemService {
        ItemService::new(Arc::new(items), Arc::new(MockMediaStore::new()))
    }

    fn sell_form() -> NewItem {
        NewItem {
            title: Some("Calculus textbook".into()),
            category: Some("books".into()),
            listing_type: Some("sell".into()),
            price: Some("100".into()),
            ..NewItem::default()
        }
    }

    #[test]
    fn csv_tags_are_trimmed_and_blank_entries_dropped() {
        let tags = TagsInput::Csv(" maths, ,books ,maths".into());
        assert_eq!(tags.normalize(), vec!["maths", "books", "maths"]);
        let tags = TagsInput::List(vec!["  a ".into(), "".into()]);
        assert_eq!(tags.normalize(), vec!["a"]);
    }

    #[tokio::test]
    async fn missing_title_fails_before_auth_check() {
        let svc = service(MockItemRepo::new());
        let form = NewItem { title: None, ..sell_form() };
        match svc.create(None, form, vec![]).await {
            Err(AppError::ValidationError { field, .. }) => assert_eq!(field, "title"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unauthenticated_create_is_rejected() {
        let svc = service(MockItemRepo::new());
        assert_eq!(svc.create(None, sell_form(), vec![]).await.unwrap_err(), AppError::AuthRequired);
    }

    #[tokio::test]
    async fn create_without_current_college_is_rejected() {
        let svc = service(MockItemRepo::new());
        let who = actor(Role::Student, None);
        assert_eq!(
            svc.create(Some(&who), sell_form(), vec![]).await.unwrap_err(),
            AppError::MissingCollege
        );
    }

    fn png(n: u8) -> Upload {
        Upload {
            filename: Some(format!("{n}.png")),
            content_type: "image/png".into(),
            data: vec![n],
        }
    }

    #[tokio::test]
    async fn create_rejects_more_than_five_images_without_storing() {
        let mut repo = MockItemRepo::new();
        repo.expect_insert_item().never();
        let mut media = MockMediaStore::new();
        media.expect_save_upload().never();
        let svc = ItemService::new(Arc::new(repo), Arc::new(media));

        let who = actor(Role::Student, Some(Uuid::now_v7()));
        let uploads = (1..=6).map(png).collect();
        match svc.create(Some(&who), sell_form(), uploads).await {
            Err(AppError::ValidationError { field, .. }) => assert_eq!(field, "images"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_keeps_surviving_urls_when_one_save_fails() {
        let mut repo = MockItemRepo::new();
        repo.expect_insert_item()
            .withf(|item: &Item| {
                item.image_urls == vec!["/static/1", "/static/3"] && item.created_at == item.updated_at
            })
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_get_item_view().returning(|id, _| {
            let mut item = rent_item(Uuid::now_v7());
            item.id = id;
            Ok(Some(ItemView {
                item,
                seller: None,
                college: None,
            }))
        });

        let mut media = MockMediaStore::new();
        media.expect_save_upload().times(3).returning(|data, _| match data[0] {
            2 => Err(anyhow::anyhow!("disk full")),
            n => Ok(n.to_string()),
        });
        media.expect_get_url().returning(|id| format!("/static/{id}"));
        let svc = ItemService::new(Arc::new(repo), Arc::new(media));

        let who = actor(Role::Student, Some(Uuid::now_v7()));
        let uploads = (1..=3).map(png).collect();
        svc.create(Some(&who), sell_form(), uploads).await.unwrap();
    }

    #[tokio::test]
    async fn rent_listing_requires_known_unit() {
        let svc = service(MockItemRepo::new());
        let who = actor(Role::Student, Some(Uuid::now_v7()));
        let form = NewItem {
            listing_type: Some("rent".into()),
            rent_price: Some("50".into()),
            rent_unit: Some("year".into()),
            ..sell_form()
        };
        match svc.create(Some(&who), form, vec![]).await {
            Err(AppError::ValidationError { field, .. }) => assert_eq!(field, "rentUnit"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sell_price_patch_is_ignored_on_rent_listing() {
        let seller = actor(Role::Student, None);
        let existing = rent_item(seller.id);
        let id = existing.id;

        let mut repo = MockItemRepo::new();
        let stored = existing.clone();
        repo.expect_get_item().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_update_item()
            .withf(|item: &Item| item.pricing.sell_price().is_none() && item.pricing.rent_price() == Some(60.0))
            .times(1)
            .returning(|_| Ok(()));
        let view_source = existing.clone();
        repo.expect_get_item_view().returning(move |_, _| {
            Ok(Some(ItemView {
                item: view_source.clone(),
                seller: None,
                college: None,
            }))
        });

        let patch = ItemPatch {
            price: Some("999".into()),
            rent_price: Some("60".into()),
            ..ItemPatch::default()
        };
        service(repo).update(id, patch, vec![], &seller).await.unwrap();
    }

    #[tokio::test]
    async fn strangers_cannot_update_but_admins_can() {
        let seller = Uuid::now_v7();
        let existing = rent_item(seller);

        let mut repo = MockItemRepo::new();
        let stored = existing.clone();
        repo.expect_get_item().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_update_item().times(1).returning(|_| Ok(()));
        let view_source = existing.clone();
        repo.expect_get_item_view().returning(move |_, _| {
            Ok(Some(ItemView {
                item: view_source.clone(),
                seller: None,
                college: None,
            }))
        });
        let svc = service(repo);

        let stranger = actor(Role::Student, None);
        let err = svc.update(existing.id, ItemPatch::default(), vec![], &stranger).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let admin = actor(Role::Admin, None);
        svc.update(existing.id, ItemPatch::default(), vec![], &admin).await.unwrap();
    }

    #[tokio::test]
    async fn admin_cannot_toggle_through_seller_path() {
        let existing = rent_item(Uuid::now_v7());
        let mut repo = MockItemRepo::new();
        let stored = existing.clone();
        repo.expect_get_item().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_set_item_active().never();

        let admin = actor(Role::Admin, None);
        let err = service(repo).toggle_active(existing.id, false, &admin).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn removed_images_are_filtered_before_truncation() {
        let seller = actor(Role::Student, None);
        let mut existing = rent_item(seller.id);
        existing.image_urls = (1..=5).map(|n| format!("/u/{n}")).collect();

        let mut repo = MockItemRepo::new();
        let stored = existing.clone();
        repo.expect_get_item().returning(move |_| Ok(Some(stored.clone())));
        repo.expect_update_item()
            .withf(|item: &Item| item.image_urls == vec!["/u/1", "/u/3", "/u/4", "/u/5", "/static/new"])
            .times(1)
            .returning(|_| Ok(()));
        let view_source = existing.clone();
        repo.expect_get_item_view().returning(move |_, _| {
            Ok(Some(ItemView {
                item: view_source.clone(),
                seller: None,
                college: None,
            }))
        });

        let mut media = MockMediaStore::new();
        media.expect_save_upload().returning(|_, _| Ok("new".into()));
        media.expect_get_url().returning(|id| format!("/static/{id}"));

        let svc = ItemService::new(Arc::new(repo), Arc::new(media));
        let patch = ItemPatch {
            remove_images: vec!["/u/2".into()],
            ..ItemPatch::default()
        };
        let upload = Upload {
            filename: None,
            content_type: "image/png".into(),
            data: vec![1],
        };
        svc.update(existing.id, patch, vec![upload.clone(), upload], &seller).await.unwrap();
    }
}
