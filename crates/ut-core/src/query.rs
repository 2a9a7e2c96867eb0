//! # Feed Queries
//!
//! Filter and pagination contracts for item and user listings. Raw query
//! strings are coerced here: malformed numbers fall back to defaults instead
//! of failing, while unknown enum values and ids are rejected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Category, Condition, ItemStatus, ListingType, Role};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 50;

/// 1-based page with a limit clamped to `[1, MAX_PAGE_LIMIT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, limit: i64) -> Self {
        let page = page.clamp(1, i64::from(u32::MAX));
        let limit = limit.clamp(1, i64::from(MAX_PAGE_LIMIT));
        Self {
            page: u32::try_from(page).unwrap_or(1),
            limit: u32::try_from(limit).unwrap_or(DEFAULT_PAGE_LIMIT),
        }
    }

    /// Builds a page from query-string values, ignoring anything that does
    /// not parse as an integer.
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        let page = page.and_then(parse_int).unwrap_or(1);
        let limit = limit
            .and_then(parse_int)
            .unwrap_or(i64::from(DEFAULT_PAGE_LIMIT));
        Self::new(page, limit)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of results plus the numbers a client needs to paginate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub pages: u64,
    pub limit: u32,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            pages: total.div_ceil(u64::from(request.limit)),
            limit: request.limit,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            pages: self.pages,
            limit: self.limit,
        }
    }
}

/// Storage-level item criteria. Every `None` means "do not filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemCriteria {
    pub is_active: Option<bool>,
    pub status: Option<ItemStatus>,
    pub seller: Option<Uuid>,
    pub college: Option<Uuid>,
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub listing_type: Option<ListingType>,
    /// Matches when either the sell price or the rent price is `>=` this
    pub min_price: Option<f64>,
    /// Matches when either the sell price or the rent price is `<=` this
    pub max_price: Option<f64>,
    /// Any-term substring match over title, description, and tags
    pub search_terms: Vec<String>,
}

/// Raw `/api/item/list` query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ItemQuery {
    /// Feed criteria: visibility is always forced to active, and status
    /// defaults to `available`.
    pub fn feed_criteria(&self) -> Result<(ItemCriteria, PageRequest)> {
        let criteria = ItemCriteria {
            is_active: Some(true),
            status: Some(parse_enum("status", self.status.as_deref())?.unwrap_or_default()),
            seller: None,
            college: parse_id("college", self.college.as_deref())?,
            category: parse_enum("category", self.category.as_deref())?,
            condition: parse_enum("condition", self.condition.as_deref())?,
            listing_type: parse_enum("listingType", self.listing_type.as_deref())?,
            min_price: self.min_price.as_deref().and_then(parse_float),
            max_price: self.max_price.as_deref().and_then(parse_float),
            search_terms: search_terms(self.q.as_deref()),
        };
        Ok((criteria, self.page_request()))
    }

    pub fn page_request(&self) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Raw `/api/item/admin/list` query string. Nothing is forced here; an
/// administrator sees hidden and traded items too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminItemQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl AdminItemQuery {
    pub fn criteria(&self) -> Result<(ItemCriteria, PageRequest)> {
        let criteria = ItemCriteria {
            is_active: parse_flag(self.is_active.as_deref()),
            status: parse_enum("status", self.status.as_deref())?,
            seller: parse_id("seller", self.seller.as_deref())?,
            college: parse_id("college", self.college.as_deref())?,
            search_terms: search_terms(self.q.as_deref()),
            ..ItemCriteria::default()
        };
        let page = PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref());
        Ok((criteria, page))
    }
}

/// Storage-level user criteria for the admin listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserCriteria {
    pub role: Option<Role>,
    pub college: Option<Uuid>,
    pub blocked: Option<bool>,
    pub search: Option<String>,
}

/// Raw `/api/user` query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl UserQuery {
    pub fn criteria(&self) -> Result<(UserCriteria, PageRequest)> {
        let criteria = UserCriteria {
            role: parse_enum("role", self.role.as_deref())?,
            college: parse_id("college", self.college.as_deref())?,
            blocked: parse_flag(self.blocked.as_deref()),
            search: non_blank(self.q.as_deref()).map(str::to_string),
        };
        let page = PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref());
        Ok((criteria, page))
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `"true"`/`"false"`; anything else (including `"all"`) disables the filter.
fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match non_blank(raw)? {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_enum<T>(field: &str, raw: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = crate::models::UnknownVariant>,
{
    non_blank(raw)
        .map(|value| value.parse::<T>().map_err(|e| AppError::invalid(field, e.to_string())))
        .transpose()
}

pub(crate) fn parse_id(field: &str, raw: Option<&str>) -> Result<Option<Uuid>> {
    non_blank(raw)
        .map(|value| {
            Uuid::parse_str(value).map_err(|_| AppError::invalid(field, format!("`{value}` is not a valid id")))
        })
        .transpose()
}

fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|q| q.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}
