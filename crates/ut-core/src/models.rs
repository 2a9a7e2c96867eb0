//! # Domain Models
//!
//! These structs represent the core entities of UniTrade.
//! We use UUID v7 for time-ordered, globally unique identification.
//! All models serialize with camelCase keys, matching the REST payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Raised when a stored or submitted string names no known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Closed string enums shared by the wire format and the storage columns.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    /// Account role; only admins pass the moderation gate.
    Role { Student => "student", Faculty => "faculty", Admin => "admin" }
}

string_enum! {
    Category {
        Books => "books",
        Electronics => "electronics",
        Furniture => "furniture",
        Notes => "notes",
        Sports => "sports",
        Cycles => "cycles",
        Stationery => "stationery",
        Hostel => "hostel",
        Other => "other",
    }
}

string_enum! {
    Condition {
        New => "new",
        LikeNew => "like_new",
        Good => "good",
        Fair => "fair",
        Poor => "poor",
    }
}

string_enum! {
    ListingType { Sell => "sell", Rent => "rent" }
}

string_enum! {
    RentUnit { Day => "day", Week => "week", Month => "month" }
}

string_enum! {
    /// Trade state of a listing, independent of its visibility flag.
    ItemStatus { Available => "available", Sold => "sold", RentedOut => "rented_out" }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Good
    }
}

impl Default for ItemStatus {
    fn default() -> Self {
        ItemStatus::Available
    }
}

/// A registered student, faculty member, or administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    /// Argon2 PHC string; never leaves the server
    #[serde(skip)]
    pub password_hash: String,
    pub avatar_url: Option<String>,
    /// Home institution chosen at signup; immutable afterwards
    pub permanent_college_id: Uuid,
    /// Scopes the user's feed and new listings
    pub current_college_id: Option<Uuid>,
    pub is_blocked: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The resolved identity handed to services once the auth gate has run.
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            current_college: self.current_college_id,
        }
    }
}

/// A user as returned by the account endpoints, with both colleges populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub permanent_college: Option<CollegeSummary>,
    pub current_college: Option<CollegeSummary>,
}

/// The identity attached to an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub current_college: Option<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An institution that scopes feeds and signups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: Uuid,
    /// Upper-cased unique code (e.g., "IITB")
    pub code: String,
    pub name: String,
    pub short_name: Option<String>,
    /// Lower-cased unique URL slug
    pub slug: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: String,
    pub logo_url: Option<String>,
    /// Banner image
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl College {
    pub fn summary(&self) -> CollegeSummary {
        CollegeSummary {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }
}

/// College projection embedded in items and profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollegeSummary {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Seller projection embedded in items. Contact fields are only filled on
/// the detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerSummary {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Pricing branch of a listing. The `listingType` tag selects exactly one
/// branch, so a listing can never carry both sale and rental prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "listingType")]
pub enum Pricing {
    #[serde(rename = "sell")]
    Sell { price: f64 },
    #[serde(rename = "rent", rename_all = "camelCase")]
    Rent {
        rent_price: f64,
        rent_unit: RentUnit,
        security_deposit: f64,
    },
}

impl Pricing {
    pub fn listing_type(&self) -> ListingType {
        match self {
            Pricing::Sell { .. } => ListingType::Sell,
            Pricing::Rent { .. } => ListingType::Rent,
        }
    }

    pub fn sell_price(&self) -> Option<f64> {
        match self {
            Pricing::Sell { price } => Some(*price),
            Pricing::Rent { .. } => None,
        }
    }

    pub fn rent_price(&self) -> Option<f64> {
        match self {
            Pricing::Rent { rent_price, .. } => Some(*rent_price),
            Pricing::Sell { .. } => None,
        }
    }
}

/// A listing: either a sell or a rent offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub condition: Condition,
    #[serde(flatten)]
    pub pricing: Pricing,
    /// At most five public image URLs
    pub image_urls: Vec<String>,
    pub seller_id: Uuid,
    /// Pinned from the seller's current college at creation time
    pub college_id: Uuid,
    pub is_active: bool,
    pub status: ItemStatus,
    pub views: i64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Visible in the feed and eligible for bookmarking.
    pub fn is_on_offer(&self) -> bool {
        self.is_active && self.status == ItemStatus::Available
    }
}

/// An item with its seller and college populated. A missing reference
/// (deleted seller or college) leaves the projection empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: Item,
    pub seller: Option<SellerSummary>,
    pub college: Option<CollegeSummary>,
}

/// Which populated fields an item read should carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Feed cards: seller username/name/avatar, college name/code
    Listing,
    /// Detail page: adds seller contact and college location
    Detail,
}

/// Per-user set of bookmarked items, kept in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub user_id: Uuid,
    pub items: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Wishlist {
    pub fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn contains(&self, item_id: Uuid) -> bool {
        self.items.contains(&item_id)
    }
}

/// A wishlist with its entries populated; dangling entries are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistView {
    pub user_id: Uuid,
    pub items: Vec<ItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file received in a multipart request, before it reaches the media store.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}
