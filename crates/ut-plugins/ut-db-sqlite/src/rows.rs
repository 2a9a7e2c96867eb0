//! Row shapes as SQLite returns them, and their conversion into `ut-core`
//! models. Enum columns are stored as their wire strings.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use ut_core::error::{AppError, Result};
use ut_core::models::{
    College, CollegeSummary, Item, ItemView, Pricing, Projection, SellerSummary, User, Wishlist,
};
use uuid::Uuid;

fn parse_column<T: std::str::FromStr>(column: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AppError::internal(format!("corrupt `{column}` column: {e}")))
}

#[derive(Debug, FromRow)]
pub(crate) struct CollegeRow {
    id: Uuid,
    code: String,
    name: String,
    short_name: Option<String>,
    slug: String,
    city: Option<String>,
    state: Option<String>,
    country: String,
    logo_url: Option<String>,
    image_url: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CollegeRow> for College {
    fn from(row: CollegeRow) -> Self {
        College {
            id: row.id,
            code: row.code,
            name: row.name,
            short_name: row.short_name,
            slug: row.slug,
            city: row.city,
            state: row.state,
            country: row.country,
            logo_url: row.logo_url,
            image_url: row.image_url,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: Uuid,
    username: String,
    name: String,
    email: String,
    mobile: String,
    role: String,
    password_hash: String,
    avatar_url: Option<String>,
    permanent_college_id: Uuid,
    current_college_id: Option<Uuid>,
    is_blocked: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            name: row.name,
            email: row.email,
            mobile: row.mobile,
            role: parse_column("role", &row.role)?,
            password_hash: row.password_hash,
            avatar_url: row.avatar_url,
            permanent_college_id: row.permanent_college_id,
            current_college_id: row.current_college_id,
            is_blocked: row.is_blocked,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ItemRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    category: String,
    item_condition: String,
    listing_type: String,
    price: Option<f64>,
    rent_price: Option<f64>,
    rent_unit: Option<String>,
    security_deposit: Option<f64>,
    image_urls: Json<Vec<String>>,
    seller_id: Uuid,
    college_id: Uuid,
    is_active: bool,
    status: String,
    views: i64,
    tags: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self> {
        let pricing = match row.listing_type.as_str() {
            "sell" => Pricing::Sell {
                price: row.price.unwrap_or_default(),
            },
            "rent" => Pricing::Rent {
                rent_price: row.rent_price.unwrap_or_default(),
                rent_unit: parse_column("rent_unit", row.rent_unit.as_deref().unwrap_or_default())?,
                security_deposit: row.security_deposit.unwrap_or_default(),
            },
            other => {
                return Err(AppError::internal(format!("corrupt `listing_type` column: {other}")));
            }
        };
        Ok(Item {
            id: row.id,
            title: row.title,
            description: row.description,
            category: parse_column("category", &row.category)?,
            condition: parse_column("item_condition", &row.item_condition)?,
            pricing,
            image_urls: row.image_urls.0,
            seller_id: row.seller_id,
            college_id: row.college_id,
            is_active: row.is_active,
            status: parse_column("status", &row.status)?,
            views: row.views,
            tags: row.tags.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// An item joined with its seller and college. Joined columns are null when
/// the reference dangles.
#[derive(Debug, FromRow)]
pub(crate) struct ItemViewRow {
    #[sqlx(flatten)]
    item: ItemRow,
    seller_username: Option<String>,
    seller_name: Option<String>,
    seller_avatar_url: Option<String>,
    seller_mobile: Option<String>,
    seller_email: Option<String>,
    college_name: Option<String>,
    college_code: Option<String>,
    college_city: Option<String>,
    college_state: Option<String>,
}

impl ItemViewRow {
    /// Drops the contact and location fields a listing card must not carry.
    pub(crate) fn into_view(self, projection: Projection) -> Result<ItemView> {
        let detail = projection == Projection::Detail;
        let item = Item::try_from(self.item)?;

        let seller = match (self.seller_username, self.seller_name) {
            (Some(username), Some(name)) => Some(SellerSummary {
                id: item.seller_id,
                username,
                name,
                avatar_url: self.seller_avatar_url,
                mobile: self.seller_mobile.filter(|_| detail),
                email: self.seller_email.filter(|_| detail),
            }),
            _ => None,
        };
        let college = match (self.college_name, self.college_code) {
            (Some(name), Some(code)) => Some(CollegeSummary {
                id: item.college_id,
                name,
                code,
                city: self.college_city.filter(|_| detail),
                state: self.college_state.filter(|_| detail),
            }),
            _ => None,
        };

        Ok(ItemView {
            item,
            seller,
            college,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct WishlistRow {
    user_id: Uuid,
    items: Json<Vec<Uuid>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WishlistRow> for Wishlist {
    fn from(row: WishlistRow) -> Self {
        Wishlist {
            user_id: row.user_id,
            items: row.items.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
