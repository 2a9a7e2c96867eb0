//! # ut-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `ut-core` domain models. One pool backs all four repository ports.

mod rows;

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite};
use ut_core::error::{AppError, Result};
use ut_core::models::{College, Item, ItemView, Pricing, Projection, User, Wishlist};
use ut_core::query::{ItemCriteria, PageRequest, UserCriteria};
use ut_core::traits::{CollegeKey, CollegeRepo, ItemRepo, UserKey, UserRepo, WishlistRepo};
use uuid::Uuid;

use rows::{CollegeRow, ItemRow, ItemViewRow, UserRow, WishlistRow};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Fixed-width RFC 3339 so that `ORDER BY created_at` sorts chronologically.
fn sortable(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Items joined with the seller and college columns the projections need.
const ITEM_VIEW_SELECT: &str = "SELECT i.*, \
     s.username AS seller_username, s.name AS seller_name, s.avatar_url AS seller_avatar_url, \
     s.mobile AS seller_mobile, s.email AS seller_email, \
     c.name AS college_name, c.code AS college_code, c.city AS college_city, c.state AS college_state \
     FROM items i \
     LEFT JOIN users s ON s.id = i.seller_id \
     LEFT JOIN colleges c ON c.id = i.college_id";

pub struct SqliteMarketRepo {
    pool: SqlitePool,
}

impl SqliteMarketRepo {
    /// Opens (or creates) the database at `database_url` and applies pending
    /// migrations.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        Self::connect(database_url, DEFAULT_MAX_CONNECTIONS).await
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        // An in-memory database lives and dies with its only connection.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(%database_url, in_memory, "sqlite store ready");
        Ok(Self { pool })
    }
}

/// Translates driver errors. Unique violations become `Conflict` naming the
/// first offending column; everything else is an internal failure.
fn db_err(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            if let Some((table, column)) = unique_target(db.message()) {
                return AppError::conflict(entity_name(table), column);
            }
        }
    }
    tracing::error!(error = %err, "sqlite query failed");
    AppError::internal(err)
}

/// Parses `UNIQUE constraint failed: users.email` into `("users", "email")`.
fn unique_target(message: &str) -> Option<(&str, &str)> {
    let target = message.strip_prefix("UNIQUE constraint failed: ")?;
    target.split(',').next()?.trim().split_once('.')
}

fn entity_name(table: &str) -> &str {
    match table {
        "users" => "User",
        "colleges" => "College",
        "items" => "Item",
        "wishlists" => "Wishlist",
        other => other,
    }
}

/// `%term%` with LIKE wildcards in the term escaped by `\`.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn push_page(qb: &mut QueryBuilder<'_, Sqlite>, page: PageRequest) {
    qb.push(" LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(to_i64(page.offset()));
}

fn push_item_filters(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &ItemCriteria) {
    qb.push(" WHERE 1 = 1");
    if let Some(active) = criteria.is_active {
        qb.push(" AND i.is_active = ").push_bind(active);
    }
    if let Some(status) = criteria.status {
        qb.push(" AND i.status = ").push_bind(status.as_str());
    }
    if let Some(seller) = criteria.seller {
        qb.push(" AND i.seller_id = ").push_bind(seller);
    }
    if let Some(college) = criteria.college {
        qb.push(" AND i.college_id = ").push_bind(college);
    }
    if let Some(category) = criteria.category {
        qb.push(" AND i.category = ").push_bind(category.as_str());
    }
    if let Some(condition) = criteria.condition {
        qb.push(" AND i.item_condition = ").push_bind(condition.as_str());
    }
    if let Some(listing_type) = criteria.listing_type {
        qb.push(" AND i.listing_type = ").push_bind(listing_type.as_str());
    }
    // Exactly one of price / rent_price is non-null per row.
    if let Some(min) = criteria.min_price {
        qb.push(" AND COALESCE(i.price, i.rent_price) >= ").push_bind(min);
    }
    if let Some(max) = criteria.max_price {
        qb.push(" AND COALESCE(i.price, i.rent_price) <= ").push_bind(max);
    }
    if !criteria.search_terms.is_empty() {
        qb.push(" AND (");
        for (n, term) in criteria.search_terms.iter().enumerate() {
            if n > 0 {
                qb.push(" OR ");
            }
            let pattern = like_pattern(term);
            qb.push("i.title LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR IFNULL(i.description, '') LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR EXISTS (SELECT 1 FROM json_each(i.tags) WHERE json_each.value LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }
        qb.push(")");
    }
}

fn push_user_filters(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &UserCriteria) {
    qb.push(" WHERE 1 = 1");
    if let Some(role) = criteria.role {
        qb.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(college) = criteria.college {
        qb.push(" AND current_college_id = ").push_bind(college);
    }
    if let Some(blocked) = criteria.blocked {
        qb.push(" AND is_blocked = ").push_bind(blocked);
    }
    if let Some(search) = criteria.search.as_deref() {
        let pattern = like_pattern(search);
        qb.push(" AND (username LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR name LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR mobile LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Column values for the pricing branch: (price, rent_price, rent_unit, security_deposit).
fn pricing_columns(pricing: &Pricing) -> (Option<f64>, Option<f64>, Option<&'static str>, Option<f64>) {
    match pricing {
        Pricing::Sell { price } => (Some(*price), None, None, None),
        Pricing::Rent {
            rent_price,
            rent_unit,
            security_deposit,
        } => (None, Some(*rent_price), Some(rent_unit.as_str()), Some(*security_deposit)),
    }
}

#[async_trait]
impl UserRepo for SqliteMarketRepo {
    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, name, email, mobile, role, password_hash, avatar_url, \
             permanent_college_id, current_college_id, is_blocked, last_login_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(user.permanent_college_id)
        .bind(user.current_college_id)
        .bind(user.is_blocked)
        .bind(user.last_login_at)
        .bind(sortable(&user.created_at))
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(User::try_from)
            .transpose()
    }

    async fn user_key_taken(&self, key: UserKey, value: &str, exclude: Option<Uuid>) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM users WHERE {} = ? AND (? IS NULL OR id <> ?))",
            key.field()
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            "UPDATE users SET username = ?, name = ?, email = ?, mobile = ?, role = ?, password_hash = ?, \
             avatar_url = ?, permanent_college_id = ?, current_college_id = ?, is_blocked = ?, \
             last_login_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.mobile)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .bind(&user.avatar_url)
        .bind(user.permanent_college_id)
        .bind(user.current_college_id)
        .bind(user.is_blocked)
        .bind(user.last_login_at)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User", user.id));
        }
        Ok(())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, criteria: &UserCriteria, page: PageRequest) -> Result<(Vec<User>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, criteria);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
        push_user_filters(&mut select, criteria);
        select.push(" ORDER BY created_at DESC, id DESC");
        push_page(&mut select, page);
        let users = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((users, u64::try_from(total).unwrap_or_default()))
    }
}

#[async_trait]
impl CollegeRepo for SqliteMarketRepo {
    async fn insert_college(&self, college: &College) -> Result<()> {
        sqlx::query(
            "INSERT INTO colleges (id, code, name, short_name, slug, city, state, country, logo_url, \
             image_url, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(college.id)
        .bind(&college.code)
        .bind(&college.name)
        .bind(&college.short_name)
        .bind(&college.slug)
        .bind(&college.city)
        .bind(&college.state)
        .bind(&college.country)
        .bind(&college.logo_url)
        .bind(&college.image_url)
        .bind(college.is_active)
        .bind(college.created_at)
        .bind(college.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_college(&self, id: Uuid) -> Result<Option<College>> {
        let row = sqlx::query_as::<_, CollegeRow>("SELECT * FROM colleges WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(College::from))
    }

    async fn list_colleges(&self, active_only: bool) -> Result<Vec<College>> {
        let sql = if active_only {
            "SELECT * FROM colleges WHERE is_active = 1 ORDER BY name ASC"
        } else {
            "SELECT * FROM colleges ORDER BY name ASC"
        };
        let rows = sqlx::query_as::<_, CollegeRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(College::from).collect())
    }

    async fn college_key_taken(&self, key: CollegeKey, value: &str, exclude: Option<Uuid>) -> Result<bool> {
        // `code` and `slug` carry NOCASE collation in the schema.
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM colleges WHERE {} = ? AND (? IS NULL OR id <> ?))",
            key.field()
        );
        sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn update_college(&self, college: &College) -> Result<()> {
        let result = sqlx::query(
            "UPDATE colleges SET code = ?, name = ?, short_name = ?, slug = ?, city = ?, state = ?, \
             country = ?, logo_url = ?, image_url = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&college.code)
        .bind(&college.name)
        .bind(&college.short_name)
        .bind(&college.slug)
        .bind(&college.city)
        .bind(&college.state)
        .bind(&college.country)
        .bind(&college.logo_url)
        .bind(&college.image_url)
        .bind(college.is_active)
        .bind(college.updated_at)
        .bind(college.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("College", college.id));
        }
        Ok(())
    }

    async fn delete_college(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM colleges WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ItemRepo for SqliteMarketRepo {
    async fn insert_item(&self, item: &Item) -> Result<()> {
        let (price, rent_price, rent_unit, security_deposit) = pricing_columns(&item.pricing);
        sqlx::query(
            "INSERT INTO items (id, title, description, category, item_condition, listing_type, price, \
             rent_price, rent_unit, security_deposit, image_urls, seller_id, college_id, is_active, status, \
             views, tags, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.condition.as_str())
        .bind(item.pricing.listing_type().as_str())
        .bind(price)
        .bind(rent_price)
        .bind(rent_unit)
        .bind(security_deposit)
        .bind(Json(&item.image_urls))
        .bind(item.seller_id)
        .bind(item.college_id)
        .bind(item.is_active)
        .bind(item.status.as_str())
        .bind(item.views)
        .bind(Json(&item.tags))
        .bind(sortable(&item.created_at))
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn get_item(&self, id: Uuid) -> Result<Option<Item>> {
        sqlx::query_as::<_, ItemRow>("SELECT * FROM items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(Item::try_from)
            .transpose()
    }

    async fn get_item_view(&self, id: Uuid, projection: Projection) -> Result<Option<ItemView>> {
        let sql = format!("{ITEM_VIEW_SELECT} WHERE i.id = ?");
        sqlx::query_as::<_, ItemViewRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .map(|row| row.into_view(projection))
            .transpose()
    }

    async fn find_items(&self, criteria: &ItemCriteria, page: Option<PageRequest>) -> Result<(Vec<ItemView>, u64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM items i");
        push_item_filters(&mut count, criteria);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let mut select = QueryBuilder::<Sqlite>::new(ITEM_VIEW_SELECT);
        push_item_filters(&mut select, criteria);
        // UUID v7 ids break ties between rows created in the same instant.
        select.push(" ORDER BY i.created_at DESC, i.id DESC");
        if let Some(page) = page {
            push_page(&mut select, page);
        }
        let views = select
            .build_query_as::<ItemViewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|row| row.into_view(Projection::Listing))
            .collect::<Result<Vec<_>>>()?;

        Ok((views, u64::try_from(total).unwrap_or_default()))
    }

    async fn item_views(&self, ids: &[Uuid]) -> Result<Vec<ItemView>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut select = QueryBuilder::<Sqlite>::new(ITEM_VIEW_SELECT);
        select.push(" WHERE i.id IN (");
        let mut separated = select.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let mut by_id: HashMap<Uuid, ItemView> = select
            .build_query_as::<ItemViewRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|row| row.into_view(Projection::Listing).map(|view| (view.item.id, view)))
            .collect::<Result<_>>()?;

        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn update_item(&self, item: &Item) -> Result<()> {
        let (price, rent_price, rent_unit, security_deposit) = pricing_columns(&item.pricing);
        let result = sqlx::query(
            "UPDATE items SET title = ?, description = ?, category = ?, item_condition = ?, listing_type = ?, \
             price = ?, rent_price = ?, rent_unit = ?, security_deposit = ?, image_urls = ?, is_active = ?, \
             status = ?, tags = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.condition.as_str())
        .bind(item.pricing.listing_type().as_str())
        .bind(price)
        .bind(rent_price)
        .bind(rent_unit)
        .bind(security_deposit)
        .bind(Json(&item.image_urls))
        .bind(item.is_active)
        .bind(item.status.as_str())
        .bind(Json(&item.tags))
        .bind(item.updated_at)
        .bind(item.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Item", item.id));
        }
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET views = views + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_item_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE items SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WishlistRepo for SqliteMarketRepo {
    async fn get_wishlist(&self, user_id: Uuid) -> Result<Option<Wishlist>> {
        let row = sqlx::query_as::<_, WishlistRow>("SELECT * FROM wishlists WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.map(Wishlist::from))
    }

    async fn save_wishlist(&self, wishlist: &Wishlist) -> Result<()> {
        sqlx::query(
            "INSERT INTO wishlists (user_id, items, created_at, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET items = excluded.items, updated_at = excluded.updated_at",
        )
        .bind(wishlist.user_id)
        .bind(Json(&wishlist.items))
        .bind(wishlist.created_at)
        .bind(wishlist.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_wishlist(&self, user_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM wishlists WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
