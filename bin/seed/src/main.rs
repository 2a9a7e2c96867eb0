//! # Seed
//!
//! Populates a fresh database with a starter college directory and the
//! administrator account. Registration refuses the admin role, so this is
//! the only way to create one. Safe to run repeatedly.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use secrecy::ExposeSecret;
use ut_auth_jwt::JwtAuthProvider;
use ut_config::{SeedSettings, Settings};
use ut_core::error::AppError;
use ut_core::models::{Role, User};
use ut_core::services::{CollegeService, NewCollege};
use ut_core::traits::{AuthProvider, CollegeRepo, UserRepo};
use ut_db_sqlite::SqliteMarketRepo;
use ut_storage_local::LocalMediaStore;
use uuid::Uuid;

/// (code, name, short name, slug, city, state)
const COLLEGES: &[(&str, &str, &str, &str, &str, &str)] = &[
    ("IITB", "Indian Institute of Technology Bombay", "IIT Bombay", "iit-bombay", "Mumbai", "Maharashtra"),
    ("IITD", "Indian Institute of Technology Delhi", "IIT Delhi", "iit-delhi", "New Delhi", "Delhi"),
    ("NITT", "National Institute of Technology Tiruchirappalli", "NIT Trichy", "nit-trichy", "Tiruchirappalli", "Tamil Nadu"),
    ("BITS", "Birla Institute of Technology and Science Pilani", "BITS Pilani", "bits-pilani", "Pilani", "Rajasthan"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    ut_config::init_tracing(settings.log_json);

    let repo = Arc::new(
        SqliteMarketRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("opening database {}", settings.database.url))?,
    );
    let media = Arc::new(LocalMediaStore::new(
        settings.media.upload_dir.clone(),
        settings.media.url_prefix.clone(),
    ));
    let auth = JwtAuthProvider::new(&settings.auth.jwt_secret, settings.auth.token_ttl_days);

    let colleges = CollegeService::new(repo.clone(), media);
    let home = seed_colleges(&colleges, repo.as_ref()).await?;
    seed_admin(repo.as_ref(), &auth, &settings.seed, home).await?;

    tracing::info!("seed complete");
    Ok(())
}

/// Returns the id of the first college, which becomes the admin's home.
async fn seed_colleges(service: &CollegeService, repo: &SqliteMarketRepo) -> anyhow::Result<Uuid> {
    for (code, name, short_name, slug, city, state) in COLLEGES {
        let input = NewCollege {
            code: Some(code.to_string()),
            name: Some(name.to_string()),
            short_name: Some(short_name.to_string()),
            slug: Some(slug.to_string()),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            country: None,
        };
        match service.create(input, None, None).await {
            Ok(college) => tracing::info!(code = %college.code, "college seeded"),
            Err(AppError::Conflict { field, .. }) => {
                tracing::info!(%code, %field, "college already present, skipping");
            }
            Err(err) => return Err(err).with_context(|| format!("seeding college {code}")),
        }
    }

    let (home_code, ..) = COLLEGES[0];
    repo.list_colleges(false)
        .await?
        .into_iter()
        .find(|college| college.code == home_code)
        .map(|college| college.id)
        .with_context(|| format!("college {home_code} missing after seeding"))
}

async fn seed_admin(
    repo: &SqliteMarketRepo,
    auth: &JwtAuthProvider,
    seed: &SeedSettings,
    home: Uuid,
) -> anyhow::Result<()> {
    let email = seed.admin_email.trim().to_lowercase();
    if repo.find_user_by_email(&email).await?.is_some() {
        tracing::info!(%email, "admin already present, skipping");
        return Ok(());
    }

    let password_hash = auth.hash_password(seed.admin_password.expose_secret()).await?;
    let now = Utc::now();
    let admin = User {
        id: Uuid::now_v7(),
        username: seed.admin_username.trim().to_lowercase(),
        name: seed.admin_name.trim().to_string(),
        email,
        mobile: seed.admin_mobile.trim().to_string(),
        role: Role::Admin,
        password_hash,
        avatar_url: None,
        permanent_college_id: home,
        current_college_id: Some(home),
        is_blocked: false,
        last_login_at: None,
        created_at: now,
        updated_at: now,
    };
    repo.insert_user(&admin).await.context("creating admin account")?;
    tracing::info!(username = %admin.username, "admin account created");
    Ok(())
}
