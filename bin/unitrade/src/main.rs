//! # UniTrade Binary
//!
//! The entry point that assembles the application based on compile-time features.

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use ut_api::{configure_routes, middleware, AppState, Ports, SessionPolicy};
use ut_config::Settings;
use ut_core::traits::{AuthProvider, MediaStore};

#[cfg(feature = "db-sqlite")]
use ut_db_sqlite::SqliteMarketRepo;

#[cfg(feature = "storage-local")]
use ut_storage_local::LocalMediaStore;

#[cfg(feature = "auth-jwt")]
use ut_auth_jwt::JwtAuthProvider;

#[cfg(not(all(feature = "db-sqlite", feature = "storage-local", feature = "auth-jwt")))]
compile_error!("unitrade needs a database, a media store and an auth provider feature enabled");

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    ut_config::init_tracing(settings.log_json);

    // 1. Database
    let repo = Arc::new(
        SqliteMarketRepo::connect(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("opening database {}", settings.database.url))?,
    );

    // 2. Media storage
    tokio::fs::create_dir_all(&settings.media.upload_dir)
        .await
        .with_context(|| format!("creating {}", settings.media.upload_dir.display()))?;
    let media: Arc<dyn MediaStore> = Arc::new(LocalMediaStore::new(
        settings.media.upload_dir.clone(),
        settings.media.url_prefix.clone(),
    ));

    // 3. Auth
    let auth: Arc<dyn AuthProvider> = Arc::new(JwtAuthProvider::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_days,
    ));

    // 4. Services, shared by every worker
    let session = SessionPolicy {
        production: settings.server.production,
        ttl_days: settings.auth.token_ttl_days,
    };
    let state = web::Data::new(AppState::new(
        Ports::from_store(repo, media, auth),
        session,
        settings.server.max_upload_bytes,
    ));

    let (host, port) = settings.bind_address();
    tracing::info!(%host, port, production = settings.server.production, "UniTrade starting");

    let cors_origins = settings.server.cors_origins.clone();
    let url_prefix = settings.media.url_prefix.clone();
    let upload_dir = settings.media.upload_dir.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::cors_policy(&cors_origins))
            .wrap(middleware::standard_middleware())
            .service(actix_files::Files::new(&url_prefix, &upload_dir))
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))
    .with_context(|| format!("binding {host}:{port}"))?
    .run()
    .await
    .context("server terminated")?;

    Ok(())
}
