//! # ut-api
//!
//! The web routing and orchestration layer for UniTrade.

pub mod error;
pub mod forms;
pub mod handlers;
pub mod middleware;
pub mod session;
pub mod state;

use actix_web::web;

pub use error::{ApiError, ApiResult};
pub use session::{SessionPolicy, SESSION_COOKIE};
pub use state::{AppState, Ports};

/// Extractor failures render through [`ApiError`] like every other error.
fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::invalid("body", err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::invalid("query", err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|_err, _req| ApiError::invalid("id", "is not a valid id").into()),
    );
}

/// Mounts every route. The binary wraps the result in logging and CORS.
///
/// # Developer Note
/// Literal segments such as `/me` are registered ahead of `/{id}` so they
/// are never captured as an id.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    use handlers::{colleges, health, items, users, wishlist};

    extractor_config(cfg);

    cfg.route("/health", web::get().to(health::health)).service(
        web::scope("/api")
            .service(
                web::scope("/user")
                    .route("", web::get().to(users::list_users))
                    .route("/register", web::post().to(users::register))
                    .route("/login", web::post().to(users::login))
                    .route("/is-auth", web::get().to(users::is_auth))
                    .route("/logout", web::post().to(users::logout))
                    .route("/me", web::patch().to(users::update_me))
                    .route("/{id}/block", web::patch().to(users::set_blocked))
                    .route("/{id}", web::patch().to(users::admin_update))
                    .route("/{id}", web::delete().to(users::delete_user)),
            )
            .service(
                web::scope("/college")
                    .route("/add", web::post().to(colleges::add))
                    .route("/list", web::get().to(colleges::list))
                    .route("/get/{id}", web::get().to(colleges::get))
                    .route("/update/{id}", web::put().to(colleges::update))
                    .route("/remove/{id}", web::delete().to(colleges::remove)),
            )
            .service(
                web::scope("/item")
                    .route("/list", web::get().to(items::list))
                    .route("/get/{id}", web::get().to(items::get))
                    .route("/add", web::post().to(items::add))
                    .route("/my-items", web::get().to(items::my_items))
                    .route("/update/{id}", web::put().to(items::update))
                    .route("/remove/{id}", web::delete().to(items::remove))
                    .route("/toggle-active/{id}", web::patch().to(items::toggle_active))
                    .route("/admin/list", web::get().to(items::admin_list))
                    .route("/admin/toggle-active/{id}", web::patch().to(items::admin_toggle_active))
                    .route("/admin/remove/{id}", web::delete().to(items::admin_remove)),
            )
            .service(
                web::scope("/wishlist")
                    .route("", web::get().to(wishlist::get))
                    .route("/add/{id}", web::post().to(wishlist::add))
                    .route("/remove/{id}", web::delete().to(wishlist::remove))
                    .route("/clear", web::delete().to(wishlist::clear))
                    .route("/check/{id}", web::get().to(wishlist::check))
                    .route("/count", web::get().to(wishlist::count)),
            ),
    );
}
