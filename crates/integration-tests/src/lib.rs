//! Fixtures shared by the integration tests: a fully wired application over
//! in-memory SQLite, a temporary media directory and a real JWT provider.

use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, App};
use chrono::Utc;
use secrecy::SecretString;
use tempfile::TempDir;
use ut_api::{configure_routes, AppState, Ports, SessionPolicy};
use ut_auth_jwt::JwtAuthProvider;
use ut_core::models::{Actor, College, ItemView, Role, Upload, User, UserProfile};
use ut_core::services::{NewCollege, NewItem, RegisterInput};
use ut_core::traits::{AuthProvider, UserRepo};
use ut_db_sqlite::SqliteMarketRepo;
use ut_storage_local::LocalMediaStore;
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "hunter22";
pub const MAX_UPLOAD_BYTES: usize = 1024 * 1024;
pub const BOUNDARY: &str = "----unitrade-test-boundary";

static NEXT_MOBILE: AtomicU32 = AtomicU32::new(1);

pub struct TestEnv {
    pub repo: Arc<SqliteMarketRepo>,
    pub auth: Arc<JwtAuthProvider>,
    pub state: web::Data<AppState>,
    pub media_dir: TempDir,
}

/// A signed-in account and its session token.
#[derive(Debug, Clone)]
pub struct Login {
    pub user: UserProfile,
    pub token: String,
}

impl Login {
    pub fn id(&self) -> Uuid {
        self.user.user.id
    }

    pub fn actor(&self) -> Actor {
        self.user.user.actor()
    }

    pub fn bearer(&self) -> (actix_web::http::header::HeaderName, String) {
        (AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

impl TestEnv {
    pub async fn new() -> Self {
        let repo = Arc::new(
            SqliteMarketRepo::new("sqlite::memory:")
                .await
                .expect("in-memory sqlite"),
        );
        let media_dir = tempfile::tempdir().expect("media dir");
        let media = Arc::new(LocalMediaStore::new(media_dir.path(), "/static/uploads"));
        let auth = Arc::new(JwtAuthProvider::new(&SecretString::from(TEST_SECRET.to_string()), 7));

        let ports = Ports::from_store(repo.clone(), media, auth.clone());
        let session = SessionPolicy {
            production: false,
            ttl_days: 7,
        };
        let state = web::Data::new(AppState::new(ports, session, MAX_UPLOAD_BYTES));

        Self {
            repo,
            auth,
            state,
            media_dir,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(self.state.clone())
            .configure(configure_routes)
    }

    pub async fn college(&self, code: &str) -> College {
        let input = NewCollege {
            code: Some(code.to_string()),
            name: Some(format!("{code} Institute of Technology")),
            slug: Some(code.to_lowercase()),
            city: Some("Pune".to_string()),
            state: Some("Maharashtra".to_string()),
            ..NewCollege::default()
        };
        self.state
            .colleges
            .create(input, None, None)
            .await
            .expect("college")
    }

    /// Registers a student through the account service.
    pub async fn student(&self, username: &str, college: &College) -> Login {
        let mobile = format!("9{:09}", NEXT_MOBILE.fetch_add(1, Ordering::Relaxed));
        let input = RegisterInput {
            username: Some(username.to_string()),
            name: Some(username.to_uppercase()),
            email: Some(format!("{username}@campus.test")),
            password: Some(TEST_PASSWORD.to_string()),
            mobile: Some(mobile),
            role: None,
            permanent_college: Some(college.id.to_string()),
        };
        let (user, token) = self.state.users.register(input).await.expect("register");
        Login { user, token }
    }

    /// Admins cannot self-register; they are written straight to storage.
    pub async fn admin(&self, college: &College) -> Login {
        let now = Utc::now();
        let user = User {
            id: Uuid::now_v7(),
            username: "root".to_string(),
            name: "Root Admin".to_string(),
            email: "root@campus.test".to_string(),
            mobile: "8000000000".to_string(),
            role: Role::Admin,
            password_hash: self.auth.hash_password(TEST_PASSWORD).await.expect("hash"),
            avatar_url: None,
            permanent_college_id: college.id,
            current_college_id: Some(college.id),
            is_blocked: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_user(&user).await.expect("insert admin");
        let token = self.auth.issue_token(user.id).expect("token");
        let user = self.state.users.profile(user.id).await.expect("profile");
        Login { user, token }
    }

    pub async fn sell_item(&self, seller: &Login, title: &str, price: f64) -> ItemView {
        let input = NewItem {
            title: Some(title.to_string()),
            category: Some("books".to_string()),
            listing_type: Some("sell".to_string()),
            price: Some(price.to_string()),
            ..NewItem::default()
        };
        self.state
            .items
            .create(Some(&seller.actor()), input, Vec::new())
            .await
            .expect("sell item")
    }

    pub async fn rent_item(&self, seller: &Login, title: &str, rent_price: f64, unit: &str) -> ItemView {
        let input = NewItem {
            title: Some(title.to_string()),
            category: Some("electronics".to_string()),
            listing_type: Some("rent".to_string()),
            rent_price: Some(rent_price.to_string()),
            rent_unit: Some(unit.to_string()),
            ..NewItem::default()
        };
        self.state
            .items
            .create(Some(&seller.actor()), input, Vec::new())
            .await
            .expect("rent item")
    }
}

/// A small PNG. Different shades give different content hashes.
pub fn png(shade: u8) -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, 64, 128, 255]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn png_upload(shade: u8) -> Upload {
    Upload {
        filename: Some(format!("photo-{shade}.png")),
        content_type: "image/png".to_string(),
        data: png(shade),
    }
}

/// One part of a hand-built `multipart/form-data` body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: Vec<u8>,
    },
}

/// Returns the `Content-Type` header value and the encoded body.
pub fn multipart(parts: Vec<Part<'_>>) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
                );
            }
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(&data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
