//! Session cookie plumbing and the identity extractors.
//!
//! Handlers never read tokens themselves: they declare an [`AuthUser`],
//! [`AdminUser`] or [`MaybeUser`] argument and receive an already resolved,
//! unblocked user.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use ut_core::error::AppError;
use ut_core::models::{Actor, User};

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "token";

/// Cookie attributes. Production cookies must cross sites, so they are
/// `Secure; SameSite=None`; everywhere else they are `SameSite=Strict`.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub production: bool,
    pub ttl_days: i64,
}

impl SessionPolicy {
    fn same_site(&self) -> SameSite {
        if self.production {
            SameSite::None
        } else {
            SameSite::Strict
        }
    }

    pub fn cookie(&self, token: &str) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, token.to_owned())
            .path("/")
            .http_only(true)
            .secure(self.production)
            .same_site(self.same_site())
            .max_age(Duration::days(self.ttl_days))
            .finish()
    }

    pub fn removal(&self) -> Cookie<'static> {
        let mut cookie = Cookie::build(SESSION_COOKIE, "")
            .path("/")
            .http_only(true)
            .secure(self.production)
            .same_site(self.same_site())
            .finish();
        cookie.make_removal();
        cookie
    }
}

/// The cookie wins over the `Authorization: Bearer` header.
fn token_from(req: &HttpRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_owned());
        }
    }
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn state_of(req: &HttpRequest) -> Result<web::Data<AppState>, ApiError> {
    req.app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError(AppError::internal("application state not configured")))
}

/// An authenticated, unblocked user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = state_of(req);
        let token = token_from(req);
        Box::pin(async move {
            let state = state?;
            let token = token.ok_or(AppError::AuthRequired)?;
            let user = state.users.resolve_session(&token).await?;
            Ok(AuthUser(user))
        })
    }
}

/// An authenticated user holding the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl AdminUser {
    pub fn actor(&self) -> Actor {
        self.0.actor()
    }
}

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload);
        Box::pin(async move {
            let AuthUser(user) = auth.await?;
            if !user.is_admin() {
                return Err(ApiError(AppError::Forbidden("admin access required".into())));
            }
            Ok(AdminUser(user))
        })
    }
}

/// The caller when a token is presented, `None` when none is. A presented
/// but invalid token still fails.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<User>);

impl FromRequest for MaybeUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        if token_from(req).is_none() {
            return Box::pin(async { Ok(MaybeUser(None)) });
        }
        let auth = AuthUser::from_request(req, payload);
        Box::pin(async move { Ok(MaybeUser(Some(auth.await?.0))) })
    }
}
