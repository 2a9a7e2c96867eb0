//! # AppError
//!
//! Centralized error handling for the UniTrade services.
//! Maps domain-specific failures to actionable error types; the HTTP layer
//! turns each variant into a status code and a `{success:false, message}` body.

use thiserror::Error;

/// The primary error type for all ut-core operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// Resource not found (e.g., Item, College, Wishlist)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Malformed or missing input, always naming the offending field
    #[error("validation error on `{field}`: {message}")]
    ValidationError { field: String, message: String },

    /// No session token was presented
    #[error("not authenticated")]
    AuthRequired,

    /// A token was presented but is invalid, expired, or names a deleted user
    #[error("invalid or expired session")]
    InvalidSession,

    #[error("invalid email or password")]
    InvalidCredentials,

    /// Ownership or role violation
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("account blocked")]
    Blocked,

    /// The resource exists but is hidden or no longer on offer
    #[error("{0}")]
    Unavailable(String),

    #[error("you must have a current college to post items")]
    MissingCollege,

    /// Uniqueness violation on a single field (e.g., duplicate college slug)
    #[error("{entity} with this {field} already exists")]
    Conflict { entity: String, field: String },

    /// Set membership violation (e.g., item already bookmarked)
    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("item not in wishlist")]
    NotInWishlist,

    /// Infrastructure failure (e.g., DB down, media store unwritable)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(kind: &str, id: impl ToString) -> Self {
        Self::NotFound(kind.to_string(), id.to_string())
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn conflict(entity: &str, field: &str) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            field: field.to_string(),
        }
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A specialized Result type for UniTrade logic.
pub type Result<T> = std::result::Result<T, AppError>;
