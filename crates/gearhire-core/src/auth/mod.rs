//! Authentication module for managing the user's session.
//!
//! This module provides:
//! - `SessionManager`: sign-in, restore, refresh, sign-out, and the
//!   retry-once wrapper for protected requests
//! - `Session`: the in-memory token, user, and expiry
//! - `ExpiryExtractor`: pluggable token expiry decoding (JWT by default)
//!
//! Sessions are persisted through a `SecureStore` and are considered expired
//! five minutes before the token's own expiry.

pub mod error;
pub mod manager;
pub mod session;
pub mod token;

pub use error::AuthError;
pub use manager::{SessionManager, SignIn};
pub use session::{Session, EXPIRY_BUFFER_MINUTES};
pub use token::{ExpiryExtractor, JwtExpiryExtractor};
