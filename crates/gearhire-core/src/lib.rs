//! Core library for gearhire, a client for the equipment rental marketplace API.
//!
//! The [`auth::SessionManager`] owns the signed-in session and wraps protected
//! calls with a single refresh-and-replay on 401. The [`catalog::CatalogClient`]
//! builds the category, subcategory, and equipment calls on top of it.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{ApiError, ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use auth::{AuthError, Session, SessionManager, SignIn};
pub use catalog::CatalogClient;
pub use config::{Config, StoreBackend};
