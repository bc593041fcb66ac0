//! REST transport module for the gearhire marketplace API.
//!
//! This module provides the [`Transport`] seam, the request/response types
//! that cross it, the production [`ReqwestTransport`], and the [`ApiError`]
//! taxonomy built from HTTP status codes.

pub mod error;
pub mod transport;

pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
