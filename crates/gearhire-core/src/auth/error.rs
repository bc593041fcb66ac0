use thiserror::Error;

use crate::api::ApiError;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Sign-in or sign-up refused by the server. Carries the server's message
    /// or a generic fallback.
    #[error("{0}")]
    Credentials(String),

    #[error("Authentication expired - please sign in again")]
    AuthenticationExpired,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("This action requires an administrator account")]
    Forbidden,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::InvalidResponse(msg) => AuthError::InvalidResponse(msg),
            other => AuthError::Api(other),
        }
    }
}
