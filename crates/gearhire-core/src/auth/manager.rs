//! The session manager: sign-in, restore, refresh, sign-out, and the
//! retry-once wrapper for protected requests.

use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::models::{Registration, User};
use crate::store::{SecureStore, StoreError, ACCESS_TOKEN_KEY, SESSION_KEYS, TOKEN_EXPIRY_KEY, USER_KEY};

use super::token::{ExpiryExtractor, JwtExpiryExtractor};
use super::{AuthError, Session};

// ============================================================================
// Constants
// ============================================================================

const SIGNIN_PATH: &str = "/auth/signin";
const SIGNUP_PATH: &str = "/auth/signup";
const LOGOUT_PATH: &str = "/auth/logout";
const REFRESH_PATH: &str = "/auth/refresh";

const LOGIN_FALLBACK_MESSAGE: &str = "Invalid email or password";
const REGISTER_FALLBACK_MESSAGE: &str = "Registration failed";

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    access_token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

/// Result of a successful sign-in.
///
/// `storage_error` is set when the session could not be written to the
/// secure store. The in-memory session is valid either way; it just will not
/// survive a restart.
#[derive(Debug)]
pub struct SignIn {
    pub user: User,
    pub storage_error: Option<StoreError>,
}

/// Owns the one authoritative session for the application.
///
/// Share it behind an `Arc`. Reads are cheap snapshots; mutations go through
/// the async methods. Token refresh is single-flight: concurrent callers that
/// hit a 401 wait on one refresh instead of each issuing their own.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<dyn SecureStore>,
    extractor: Box<dyn ExpiryExtractor>,
    state: RwLock<Session>,
    refresh_lock: tokio::sync::Mutex<()>,
    storage_error: Mutex<Option<StoreError>>,
}

impl SessionManager {
    /// Create a manager with an empty session and the JWT expiry extractor
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn SecureStore>) -> Self {
        Self::with_extractor(transport, store, Box::new(JwtExpiryExtractor))
    }

    pub fn with_extractor(
        transport: Arc<dyn Transport>,
        store: Arc<dyn SecureStore>,
        extractor: Box<dyn ExpiryExtractor>,
    ) -> Self {
        Self {
            transport,
            store,
            extractor,
            state: RwLock::new(Session::empty()),
            refresh_lock: tokio::sync::Mutex::new(()),
            storage_error: Mutex::new(None),
        }
    }

    // ===== Read accessors =====

    fn read_state(&self) -> RwLockReadGuard<'_, Session> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Session> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the current session
    pub fn session(&self) -> Session {
        self.read_state().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_state().access_token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.read_state().user().cloned()
    }

    pub fn token_expiry(&self) -> Option<i64> {
        self.read_state().token_expiry()
    }

    pub fn is_expired(&self) -> bool {
        self.read_state().is_expired()
    }

    /// Token present and outside the expiry buffer
    pub fn is_authenticated(&self) -> bool {
        !self.is_expired()
    }

    pub fn is_admin(&self) -> bool {
        self.read_state().is_admin()
    }

    /// Store failure from the last refresh that could not persist its token.
    ///
    /// The refreshed session stays usable in memory but will not survive a
    /// restart. Taking the error clears it.
    pub fn take_storage_error(&self) -> Option<StoreError> {
        self.storage_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }

    // ===== Lifecycle =====

    /// Load the persisted session, if any.
    ///
    /// Read failures and missing fields leave the session empty without an
    /// error. A loaded session that is already expired (or has no known
    /// expiry) is discarded and wiped from the store. Returns whether a
    /// usable session is now in memory.
    pub async fn restore(&self) -> bool {
        let loaded = match self.load_persisted().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("No persisted session found");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session, starting signed out");
                return false;
            }
        };

        if loaded.is_expired() {
            info!(expiry = ?loaded.token_expiry(), "Persisted session expired, discarding");
            self.clear().await;
            return false;
        }

        debug!(
            user_id = ?loaded.user().map(|u| u.id),
            minutes_left = ?loaded.minutes_until_expiry(),
            "Session restored"
        );
        *self.write_state() = loaded;
        true
    }

    /// Read the three session keys. `Ok(None)` when nothing usable is stored.
    async fn load_persisted(&self) -> Result<Option<Session>, StoreError> {
        let Some(token) = self.store.get(ACCESS_TOKEN_KEY).await? else {
            return Ok(None);
        };

        let user = match self.store.get(USER_KEY).await? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Persisted user record is unreadable");
                    return Ok(None);
                }
            },
            None => return Ok(None),
        };

        let expiry = self
            .store
            .get(TOKEN_EXPIRY_KEY)
            .await?
            .and_then(|raw| raw.trim().parse::<i64>().ok());

        Ok(Some(Session::authenticated(token, Some(user), expiry)))
    }

    /// Sign in with email and password.
    ///
    /// On rejection the current session is left untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<SignIn, AuthError> {
        let request = ApiRequest::post(SIGNIN_PATH).json(&SignInRequest { email, password })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = Self::rejection(response, LOGIN_FALLBACK_MESSAGE);
            warn!(error = %err, "Sign-in rejected");
            return Err(err);
        }

        let body: SignInResponse = response.json()?;
        let expiry = self.extractor.expiry_millis(&body.access_token);
        if expiry.is_none() {
            warn!("Token expiry could not be decoded; session will be treated as expired");
        }

        let session = Session::authenticated(body.access_token, Some(body.user.clone()), expiry);
        let storage_error = self.persist(&session).await.err();
        if let Some(ref e) = storage_error {
            warn!(error = %e, "Failed to persist session");
        }
        *self.write_state() = session;

        info!(user_id = body.user.id, role = ?body.user.role, "Signed in");
        Ok(SignIn {
            user: body.user,
            storage_error,
        })
    }

    /// Create an account. Does not sign in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<Registration, AuthError> {
        let request = ApiRequest::post(SIGNUP_PATH).json(&SignUpRequest {
            email,
            password,
            username,
        })?;
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            let err = Self::rejection(response, REGISTER_FALLBACK_MESSAGE);
            warn!(error = %err, "Sign-up rejected");
            return Err(err);
        }

        let registration: Registration = response.json()?;
        info!(user_id = registration.id, "Account registered");
        Ok(registration)
    }

    /// Sign out. The server call is best-effort; the local session and the
    /// store are always cleared, and calling this again is harmless.
    pub async fn logout(&self) {
        if let Some(token) = self.access_token() {
            let request = ApiRequest::post(LOGOUT_PATH).with_bearer(&token);
            match self.transport.send(request).await {
                Ok(response) if response.is_success() => debug!("Server session invalidated"),
                Ok(response) => debug!(status = response.status, "Server logout refused"),
                Err(e) => warn!(error = %e, "Server logout failed"),
            }
        }
        self.clear().await;
        info!("Signed out");
    }

    /// Obtain a new access token using the server-managed refresh credential.
    ///
    /// Any failure clears the whole session and yields `None`.
    pub async fn refresh(&self) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that was rejected while using `stale`.
    ///
    /// If another caller already replaced `stale` while we waited for the
    /// lock, reuse its token rather than refreshing again. If the session was
    /// cleared in the meantime there is nothing to refresh.
    async fn refresh_after(&self, stale: &str) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;
        match self.access_token() {
            Some(current) if current != stale => {
                debug!("Token already refreshed by a concurrent request");
                Some(current)
            }
            Some(_) => self.refresh_locked().await,
            None => None,
        }
    }

    /// Caller must hold `refresh_lock`.
    ///
    /// If the session changes while the request is in flight (a logout or a
    /// new login), the refresh result is dropped and the current token wins.
    async fn refresh_locked(&self) -> Option<String> {
        let before = self.access_token();
        let outcome = self.request_new_token().await;

        let token = match outcome {
            Ok(token) => token,
            Err(e) => {
                if self.access_token() != before {
                    debug!(error = %e, "Session changed during failed refresh, leaving it alone");
                    return self.access_token();
                }
                warn!(error = %e, "Token refresh failed, clearing session");
                self.clear().await;
                return None;
            }
        };

        let expiry = self.extractor.expiry_millis(&token);
        let session = {
            let mut state = self.write_state();
            if state.access_token() != before.as_deref() {
                debug!("Session changed during refresh, discarding refreshed token");
                return state.access_token().map(str::to_string);
            }
            let refreshed = state.with_token(token.clone(), expiry);
            *state = refreshed.clone();
            refreshed
        };

        if let Err(e) = self.persist(&session).await {
            error!(error = %e, "Failed to persist refreshed session");
            *self
                .storage_error
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(e);
        }

        // A logout that landed while we were writing has already wiped the
        // store once; our writes came after it.
        if self.access_token().is_none() {
            debug!("Signed out during refresh, wiping refreshed token");
            self.wipe_store().await;
            return None;
        }

        info!(expiry = ?expiry, "Access token refreshed");
        Some(token)
    }

    async fn request_new_token(&self) -> Result<String, ApiError> {
        let response = self
            .transport
            .send(ApiRequest::post(REFRESH_PATH))
            .await?
            .error_for_status()?;
        let body: RefreshResponse = response.json()?;
        Ok(body.access_token)
    }

    // ===== Protected requests =====

    /// Send `request` with the current bearer token.
    ///
    /// A 401 triggers at most one refresh and one replay. If the refresh fails,
    /// or the replay is rejected again, the session is cleared and
    /// `AuthenticationExpired` is returned. Other failures are returned as-is.
    pub async fn authenticated_request(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let token = self.access_token().ok_or(AuthError::Unauthenticated)?;

        let response = self.transport.send(request.with_bearer(&token)).await?;
        if !response.is_unauthorized() {
            return Ok(response.error_for_status()?);
        }

        info!(path = %request.path, "Request unauthorized, refreshing token");
        let Some(fresh) = self.refresh_after(&token).await else {
            self.logout().await;
            return Err(AuthError::AuthenticationExpired);
        };

        let retried = self.transport.send(request.with_bearer(&fresh)).await?;
        if retried.is_unauthorized() {
            warn!(path = %request.path, "Refreshed token rejected, signing out");
            self.logout().await;
            return Err(AuthError::AuthenticationExpired);
        }
        Ok(retried.error_for_status()?)
    }

    /// Send a request that needs no credentials. Non-2xx statuses become errors.
    pub async fn public_request(&self, request: ApiRequest) -> Result<ApiResponse, AuthError> {
        let response = self.transport.send(request).await?;
        Ok(response.error_for_status()?)
    }

    // ===== Persistence helpers =====

    /// Write all three session fields as one unit.
    ///
    /// On any failure every session key is removed, so a later `restore()`
    /// never pairs a token with another token's user or expiry.
    async fn persist(&self, session: &Session) -> Result<(), StoreError> {
        let result = self.write_session(session).await;
        if result.is_err() {
            self.wipe_store().await;
        }
        result
    }

    async fn write_session(&self, session: &Session) -> Result<(), StoreError> {
        let Some(token) = session.access_token() else {
            return Ok(());
        };
        self.store.set(ACCESS_TOKEN_KEY, token).await?;

        match session.user() {
            Some(user) => {
                let raw = serde_json::to_string(user)
                    .map_err(|e| StoreError::Corrupt(format!("Failed to encode user: {}", e)))?;
                self.store.set(USER_KEY, &raw).await?;
            }
            None => self.store.remove(USER_KEY).await?,
        }

        match session.token_expiry() {
            Some(expiry) => self.store.set(TOKEN_EXPIRY_KEY, &expiry.to_string()).await?,
            None => self.store.remove(TOKEN_EXPIRY_KEY).await?,
        }
        Ok(())
    }

    /// Empty the in-memory session and wipe every persisted key
    async fn clear(&self) {
        *self.write_state() = Session::empty();
        self.wipe_store().await;
    }

    async fn wipe_store(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key).await {
                warn!(key, error = %e, "Failed to remove persisted session field");
            }
        }
    }

    fn rejection(response: ApiResponse, fallback: &str) -> AuthError {
        if (400..500).contains(&response.status) {
            let message = ApiError::server_message(&response.body).unwrap_or_else(|| fallback.to_string());
            AuthError::Credentials(message)
        } else {
            AuthError::Api(ApiError::from_status(response.status, &response.body))
        }
    }
}
