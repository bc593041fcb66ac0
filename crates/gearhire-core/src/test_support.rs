//! Test utilities: scripted transport, failing store, token and user fixtures.
//! This module is only compiled when running tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::SessionManager;
use crate::models::{Role, User};
use crate::store::{MemoryStore, SecureStore, StoreError};

// ============================================================================
// Fixtures
// ============================================================================

/// HS256 token carrying `exp` when given
pub fn make_token(exp: Option<i64>) -> String {
    let claims = match exp {
        Some(exp) => serde_json::json!({ "sub": "1", "exp": exp }),
        None => serde_json::json!({ "sub": "1" }),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret"))
        .expect("Failed to encode test token")
}

/// Token expiring `minutes` from now
pub fn token_expiring_in(minutes: i64) -> String {
    make_token(Some((Utc::now() + Duration::minutes(minutes)).timestamp()))
}

pub fn sample_user(role: Role) -> User {
    User {
        id: 1,
        email: "renter@gearhire.test".to_string(),
        role,
        username: Some("renter".to_string()),
    }
}

pub fn signin_body(token: &str, role: Role) -> String {
    serde_json::json!({ "access_token": token, "user": sample_user(role) }).to_string()
}

pub fn ok(body: impl Into<String>) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse::new(200, body))
}

pub fn status(code: u16) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse::new(code, ""))
}

// ============================================================================
// Fake transport
// ============================================================================

type Responder = dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync;

/// Transport that answers from a closure and records every request.
/// Each send yields once so concurrent callers interleave.
pub struct FakeTransport {
    responder: Box<Responder>,
    calls: Mutex<Vec<ApiRequest>>,
    slow_path: Option<(String, usize)>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            slow_path: None,
        })
    }

    /// Like `new`, but requests to `path` yield `yields` times before answering
    pub fn with_slow_path<F>(path: &str, yields: usize, responder: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            slow_path: Some((path.to_string(), yields)),
        })
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls().iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.calls.lock().expect("calls lock poisoned").push(request.clone());
        let yields = match &self.slow_path {
            Some((path, yields)) if *path == request.path => *yields,
            _ => 1,
        };
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        (self.responder)(&request)
    }
}

// ============================================================================
// Failing store
// ============================================================================

/// Store whose reads or writes fail, either always or for one key
pub struct FailingStore {
    pub fail_reads: bool,
    pub fail_writes: bool,
    fail_key: Option<&'static str>,
    inner: MemoryStore,
}

impl FailingStore {
    pub fn new(fail_reads: bool, fail_writes: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_reads,
            fail_writes,
            fail_key: None,
            inner: MemoryStore::new(),
        })
    }

    /// Store where only `set(key)` fails; removals still succeed
    pub fn failing_key(key: &'static str) -> Arc<Self> {
        Arc::new(Self {
            fail_reads: false,
            fail_writes: false,
            fail_key: Some(key),
            inner: MemoryStore::new(),
        })
    }

    /// Write straight to the backing map, bypassing configured failures
    pub async fn seed(&self, key: &str, value: &str) {
        self.inner.set(key, value).await.expect("seed write failed");
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SecureStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Backend("keychain locked".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes || self.fail_key == Some(key) {
            return Err(StoreError::Backend("keychain locked".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("keychain locked".to_string()));
        }
        self.inner.remove(key).await
    }
}

/// Manager over `transport` and a fresh memory store, returning both
pub fn manager_with(transport: Arc<FakeTransport>) -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let manager = SessionManager::new(transport, store.clone());
    (manager, store)
}
