#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use serde_json::{Value, json};
use sirine_client::{
    ClientConfig, ClientError, MemoryStorage, RecordingNavigator, SirineClient,
    models::{AuthPayload, Department, Role, User},
    navigation::NavigatorState,
    storage::StorageState,
    transport::{ApiRequest, ApiResponse, HttpTransport, TransportState},
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;

pub const GOOD_PASSWORD: &str = "rahasia123";
pub const INITIAL_ACCESS: &str = "access-0";
pub const INITIAL_REFRESH: &str = "refresh-0";
pub const ROTATED_ACCESS: &str = "access-1";
pub const ROTATED_REFRESH: &str = "refresh-1";

// --- Fixtures ---

pub fn user(id: u64, role: Role) -> User {
    let mut user = User::new(id, role, Department::Khazwal);
    user.nip = format!("{id:05}");
    user.full_name = format!("Pegawai {id}");
    user
}

pub fn auth_payload(role: Role) -> AuthPayload {
    AuthPayload {
        token: INITIAL_ACCESS.to_string(),
        refresh_token: INITIAL_REFRESH.to_string(),
        user: user(1, role),
        require_password_change: false,
    }
}

#[derive(Serialize)]
struct TestClaims {
    #[serde(skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
    user_id: u64,
    role: &'static str,
}

/// Mints a signed JWT expiring `ttl_secs` from now (negative for the past),
/// or with no `exp` claim at all.
pub fn mint_jwt(ttl_secs: Option<i64>) -> String {
    let claims = TestClaims {
        exp: ttl_secs.map(|ttl| chrono::Utc::now().timestamp() + ttl),
        user_id: 1,
        role: "ADMIN",
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"sirine-test-secret"),
    )
    .expect("Failed to mint test JWT")
}

// --- Mock Transport ---

/// How the mock backend answers `POST /auth/refresh`.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    Rotate,
    Reject,
    ServerError,
}

/// MockBackend
///
/// An in-process stand-in for the API. Protected paths accept only the
/// current access token; refresh rotates it. An optional gate holds every
/// refresh call until the test releases it.
pub struct MockBackend {
    valid_token: Mutex<String>,
    refresh_behavior: Mutex<RefreshBehavior>,
    refresh_gate: Option<Arc<Notify>>,
    // Rotated tokens are issued but never accepted.
    stale_after_refresh: bool,
    refresh_calls: AtomicUsize,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            valid_token: Mutex::new(INITIAL_ACCESS.to_string()),
            refresh_behavior: Mutex::new(RefreshBehavior::Rotate),
            refresh_gate: None,
            stale_after_refresh: false,
            refresh_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_refresh(self, behavior: RefreshBehavior) -> Self {
        *self.refresh_behavior.lock().unwrap() = behavior;
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.refresh_gate = Some(gate);
        self
    }

    pub fn stale_after_refresh(mut self) -> Self {
        self.stale_after_refresh = true;
        self
    }

    /// Makes the current access token stale, as if it expired server-side.
    pub fn expire_access_token(&self) {
        *self.valid_token.lock().unwrap() = "expired-on-server".to_string();
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }

    fn refresh_response(&self) -> ApiResponse {
        let behavior = self.refresh_behavior.lock().unwrap().clone();
        match behavior {
            RefreshBehavior::Rotate => {
                if !self.stale_after_refresh {
                    *self.valid_token.lock().unwrap() = ROTATED_ACCESS.to_string();
                }
                ApiResponse::new(
                    200,
                    json!({
                        "success": true,
                        "message": "Token berhasil di-refresh",
                        "data": { "token": ROTATED_ACCESS, "refresh_token": ROTATED_REFRESH }
                    }),
                )
            }
            RefreshBehavior::Reject => ApiResponse::new(
                401,
                json!({ "success": false, "message": "Refresh token tidak valid" }),
            ),
            RefreshBehavior::ServerError => ApiResponse::new(500, Value::Null),
        }
    }

    fn login_response(request: &ApiRequest) -> ApiResponse {
        let password = request
            .body
            .as_ref()
            .and_then(|body| body.get("password"))
            .and_then(Value::as_str);

        if password != Some(GOOD_PASSWORD) {
            return ApiResponse::new(
                401,
                json!({ "success": false, "message": "NIP atau password salah" }),
            );
        }

        let payload = auth_payload(Role::Admin);
        ApiResponse::new(
            200,
            json!({ "success": true, "message": "Login berhasil", "data": payload }),
        )
    }
}

#[async_trait]
impl HttpTransport for MockBackend {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.log.lock().unwrap().push(request.clone());

        // Like the real transport, a leading slash is optional.
        match request.path.trim_start_matches('/') {
            "auth/login" => Ok(Self::login_response(&request)),
            "auth/refresh" => {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = &self.refresh_gate {
                    gate.notified().await;
                }
                Ok(self.refresh_response())
            }
            _ => {
                let path = request.path.as_str();
                let valid = self.valid_token.lock().unwrap().clone();
                if request.bearer.as_deref() == Some(valid.as_str()) {
                    Ok(ApiResponse::new(
                        200,
                        json!({ "success": true, "data": { "path": path, "token": valid } }),
                    ))
                } else {
                    Ok(ApiResponse::new(
                        401,
                        json!({ "success": false, "message": "Token tidak valid" }),
                    ))
                }
            }
        }
    }
}

// --- Harness ---

pub struct Harness {
    pub client: SirineClient,
    pub backend: Arc<MockBackend>,
    pub navigator: Arc<RecordingNavigator>,
    pub storage: Arc<MemoryStorage>,
}

pub fn harness(backend: MockBackend) -> Harness {
    harness_with_storage(backend, MemoryStorage::new())
}

pub fn harness_with_storage(backend: MockBackend, storage: MemoryStorage) -> Harness {
    let backend = Arc::new(backend);
    let navigator = Arc::new(RecordingNavigator::new());
    let storage = Arc::new(storage);

    let client = SirineClient::new(
        ClientConfig::default(),
        Arc::clone(&backend) as TransportState,
        Arc::clone(&storage) as StorageState,
        Arc::clone(&navigator) as NavigatorState,
    );

    Harness {
        client,
        backend,
        navigator,
        storage,
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}
