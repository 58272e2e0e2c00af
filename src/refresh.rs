use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use reqwest::Method;
use serde_json::json;
use tokio::sync::oneshot;

use crate::{
    api::REFRESH_ENDPOINT,
    error::{ClientError, GENERIC_ERROR_MESSAGE, SESSION_EXPIRED_MESSAGE, extract_message},
    models::{ApiEnvelope, RefreshResponse},
    navigation::NavigatorState,
    routes::LOGIN_PATH,
    session::SessionStore,
    transport::{ApiRequest, TransportState},
};

type RefreshOutcome = Result<String, ClientError>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    // Parked callers, in arrival order.
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

enum Turn {
    Leader,
    Follower(oneshot::Receiver<RefreshOutcome>),
}

/// RefreshCoordinator
///
/// Single-flight access-token refresh. The first caller that finds no refresh
/// in progress becomes the leader and issues the one `POST /auth/refresh`;
/// every caller arriving while it is outstanding parks on a oneshot channel
/// and receives the leader's outcome.
///
/// States: IDLE -> REFRESHING -> IDLE. The state mutex is never held across
/// an await point.
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    calls: AtomicUsize,
    transport: TransportState,
    session: Arc<SessionStore>,
    navigator: NavigatorState,
}

impl RefreshCoordinator {
    pub fn new(
        transport: TransportState,
        session: Arc<SessionStore>,
        navigator: NavigatorState,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            calls: AtomicUsize::new(0),
            transport,
            session,
            navigator,
        }
    }

    /// Number of refresh network calls issued so far.
    pub fn refresh_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Callers currently parked behind the in-flight refresh.
    pub fn queued(&self) -> usize {
        self.lock().waiters.len()
    }

    /// fresh_access_token
    ///
    /// Returns a newly issued access token, sharing one refresh call among all
    /// concurrent callers.
    ///
    /// With no refresh token at all the session is cleared and the login
    /// surface navigated to immediately, without a network call.
    ///
    /// # Errors
    /// `ClientError::SessionExpired` when the refresh failed (the session has
    /// been cleared), or `ClientError::RefreshAbandoned` when the leader was
    /// cancelled before it settled.
    pub async fn fresh_access_token(&self) -> Result<String, ClientError> {
        let turn = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                Turn::Follower(rx)
            } else if self.session.refresh_token().is_none() {
                drop(state);
                tracing::warn!("No refresh token available, ending session");
                return Err(self.expire(SESSION_EXPIRED_MESSAGE.to_string()));
            } else {
                state.refreshing = true;
                Turn::Leader
            }
        };

        match turn {
            Turn::Follower(rx) => {
                tracing::debug!("Waiting on in-flight token refresh");
                rx.await.unwrap_or(Err(ClientError::RefreshAbandoned))
            }
            Turn::Leader => {
                let guard = LeaderGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.run_refresh().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    async fn run_refresh(&self) -> RefreshOutcome {
        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(self.expire(SESSION_EXPIRED_MESSAGE.to_string()));
        };

        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Refreshing access token");

        let request = ApiRequest::new(Method::POST, REFRESH_ENDPOINT)
            .with_body(json!({ "refresh_token": refresh_token }));

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh did not reach the server");
                return Err(self.expire(SESSION_EXPIRED_MESSAGE.to_string()));
            }
        };

        if !response.is_success() {
            let message = match extract_message(&response.body) {
                text if text == GENERIC_ERROR_MESSAGE => SESSION_EXPIRED_MESSAGE.to_string(),
                text => text,
            };
            tracing::warn!(status = response.status, %message, "Token refresh rejected");
            return Err(self.expire(message));
        }

        let envelope: ApiEnvelope<RefreshResponse> = match serde_json::from_value(response.body) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh returned an unreadable body");
                return Err(self.expire(SESSION_EXPIRED_MESSAGE.to_string()));
            }
        };

        let data = match envelope.data {
            Some(data) if envelope.success => data,
            _ => {
                let message = envelope
                    .message
                    .unwrap_or_else(|| SESSION_EXPIRED_MESSAGE.to_string());
                return Err(self.expire(message));
            }
        };

        self.session.update_tokens(&data.token, &data.refresh_token);
        if let Some(user) = data.user {
            self.session.set_user(user);
        }

        tracing::info!("Access token refreshed");
        Ok(data.token)
    }

    /// Terminal path: drop the session, send the user to login.
    fn expire(&self, message: String) -> ClientError {
        self.session.clear_auth();
        self.navigator.navigate(LOGIN_PATH);
        ClientError::SessionExpired(message)
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the coordinator to IDLE when the leader finishes or is dropped.
///
/// If the leader future is cancelled mid-refresh, the parked senders are
/// dropped, so followers observe `RefreshAbandoned` instead of waiting forever.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        let waiters = self.release();
        tracing::debug!(waiters = waiters.len(), ok = outcome.is_ok(), "Releasing queued requests");
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        self.settled = true;
    }

    fn release(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut state = self.coordinator.lock();
        state.refreshing = false;
        std::mem::take(&mut state.waiters)
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let abandoned = self.release();
            tracing::warn!(waiters = abandoned.len(), "Token refresh abandoned");
        }
    }
}
