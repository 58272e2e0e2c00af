use std::sync::Arc;

use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::Instrument;

use crate::{
    api::{LOGIN_ENDPOINT, REFRESH_ENDPOINT},
    error::{ClientError, SESSION_EXPIRED_MESSAGE, extract_message},
    navigation::NavigatorState,
    refresh::RefreshCoordinator,
    routes::LOGIN_PATH,
    session::SessionStore,
    transport::{ApiRequest, ApiResponse, TransportState},
};

/// Gateway
///
/// Authenticated Request Gateway. Wraps every outbound call: injects the
/// current access token, and on a 401 decides between surfacing the error,
/// ending the session, or waiting on a single shared token refresh and
/// replaying the call once.
///
/// One gateway is built per client and owns its [`RefreshCoordinator`], so
/// separate clients (and separate tests) never share refresh state.
pub struct Gateway {
    transport: TransportState,
    session: Arc<SessionStore>,
    navigator: NavigatorState,
    refresh: RefreshCoordinator,
}

impl Gateway {
    pub fn new(
        transport: TransportState,
        session: Arc<SessionStore>,
        navigator: NavigatorState,
    ) -> Self {
        let refresh = RefreshCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&session),
            Arc::clone(&navigator),
        );
        Self {
            transport,
            session,
            navigator,
            refresh,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    pub fn navigator(&self) -> &NavigatorState {
        &self.navigator
    }

    // --- Typed verbs ---

    /// # Errors
    /// See [`Gateway::send_raw`].
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.call(Method::GET, path, None).await
    }

    /// # Errors
    /// See [`Gateway::send_raw`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::POST, path, Some(serde_json::to_value(body)?))
            .await
    }

    /// # Errors
    /// See [`Gateway::send_raw`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PUT, path, Some(serde_json::to_value(body)?))
            .await
    }

    /// # Errors
    /// See [`Gateway::send_raw`].
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Method::PATCH, path, Some(serde_json::to_value(body)?))
            .await
    }

    /// # Errors
    /// See [`Gateway::send_raw`].
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.call(Method::DELETE, path, None).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let value = self.send_raw(method, path, body).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// send_raw
    ///
    /// Sends one call and returns the JSON body of a 2xx response.
    ///
    /// # Errors
    /// * `InvalidCredentials` for a 401 on the login endpoint (no refresh).
    /// * `SessionExpired` when the refresh endpoint itself returns 401, or the
    ///   shared refresh fails.
    /// * `Unauthorized` when the replayed call is rejected again.
    /// * `Validation` / `Api` for other non-2xx statuses, `Network` when no
    ///   response arrived.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ClientError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;

        let response = self.dispatch(request).await?;
        if !response.is_success() {
            return Err(ClientError::from_response(response.status, &response.body));
        }
        Ok(response.body)
    }

    /// dispatch
    ///
    /// The interceptor proper: returns whatever the server answered, except
    /// that a 401 is resolved by the rules above before the caller sees it.
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let span = tracing::debug_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            req_id = %request.request_id,
        );

        self.intercept(request).instrument(span).await
    }

    async fn intercept(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut request = request.with_bearer(self.session.access_token());
        tracing::debug!(authenticated = request.bearer.is_some(), "Dispatching request");

        let response = self.transport.send(request.clone()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        let message = extract_message(&response.body);

        if is_endpoint(&request.path, LOGIN_ENDPOINT) {
            return Err(ClientError::InvalidCredentials(message));
        }

        if is_endpoint(&request.path, REFRESH_ENDPOINT) {
            tracing::warn!("Refresh endpoint rejected the refresh token");
            self.session.clear_auth();
            self.navigator.navigate(LOGIN_PATH);
            return Err(ClientError::SessionExpired(SESSION_EXPIRED_MESSAGE.to_string()));
        }

        if request.retried {
            return Err(ClientError::Unauthorized(message));
        }

        request.retried = true;
        tracing::debug!("Access token rejected, awaiting refresh");
        let token = self.refresh.fresh_access_token().await?;
        request.bearer = Some(token);

        let replayed = self.transport.send(request).await?;
        if replayed.is_unauthorized() {
            tracing::warn!("Request rejected again after token refresh");
            return Err(ClientError::Unauthorized(extract_message(&replayed.body)));
        }
        Ok(replayed)
    }
}

/// Compares a request path with an endpoint, ignoring the query string and
/// leading or trailing slashes. The transport accepts `auth/login` and
/// `/auth/login` alike, so both must hit the same rule.
fn is_endpoint(path: &str, endpoint: &str) -> bool {
    let path = path.split('?').next().unwrap_or(path);
    path.trim_start_matches('/').trim_end_matches('/') == endpoint.trim_start_matches('/')
}

#[cfg(test)]
mod tests {
    use super::is_endpoint;

    #[test]
    fn endpoint_match_ignores_query_and_slashes() {
        assert!(is_endpoint("/auth/login", "/auth/login"));
        assert!(is_endpoint("/auth/login/", "/auth/login"));
        assert!(is_endpoint("/auth/refresh?x=1", "/auth/refresh"));
        assert!(is_endpoint("auth/login", "/auth/login"));
        assert!(is_endpoint("auth/refresh/?x=1", "/auth/refresh"));
        assert!(!is_endpoint("/auth/me", "/auth/login"));
        assert!(!is_endpoint("auth/me", "/auth/login"));
    }
}
