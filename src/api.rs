use std::sync::Arc;

use serde_json::{Value, json};

use crate::{
    error::ClientError,
    gateway::Gateway,
    models::{
        ApiEnvelope, AuthPayload, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest,
        ResetPasswordRequest, User,
    },
    routes::{LOGIN_PATH, dashboard_for_role},
    session::SessionStore,
};

// --- Endpoints (relative to the API base URL) ---

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout";
pub const ME_ENDPOINT: &str = "/auth/me";
pub const FORGOT_PASSWORD_ENDPOINT: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_ENDPOINT: &str = "/auth/reset-password";
pub const CHANGE_PASSWORD_ENDPOINT: &str = "/profile/password";

/// AuthApi
///
/// The authentication operations a front-end performs, each a thin call
/// through the [`Gateway`] plus the matching session mutation.
#[derive(Clone)]
pub struct AuthApi {
    gateway: Arc<Gateway>,
}

impl AuthApi {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    /// login
    ///
    /// `identifier` is the NIP or the e-mail address. A 401 here is reported
    /// as `InvalidCredentials` and never triggers a refresh.
    ///
    /// # Errors
    /// `InvalidCredentials`, `Validation`, `Api` or `Network`.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<AuthPayload, ClientError> {
        let request = LoginRequest {
            nip: identifier.to_string(),
            password: password.to_string(),
            remember_me,
        };

        let envelope: ApiEnvelope<AuthPayload> =
            self.gateway.post(LOGIN_ENDPOINT, &request).await?;
        let payload = unwrap_data(envelope, "Login gagal")?;

        self.session().set_auth(&payload);
        Ok(payload)
    }

    /// logout
    ///
    /// Tells the server (best effort) and then always clears the local
    /// session and navigates to the login surface, even if the call failed.
    pub async fn logout(&self) {
        if self.session().access_token().is_some() {
            let result: Result<Value, ClientError> =
                self.gateway.post(LOGOUT_ENDPOINT, &json!({})).await;
            if let Err(err) = result {
                tracing::warn!(error = %err, "Logout call failed, clearing session anyway");
            }
        }

        self.session().clear_auth();
        self.gateway.navigator().navigate(LOGIN_PATH);
    }

    /// Fetches `/auth/me` and replaces the stored user with it.
    ///
    /// # Errors
    /// Any gateway error, or `Api` when the envelope reports failure.
    pub async fn fetch_current_user(&self) -> Result<User, ClientError> {
        let envelope: ApiEnvelope<User> = self.gateway.get(ME_ENDPOINT).await?;
        let user = unwrap_data(envelope, "Gagal mengambil data user")?;

        self.session().set_user(user.clone());
        Ok(user)
    }

    /// check_auth
    ///
    /// Validates the stored session against the server. Without an access
    /// token this is `false` with no network call; any failure clears the
    /// session.
    pub async fn check_auth(&self) -> bool {
        if self.session().access_token().is_none() {
            return false;
        }

        match self.fetch_current_user().await {
            Ok(_) => true,
            Err(err) => {
                tracing::info!(error = %err, "Stored session failed verification");
                self.session().clear_auth();
                false
            }
        }
    }

    /// Forces a token refresh, sharing the in-flight one if there is one.
    ///
    /// # Errors
    /// `SessionExpired` (session already cleared) or `RefreshAbandoned`.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.gateway.refresh_coordinator().fresh_access_token().await
    }

    /// Requests a reset link. The server answers success whether or not the
    /// account exists; the returned message is meant for display.
    ///
    /// # Errors
    /// `Validation`, `Api` or `Network`.
    pub async fn forgot_password(&self, nip_or_email: &str) -> Result<String, ClientError> {
        let request = ForgotPasswordRequest {
            nip_or_email: nip_or_email.to_string(),
        };
        let envelope: ApiEnvelope<Value> =
            self.gateway.post(FORGOT_PASSWORD_ENDPOINT, &request).await?;
        unwrap_message(envelope, "Gagal mengirim email reset password")
    }

    /// # Errors
    /// `Validation`, `Api` (e.g. expired reset token) or `Network`.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let request = ResetPasswordRequest {
            token: token.to_string(),
            new_password: new_password.to_string(),
        };
        let envelope: ApiEnvelope<Value> =
            self.gateway.post(RESET_PASSWORD_ENDPOINT, &request).await?;
        unwrap_message(envelope, "Gagal reset password")
    }

    /// change_password
    ///
    /// On success the server revokes every session of the user, so the local
    /// session is cleared and the login surface navigated to.
    ///
    /// # Errors
    /// `Validation`, `Api`, `SessionExpired` or `Network`.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<String, ClientError> {
        let request = ChangePasswordRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let envelope: ApiEnvelope<Value> =
            self.gateway.put(CHANGE_PASSWORD_ENDPOINT, &request).await?;
        let message = unwrap_message(envelope, "Gagal mengubah password")?;

        self.session().clear_auth();
        self.gateway.navigator().navigate(LOGIN_PATH);
        Ok(message)
    }

    /// Where the signed-in user lands by default; `/login` when signed out.
    pub fn dashboard_route(&self) -> &'static str {
        self.session()
            .user()
            .map_or(LOGIN_PATH, |user| dashboard_for_role(user.role))
    }
}

/// Unwraps `data` of a successful envelope.
fn unwrap_data<T>(envelope: ApiEnvelope<T>, fallback: &str) -> Result<T, ClientError> {
    match envelope.data {
        Some(data) if envelope.success => Ok(data),
        _ => Err(ClientError::Api {
            status: 200,
            message: envelope.message.unwrap_or_else(|| fallback.to_string()),
        }),
    }
}

/// Returns the message of a successful envelope that carries no data.
fn unwrap_message(envelope: ApiEnvelope<Value>, fallback: &str) -> Result<String, ClientError> {
    if envelope.success {
        Ok(envelope.message.unwrap_or_default())
    } else {
        Err(ClientError::Api {
            status: 200,
            message: envelope.message.unwrap_or_else(|| fallback.to_string()),
        })
    }
}
