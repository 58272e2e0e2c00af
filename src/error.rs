use std::collections::BTreeMap;

use serde_json::Value;

/// Fallback text shown when the server gives no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Terjadi kesalahan";

/// Fallback text for connectivity failures (no response at all).
pub const NETWORK_ERROR_MESSAGE: &str =
    "Tidak dapat terhubung ke server. Periksa koneksi internet Anda.";

/// Text surfaced when the session can no longer be recovered.
pub const SESSION_EXPIRED_MESSAGE: &str = "Sesi Anda telah berakhir. Silakan login kembali.";

/// ClientError
///
/// Every failure the client can surface to calling code. The variants follow
/// the error taxonomy of the authentication flow:
///
/// * `InvalidCredentials`: 401 on the login call. No session mutation.
/// * `SessionExpired`: the refresh call failed or no refresh token exists.
///   The session has already been cleared and the login surface navigated to.
/// * `Network`: no response was received. The session is untouched.
/// * `Validation`: 400/422 carrying per-field messages.
/// * `Api`: any other rejected call, with the server message when present.
///
/// The type is `Clone` so a single refresh outcome can be handed to every
/// request that was parked behind it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{0}")]
    SessionExpired(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("token refresh was abandoned before it settled")]
    RefreshAbandoned,

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("session storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Human-readable text suitable for display next to a form or in a toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(message)
            | Self::SessionExpired(message)
            | Self::Unauthorized(message) => message.clone(),
            Self::Validation { message, .. } | Self::Api { message, .. } => message.clone(),
            Self::Network(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::RefreshAbandoned => SESSION_EXPIRED_MESSAGE.to_string(),
            Self::Decode(_) | Self::Storage(_) | Self::Config(_) => {
                GENERIC_ERROR_MESSAGE.to_string()
            }
        }
    }

    /// True when the caller is expected to send the user back to the login screen.
    pub fn is_session_terminal(&self) -> bool {
        matches!(self, Self::SessionExpired(_) | Self::RefreshAbandoned)
    }

    /// Builds the error for a non-success HTTP status from the response body.
    pub(crate) fn from_response(status: u16, body: &Value) -> Self {
        let message = extract_message(body);
        match status {
            400 | 422 => {
                let fields = extract_field_errors(body);
                if fields.is_empty() && status == 400 {
                    Self::Api { status, message }
                } else {
                    Self::Validation { message, fields }
                }
            }
            _ => Self::Api { status, message },
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Pulls the human-readable message out of an error body.
///
/// Prefers `message`, then `error`, then the generic localized fallback.
pub fn extract_message(body: &Value) -> String {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(key).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map_or_else(|| GENERIC_ERROR_MESSAGE.to_string(), str::to_string)
}

/// Reads the `errors` object of a validation response into field -> message.
///
/// Accepts both `{"field": "msg"}` and `{"field": ["msg", ...]}` shapes; for
/// arrays the first message wins.
fn extract_field_errors(body: &Value) -> BTreeMap<String, String> {
    let Some(errors) = body.get("errors").and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    errors
        .iter()
        .filter_map(|(field, value)| {
            let text = match value {
                Value::String(text) => Some(text.clone()),
                Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
                _ => None,
            }?;
            Some((field.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_prefers_message_over_error() {
        let body = json!({ "message": "NIP atau password salah", "error": "unauthorized" });
        assert_eq!(extract_message(&body), "NIP atau password salah");
    }

    #[test]
    fn message_falls_back_to_error_then_generic() {
        assert_eq!(extract_message(&json!({ "error": "boom" })), "boom");
        assert_eq!(extract_message(&json!({})), GENERIC_ERROR_MESSAGE);
        assert_eq!(extract_message(&json!({ "message": "  " })), GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn validation_errors_collect_fields() {
        let body = json!({
            "success": false,
            "message": "Validasi gagal",
            "errors": { "nip": "NIP wajib diisi", "password": ["terlalu pendek", "lain"] }
        });

        match ClientError::from_response(422, &body) {
            ClientError::Validation { message, fields } => {
                assert_eq!(message, "Validasi gagal");
                assert_eq!(fields["nip"], "NIP wajib diisi");
                assert_eq!(fields["password"], "terlalu pendek");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn plain_bad_request_is_api_error() {
        let err = ClientError::from_response(400, &json!({ "message": "Token tidak valid" }));
        assert_eq!(
            err,
            ClientError::Api {
                status: 400,
                message: "Token tidak valid".to_string()
            }
        );
    }

    #[test]
    fn network_errors_use_generic_user_message() {
        let err = ClientError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), NETWORK_ERROR_MESSAGE);
        assert!(!err.is_session_terminal());
    }
}
