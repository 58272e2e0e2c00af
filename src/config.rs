use std::{env, path::PathBuf, time::Duration};

use crate::error::ClientError;

/// Default API base for local development (the Gin backend on :8080).
pub const LOCAL_API_BASE_URL: &str = "http://localhost:8080/api";

/// Request timeout applied when `SIRINE_HTTP_TIMEOUT_MS` is not set.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// ClientConfig
///
/// Immutable client configuration, loaded once at startup and cloned into
/// every component that needs it (transport, CLI, session persistence).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    // Base URL every request path is joined to, e.g. `http://host:8080/api`.
    pub api_base_url: String,
    // Per-request timeout. Also bounds how long a refresh can stall queued calls.
    pub timeout: Duration,
    // Runtime environment marker. Controls log format and fail-fast rules.
    pub env: Env,
    // Where the CLI persists the session between runs.
    pub session_file: PathBuf,
}

/// Env
///
/// Runtime context. Local gets forgiving defaults; Production requires every
/// endpoint to be configured explicitly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for ClientConfig {
    /// Safe local configuration used by tests and examples.
    fn default() -> Self {
        Self {
            api_base_url: LOCAL_API_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            env: Env::Local,
            session_file: default_session_file(),
        }
    }
}

impl ClientConfig {
    /// load
    ///
    /// Reads the configuration from the environment (call `dotenv` first if a
    /// `.env` file should be honoured).
    ///
    /// # Errors
    /// Returns `ClientError::Config` when `SIRINE_API_BASE_URL` is missing in
    /// production, or when the timeout is not a positive integer.
    pub fn load() -> Result<Self, ClientError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match (env, env::var("SIRINE_API_BASE_URL")) {
            (_, Ok(url)) if !url.trim().is_empty() => url.trim_end_matches('/').to_string(),
            (Env::Local, _) => LOCAL_API_BASE_URL.to_string(),
            (Env::Production, _) => {
                return Err(ClientError::Config(
                    "SIRINE_API_BASE_URL must be set in production".to_string(),
                ));
            }
        };

        let timeout = match env::var("SIRINE_HTTP_TIMEOUT_MS") {
            Ok(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    ClientError::Config(format!("SIRINE_HTTP_TIMEOUT_MS is not a number: {raw}"))
                })?;
                if millis == 0 {
                    return Err(ClientError::Config(
                        "SIRINE_HTTP_TIMEOUT_MS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_millis(millis)
            }
            Err(_) => Duration::from_millis(DEFAULT_TIMEOUT_MS),
        };

        let session_file = env::var("SIRINE_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        Ok(Self {
            api_base_url,
            timeout,
            env,
            session_file,
        })
    }
}

fn default_session_file() -> PathBuf {
    env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir())
        .join(".sirine")
        .join("session.json")
}
