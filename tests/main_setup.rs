use serial_test::serial;
use sirine_client::{
    ClientConfig, ClientError,
    config::{DEFAULT_TIMEOUT_MS, Env, LOCAL_API_BASE_URL},
};
use std::{env, panic, path::PathBuf, time::Duration};

const CONFIG_VARS: [&str; 4] = [
    "APP_ENV",
    "SIRINE_API_BASE_URL",
    "SIRINE_HTTP_TIMEOUT_MS",
    "SIRINE_SESSION_FILE",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly the given variables set (all other config
/// variables cleared), then restores the original environment.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_client_config_production_fail_fast() {
    let result = run_with_env(&[("APP_ENV", "production")], ClientConfig::load);

    assert!(
        matches!(result, Err(ClientError::Config(_))),
        "Production config must require SIRINE_API_BASE_URL"
    );
}

#[test]
#[serial]
fn test_client_config_production_with_base_url() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("SIRINE_API_BASE_URL", "https://sirine.example.go.id/api/"),
        ],
        ClientConfig::load,
    )
    .unwrap();

    assert_eq!(config.env, Env::Production);
    // Trailing slash is trimmed so paths join cleanly.
    assert_eq!(config.api_base_url, "https://sirine.example.go.id/api");
}

#[test]
#[serial]
fn test_client_config_local_env_defaults() {
    let config = run_with_env(&[("APP_ENV", "local")], ClientConfig::load).unwrap();

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.api_base_url, LOCAL_API_BASE_URL);
    assert_eq!(config.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    assert!(config.session_file.ends_with(".sirine/session.json"));
}

#[test]
#[serial]
fn test_client_config_overrides() {
    let config = run_with_env(
        &[
            ("SIRINE_HTTP_TIMEOUT_MS", "2500"),
            ("SIRINE_SESSION_FILE", "/tmp/sirine-test/session.json"),
        ],
        ClientConfig::load,
    )
    .unwrap();

    assert_eq!(config.timeout, Duration::from_millis(2500));
    assert_eq!(
        config.session_file,
        PathBuf::from("/tmp/sirine-test/session.json")
    );
}

#[test]
#[serial]
fn test_client_config_rejects_bad_timeout() {
    for raw in ["0", "soon", "-5"] {
        let result = run_with_env(&[("SIRINE_HTTP_TIMEOUT_MS", raw)], ClientConfig::load);
        assert!(
            matches!(result, Err(ClientError::Config(_))),
            "accepted timeout {raw:?}"
        );
    }
}
