use super::{
    FORGOT_PASSWORD_PATH, LOGIN_PATH, RESET_PASSWORD_PATH, Route, RouteMeta,
};

/// Public Routes
///
/// Login is guest-only: a signed-in user is bounced to their dashboard (or
/// to the forced password change). The recovery pages stay open to anyone,
/// since a reset link may be followed from a signed-in browser.
pub fn public_routes() -> Vec<Route> {
    vec![
        Route::new(
            LOGIN_PATH,
            "Login",
            RouteMeta::guest().with_title("Login"),
        ),
        Route::new(
            FORGOT_PASSWORD_PATH,
            "ForgotPassword",
            RouteMeta::open()
                .skipping_password_check()
                .with_title("Lupa Password"),
        ),
        Route::new(
            RESET_PASSWORD_PATH,
            "ResetPassword",
            RouteMeta::open()
                .skipping_password_check()
                .with_title("Reset Password"),
        ),
    ]
}
