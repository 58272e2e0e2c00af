use super::{
    DASHBOARD_PATH, FORCE_CHANGE_PASSWORD_PATH, Forward, PROFILE_PATH, Route, RouteMeta,
    STAFF_DASHBOARD_PATH,
};

/// Authenticated Routes
///
/// Reachable by every signed-in role. `/dashboard` itself renders nothing;
/// it forwards to the caller's role dashboard.
pub fn authenticated_routes() -> Vec<Route> {
    vec![
        Route::new(DASHBOARD_PATH, "Dashboard", RouteMeta::authenticated())
            .forwarding(Forward::RoleDashboard),
        Route::new(
            STAFF_DASHBOARD_PATH,
            "StaffDashboard",
            RouteMeta::authenticated().with_title("Dashboard"),
        ),
        Route::new(
            PROFILE_PATH,
            "Profile",
            RouteMeta::authenticated().with_title("Profil"),
        ),
        // Must stay reachable while the password change is pending.
        Route::new(
            FORCE_CHANGE_PASSWORD_PATH,
            "ForceChangePassword",
            RouteMeta::authenticated()
                .skipping_password_check()
                .with_title("Ganti Password"),
        ),
    ]
}
