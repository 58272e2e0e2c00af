use crate::models::Role;

use super::{ADMIN_DASHBOARD_PATH, Route, RouteMeta};

/// Admin Routes
///
/// ADMIN and MANAGER only. Other roles are sent to their own dashboard.
pub fn admin_routes() -> Vec<Route> {
    vec![Route::new(
        ADMIN_DASHBOARD_PATH,
        "AdminDashboard",
        RouteMeta::authenticated()
            .with_roles(&[Role::Admin, Role::Manager])
            .with_title("Dashboard Admin"),
    )]
}
