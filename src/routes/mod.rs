//! Route Table Index
//!
//! The navigable surface of the front-end, split by who may reach it. The
//! guard in `crate::guard` reads each route's [`RouteMeta`]; the split here
//! only keeps the table readable.

/// Routes for signed-out visitors (login and password recovery).
pub mod public;

/// Routes for any signed-in user.
pub mod authenticated;

/// Routes restricted to ADMIN and MANAGER.
pub mod admin;

use crate::{
    guard::{self, GuardDecision, Redirect, Target},
    models::Role,
    session::Session,
};

pub const ROOT_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";
pub const FORCE_CHANGE_PASSWORD_PATH: &str = "/force-change-password";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_DASHBOARD_PATH: &str = "/dashboard/admin";
pub const STAFF_DASHBOARD_PATH: &str = "/dashboard/staff";
pub const PROFILE_PATH: &str = "/profile";
pub const NOT_FOUND_NAME: &str = "NotFound";

pub const APP_TITLE: &str = "Sirine Go";

/// Upper bound on chained redirects followed by [`RouteTable::navigate`].
const MAX_REDIRECT_HOPS: usize = 8;

/// Fixed role -> landing page table.
pub fn dashboard_for_role(role: Role) -> &'static str {
    match role {
        Role::Admin | Role::Manager => ADMIN_DASHBOARD_PATH,
        Role::StaffKhazwal
        | Role::OperatorCetak
        | Role::QcInspector
        | Role::Verifikator
        | Role::StaffKhazkhir
        | Role::Unknown => STAFF_DASHBOARD_PATH,
    }
}

/// RouteMeta
///
/// Access rules attached to a route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteMeta {
    pub requires_auth: bool,
    /// Only reachable while signed out (the login page).
    pub guest_only: bool,
    /// Restricts the route to these roles.
    pub roles: Option<Vec<Role>>,
    /// Reachable even while a forced password change is pending.
    pub skip_password_check: bool,
    pub title: Option<&'static str>,
}

impl RouteMeta {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn guest() -> Self {
        Self {
            guest_only: true,
            ..Self::default()
        }
    }

    pub fn authenticated() -> Self {
        Self {
            requires_auth: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: &[Role]) -> Self {
        self.roles = Some(roles.to_vec());
        self
    }

    #[must_use]
    pub fn skipping_password_check(mut self) -> Self {
        self.skip_password_check = true;
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: &'static str) -> Self {
        self.title = Some(title);
        self
    }
}

/// Where a route forwards to before any guard runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    To(&'static str),
    /// The caller's role dashboard, or the login page when signed out.
    RoleDashboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub name: &'static str,
    pub meta: RouteMeta,
    pub forward: Option<Forward>,
}

impl Route {
    pub fn new(path: &'static str, name: &'static str, meta: RouteMeta) -> Self {
        Self {
            path,
            name,
            meta,
            forward: None,
        }
    }

    #[must_use]
    pub fn forwarding(mut self, forward: Forward) -> Self {
        self.forward = Some(forward);
        self
    }

    /// `"<title> - Sirine Go"`, or just the app title for untitled routes.
    pub fn document_title(&self) -> String {
        match self.meta.title {
            Some(title) => format!("{title} - {APP_TITLE}"),
            None => APP_TITLE.to_string(),
        }
    }
}

/// The outcome of following a navigation through forwards and guards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// The location finally shown, including any `?redirect=` query.
    pub location: String,
    /// Every location visited on the way, starting with the requested one.
    pub hops: Vec<String>,
}

/// RouteTable
///
/// Exact-path route lookup with a catch-all not-found route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    not_found: Route,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            not_found: Route::new("/:pathMatch(.*)*", NOT_FOUND_NAME, RouteMeta::open()),
        }
    }

    /// The application's route table.
    pub fn standard() -> Self {
        let mut routes = vec![
            Route::new(ROOT_PATH, "Root", RouteMeta::open())
                .forwarding(Forward::To(DASHBOARD_PATH)),
        ];
        routes.extend(public::public_routes());
        routes.extend(authenticated::authenticated_routes());
        routes.extend(admin::admin_routes());
        Self::new(routes)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Resolves a location (query string ignored) to its route, falling back
    /// to the not-found route.
    pub fn resolve(&self, location: &str) -> &Route {
        let path = strip_query(location);
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };

        self.routes
            .iter()
            .find(|route| route.path == path)
            .unwrap_or(&self.not_found)
    }

    /// Runs the guard for one navigation attempt, after applying the route's
    /// forward if it has one.
    pub fn check(&self, location: &str, session: &Session) -> GuardDecision {
        let route = self.resolve(location);

        if let Some(forward) = route.forward {
            let to = match forward {
                Forward::To(path) => path,
                Forward::RoleDashboard => session.role().map_or(LOGIN_PATH, dashboard_for_role),
            };
            return GuardDecision::Redirect(Redirect::to(to));
        }

        let target = Target {
            path: strip_query(location),
            full_path: location,
            meta: &route.meta,
        };
        guard::decide(&target, session)
    }

    /// Follows forwards and guard redirects until a location is allowed.
    ///
    /// Stops after a bounded number of hops so a misconfigured table cannot
    /// loop forever; the last location reached is returned in that case.
    pub fn navigate(&self, location: &str, session: &Session) -> Navigation {
        let mut current = location.to_string();
        let mut hops = vec![current.clone()];

        for _ in 0..MAX_REDIRECT_HOPS {
            match self.check(&current, session) {
                GuardDecision::Allow => break,
                GuardDecision::Redirect(redirect) => {
                    current = redirect.to_location();
                    hops.push(current.clone());
                }
            }
        }

        Navigation {
            location: current,
            hops,
        }
    }
}

fn strip_query(location: &str) -> &str {
    location.split(['?', '#']).next().unwrap_or(location)
}
