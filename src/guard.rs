use tracing::debug;
use url::form_urlencoded;

use crate::{
    routes::{
        DASHBOARD_PATH, FORCE_CHANGE_PASSWORD_PATH, LOGIN_PATH, RouteMeta, dashboard_for_role,
    },
    session::Session,
};

/// Query parameter carrying the originally requested location to the login page.
pub const RETURN_PARAM: &str = "redirect";

/// A navigation attempt as seen by the guard.
#[derive(Debug, Clone, Copy)]
pub struct Target<'a> {
    /// Path without query or fragment.
    pub path: &'a str,
    /// The location exactly as requested, used as the return destination.
    pub full_path: &'a str,
    pub meta: &'a RouteMeta,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub return_to: Option<String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_to: None,
        }
    }

    pub fn with_return(path: impl Into<String>, return_to: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            return_to: Some(return_to.into()),
        }
    }

    /// Renders `path?redirect=<urlencoded return location>`.
    pub fn to_location(&self) -> String {
        match &self.return_to {
            Some(return_to) => {
                let encoded: String =
                    form_urlencoded::byte_serialize(return_to.as_bytes()).collect();
                format!("{}?{RETURN_PARAM}={encoded}", self.path)
            }
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Redirect),
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect_location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::Redirect(redirect) => Some(redirect.to_location()),
        }
    }
}

/// Decides whether `target` is reachable with the given session.
///
/// Rules are evaluated in order and the first match wins:
/// 1. guest-only target while signed in: forced password change, else the role dashboard
/// 2. protected target while signed out: login, remembering the target
/// 3. pending password change: the forced change page, unless the target opts out
/// 4. role-restricted target the user's role is not in: the role dashboard
/// 5. allow
pub fn decide(target: &Target<'_>, session: &Session) -> GuardDecision {
    let meta = target.meta;
    let authenticated = session.is_authenticated();

    if meta.guest_only && authenticated {
        let to = if session.requires_password_change() {
            FORCE_CHANGE_PASSWORD_PATH
        } else {
            landing_page(session)
        };
        debug!(path = target.path, to, "guest-only route while signed in");
        return GuardDecision::Redirect(Redirect::to(to));
    }

    if meta.requires_auth && !authenticated {
        debug!(path = target.path, "protected route while signed out");
        return GuardDecision::Redirect(Redirect::with_return(LOGIN_PATH, target.full_path));
    }

    if authenticated
        && !meta.skip_password_check
        && session.requires_password_change()
        && target.path != FORCE_CHANGE_PASSWORD_PATH
    {
        return GuardDecision::Redirect(Redirect::to(FORCE_CHANGE_PASSWORD_PATH));
    }

    if let Some(roles) = &meta.roles {
        if !session.has_role(roles) {
            let to = landing_page(session);
            debug!(path = target.path, to, "role not permitted");
            return GuardDecision::Redirect(Redirect::to(to));
        }
    }

    GuardDecision::Allow
}

fn landing_page(session: &Session) -> &'static str {
    session.role().map_or(DASHBOARD_PATH, dashboard_for_role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_location_is_percent_encoded() {
        let redirect = Redirect::with_return(LOGIN_PATH, "/dashboard/admin?tab=users");
        assert_eq!(
            redirect.to_location(),
            "/login?redirect=%2Fdashboard%2Fadmin%3Ftab%3Dusers"
        );
    }

    #[test]
    fn plain_redirect_has_no_query() {
        assert_eq!(Redirect::to("/profile").to_location(), "/profile");
    }
}
