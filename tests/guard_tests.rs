mod common;

use common::user;
use sirine_client::{
    Session,
    guard::{GuardDecision, Redirect, Target, decide},
    models::Role,
    routes::{RouteMeta, RouteTable, dashboard_for_role},
};

fn signed_in(role: Role) -> Session {
    Session {
        access_token: Some("access".to_string()),
        refresh_token: Some("refresh".to_string()),
        user: Some(user(3, role)),
    }
}

fn must_change_password(role: Role) -> Session {
    let mut session = signed_in(role);
    if let Some(user) = session.user.as_mut() {
        user.must_change_password = true;
    }
    session
}

fn redirect(path: &str) -> GuardDecision {
    GuardDecision::Redirect(Redirect::to(path))
}

// --- Rule order on a bare target ---

#[test]
fn test_unauthenticated_admin_target_goes_to_login_not_dashboard() {
    let meta = RouteMeta::authenticated().with_roles(&[Role::Admin]);
    let target = Target {
        path: "/dashboard/admin",
        full_path: "/dashboard/admin?tab=users",
        meta: &meta,
    };

    let decision = decide(&target, &Session::default());

    assert_eq!(
        decision,
        GuardDecision::Redirect(Redirect::with_return(
            "/login",
            "/dashboard/admin?tab=users"
        ))
    );
    assert_eq!(
        decision.redirect_location().unwrap(),
        "/login?redirect=%2Fdashboard%2Fadmin%3Ftab%3Dusers"
    );
}

#[test]
fn test_guest_only_target_when_signed_in() {
    let meta = RouteMeta::guest();
    let target = Target {
        path: "/login",
        full_path: "/login",
        meta: &meta,
    };

    assert_eq!(
        decide(&target, &signed_in(Role::Admin)),
        redirect("/dashboard/admin")
    );
    assert_eq!(
        decide(&target, &signed_in(Role::QcInspector)),
        redirect("/dashboard/staff")
    );
    assert_eq!(
        decide(&target, &must_change_password(Role::Admin)),
        redirect("/force-change-password")
    );
    assert!(decide(&target, &Session::default()).is_allowed());
}

#[test]
fn test_role_mismatch_goes_to_role_dashboard() {
    let meta = RouteMeta::authenticated().with_roles(&[Role::Admin, Role::Manager]);
    let target = Target {
        path: "/dashboard/admin",
        full_path: "/dashboard/admin",
        meta: &meta,
    };

    assert_eq!(
        decide(&target, &signed_in(Role::StaffKhazwal)),
        redirect("/dashboard/staff")
    );
    assert!(decide(&target, &signed_in(Role::Manager)).is_allowed());
}

#[test]
fn test_password_check_precedes_role_check() {
    let meta = RouteMeta::authenticated().with_roles(&[Role::Admin]);
    let target = Target {
        path: "/dashboard/admin",
        full_path: "/dashboard/admin",
        meta: &meta,
    };

    assert_eq!(
        decide(&target, &must_change_password(Role::OperatorCetak)),
        redirect("/force-change-password")
    );
}

#[test]
fn test_role_dashboard_table() {
    assert_eq!(dashboard_for_role(Role::Admin), "/dashboard/admin");
    assert_eq!(dashboard_for_role(Role::Manager), "/dashboard/admin");
    for role in [
        Role::StaffKhazwal,
        Role::OperatorCetak,
        Role::QcInspector,
        Role::Verifikator,
        Role::StaffKhazkhir,
    ] {
        assert_eq!(dashboard_for_role(role), "/dashboard/staff");
    }
}

// --- Through the route table ---

#[test]
fn test_forced_password_change_overrides_every_protected_route() {
    let table = RouteTable::standard();
    let session = must_change_password(Role::StaffKhazwal);

    for path in ["/profile", "/dashboard/staff", "/dashboard", "/"] {
        let navigation = table.navigate(path, &session);
        assert_eq!(navigation.location, "/force-change-password", "from {path}");
    }

    // The exempt routes stay reachable.
    assert!(table.check("/force-change-password", &session).is_allowed());
    assert!(table.check("/reset-password?token=abc", &session).is_allowed());
}

#[test]
fn test_root_lands_on_role_dashboard() {
    let table = RouteTable::standard();

    let navigation = table.navigate("/", &signed_in(Role::Manager));
    assert_eq!(
        navigation.hops,
        vec!["/", "/dashboard", "/dashboard/admin"]
    );

    let navigation = table.navigate("/", &signed_in(Role::Verifikator));
    assert_eq!(navigation.location, "/dashboard/staff");
}

#[test]
fn test_signed_out_root_lands_on_login() {
    let table = RouteTable::standard();
    let navigation = table.navigate("/", &Session::default());
    assert_eq!(navigation.location, "/login");
}

#[test]
fn test_staff_cannot_open_admin_dashboard() {
    let table = RouteTable::standard();
    let navigation = table.navigate("/dashboard/admin", &signed_in(Role::QcInspector));
    assert_eq!(navigation.location, "/dashboard/staff");
}

#[test]
fn test_signed_out_protected_route_keeps_return_path() {
    let table = RouteTable::standard();
    let navigation = table.navigate("/profile", &Session::default());
    assert_eq!(navigation.location, "/login?redirect=%2Fprofile");
    assert_eq!(table.resolve(&navigation.location).name, "Login");
}

#[test]
fn test_unknown_paths_resolve_to_not_found() {
    let table = RouteTable::standard();
    let route = table.resolve("/no/such/page");

    assert_eq!(route.name, "NotFound");
    assert!(table.check("/no/such/page", &Session::default()).is_allowed());
}

#[test]
fn test_document_titles() {
    let table = RouteTable::standard();
    assert_eq!(table.resolve("/login").document_title(), "Login - Sirine Go");
    assert_eq!(
        table.resolve("/dashboard/admin/").document_title(),
        "Dashboard Admin - Sirine Go"
    );
    assert_eq!(table.resolve("/nowhere").document_title(), "Sirine Go");
}
