use super::*;

fn redirect_target(decision: &RouteDecision) -> Option<&str> {
    match decision {
        RouteDecision::Allow => None,
        RouteDecision::Redirect { target, .. } => Some(target.as_str()),
    }
}

// =============================================================================
// member paths
// =============================================================================

#[test]
fn member_path_without_cookies_redirects_to_signin_with_next() {
    let decision = decide("/member/timeline", None, None);
    assert_eq!(
        decision,
        RouteDecision::Redirect {
            target: "/signin?next=/member/timeline".into(),
            reason: RedirectReason::NotLoggedIn,
        }
    );
}

#[test]
fn member_path_with_non_true_logged_in_redirects() {
    for value in ["false", "TRUE", "1", "", "true "] {
        let decision = decide("/member/messages", Some(value), Some("admin"));
        assert_eq!(redirect_target(&decision), Some("/signin?next=/member/messages"), "value {value:?}");
    }
}

#[test]
fn member_path_logged_in_passes_regardless_of_role() {
    assert_eq!(decide("/member/timeline", Some("true"), None), RouteDecision::Allow);
    assert_eq!(decide("/member/timeline", Some("true"), Some("member")), RouteDecision::Allow);
    assert_eq!(decide("/member/timeline", Some("true"), Some("garbage")), RouteDecision::Allow);
}

#[test]
fn bare_member_prefix_is_protected() {
    assert_eq!(redirect_target(&decide("/member", None, None)), Some("/signin?next=/member"));
}

// =============================================================================
// admin paths
// =============================================================================

#[test]
fn admin_path_logged_in_non_admin_goes_to_safe_default() {
    let decision = decide("/admin/reports", Some("true"), Some("member"));
    assert_eq!(
        decision,
        RouteDecision::Redirect { target: "/member/timeline".into(), reason: RedirectReason::NotAdmin }
    );
}

#[test]
fn admin_path_logged_in_without_role_goes_to_safe_default() {
    let decision = decide("/admin/reports", Some("true"), None);
    assert_eq!(redirect_target(&decision), Some(SAFE_DEFAULT_PATH));
}

#[test]
fn admin_path_not_logged_in_goes_to_signin_even_with_admin_role() {
    for role in [None, Some("admin"), Some("member")] {
        let decision = decide("/admin/reports", None, role);
        assert_eq!(redirect_target(&decision), Some("/signin?next=/admin/reports"), "role {role:?}");
    }
}

#[test]
fn admin_path_with_admin_role_passes() {
    assert_eq!(decide("/admin/reports", Some("true"), Some("admin")), RouteDecision::Allow);
}

#[test]
fn admin_role_is_case_sensitive() {
    let decision = decide("/admin", Some("true"), Some("Admin"));
    assert_eq!(redirect_target(&decision), Some(SAFE_DEFAULT_PATH));
}

// =============================================================================
// unprotected paths
// =============================================================================

#[test]
fn public_paths_pass_through_regardless_of_cookies() {
    let cookies = [(None, None), (Some("true"), Some("admin")), (Some("nope"), Some("member"))];
    for path in ["/", "/signin", "/api/auth/me", "/membership", "/administrator", "/about/member"] {
        for (logged_in, role) in cookies {
            assert_eq!(decide(path, logged_in, role), RouteDecision::Allow, "path {path}");
        }
    }
}

// =============================================================================
// next encoding / sanitizing
// =============================================================================

#[test]
fn encode_next_keeps_slashes_and_escapes_query_chars() {
    assert_eq!(encode_next("/member/timeline"), "/member/timeline");
    assert_eq!(encode_next("/member/a b&c"), "/member/a%20b%26c");
    assert_eq!(encode_next("/member/%20"), "/member/%2520");
}

#[test]
fn encode_next_escapes_utf8_and_query_delimiters_per_segment() {
    assert_eq!(encode_next("/member/café?x=1"), "/member/caf%C3%A9%3Fx%3D1");
    assert_eq!(encode_next("/member/profile/u#1"), "/member/profile/u%231");
    assert_eq!(encode_next("/"), "/");
}

#[test]
fn sanitize_next_accepts_local_paths() {
    assert_eq!(sanitize_next(Some("/member/messages")), "/member/messages");
}

#[test]
fn sanitize_next_rejects_external_targets() {
    assert_eq!(sanitize_next(Some("https://evil.example")), SAFE_DEFAULT_PATH);
    assert_eq!(sanitize_next(Some("//evil.example")), SAFE_DEFAULT_PATH);
    assert_eq!(sanitize_next(Some("/\\evil.example")), SAFE_DEFAULT_PATH);
    assert_eq!(sanitize_next(None), SAFE_DEFAULT_PATH);
}
