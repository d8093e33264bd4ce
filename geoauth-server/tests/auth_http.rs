use axum::http::StatusCode;
use serde_json::{Value, json};

use geoauth_core::auth::RefreshPolicy;

#[path = "support/mod.rs"]
mod support;

use support::{
    PASSWORD, bearer, build_test_app, build_test_app_with, login, register,
    seed_admin, test_config,
};

#[tokio::test]
async fn register_login_refresh_logout_round_trip() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    let user_id = register(server, "alice", None).await;
    let (access, refresh) = login(server, "alice").await;

    let protected = server
        .get("/api/test/protected")
        .add_header("Authorization", bearer(&access))
        .await;
    protected.assert_status_ok();
    let body: Value = protected.json();
    assert_eq!(body["userId"], user_id);
    assert_eq!(body["role"], "User");

    let refreshed = server
        .post("/api/auth/refresh")
        .json(&json!({ "refreshToken": refresh }))
        .await;
    refreshed.assert_status_ok();
    let body: Value = refreshed.json();
    assert_eq!(body["success"], true);
    let rotated = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    // The rotated-away value no longer works.
    let stale = server
        .post("/api/auth/refresh")
        .json(&json!({ "refreshToken": refresh }))
        .await;
    stale.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = stale.json();
    assert_eq!(body["message"], "Invalid or expired refresh token");

    let logout = server
        .post("/api/auth/logout")
        .json(&json!({ "refreshToken": rotated }))
        .await;
    logout.assert_status_ok();
    let body: Value = logout.json();
    assert_eq!(body["message"], "Logout successful");

    let after_logout = server
        .post("/api/auth/refresh")
        .json(&json!({ "refreshToken": rotated }))
        .await;
    after_logout.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn touch_policy_keeps_refresh_value() {
    let app = build_test_app(RefreshPolicy::Touch).await.unwrap();
    let server = &app.server;

    register(server, "bob", None).await;
    let (_, refresh) = login(server, "bob").await;

    for _ in 0..2 {
        let response = server
            .post("/api/auth/refresh")
            .json(&json!({ "refreshToken": refresh }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["refreshToken"], refresh.as_str());
    }
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    register(server, "carol", None).await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "carol",
            "email": "other@geo.example",
            "password": PASSWORD,
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Username or email already exists");
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    let short_password = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "dave",
            "email": "dave@geo.example",
            "password": "12345",
        }))
        .await;
    short_password.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = short_password.json();
    assert_eq!(body["message"], "Password must be at least 6 characters");

    let missing = server
        .post("/api/auth/register")
        .json(&json!({ "username": "dave" }))
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = missing.json();
    assert_eq!(body["message"], "All fields are required");
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    register(server, "erin", None).await;

    let wrong_password = server
        .post("/api/auth/login")
        .json(&json!({ "username": "erin", "password": "not-it" }))
        .await;
    let unknown_user = server
        .post("/api/auth/login")
        .json(&json!({ "username": "nobody", "password": PASSWORD }))
        .await;

    for response in [wrong_password, unknown_user] {
        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid username or password");
        assert!(body.get("token").is_none());
    }

    let blank = server
        .post("/api/auth/login")
        .json(&json!({ "username": "", "password": "" }))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn protected_routes_require_valid_bearer() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    server.get("/api/test/public").await.assert_status_ok();

    server
        .get("/api/test/protected")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/test/protected")
        .add_header("Authorization", bearer("not.a.jwt"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    server
        .get("/api/test/protected")
        .add_header("Authorization", "Basic YWxpY2U6c2VjcmV0")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn access_token_stops_working_at_expiry() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    register(server, "frank", None).await;
    let (access, _) = login(server, "frank").await;

    app.clock.advance(chrono::Duration::minutes(14));
    server
        .get("/api/test/protected")
        .add_header("Authorization", bearer(&access))
        .await
        .assert_status_ok();

    app.clock.advance(chrono::Duration::minutes(1));
    server
        .get("/api/test/protected")
        .add_header("Authorization", bearer(&access))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_checks() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    register(server, "grace", None).await;
    seed_admin(&app, "root").await;
    let (user_access, _) = login(server, "grace").await;
    let (admin_access, _) = login(server, "root").await;

    let report = server
        .get("/api/test/check-role")
        .add_header("Authorization", bearer(&user_access))
        .await;
    report.assert_status_ok();
    let body: Value = report.json();
    assert_eq!(body["isAdmin"], false);
    assert_eq!(body["isUser"], true);
    assert_eq!(body["username"], "grace");

    server
        .get("/api/test/admin")
        .add_header("Authorization", bearer(&user_access))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let admin = server
        .get("/api/test/admin")
        .add_header("Authorization", bearer(&admin_access))
        .await;
    admin.assert_status_ok();
    let body: Value = admin.json();
    assert_eq!(body["role"], "Admin");
}

#[tokio::test]
async fn admin_revokes_every_session_of_a_user() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    let user_id = register(server, "heidi", None).await;
    seed_admin(&app, "root").await;
    let (user_access, first_refresh) = login(server, "heidi").await;
    let (_, second_refresh) = login(server, "heidi").await;
    let (admin_access, _) = login(server, "root").await;

    let path = format!("/api/auth/users/{user_id}/sessions");

    server
        .delete(&path)
        .add_header("Authorization", bearer(&user_access))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let revoked = server
        .delete(&path)
        .add_header("Authorization", bearer(&admin_access))
        .await;
    revoked.assert_status_ok();
    let body: Value = revoked.json();
    assert_eq!(body["revoked"], 2);

    for refresh in [first_refresh, second_refresh] {
        server
            .post("/api/auth/refresh")
            .json(&json!({ "refreshToken": refresh }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    server
        .delete("/api/auth/users/9999/sessions")
        .add_header("Authorization", bearer(&admin_access))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn logout_of_unknown_session_is_not_found() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();

    let response = app
        .server
        .post("/api/auth/logout")
        .json(&json!({ "refreshToken": "never-issued" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["success"], false);

    app.server
        .post("/api/auth/logout")
        .json(&json!({}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn anonymous_registration_cannot_claim_admin() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    let victim = register(server, "ivy", None).await;
    let (_, victim_refresh) = login(server, "ivy").await;

    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": "mallory",
            "email": "mallory@geo.example",
            "password": PASSWORD,
            "role": "Admin",
        }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Admin role required to assign role Admin");

    // No account was created, so there is nobody to log in as.
    server
        .post("/api/auth/login")
        .json(&json!({ "username": "mallory", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // A plain user's token does not unlock role assignment either.
    let (user_access, _) = login(server, "ivy").await;
    server
        .post("/api/auth/register")
        .add_header("Authorization", bearer(&user_access))
        .json(&json!({
            "username": "mallory",
            "email": "mallory@geo.example",
            "password": PASSWORD,
            "role": "Admin",
        }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    server
        .delete(&format!("/api/auth/users/{victim}/sessions"))
        .add_header("Authorization", bearer(&user_access))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    server
        .post("/api/auth/refresh")
        .json(&json!({ "refreshToken": victim_refresh }))
        .await
        .assert_status_ok();

    // Asking for the default role explicitly is fine.
    register(server, "judy", Some("User")).await;
}

#[tokio::test]
async fn admin_can_register_privileged_accounts() {
    let app = build_test_app(RefreshPolicy::Rotate).await.unwrap();
    let server = &app.server;

    seed_admin(&app, "root").await;
    let (admin_access, _) = login(server, "root").await;

    let response = server
        .post("/api/auth/register")
        .add_header("Authorization", bearer(&admin_access))
        .json(&json!({
            "username": "deputy",
            "email": "deputy@geo.example",
            "password": PASSWORD,
            "role": "Admin",
        }))
        .await;
    response.assert_status_ok();

    let (deputy_access, _) = login(server, "deputy").await;
    server
        .get("/api/test/admin")
        .add_header("Authorization", bearer(&deputy_access))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn role_self_assignment_can_be_enabled() {
    let mut config = test_config(RefreshPolicy::Rotate);
    config.auth.allow_role_self_assignment = true;
    let app = build_test_app_with(config).await.unwrap();
    let server = &app.server;

    register(server, "root", Some("Admin")).await;
    let (admin_access, _) = login(server, "root").await;

    server
        .get("/api/test/admin")
        .add_header("Authorization", bearer(&admin_access))
        .await
        .assert_status_ok();
}
