//! Authentication and user-management flows: signup/approval, login, token
//! gating, and the self-targeting guards.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn login_returns_a_usable_bearer_token() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@checkflow.local", "password": "admin123" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, "/api/auth/me", Some(&token), None)
        .await;
    assert_eq!(response.status(), 200);
    let me = response_json(response).await;
    assert_eq!(me["email"], "admin@checkflow.local");
    assert_eq!(me["role"], "ADMIN");
}

#[tokio::test]
async fn wrong_credentials_are_unauthorized() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "admin@checkflow.local", "password": "wrong" })),
        )
        .await;
    assert_eq!(response.status(), 401);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn signups_wait_for_admin_activation() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "email": "new.clerk@example.com",
                "password": "secret99",
                "full_name": "New Clerk"
            })),
        )
        .await;
    assert_eq!(response.status(), 201);

    // Pending approval blocks login with a distinct message.
    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "new.clerk@example.com", "password": "secret99" })),
        )
        .await;
    assert_eq!(response.status(), 403);

    let admin = app.admin_token().await;
    let response = app
        .request(Method::GET, "/api/auth/pending-count", Some(&admin), None)
        .await;
    assert_eq!(response_json(response).await["count"], 1);

    // Activate and retry.
    let response = app
        .request(Method::GET, "/api/auth/users", Some(&admin), None)
        .await;
    let users = response_json(response).await;
    let pending_id = users
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "new.clerk@example.com")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/auth/users/{pending_id}/toggle-active"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(response_json(response).await["is_active"], true);

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "new.clerk@example.com", "password": "secret99" })),
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn duplicate_signup_emails_are_rejected() {
    let app = TestApp::new().await;

    let payload = json!({
        "email": "dup@example.com",
        "password": "secret99",
        "full_name": "Dup"
    });
    let first = app
        .request(Method::POST, "/api/auth/signup", None, Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .request(Method::POST, "/api/auth/signup", None, Some(payload))
        .await;
    assert_eq!(second.status(), 400);
    assert_eq!(
        response_json(second).await["message"],
        "Email already registered"
    );
}

#[tokio::test]
async fn short_passwords_are_rejected_at_signup() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({
                "email": "short@example.com",
                "password": "abc",
                "full_name": "Shorty"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn admins_cannot_change_their_own_role_or_deactivate_themselves() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .request(Method::GET, "/api/auth/me", Some(&admin), None)
        .await;
    let admin_id = response_json(response).await["id"].as_i64().unwrap();

    let response = app
        .request(
            Method::PUT,
            &format!("/api/auth/users/{admin_id}/role"),
            Some(&admin),
            Some(json!({ "role": "VIEWER" })),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Cannot change your own role"
    );

    let response = app
        .request(
            Method::PUT,
            &format!("/api/auth/users/{admin_id}/toggle-active"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Cannot deactivate yourself"
    );
}

#[tokio::test]
async fn admin_created_users_are_active_immediately() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/users",
            Some(&admin),
            Some(json!({
                "email": "ops@example.com",
                "password": "secret99",
                "full_name": "Ops Clerk",
                "role": "CLERK"
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = response_json(response).await;
    assert_eq!(body["is_active"], true);
    assert_eq!(body["role"], "CLERK");

    let response = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ops@example.com", "password": "secret99" })),
        )
        .await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn invalid_roles_are_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/users",
            Some(&admin),
            Some(json!({
                "email": "weird@example.com",
                "password": "secret99",
                "full_name": "Weird Role",
                "role": "SUPERUSER"
            })),
        )
        .await;
    assert_eq!(response.status(), 400);
    assert_eq!(
        response_json(response).await["message"],
        "Invalid role. Must be ADMIN, CLERK, or VIEWER"
    );
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let app = TestApp::new().await;
    let clerk = app.clerk_token().await;
    let viewer = app.viewer_token().await;

    for token in [&clerk, &viewer] {
        let response = app
            .request(Method::GET, "/api/auth/users", Some(token), None)
            .await;
        assert_eq!(response.status(), 403);
    }
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/auth/me", Some("not-a-jwt"), None)
        .await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn deactivated_users_lose_access_immediately() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let viewer = app.viewer_token().await;

    let response = app
        .request(Method::GET, "/api/auth/me", Some(&viewer), None)
        .await;
    let viewer_id = response_json(response).await["id"].as_i64().unwrap();

    app.request(
        Method::PUT,
        &format!("/api/auth/users/{viewer_id}/toggle-active"),
        Some(&admin),
        None,
    )
    .await;

    // The old token still decodes but the account check refuses it.
    let response = app
        .request(Method::GET, "/api/invoices", Some(&viewer), None)
        .await;
    assert_eq!(response.status(), 403);
}
