//! Vendor directory: admin-gated CRUD, the unique-name rule, and the in-use
//! deletion guard.

mod common;

use axum::http::Method;
use common::{response_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn admins_manage_vendors() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let response = app
        .request(
            Method::POST,
            "/api/vendors",
            Some(&admin),
            Some(json!({
                "name": "Acme Supply",
                "city": "Springfield",
                "state": "IL",
                "email": "billing@acme.example.com"
            })),
        )
        .await;
    assert_eq!(response.status(), 201);
    let vendor = response_json(response).await;
    let vendor_id = vendor["id"].as_i64().unwrap();
    assert_eq!(vendor["name"], "Acme Supply");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/vendors/{vendor_id}"),
            Some(&admin),
            Some(json!({ "phone": "555-0100" })),
        )
        .await;
    assert_eq!(response.status(), 200);
    let updated = response_json(response).await;
    assert_eq!(updated["phone"], "555-0100");
    assert_eq!(updated["city"], "Springfield");

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/vendors/{vendor_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), 204);

    let response = app
        .request(
            Method::GET,
            &format!("/api/vendors/{vendor_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn vendor_names_are_unique() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let payload = json!({ "name": "Globex" });
    let first = app
        .request(Method::POST, "/api/vendors", Some(&admin), Some(payload.clone()))
        .await;
    assert_eq!(first.status(), 201);

    let second = app
        .request(Method::POST, "/api/vendors", Some(&admin), Some(payload))
        .await;
    assert_eq!(second.status(), 400);
    assert_eq!(
        response_json(second).await["message"],
        "Vendor with this name already exists"
    );

    // Same letters, different case: a distinct vendor.
    let response = app
        .request(
            Method::POST,
            "/api/vendors",
            Some(&admin),
            Some(json!({ "name": "GLOBEX" })),
        )
        .await;
    assert_eq!(response.status(), 201);
}

#[tokio::test]
async fn vendors_referenced_by_invoices_cannot_be_deleted() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let csv = "\
invoice_number,store_number,vendor_name,amount
INV-900,001,Initech,42.00
";
    app.import_csv(&admin, csv).await;

    let response = app
        .request(Method::GET, "/api/vendors", Some(&admin), None)
        .await;
    let vendors = response_json(response).await;
    let vendor_id = vendors
        .as_array()
        .unwrap()
        .iter()
        .find(|v| v["name"] == "Initech")
        .unwrap()["id"]
        .as_i64()
        .unwrap();

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/vendors/{vendor_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), 400);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("cannot be deleted"));
}

#[tokio::test]
async fn clerks_and_viewers_can_read_but_not_manage() {
    let app = TestApp::new().await;
    let clerk = app.clerk_token().await;
    let viewer = app.viewer_token().await;

    for token in [&clerk, &viewer] {
        let response = app
            .request(Method::GET, "/api/vendors", Some(token), None)
            .await;
        assert_eq!(response.status(), 200);

        let response = app
            .request(
                Method::POST,
                "/api/vendors",
                Some(token),
                Some(json!({ "name": "Nope Inc" })),
            )
            .await;
        assert_eq!(response.status(), 403);
    }
}

#[tokio::test]
async fn health_endpoint_reports_database_state() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), 200);
    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "ok");
}
