#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use checkflow_api::{build_router, config::AppConfig, db, AppState};

pub const BOUNDARY: &str = "checkflow-test-boundary";

/// Test harness: a full application router backed by a temporary SQLite
/// database with migrations applied and the default users seeded.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _tmp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create tempdir");
        let db_path = tmp.path().join("checkflow_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            480,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_dir = tmp.path().join("uploads").display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("migrations");

        let db_arc = Arc::new(pool);
        db::seed_default_users(&db_arc).await.expect("seed users");

        let state = AppState::new(cfg, db_arc);
        state.attachments.init().await.expect("attachment storage");

        let router = build_router(state.clone());

        Self {
            router,
            state,
            _tmp: tmp,
        }
    }

    /// Mints a token for a seeded (or created) user without going through the
    /// login endpoint.
    pub async fn token_for(&self, email: &str) -> String {
        let user = self
            .state
            .services
            .users
            .find_by_email(email)
            .await
            .expect("user lookup")
            .unwrap_or_else(|| panic!("no such user: {email}"));
        self.state.auth.issue_token(&user).expect("issue token")
    }

    pub async fn admin_token(&self) -> String {
        self.token_for("admin@checkflow.local").await
    }

    pub async fn clerk_token(&self) -> String {
        self.token_for("clerk@checkflow.local").await
    }

    pub async fn viewer_token(&self) -> String {
        self.token_for("viewer@checkflow.local").await
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Sends a multipart/form-data request assembled from `parts`.
    pub async fn request_multipart(
        &self,
        path: &str,
        token: &str,
        parts: &[MultipartPart<'_>],
    ) -> Response {
        let body = multipart_body(parts);
        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router response")
    }

    /// Uploads CSV bytes to the import endpoint and returns the summary JSON.
    pub async fn import_csv(&self, token: &str, csv: &str) -> Value {
        let response = self
            .request_multipart(
                "/api/invoices/import",
                token,
                &[MultipartPart::file("file", "invoices.csv", "text/csv", csv.as_bytes())],
            )
            .await;
        assert_eq!(response.status(), 200, "import should succeed");
        response_json(response).await
    }
}

/// One part of a multipart body: either a plain form field or a file.
pub struct MultipartPart<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> MultipartPart<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, filename: &'a str, content_type: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some(content_type),
            data,
        }
    }
}

pub fn multipart_body(parts: &[MultipartPart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}

pub async fn response_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes")
        .to_vec()
}
