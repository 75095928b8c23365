use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use validator::Validate;

use super::common::{created_response, success_response, validate_input};
use crate::auth::{Capability, CurrentUser, Role};
use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    Role::Viewer.to_string()
}

#[derive(Debug, Deserialize)]
pub struct RoleUpdateRequest {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/pending-count", get(pending_count))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id/role", put(update_user_role))
        .route("/users/:id/toggle-active", put(toggle_user_active))
}

/// Self-registration; the account stays inactive until an admin approves it.
async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;

    state
        .services
        .users
        .signup(&payload.email, &payload.password, &payload.full_name)
        .await?;

    Ok(created_response(json!({
        "message": "Account created. An admin needs to approve your account before you can log in."
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let user = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;

    let token = state.auth.issue_token(&user)?;
    info!("User logged in: {}", user.email);

    Ok(success_response(TokenResponse {
        access_token: token,
        token_type: "bearer",
    }))
}

async fn me(user: CurrentUser) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(UserResponse::from(user.user)))
}

/// Count of accounts awaiting activation; drives the admin nav badge.
async fn pending_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::UsersManage)?;
    let count = state.services.users.pending_count().await?;
    Ok(success_response(json!({ "count": count })))
}

async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::UsersManage)?;
    let users = state.services.users.list().await?;
    Ok(success_response(
        users.into_iter().map(UserResponse::from).collect::<Vec<_>>(),
    ))
}

async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::UsersManage)?;
    validate_input(&payload)?;

    let role = parse_role(&payload.role)?;
    let created = state
        .services
        .users
        .create_user(&payload.email, &payload.password, &payload.full_name, role)
        .await?;

    Ok(created_response(UserResponse::from(created)))
}

async fn update_user_role(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<i32>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::UsersManage)?;

    let role = parse_role(&payload.role)?;
    let updated = state
        .services
        .users
        .set_role(user.id(), user_id, role)
        .await?;

    Ok(success_response(UserResponse::from(updated)))
}

async fn toggle_user_active(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    user.require(Capability::UsersManage)?;

    let updated = state
        .services
        .users
        .toggle_active(user.id(), user_id)
        .await?;

    Ok(success_response(UserResponse::from(updated)))
}

fn parse_role(raw: &str) -> Result<Role, ServiceError> {
    raw.parse().map_err(|_| {
        ServiceError::Validation("Invalid role. Must be ADMIN, CLERK, or VIEWER".to_string())
    })
}
