//! Authentication and authorization.
//!
//! Bearer tokens are HS256 JWTs carrying the subject id and role. Roles form a
//! flat set (ADMIN, CLERK, VIEWER); authorization is a per-operation capability
//! check against a static policy table, not a role hierarchy graph.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::entities::user;
use crate::errors::ServiceError;
use crate::AppState;

/// Operator roles, stored on the user row as text.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Clerk,
    Viewer,
}

/// Named capabilities checked per operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Display)]
pub enum Capability {
    #[strum(serialize = "invoices:read")]
    InvoicesRead,
    #[strum(serialize = "invoices:write")]
    InvoicesWrite,
    #[strum(serialize = "invoices:approve")]
    InvoicesApprove,
    #[strum(serialize = "checks:read")]
    ChecksRead,
    #[strum(serialize = "checks:issue")]
    ChecksIssue,
    #[strum(serialize = "vendors:read")]
    VendorsRead,
    #[strum(serialize = "vendors:manage")]
    VendorsManage,
    #[strum(serialize = "users:manage")]
    UsersManage,
}

impl Role {
    /// Static policy table. ADMIN's superset is spelled out by policy, not by
    /// structural inheritance between roles.
    pub fn allows(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Admin => true,
            Role::Clerk => matches!(
                capability,
                InvoicesRead | InvoicesWrite | ChecksRead | VendorsRead
            ),
            Role::Viewer => matches!(capability, InvoicesRead | ChecksRead | VendorsRead),
        }
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Subject (user ID)
    pub role: String, // Role at issuance time
    pub iat: i64,     // Issued at
    pub exp: i64,     // Expiration time
}

/// Issues and validates bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    token_expiry: chrono::Duration,
}

impl AuthService {
    pub fn new(jwt_secret: String, token_expiry: chrono::Duration) -> Self {
        Self {
            jwt_secret,
            token_expiry,
        }
    }

    /// Generate a token for a user
    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.token_expiry).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("token creation failed: {e}")))
    }

    /// Validate a token and extract the claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ServiceError::Unauthorized("Token has expired".to_string())
            }
            _ => ServiceError::Unauthorized("Invalid authentication token".to_string()),
        })
    }
}

/// Hashes a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))
}

/// Verifies a password against a stored argon2 hash. An unparsable hash counts
/// as a failed verification rather than an error.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// The authenticated caller, resolved from the bearer token against the
/// current user row so deactivations take effect immediately.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: user::Model,
    pub role: Role,
}

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    /// Per-operation capability check.
    pub fn require(&self, capability: Capability) -> Result<(), ServiceError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Role {} is not permitted to {}",
                self.role, capability
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing bearer credentials".to_string())
            })?;

        let claims = state.auth.verify_token(token)?;
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*state.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Unknown user".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Forbidden(
                "Your account has been deactivated".to_string(),
            ));
        }

        let role = user
            .role
            .parse()
            .map_err(|_| ServiceError::Internal(format!("corrupt role on user {}", user.id)))?;

        Ok(CurrentUser { user, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_user(role: Role) -> user::Model {
        let now = Utc::now();
        user::Model {
            id: 7,
            email: "ops@example.com".into(),
            hashed_password: String::new(),
            full_name: "Ops".into(),
            role: role.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn admin_is_allowed_everything() {
        for cap in [
            Capability::InvoicesRead,
            Capability::InvoicesWrite,
            Capability::InvoicesApprove,
            Capability::ChecksRead,
            Capability::ChecksIssue,
            Capability::VendorsRead,
            Capability::VendorsManage,
            Capability::UsersManage,
        ] {
            assert!(Role::Admin.allows(cap), "admin should allow {cap}");
        }
    }

    #[test]
    fn clerk_can_write_invoices_but_not_approve() {
        assert!(Role::Clerk.allows(Capability::InvoicesWrite));
        assert!(!Role::Clerk.allows(Capability::InvoicesApprove));
        assert!(!Role::Clerk.allows(Capability::ChecksIssue));
        assert!(!Role::Clerk.allows(Capability::VendorsManage));
        assert!(!Role::Clerk.allows(Capability::UsersManage));
    }

    #[test]
    fn viewer_is_read_only() {
        assert!(Role::Viewer.allows(Capability::InvoicesRead));
        assert!(Role::Viewer.allows(Capability::ChecksRead));
        assert!(!Role::Viewer.allows(Capability::InvoicesWrite));
        assert!(!Role::Viewer.allows(Capability::InvoicesApprove));
    }

    #[test]
    fn token_round_trip_preserves_subject_and_role() {
        let auth = AuthService::new(
            "unit_test_secret_that_is_long_enough_for_hs256".into(),
            Duration::minutes(480),
        );
        let token = auth.issue_token(&sample_user(Role::Clerk)).unwrap();
        let claims = auth.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "CLERK");
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = AuthService::new(
            "unit_test_secret_that_is_long_enough_for_hs256".into(),
            Duration::minutes(-120),
        );
        let token = auth.issue_token(&sample_user(Role::Viewer)).unwrap();
        let err = auth.verify_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("clerk123").unwrap();
        assert!(verify_password("clerk123", &hash));
        assert!(!verify_password("clerk124", &hash));
        assert!(!verify_password("clerk123", "not-a-phc-string"));
    }

    #[test]
    fn role_strings_round_trip() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Viewer.to_string(), "VIEWER");
        assert!("SUPERUSER".parse::<Role>().is_err());
    }
}
