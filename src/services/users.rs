use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};

use crate::auth::{hash_password, verify_password, Role};
use crate::entities::user;
use crate::errors::ServiceError;

/// User accounts and the admin-gated lifecycle around them.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
}

impl UserService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Self-registration. Accounts start inactive as VIEWER and need an admin
    /// to activate them; the pending state is what the admin badge counts.
    #[instrument(skip(self, password))]
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<user::Model, ServiceError> {
        if password.len() < 6 {
            return Err(ServiceError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(ServiceError::Validation(
                "Full name is required".to_string(),
            ));
        }
        if self.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            email: Set(email.to_string()),
            hashed_password: Set(hash_password(password)?),
            full_name: Set(full_name.to_string()),
            role: Set(Role::Viewer.to_string()),
            is_active: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        // Email delivery is an external collaborator; the approval request is
        // logged for operators instead.
        info!(
            "New user {} ({}) awaiting admin approval",
            created.full_name, created.email
        );
        Ok(created)
    }

    /// Credential check for login. Inactive accounts authenticate but are
    /// refused with a pending-approval message.
    #[instrument(skip(self, password))]
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<user::Model, ServiceError> {
        let user = self.find_by_email(email).await?;
        let user = match user {
            Some(user) if verify_password(password, &user.hashed_password) => user,
            _ => {
                return Err(ServiceError::Unauthorized(
                    "Invalid email or password".to_string(),
                ))
            }
        };

        if !user.is_active {
            return Err(ServiceError::Forbidden(
                "Your account is pending admin approval".to_string(),
            ));
        }
        Ok(user)
    }

    /// Admin-created accounts are active immediately.
    #[instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<user::Model, ServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(ServiceError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            email: Set(email.to_string()),
            hashed_password: Set(hash_password(password)?),
            full_name: Set(full_name.to_string()),
            role: Set(role.to_string()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!("User {} created with role {}", created.email, role);
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<user::Model>, ServiceError> {
        user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Number of accounts still waiting for activation.
    #[instrument(skip(self))]
    pub async fn pending_count(&self) -> Result<u64, ServiceError> {
        user::Entity::find()
            .filter(user::Column::IsActive.eq(false))
            .count(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    /// Changes a user's role. Self-targeting is rejected regardless of
    /// payload so an admin cannot lock themselves out of user management.
    #[instrument(skip(self))]
    pub async fn set_role(
        &self,
        acting_user_id: i32,
        target_user_id: i32,
        role: Role,
    ) -> Result<user::Model, ServiceError> {
        if acting_user_id == target_user_id {
            return Err(ServiceError::Validation(
                "Cannot change your own role".to_string(),
            ));
        }

        let target = self.fetch(target_user_id).await?;
        let mut active: user::ActiveModel = target.into();
        active.role = Set(role.to_string());
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!("User {} role set to {}", updated.email, role);
        Ok(updated)
    }

    /// Flips the active flag; used both to approve signups and to deactivate
    /// accounts. Self-targeting is rejected.
    #[instrument(skip(self))]
    pub async fn toggle_active(
        &self,
        acting_user_id: i32,
        target_user_id: i32,
    ) -> Result<user::Model, ServiceError> {
        if acting_user_id == target_user_id {
            return Err(ServiceError::Validation(
                "Cannot deactivate yourself".to_string(),
            ));
        }

        let target = self.fetch(target_user_id).await?;
        let next = !target.is_active;
        let mut active: user::ActiveModel = target.into();
        active.is_active = Set(next);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(
            "User {} {}",
            updated.email,
            if updated.is_active { "activated" } else { "deactivated" }
        );
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(ServiceError::from)
    }

    async fn fetch(&self, user_id: i32) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}
