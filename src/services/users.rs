use crate::{
    db::DbPool,
    entities::user::{self, ActiveModel as UserActiveModel, Entity as UserEntity, Model as UserModel, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const INVALID_LOGIN: &str = "Invalid login credentials";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 200, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email: String,
    #[validate(length(min = 1, max = 32, message = "Phone is required"))]
    pub phone: String,
    #[serde(default)]
    pub role: UserRole,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: UserRole,
}

impl From<UserModel> for UserProfile {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            email: model.email,
            phone: model.phone,
            role: model.role,
        }
    }
}

/// Registration, login and password reset.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    min_password_length: usize,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        min_password_length: usize,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            min_password_length,
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterUserRequest) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        self.check_new_password(&request.password, &request.confirm_password)?;

        let db = &*self.db_pool;
        let email = request.email.trim().to_string();

        let existing = UserEntity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!("Registration rejected: email already registered");
            return Err(ServiceError::ValidationError(
                "Email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(request.full_name.trim().to_string()),
            email: Set(email),
            phone: Set(request.phone.trim().to_string()),
            role: Set(request.role),
            password_hash: Set(password_hash),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert user");
            ServiceError::DatabaseError(e)
        })?;

        self.event_sender
            .send_or_log(Event::UserRegistered(user.id))
            .await;

        info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Looks the user up by email or phone and verifies the password.
    #[instrument(skip(self, identifier, password))]
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<UserProfile, ServiceError> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ServiceError::NotFound(INVALID_LOGIN.to_string()));
        }

        // Phone numbers are not unique, so every matching account is a candidate
        let candidates = UserEntity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Email.eq(identifier))
                    .add(user::Column::Phone.eq(identifier)),
            )
            .order_by_asc(user::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?;

        for user in candidates {
            if verify_password(password, &user.password_hash)? {
                info!(user_id = %user.id, "User authenticated");
                return Ok(user.into());
            }
        }

        warn!("Login rejected: no account matches identifier and password");
        Err(ServiceError::NotFound(INVALID_LOGIN.to_string()))
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), ServiceError> {
        self.check_new_password(&request.new_password, &request.confirm_password)?;

        let db = &*self.db_pool;
        let user = UserEntity::find()
            .filter(user::Column::Email.eq(request.email.trim()))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Email is not registered".to_string()))?;

        let user_id = user.id;
        let mut active: UserActiveModel = user.into();
        active.password_hash = Set(hash_password(&request.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(db).await.map_err(|e| {
            error!(error = %e, %user_id, "Failed to update password");
            ServiceError::DatabaseError(e)
        })?;

        info!(%user_id, "Password reset");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        UserEntity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))
    }

    fn check_new_password(&self, password: &str, confirm: &str) -> Result<(), ServiceError> {
        if password != confirm {
            return Err(ServiceError::ValidationError(
                "Passwords do not match".to_string(),
            ));
        }
        if password.chars().count() < self.min_password_length {
            return Err(ServiceError::ValidationError(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }
}

/// Hashes a password with argon2 and a random salt (PHC string format).
pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
