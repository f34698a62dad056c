use shared::models::*;
use shared::validation::{normalize_email, validate_registration, validate_user_update, ValidationError};
use tracing::{info, warn};
use uuid::Uuid;
use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::AdminSeed;
use crate::error::ApiError;
use crate::store::UserStore;

pub struct AccountProcessor;

impl AccountProcessor {
    pub async fn register(
        store: &(impl UserStore + ?Sized),
        passwords: &PasswordHasher,
        tokens: &TokenIssuer,
        request: &RegisterRequest,
    ) -> Result<AuthResponse, ApiError> {
        let (username, email) = validate_registration(request)?;

        if store.find_user_by_email(&email).await?.is_some() {
            return Err(ApiError::Conflict("User already exists".into()));
        }

        let user = store.create_user(NewUser {
            username,
            email,
            password_hash: passwords.hash(&request.password)?,
            is_admin: false,
        }).await?;

        info!("Registered user {}", user.id);
        Self::authenticated(tokens, &user)
    }

    pub async fn login(
        store: &(impl UserStore + ?Sized),
        passwords: &PasswordHasher,
        tokens: &TokenIssuer,
        request: &LoginRequest,
    ) -> Result<AuthResponse, ApiError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ValidationError::MissingCredentials.into());
        }

        let invalid = || ApiError::Unauthorized("Invalid email or password".into());
        let email = normalize_email(&request.email).map_err(|_| invalid())?;

        match store.find_user_by_email(&email).await? {
            Some(user) if passwords.verify(&request.password, &user.password_hash) => {
                info!("User {} logged in", user.id);
                Self::authenticated(tokens, &user)
            }
            _ => {
                warn!("Failed login attempt");
                Err(invalid())
            }
        }
    }

    pub async fn list_users(store: &(impl UserStore + ?Sized)) -> Result<Vec<UserProfile>, ApiError> {
        Ok(store.list_users().await?.iter().map(UserProfile::from).collect())
    }

    pub async fn get_user(store: &(impl UserStore + ?Sized), id: Uuid) -> Result<UserProfile, ApiError> {
        store.find_user_by_id(id).await?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(user_not_found)
    }

    pub async fn update_user(
        store: &(impl UserStore + ?Sized),
        id: Uuid,
        request: &UpdateUserRequest,
    ) -> Result<UserProfile, ApiError> {
        let changes = validate_user_update(request)?;
        let user = store.update_user(id, &changes).await?.ok_or_else(user_not_found)?;
        info!("Updated user {}", user.id);
        Ok(UserProfile::from(&user))
    }

    pub async fn delete_user(store: &(impl UserStore + ?Sized), id: Uuid) -> Result<MessageResponse, ApiError> {
        if !store.delete_user(id).await? {
            return Err(user_not_found());
        }
        info!("Removed user {}", id);
        Ok(MessageResponse::new("User removed"))
    }

    /// Creates the configured admin account unless its email is already registered.
    pub async fn ensure_admin(
        store: &(impl UserStore + ?Sized),
        passwords: &PasswordHasher,
        seed: &AdminSeed,
    ) -> Result<Option<UserProfile>, ApiError> {
        let request = RegisterRequest {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password: seed.password.clone(),
        };
        let (username, email) = validate_registration(&request)?;

        if store.find_user_by_email(&email).await?.is_some() {
            return Ok(None);
        }

        let admin = store.create_user(NewUser {
            username,
            email,
            password_hash: passwords.hash(&seed.password)?,
            is_admin: true,
        }).await?;

        info!("👤 Created admin account {}", admin.email);
        Ok(Some(UserProfile::from(&admin)))
    }

    fn authenticated(tokens: &TokenIssuer, user: &User) -> Result<AuthResponse, ApiError> {
        Ok(AuthResponse {
            user: UserProfile::from(user),
            token: tokens.issue(user.id)?,
        })
    }
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".into())
}
