use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::hasher::CredentialHasher;
use crate::auth::token::generate_token;
use crate::db::models::{NewUser, User, UserUpdate};
use crate::db::store::UserStore;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

/// Registration, login checks, sessions and password resets.
///
/// Login and session lookups never distinguish an unknown user from bad
/// credentials: both come back as `false` / `None`.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    // bcrypt is CPU-bound; keep it off the async worker threads
    async fn hash_credential(&self, plaintext: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|e| AppError::InternalError(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_credential(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &digest))
            .await
            .map_err(|e| AppError::InternalError(format!("Verification task failed: {}", e)))?
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        if email.is_empty() || password.is_empty() {
            return Err(AppError::ValidationError(
                "email and password are required".to_string(),
            ));
        }

        if self.store.find_by_email(email).await?.is_some() {
            warn!("Registration rejected, email already registered: {}", email);
            return Err(AuthError::AlreadyExists(email.to_string()).into());
        }

        let hashed_credential = self.hash_credential(password).await?;
        let new_user = NewUser {
            email: email.to_string(),
            hashed_credential,
        };

        // The store's unique constraint settles races with concurrent registrations
        let user = self.store.insert(new_user).await.map_err(|e| match e {
            AppError::DatabaseError(DatabaseError::Duplicate) => {
                AppError::AuthError(AuthError::AlreadyExists(email.to_string()))
            }
            other => other,
        })?;

        info!("Registered user {} ({})", user.id, user.email);
        Ok(user)
    }

    pub async fn valid_login(&self, email: &str, password: &str) -> Result<bool> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => {
                debug!("Login attempt for unknown email: {}", email);
                return Ok(false);
            }
        };

        match self.verify_credential(password, &user.hashed_credential).await {
            Ok(valid) => Ok(valid),
            Err(e) => {
                warn!("Stored credential for user {} could not be verified: {}", user.id, e);
                Ok(false)
            }
        }
    }

    pub async fn create_session(&self, email: &str) -> Result<Option<String>> {
        let user = match self.store.find_by_email(email).await? {
            Some(user) => user,
            None => return Ok(None),
        };

        let token = generate_token();
        self.store
            .update(user.id, UserUpdate::session_token(Some(token.clone())))
            .await?;

        info!("Session created for user {}", user.id);
        Ok(Some(token))
    }

    pub async fn get_user_by_session(&self, token: &str) -> Result<Option<User>> {
        if token.is_empty() {
            return Ok(None);
        }

        self.store.find_by_session_token(token).await
    }

    /// Clears the user's session. Clearing an absent session is a no-op.
    pub async fn destroy_session(&self, user_id: Uuid) -> Result<()> {
        self.store
            .update(user_id, UserUpdate::session_token(None))
            .await?;

        info!("Session destroyed for user {}", user_id);
        Ok(())
    }

    pub async fn get_reset_token(&self, email: &str) -> Result<String> {
        let user = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate_token();
        self.store
            .update(user.id, UserUpdate::reset_token(Some(token.clone())))
            .await?;

        info!("Password reset requested for user {}", user.id);
        Ok(token)
    }

    pub async fn get_user_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        if token.is_empty() {
            return Ok(None);
        }

        self.store.find_by_reset_token(token).await
    }

    pub async fn update_password(&self, reset_token: &str, new_password: &str) -> Result<()> {
        if reset_token.is_empty() {
            return Err(AuthError::InvalidToken.into());
        }
        if new_password.is_empty() {
            return Err(AppError::ValidationError("new password is required".to_string()));
        }

        let user = self
            .store
            .find_by_reset_token(reset_token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let hashed_credential = self.hash_credential(new_password).await?;
        self.store
            .update(user.id, UserUpdate::password_reset(hashed_credential))
            .await?;

        info!("Password updated for user {}", user.id);
        Ok(())
    }
}
