use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_credential: String,
    #[serde(skip_serializing)]
    pub session_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_active_session(&self) -> bool {
        self.session_token.is_some()
    }

    /// Applies `update` in place and bumps `updated_at`.
    pub(crate) fn apply(&mut self, update: UserUpdate) {
        if let Some(hashed_credential) = update.hashed_credential {
            self.hashed_credential = hashed_credential;
        }
        if let Some(session_token) = update.session_token {
            self.session_token = session_token;
        }
        if let Some(reset_token) = update.reset_token {
            self.reset_token = reset_token;
        }
        self.updated_at = Utc::now();
    }
}

/// Fields supplied at registration. The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub hashed_credential: String,
}

/// Partial update of a user record.
///
/// `None` leaves a field untouched. For the nullable token columns,
/// `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub hashed_credential: Option<String>,
    pub session_token: Option<Option<String>>,
    pub reset_token: Option<Option<String>>,
}

impl UserUpdate {
    pub fn session_token(token: Option<String>) -> Self {
        Self {
            session_token: Some(token),
            ..Default::default()
        }
    }

    pub fn reset_token(token: Option<String>) -> Self {
        Self {
            reset_token: Some(token),
            ..Default::default()
        }
    }

    /// New credential digest, consuming the pending reset token.
    pub fn password_reset(hashed_credential: String) -> Self {
        Self {
            hashed_credential: Some(hashed_credential),
            reset_token: Some(None),
            ..Default::default()
        }
    }

    /// Sets a field addressed by its column name.
    ///
    /// Only the updatable columns are accepted; anything else, including
    /// `id` and `email`, is a validation error.
    pub fn set(mut self, field: &str, value: Option<String>) -> Result<Self, AppError> {
        match field.parse::<UserField>()? {
            UserField::HashedCredential => {
                let value = value.ok_or_else(|| {
                    AppError::ValidationError("hashed_credential cannot be cleared".to_string())
                })?;
                self.hashed_credential = Some(value);
            }
            UserField::SessionToken => self.session_token = Some(value),
            UserField::ResetToken => self.reset_token = Some(value),
        }
        Ok(self)
    }
}

/// The columns a [`UserUpdate`] may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    HashedCredential,
    SessionToken,
    ResetToken,
}

impl FromStr for UserField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hashed_credential" => Ok(UserField::HashedCredential),
            "session_token" => Ok(UserField::SessionToken),
            "reset_token" => Ok(UserField::ResetToken),
            other => Err(AppError::ValidationError(format!(
                "unknown user field: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "bob@example.com".to_string(),
            hashed_credential: "$2b$04$digest".to_string(),
            session_token: Some("session".to_string()),
            reset_token: Some("reset".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_leaves_untouched_fields() {
        let mut user = sample_user();
        user.apply(UserUpdate::session_token(None));

        assert!(!user.has_active_session());
        assert_eq!(user.reset_token.as_deref(), Some("reset"));
        assert_eq!(user.hashed_credential, "$2b$04$digest");
    }

    #[test]
    fn test_password_reset_clears_reset_token() {
        let mut user = sample_user();
        user.apply(UserUpdate::password_reset("$2b$04$other".to_string()));

        assert_eq!(user.hashed_credential, "$2b$04$other");
        assert!(user.reset_token.is_none());
        assert!(user.has_active_session());
    }

    #[test]
    fn test_set_by_name() {
        let update = UserUpdate::default()
            .set("session_token", Some("abc".to_string()))
            .unwrap()
            .set("reset_token", None)
            .unwrap();

        assert_eq!(update.session_token, Some(Some("abc".to_string())));
        assert_eq!(update.reset_token, Some(None));
        assert!(update.hashed_credential.is_none());
    }

    #[test]
    fn test_set_rejects_unknown_fields() {
        for field in ["email", "id", "password", "is_admin"] {
            let result = UserUpdate::default().set(field, Some("x".to_string()));
            assert!(matches!(result, Err(AppError::ValidationError(_))), "{} accepted", field);
        }
    }

    #[test]
    fn test_set_rejects_cleared_credential() {
        let result = UserUpdate::default().set("hashed_credential", None);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_serialization_hides_secrets() {
        let json = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(json["email"], "bob@example.com");
        assert!(json.get("hashed_credential").is_none());
        assert!(json.get("session_token").is_none());
        assert!(json.get("reset_token").is_none());
    }
}
