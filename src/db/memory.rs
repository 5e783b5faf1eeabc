use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{NewUser, User, UserUpdate};
use crate::db::store::UserStore;
use crate::error::DatabaseError;
use crate::Result;

/// Process-local store. Every write takes the lock once, so the uniqueness
/// checks and the mutation are atomic with respect to other callers.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    async fn find_where<F>(&self, predicate: F) -> Option<User>
    where
        F: Fn(&User) -> bool,
    {
        let users = self.users.read().await;
        users.values().find(|u| predicate(u)).cloned()
    }
}

fn token_taken<F>(users: &HashMap<Uuid, User>, id: Uuid, token: &str, field: F) -> bool
where
    F: Fn(&User) -> Option<&str>,
{
    users
        .values()
        .any(|u| u.id != id && field(u) == Some(token))
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.find_where(|u| u.email == email).await)
    }

    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .find_where(|u| u.session_token.as_deref() == Some(token))
            .await)
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        Ok(self
            .find_where(|u| u.reset_token.as_deref() == Some(token))
            .await)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate.into());
        }

        let mut id = Uuid::new_v4();
        while users.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let now = Utc::now();
        let record = User {
            id,
            email: user.email,
            hashed_credential: user.hashed_credential,
            session_token: None,
            reset_token: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(id, record.clone());

        Ok(record)
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User> {
        let mut users = self.users.write().await;

        if !users.contains_key(&id) {
            return Err(DatabaseError::NotFound.into());
        }

        if let Some(Some(token)) = &update.session_token {
            if token_taken(&users, id, token, |u| u.session_token.as_deref()) {
                return Err(DatabaseError::Duplicate.into());
            }
        }
        if let Some(Some(token)) = &update.reset_token {
            if token_taken(&users, id, token, |u| u.reset_token.as_deref()) {
                return Err(DatabaseError::Duplicate.into());
            }
        }

        let user = users.get_mut(&id).ok_or(DatabaseError::NotFound)?;
        user.apply(update);

        Ok(user.clone())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            hashed_credential: "digest".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_distinct_ids() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty().await);

        let a = store.insert(new_user("a@example.com")).await.unwrap();
        let b = store.insert(new_user("b@example.com")).await.unwrap();

        assert!(!store.is_empty().await);
        assert_ne!(a.id, b.id);
        assert!(a.session_token.is_none());
        assert!(a.reset_token.is_none());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();

        let err = store.insert(new_user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(DatabaseError::Duplicate)));

        // Email comparison is case-sensitive
        assert!(store.insert(new_user("A@example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_lookups_return_none_when_missing() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("a@example.com")).await.unwrap();

        assert!(store.find_by_email("b@example.com").await.unwrap().is_none());
        assert!(store.find_by_session_token("tok").await.unwrap().is_none());
        assert!(store.find_by_reset_token("tok").await.unwrap().is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let store = InMemoryUserStore::new();
        let err = store
            .update(Uuid::new_v4(), UserUpdate::session_token(None))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::DatabaseError(DatabaseError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_and_find_by_tokens() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("a@example.com")).await.unwrap();

        store
            .update(user.id, UserUpdate::session_token(Some("s1".into())))
            .await
            .unwrap();
        store
            .update(user.id, UserUpdate::reset_token(Some("r1".into())))
            .await
            .unwrap();

        let by_session = store.find_by_session_token("s1").await.unwrap().unwrap();
        let by_reset = store.find_by_reset_token("r1").await.unwrap().unwrap();
        assert_eq!(by_session.id, user.id);
        assert_eq!(by_reset.id, user.id);
        assert!(by_reset.updated_at >= user.updated_at);
    }

    #[tokio::test]
    async fn test_session_token_unique_when_present() {
        let store = InMemoryUserStore::new();
        let a = store.insert(new_user("a@example.com")).await.unwrap();
        let b = store.insert(new_user("b@example.com")).await.unwrap();

        store
            .update(a.id, UserUpdate::session_token(Some("shared".into())))
            .await
            .unwrap();
        let err = store
            .update(b.id, UserUpdate::session_token(Some("shared".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(DatabaseError::Duplicate)));

        // Absent tokens never collide
        store.update(a.id, UserUpdate::session_token(None)).await.unwrap();
        store.update(b.id, UserUpdate::session_token(None)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_insert_same_email() {
        let store = Arc::new(InMemoryUserStore::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(new_user("race@example.com")).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(store.len().await, 1);
    }
}
