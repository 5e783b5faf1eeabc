use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::models::{NewUser, User, UserUpdate};
use crate::db::store::UserStore;
use crate::error::DatabaseError;
use crate::Result;

const USER_COLUMNS: &str =
    "id, email, hashed_credential, session_token, reset_token, created_at, updated_at";

/// Postgres-backed store. Uniqueness is enforced by the `users` table
/// constraints; see `migrations/`.
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        Self::new_with_options(
            &config.url,
            config.max_connections,
            Duration::from_secs(config.acquire_timeout_secs),
        )
        .await
    }

    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_session_token(&self, token: &str) -> Result<Option<User>> {
        self.find_one("session_token", token).await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        self.find_one("reset_token", token).await
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO users (id, email, hashed_credential, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let mut transaction = self.pool.begin().await?;

        let result = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.hashed_credential)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *transaction)
            .await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn update(&self, id: Uuid, update: UserUpdate) -> Result<User> {
        let query = format!(
            r#"
            UPDATE users SET
                hashed_credential = COALESCE($2, hashed_credential),
                session_token = CASE WHEN $3 THEN $4 ELSE session_token END,
                reset_token = CASE WHEN $5 THEN $6 ELSE reset_token END,
                updated_at = $7
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let set_session = update.session_token.is_some();
        let set_reset = update.reset_token.is_some();

        let user = sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(update.hashed_credential)
            .bind(set_session)
            .bind(update.session_token.flatten())
            .bind(set_reset)
            .bind(update.reset_token.flatten())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::NotFound)?;

        Ok(user)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
