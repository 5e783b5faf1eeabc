//! User record storage.
//!
//! [`UserStore`] is the contract the auth service is written against.
//! Two implementations ship with the crate: [`PgUserStore`] for production
//! and [`InMemoryUserStore`] for tests and local runs.

pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;
use tracing::info;

pub use memory::InMemoryUserStore;
pub use models::{NewUser, User, UserField, UserUpdate};
pub use postgres::PgUserStore;
pub use store::UserStore;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::Result;

/// Opens the store selected by `config.backend`, running migrations for Postgres.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn UserStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let store = PgUserStore::connect(config).await?;
            store.migrate().await?;
            info!("Connected to Postgres user store");
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory user store");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}
