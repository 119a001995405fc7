//! Settings database operations (`sync.settings`).
//!
//! Generic JSONB key/value storage; the import run state lives under
//! [`IMPORT_STATE_KEY`].

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::RepositoryError;
use crate::import::state::{ImportState, ImportStateStore};

/// Key of the import run state.
pub const IMPORT_STATE_KEY: &str = "import_state";

/// Get a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn get_setting(pool: &PgPool, key: &str) -> Result<Option<JsonValue>, RepositoryError> {
    let result =
        sqlx::query_scalar::<_, JsonValue>("SELECT value FROM sync.settings WHERE key = $1")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    Ok(result)
}

/// Set a setting value.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn set_setting(
    pool: &PgPool,
    key: &str,
    value: &JsonValue,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO sync.settings (key, value)
        VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = NOW()
        ",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// [`ImportStateStore`] backed by the settings table.
#[derive(Clone)]
pub struct PgImportStateStore {
    pool: PgPool,
}

impl PgImportStateStore {
    /// Create a new state store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStateStore for PgImportStateStore {
    async fn load(&self) -> Result<ImportState, RepositoryError> {
        match get_setting(&self.pool, IMPORT_STATE_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(ImportState::default()),
        }
    }

    async fn save(&self, state: &ImportState) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(state)?;
        set_setting(&self.pool, IMPORT_STATE_KEY, &value).await
    }
}
