//! SQLite provider repository implementation.
//!
//! Implements `ProviderRepository` from `bookline-core` using sqlx with split
//! read/write pools.

use bookline_core::repository::provider::ProviderRepository;
use bookline_types::error::RepositoryError;
use bookline_types::provider::{Provider, ProviderId};
use chrono::{DateTime, Utc};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ProviderRepository`.
pub struct SqliteProviderRepository {
    pool: DatabasePool,
}

impl SqliteProviderRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to the domain Provider.
struct ProviderRow {
    id: String,
    name: String,
    description: String,
    price: i64,
    active: i64,
    crm_owner_ref: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ProviderRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            active: row.try_get("active")?,
            crm_owner_ref: row.try_get("crm_owner_ref")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_provider(self) -> Result<Provider, RepositoryError> {
        let id = self
            .id
            .parse::<ProviderId>()
            .map_err(|e| RepositoryError::Query(format!("invalid provider id: {e}")))?;

        Ok(Provider {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            active: self.active != 0,
            crm_owner_ref: self.crm_owner_ref,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl ProviderRepository for SqliteProviderRepository {
    async fn create(&self, provider: &Provider) -> Result<Provider, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO providers (id, name, description, price, active, crm_owner_ref, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(provider.id.to_string())
        .bind(&provider.name)
        .bind(&provider.description)
        .bind(provider.price)
        .bind(provider.active as i64)
        .bind(&provider.crm_owner_ref)
        .bind(format_datetime(&provider.created_at))
        .bind(format_datetime(&provider.updated_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(provider.clone()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "provider '{}' already exists",
                    provider.id
                )))
            }
            Err(e) => Err(RepositoryError::Query(e.to_string())),
        }
    }

    async fn get_by_id(&self, id: &ProviderId) -> Result<Option<Provider>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM providers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let provider_row =
                    ProviderRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(provider_row.into_provider()?))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Provider>, RepositoryError> {
        let sql = if active_only {
            "SELECT * FROM providers WHERE active = 1 ORDER BY name"
        } else {
            "SELECT * FROM providers ORDER BY name"
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut providers = Vec::with_capacity(rows.len());
        for row in &rows {
            let provider_row =
                ProviderRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            providers.push(provider_row.into_provider()?);
        }

        Ok(providers)
    }

    async fn update(&self, provider: &Provider) -> Result<Provider, RepositoryError> {
        let result = sqlx::query(
            "UPDATE providers SET name = ?, description = ?, price = ?, active = ?, crm_owner_ref = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&provider.name)
        .bind(&provider.description)
        .bind(provider.price)
        .bind(provider.active as i64)
        .bind(&provider.crm_owner_ref)
        .bind(format_datetime(&provider.updated_at))
        .bind(provider.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(provider.clone())
    }
}
