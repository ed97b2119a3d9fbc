//! SQLite schedule repository implementation.
//!
//! Working hours are stored one row per (provider, weekday) with "HH:MM"
//! wall-clock strings. `apply_template` replaces the whole week inside one
//! transaction.

use bookline_core::repository::schedule::ScheduleRepository;
use bookline_types::error::RepositoryError;
use bookline_types::provider::ProviderId;
use bookline_types::schedule::{TimeRange, Weekday, WeeklyTemplate};
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ScheduleRepository`.
pub struct SqliteScheduleRepository {
    pool: DatabasePool,
}

impl SqliteScheduleRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const TIME_FMT: &str = "%H:%M";

fn range_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<TimeRange, RepositoryError> {
    let start: String = row
        .try_get("start_time")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    let end: String = row
        .try_get("end_time")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    TimeRange::parse(&start, &end)
        .map_err(|e| RepositoryError::Query(format!("invalid stored hours: {e}")))
}

impl ScheduleRepository for SqliteScheduleRepository {
    async fn get_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
    ) -> Result<Option<TimeRange>, RepositoryError> {
        let row = sqlx::query(
            "SELECT start_time, end_time FROM working_hours WHERE provider_id = ? AND weekday = ?",
        )
        .bind(provider_id.to_string())
        .bind(weekday.index() as i64)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(range_from_row).transpose()
    }

    async fn set_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
        range: TimeRange,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO working_hours (provider_id, weekday, start_time, end_time)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (provider_id, weekday) DO UPDATE SET start_time = excluded.start_time, end_time = excluded.end_time",
        )
        .bind(provider_id.to_string())
        .bind(weekday.index() as i64)
        .bind(range.start.format(TIME_FMT).to_string())
        .bind(range.end.format(TIME_FMT).to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn clear_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM working_hours WHERE provider_id = ? AND weekday = ?")
            .bind(provider_id.to_string())
            .bind(weekday.index() as i64)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn apply_template(
        &self,
        provider_id: &ProviderId,
        template: &WeeklyTemplate,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM working_hours WHERE provider_id = ?")
            .bind(provider_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for weekday in Weekday::ALL {
            if let Some(range) = template.day(weekday) {
                sqlx::query(
                    "INSERT INTO working_hours (provider_id, weekday, start_time, end_time)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(provider_id.to_string())
                .bind(weekday.index() as i64)
                .bind(range.start.format(TIME_FMT).to_string())
                .bind(range.end.format(TIME_FMT).to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn week(&self, provider_id: &ProviderId) -> Result<WeeklyTemplate, RepositoryError> {
        let rows = sqlx::query(
            "SELECT weekday, start_time, end_time FROM working_hours WHERE provider_id = ? ORDER BY weekday",
        )
        .bind(provider_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut template = WeeklyTemplate { days: [None; 7] };
        for row in &rows {
            let weekday: i64 = row
                .try_get("weekday")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let weekday = Weekday::from_index(weekday as u8)
                .ok_or_else(|| RepositoryError::Query(format!("invalid weekday {weekday}")))?;
            template.days[weekday.index() as usize] = Some(range_from_row(row)?);
        }

        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;
    use crate::sqlite::provider::SqliteProviderRepository;
    use bookline_core::repository::provider::ProviderRepository;
    use bookline_types::provider::Provider;
    use chrono::Utc;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    async fn seed_provider(pool: &DatabasePool) -> ProviderId {
        let now = Utc::now();
        let provider = Provider {
            id: ProviderId::new(),
            name: "Dr. Aliyev".to_string(),
            description: String::new(),
            price: 0,
            active: true,
            crm_owner_ref: None,
            created_at: now,
            updated_at: now,
        };
        SqliteProviderRepository::new(pool.clone())
            .create(&provider)
            .await
            .unwrap();
        provider.id
    }

    #[tokio::test]
    async fn test_set_get_clear_day() {
        let pool = test_pool().await;
        let provider_id = seed_provider(&pool).await;
        let repo = SqliteScheduleRepository::new(pool);

        let hours = TimeRange::parse("09:00", "17:00").unwrap();
        repo.set_day(&provider_id, Weekday::Monday, hours)
            .await
            .unwrap();

        let stored = repo.get_day(&provider_id, Weekday::Monday).await.unwrap();
        assert_eq!(stored, Some(hours));
        assert!(
            repo.get_day(&provider_id, Weekday::Tuesday)
                .await
                .unwrap()
                .is_none()
        );

        repo.clear_day(&provider_id, Weekday::Monday).await.unwrap();
        assert!(
            repo.get_day(&provider_id, Weekday::Monday)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_set_day_overwrites() {
        let pool = test_pool().await;
        let provider_id = seed_provider(&pool).await;
        let repo = SqliteScheduleRepository::new(pool);

        repo.set_day(
            &provider_id,
            Weekday::Monday,
            TimeRange::parse("09:00", "17:00").unwrap(),
        )
        .await
        .unwrap();
        let evening = TimeRange::parse("14:00", "20:00").unwrap();
        repo.set_day(&provider_id, Weekday::Monday, evening)
            .await
            .unwrap();

        let stored = repo.get_day(&provider_id, Weekday::Monday).await.unwrap();
        assert_eq!(stored, Some(evening));
    }

    #[tokio::test]
    async fn test_apply_template_replaces_week() {
        let pool = test_pool().await;
        let provider_id = seed_provider(&pool).await;
        let repo = SqliteScheduleRepository::new(pool);

        // Pre-existing Sunday hours must not survive a template without them
        repo.set_day(
            &provider_id,
            Weekday::Sunday,
            TimeRange::parse("10:00", "12:00").unwrap(),
        )
        .await
        .unwrap();

        repo.apply_template(&provider_id, &WeeklyTemplate::default())
            .await
            .unwrap();

        let week = repo.week(&provider_id).await.unwrap();
        assert!(week.day(Weekday::Monday).is_some());
        assert!(week.day(Weekday::Friday).is_some());
        assert!(week.day(Weekday::Saturday).is_none());
        assert!(week.day(Weekday::Sunday).is_none());
    }
}
