//! SQLite reservation repository implementation.
//!
//! `reserve` and `reschedule` run the overlap check and the write inside one
//! transaction on the single-connection writer pool, so of two concurrent
//! attempts on overlapping intervals exactly one commits.
//!
//! Interval timestamps are stored as fixed-width naive strings
//! (`%Y-%m-%dT%H:%M:%S`) so SQLite's lexicographic string comparison matches
//! chronological order; `end_at` is denormalized to keep the overlap
//! predicate inside SQL.

use bookline_core::repository::reservation::ReservationRepository;
use bookline_types::error::RepositoryError;
use bookline_types::provider::ProviderId;
use bookline_types::reservation::{
    MeetingRef, Reservation, ReservationId, ReservationStatus, SubjectId,
};
use chrono::{Duration, NaiveDateTime};
use sqlx::Row;

use super::pool::DatabasePool;
use super::provider::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `ReservationRepository`.
pub struct SqliteReservationRepository {
    pool: DatabasePool,
}

impl SqliteReservationRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

const NAIVE_FMT: &str = "%Y-%m-%dT%H:%M:%S";

fn format_naive(dt: &NaiveDateTime) -> String {
    dt.format(NAIVE_FMT).to_string()
}

fn parse_naive(s: &str) -> Result<NaiveDateTime, RepositoryError> {
    NaiveDateTime::parse_from_str(s, NAIVE_FMT)
        .map_err(|e| RepositoryError::Query(format!("invalid timestamp: {e}")))
}

/// Statuses that hold their interval. Matches `ReservationStatus::is_active`.
const ACTIVE_STATUSES: &str = "('pending', 'payment_pending', 'confirmed')";

struct ReservationRow {
    id: String,
    provider_id: String,
    subject_id: String,
    start_at: String,
    duration_minutes: i64,
    status: String,
    price: i64,
    payment_ref: Option<String>,
    meeting_id: Option<String>,
    meeting_join_url: Option<String>,
    crm_event_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl ReservationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            provider_id: row.try_get("provider_id")?,
            subject_id: row.try_get("subject_id")?,
            start_at: row.try_get("start_at")?,
            duration_minutes: row.try_get("duration_minutes")?,
            status: row.try_get("status")?,
            price: row.try_get("price")?,
            payment_ref: row.try_get("payment_ref")?,
            meeting_id: row.try_get("meeting_id")?,
            meeting_join_url: row.try_get("meeting_join_url")?,
            crm_event_id: row.try_get("crm_event_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_reservation(self) -> Result<Reservation, RepositoryError> {
        let id = self
            .id
            .parse::<ReservationId>()
            .map_err(|e| RepositoryError::Query(format!("invalid reservation id: {e}")))?;
        let provider_id = self
            .provider_id
            .parse::<ProviderId>()
            .map_err(|e| RepositoryError::Query(format!("invalid provider id: {e}")))?;
        let subject_id = self
            .subject_id
            .parse::<SubjectId>()
            .map_err(|e| RepositoryError::Query(format!("invalid subject id: {e}")))?;
        let status: ReservationStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        let meeting = match (self.meeting_id, self.meeting_join_url) {
            (Some(external_id), Some(join_url)) => Some(MeetingRef {
                external_id,
                join_url,
            }),
            _ => None,
        };

        Ok(Reservation {
            id,
            provider_id,
            subject_id,
            start: parse_naive(&self.start_at)?,
            duration_minutes: self.duration_minutes as u32,
            status,
            price: self.price,
            payment_ref: self.payment_ref,
            meeting,
            crm_event_id: self.crm_event_id,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

fn map_row(row: &sqlx::sqlite::SqliteRow) -> Result<Reservation, RepositoryError> {
    ReservationRow::from_row(row)
        .map_err(|e| RepositoryError::Query(e.to_string()))?
        .into_reservation()
}

impl ReservationRepository for SqliteReservationRepository {
    async fn reserve(&self, reservation: &Reservation) -> Result<Reservation, RepositoryError> {
        let start = format_naive(&reservation.start);
        let end = format_naive(&reservation.end());

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let taken: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT id FROM reservations
             WHERE provider_id = ? AND status IN {ACTIVE_STATUSES}
               AND start_at < ? AND end_at > ?
             LIMIT 1"
        ))
        .bind(reservation.provider_id.to_string())
        .bind(&end)
        .bind(&start)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if taken.is_some() {
            // Transaction rolls back on drop
            return Err(RepositoryError::Conflict(format!(
                "interval starting {} is taken",
                reservation.start
            )));
        }

        sqlx::query(
            "INSERT INTO reservations (id, provider_id, subject_id, start_at, end_at, duration_minutes, status, price, payment_ref, meeting_id, meeting_join_url, crm_event_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reservation.id.to_string())
        .bind(reservation.provider_id.to_string())
        .bind(reservation.subject_id.to_string())
        .bind(&start)
        .bind(&end)
        .bind(reservation.duration_minutes as i64)
        .bind(reservation.status.to_string())
        .bind(reservation.price)
        .bind(&reservation.payment_ref)
        .bind(reservation.meeting.as_ref().map(|m| m.external_id.clone()))
        .bind(reservation.meeting.as_ref().map(|m| m.join_url.clone()))
        .bind(&reservation.crm_event_id)
        .bind(format_datetime(&reservation.created_at))
        .bind(format_datetime(&reservation.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(reservation.clone())
    }

    async fn get_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM reservations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(map_row).transpose()
    }

    async fn list_active_in_range(
        &self,
        provider_id: &ProviderId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM reservations
             WHERE provider_id = ? AND status IN {ACTIVE_STATUSES}
               AND start_at < ? AND end_at > ?
             ORDER BY start_at"
        ))
        .bind(provider_id.to_string())
        .bind(format_naive(&to))
        .bind(format_naive(&from))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(map_row).collect()
    }

    async fn list_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<Reservation>, RepositoryError> {
        let rows =
            sqlx::query("SELECT * FROM reservations WHERE subject_id = ? ORDER BY start_at DESC")
                .bind(subject_id.to_string())
                .fetch_all(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(map_row).collect()
    }

    async fn update(
        &self,
        reservation: &Reservation,
        expected: ReservationStatus,
    ) -> Result<Reservation, RepositoryError> {
        // The status precondition runs inside the UPDATE itself, so a
        // transition committed by a concurrent call cannot be overwritten.
        let result = sqlx::query(
            "UPDATE reservations SET status = ?, payment_ref = ?, meeting_id = ?, meeting_join_url = ?, crm_event_id = ?, updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(reservation.status.to_string())
        .bind(&reservation.payment_ref)
        .bind(reservation.meeting.as_ref().map(|m| m.external_id.clone()))
        .bind(reservation.meeting.as_ref().map(|m| m.join_url.clone()))
        .bind(&reservation.crm_event_id)
        .bind(format_datetime(&reservation.updated_at))
        .bind(reservation.id.to_string())
        .bind(expected.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(&reservation.id).await? {
                Some(current) => Err(RepositoryError::Conflict(format!(
                    "reservation {} is {}, not {expected}",
                    reservation.id, current.status
                ))),
                None => Err(RepositoryError::NotFound),
            };
        }

        // Re-read so interval fields reflect the stored row, not the caller's copy
        self.get_by_id(&reservation.id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn reschedule(
        &self,
        id: &ReservationId,
        new_start: NaiveDateTime,
        new_duration_minutes: u32,
    ) -> Result<Reservation, RepositoryError> {
        let new_end = new_start + Duration::minutes(new_duration_minutes as i64);
        let start = format_naive(&new_start);
        let end = format_naive(&new_end);

        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let current = sqlx::query("SELECT * FROM reservations WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;
        let current = map_row(&current)?;

        let taken: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT id FROM reservations
             WHERE provider_id = ? AND id != ? AND status IN {ACTIVE_STATUSES}
               AND start_at < ? AND end_at > ?
             LIMIT 1"
        ))
        .bind(current.provider_id.to_string())
        .bind(id.to_string())
        .bind(&end)
        .bind(&start)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if taken.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "interval starting {new_start} is taken"
            )));
        }

        sqlx::query(
            "UPDATE reservations SET start_at = ?, end_at = ?, duration_minutes = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&start)
        .bind(&end)
        .bind(new_duration_minutes as i64)
        .bind(format_datetime(&chrono::Utc::now()))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }
}
