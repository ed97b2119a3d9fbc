//! Reservation repository trait definition.
//!
//! `reserve` and `reschedule` are the ConflictGuard seam: implementations
//! must execute the overlap check and the write as one atomic unit, so that
//! of two concurrent attempts on overlapping intervals for the same provider
//! exactly one commits and the other fails with `RepositoryError::Conflict`.

use chrono::NaiveDateTime;

use bookline_types::error::RepositoryError;
use bookline_types::provider::ProviderId;
use bookline_types::reservation::{Reservation, ReservationId, ReservationStatus, SubjectId};

/// Repository trait for reservation persistence.
pub trait ReservationRepository: Send + Sync {
    /// Insert a reservation iff no active reservation for the same provider
    /// overlaps its interval. Check and insert are atomic.
    fn reserve(
        &self,
        reservation: &Reservation,
    ) -> impl std::future::Future<Output = Result<Reservation, RepositoryError>> + Send;

    /// Get a reservation by its unique ID.
    fn get_by_id(
        &self,
        id: &ReservationId,
    ) -> impl std::future::Future<Output = Result<Option<Reservation>, RepositoryError>> + Send;

    /// Active (pending / payment_pending / confirmed) reservations for a
    /// provider whose intervals intersect `[from, to)`, ordered by start.
    fn list_active_in_range(
        &self,
        provider_id: &ProviderId,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> impl std::future::Future<Output = Result<Vec<Reservation>, RepositoryError>> + Send;

    /// All reservations made by a subject, newest first.
    fn list_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> impl std::future::Future<Output = Result<Vec<Reservation>, RepositoryError>> + Send;

    /// Update status, payment reference, and external refs, iff the stored
    /// status still equals `expected`. A row whose status changed underneath
    /// the caller fails with `RepositoryError::Conflict` and stays untouched,
    /// so a committed transition can never be overwritten by a stale one.
    /// Never moves the reserved interval -- use `reschedule` for that.
    fn update(
        &self,
        reservation: &Reservation,
        expected: ReservationStatus,
    ) -> impl std::future::Future<Output = Result<Reservation, RepositoryError>> + Send;

    /// Move a reservation to a new interval iff the new interval is free of
    /// other active reservations. On conflict the stored row is untouched.
    fn reschedule(
        &self,
        id: &ReservationId,
        new_start: NaiveDateTime,
        new_duration_minutes: u32,
    ) -> impl std::future::Future<Output = Result<Reservation, RepositoryError>> + Send;
}
