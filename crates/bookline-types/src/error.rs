use thiserror::Error;

use crate::reservation::ReservationStatus;

/// Errors surfaced by the booking core to its callers.
///
/// All of these are returned synchronously; none of them crash the process.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("provider not found")]
    ProviderNotFound,

    #[error("reservation not found")]
    ReservationNotFound,

    #[error("invalid time range: {0}")]
    InvalidTimeRange(String),

    /// The requested interval is unavailable at commit time.
    #[error("slot unavailable: {0}")]
    Conflict(String),

    #[error("'{event}' is not a legal transition from status '{from}'")]
    InvalidTransition {
        from: ReservationStatus,
        event: &'static str,
    },

    #[error("payment outcome does not match the pending charge: {0}")]
    PaymentMismatch(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors from repository operations (used by trait definitions in bookline-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from external collaborators (calendar, CRM).
///
/// Always non-fatal to the reservation: callers log and continue.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator not configured: {0}")]
    Unconfigured(String),

    #[error("collaborator request failed: {0}")]
    Http(String),

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),

    #[error("collaborator call timed out")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_error_display() {
        let err = BookingError::Conflict("10:00 already booked".to_string());
        assert_eq!(err.to_string(), "slot unavailable: 10:00 already booked");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = BookingError::InvalidTransition {
            from: ReservationStatus::Cancelled,
            event: "finalize",
        };
        assert!(err.to_string().contains("finalize"));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_collaborator_error_display() {
        assert_eq!(
            CollaboratorError::Timeout.to_string(),
            "collaborator call timed out"
        );
    }
}
