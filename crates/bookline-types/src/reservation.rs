use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::provider::ProviderId;

/// Default appointment length in minutes when the caller does not specify one.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Unique identifier for a reservation, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub Uuid);

impl ReservationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ReservationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the booking requester (end user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(pub Uuid);

impl SubjectId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SubjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Reservation lifecycle states.
///
/// - Pending: created, awaiting finalization
/// - PaymentPending: finalized with a non-zero price, awaiting payment outcome
/// - Confirmed: appointment stands; external calendar/CRM effects dispatched
/// - Cancelled: interval released (terminal)
/// - Completed: appointment took place (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    PaymentPending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// Active reservations hold their interval against double-booking.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ReservationStatus::Pending
                | ReservationStatus::PaymentPending
                | ReservationStatus::Confirmed
        )
    }

    /// Terminal states permit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReservationStatus::Pending => write!(f, "pending"),
            ReservationStatus::PaymentPending => write!(f, "payment_pending"),
            ReservationStatus::Confirmed => write!(f, "confirmed"),
            ReservationStatus::Cancelled => write!(f, "cancelled"),
            ReservationStatus::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReservationStatus::Pending),
            "payment_pending" => Ok(ReservationStatus::PaymentPending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "completed" => Ok(ReservationStatus::Completed),
            other => Err(format!("invalid reservation status: '{other}'")),
        }
    }
}

/// Reference to a meeting created in the external calendar collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRef {
    pub external_id: String,
    pub join_url: String,
}

/// A persisted booking instance with lifecycle status.
///
/// Start times are naive wall-clock values interpreted as provider-local;
/// the core performs no timezone conversion. Row timestamps are UTC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub provider_id: ProviderId,
    pub subject_id: SubjectId,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
    pub status: ReservationStatus,
    /// Price captured from the provider at creation time.
    pub price: i64,
    /// Opaque charge reference, present once payment is initiated.
    pub payment_ref: Option<String>,
    /// External calendar meeting, present after a successful dispatch.
    pub meeting: Option<MeetingRef>,
    /// External CRM event id, present after a successful dispatch.
    pub crm_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Exclusive end of the reserved interval.
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }
}

/// A computed, bookable start-time candidate of fixed duration.
///
/// Produced fresh on every query; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub provider_id: ProviderId,
    pub start: NaiveDateTime,
    pub duration_minutes: u32,
}

impl Slot {
    /// Exclusive end of the slot interval.
    pub fn end(&self) -> NaiveDateTime {
        self.start + Duration::minutes(self.duration_minutes as i64)
    }
}

/// Request to create a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub provider_id: ProviderId,
    pub subject_id: SubjectId,
    pub start: NaiveDateTime,
    pub duration_minutes: Option<u32>,
}
