//! External side effects dispatched after a reservation transition commits.
//!
//! The dispatcher is deliberately on the far side of the state machine:
//! a confirmed reservation stands even when the calendar or CRM is down.
//! Every collaborator call carries a bounded timeout; failures are logged
//! with the reservation id and reported as [`DispatchOutcome::Failed`],
//! never as an error to the caller.

use std::future::Future;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use bookline_types::error::CollaboratorError;
use bookline_types::provider::Provider;
use bookline_types::reservation::{MeetingRef, Reservation};

/// Calendar/meeting collaborator (create and move remote meetings).
pub trait CalendarService: Send + Sync {
    fn create_meeting(
        &self,
        topic: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> impl Future<Output = Result<MeetingRef, CollaboratorError>> + Send;

    fn update_meeting(
        &self,
        external_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// CRM collaborator (calendar events on the provider's CRM account).
pub trait CrmService: Send + Sync {
    fn create_event(
        &self,
        owner_ref: &str,
        title: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
        description: &str,
    ) -> impl Future<Output = Result<String, CollaboratorError>> + Send;

    fn update_event(
        &self,
        external_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> impl Future<Output = Result<(), CollaboratorError>> + Send;
}

/// Fire-and-forget operator/user notification sink.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, audience: &str, message: &str) -> impl Future<Output = ()> + Send;
}

/// Result of one best-effort collaborator dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    Failed(String),
    /// Nothing to dispatch (collaborator unconfigured or no owner ref).
    #[default]
    Skipped,
}

/// External references and outcomes gathered while confirming a reservation.
///
/// A `Failed` outcome is informational: the reservation stays confirmed and
/// the operator can retry the dispatch later.
#[derive(Debug, Clone, Default)]
pub struct ConfirmedEffects {
    pub meeting: Option<MeetingRef>,
    pub crm_event_id: Option<String>,
    pub calendar: DispatchOutcome,
    pub crm: DispatchOutcome,
}

/// Boundary invoked by the lifecycle after a transition commits.
pub trait EffectsDispatcher: Send + Sync {
    /// Reservation became CONFIRMED: create the remote meeting and CRM event.
    fn reservation_confirmed(
        &self,
        reservation: &Reservation,
        provider: &Provider,
    ) -> impl Future<Output = ConfirmedEffects> + Send;

    /// A confirmed reservation's interval changed: move the remote artifacts.
    fn reservation_moved(
        &self,
        reservation: &Reservation,
    ) -> impl Future<Output = ()> + Send;

    /// Reservation was cancelled: notify, nothing to keep in sync.
    fn reservation_cancelled(
        &self,
        reservation: &Reservation,
    ) -> impl Future<Output = ()> + Send;
}

/// Production dispatcher wiring calendar, CRM, and notification collaborators.
pub struct CollaboratorDispatcher<C, M, N> {
    calendar: C,
    crm: M,
    notifier: N,
    timeout: Duration,
}

impl<C, M, N> CollaboratorDispatcher<C, M, N>
where
    C: CalendarService,
    M: CrmService,
    N: NotificationSink,
{
    pub fn new(calendar: C, crm: M, notifier: N, timeout: Duration) -> Self {
        Self {
            calendar,
            crm,
            notifier,
            timeout,
        }
    }

    /// Run one collaborator call under the configured timeout.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout),
        }
    }
}

impl<C, M, N> EffectsDispatcher for CollaboratorDispatcher<C, M, N>
where
    C: CalendarService,
    M: CrmService,
    N: NotificationSink,
{
    async fn reservation_confirmed(
        &self,
        reservation: &Reservation,
        provider: &Provider,
    ) -> ConfirmedEffects {
        let mut effects = ConfirmedEffects::default();

        let topic = format!("Appointment with {}", provider.name);
        let calendar = self
            .bounded(self.calendar.create_meeting(
                &topic,
                reservation.start,
                reservation.duration_minutes,
            ))
            .await;
        match calendar {
            Ok(meeting) => {
                info!(reservation = %reservation.id, meeting = %meeting.external_id, "meeting created");
                effects.meeting = Some(meeting);
                effects.calendar = DispatchOutcome::Completed;
            }
            Err(CollaboratorError::Unconfigured(what)) => {
                info!(reservation = %reservation.id, "calendar dispatch skipped: {what}");
            }
            Err(err) => {
                warn!(reservation = %reservation.id, "calendar dispatch failed: {err}");
                effects.calendar = DispatchOutcome::Failed(err.to_string());
            }
        }

        match provider.crm_owner_ref.as_deref() {
            Some(owner_ref) => {
                let description = match &effects.meeting {
                    Some(meeting) => format!("Join link: {}", meeting.join_url),
                    None => String::new(),
                };
                let crm = self
                    .bounded(self.crm.create_event(
                        owner_ref,
                        &topic,
                        reservation.start,
                        reservation.duration_minutes,
                        &description,
                    ))
                    .await;
                match crm {
                    Ok(event_id) => {
                        info!(reservation = %reservation.id, event = %event_id, "CRM event created");
                        effects.crm_event_id = Some(event_id);
                        effects.crm = DispatchOutcome::Completed;
                    }
                    Err(CollaboratorError::Unconfigured(what)) => {
                        info!(reservation = %reservation.id, "CRM dispatch skipped: {what}");
                    }
                    Err(err) => {
                        warn!(reservation = %reservation.id, "CRM dispatch failed: {err}");
                        effects.crm = DispatchOutcome::Failed(err.to_string());
                    }
                }
            }
            None => {
                info!(reservation = %reservation.id, "CRM dispatch skipped: provider has no owner ref");
            }
        }

        self.notifier
            .notify(
                "operators",
                &format!(
                    "Reservation {} confirmed for {} at {}",
                    reservation.id, provider.name, reservation.start
                ),
            )
            .await;

        effects
    }

    async fn reservation_moved(&self, reservation: &Reservation) {
        if let Some(meeting) = &reservation.meeting {
            let result = self
                .bounded(self.calendar.update_meeting(
                    &meeting.external_id,
                    reservation.start,
                    reservation.duration_minutes,
                ))
                .await;
            if let Err(err) = result {
                warn!(reservation = %reservation.id, "calendar update failed: {err}");
            }
        }

        if let Some(event_id) = &reservation.crm_event_id {
            let result = self
                .bounded(self.crm.update_event(
                    event_id,
                    reservation.start,
                    reservation.duration_minutes,
                ))
                .await;
            if let Err(err) = result {
                warn!(reservation = %reservation.id, "CRM update failed: {err}");
            }
        }

        self.notifier
            .notify(
                "operators",
                &format!(
                    "Reservation {} moved to {}",
                    reservation.id, reservation.start
                ),
            )
            .await;
    }

    async fn reservation_cancelled(&self, reservation: &Reservation) {
        self.notifier
            .notify(
                "operators",
                &format!("Reservation {} cancelled", reservation.id),
            )
            .await;
    }
}
