//! Reservation lifecycle: creation, payment gating, confirmation,
//! cancellation, reschedule, completion.
//!
//! `BookingService` drives every legal status transition. The conflict check
//! itself lives behind [`ReservationRepository::reserve`] /
//! [`ReservationRepository::reschedule`] -- implementations commit the
//! overlap check and the write atomically, so the service never races
//! against concurrent bookings. External effects run after the transition
//! commits and can only degrade, never roll it back.

use chrono::{Local, NaiveDate, NaiveDateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use bookline_types::error::{BookingError, RepositoryError};
use bookline_types::provider::{Provider, ProviderId};
use bookline_types::reservation::{
    CreateReservationRequest, DEFAULT_DURATION_MINUTES, Reservation, ReservationId,
    ReservationStatus, Slot, SubjectId,
};
use bookline_types::schedule::Weekday;

use crate::booking::effects::EffectsDispatcher;
use crate::booking::slots::free_slots;
use crate::repository::provider::ProviderRepository;
use crate::repository::reservation::ReservationRepository;
use crate::repository::schedule::ScheduleRepository;

/// Service orchestrating slot computation and the reservation state machine.
///
/// Generic over repository and dispatcher traits -- bookline-core never
/// depends on bookline-infra.
pub struct BookingService<P, S, R, E> {
    providers: P,
    schedule: S,
    reservations: R,
    effects: E,
    granularity_minutes: u32,
}

impl<P, S, R, E> BookingService<P, S, R, E>
where
    P: ProviderRepository,
    S: ScheduleRepository,
    R: ReservationRepository,
    E: EffectsDispatcher,
{
    pub fn new(
        providers: P,
        schedule: S,
        reservations: R,
        effects: E,
        granularity_minutes: u32,
    ) -> Self {
        Self {
            providers,
            schedule,
            reservations,
            effects,
            granularity_minutes,
        }
    }

    /// Bookable slots for a provider on a date.
    ///
    /// Recomputed on every call against live reservations -- no caching.
    /// A day without working hours, or an inactive provider, yields an
    /// empty list. Callers filter out past dates; the authoritative past
    /// check happens again in [`Self::create`].
    pub async fn compute_slots(
        &self,
        provider_id: &ProviderId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>, BookingError> {
        let provider = self.provider(provider_id).await?;
        if !provider.active {
            return Ok(Vec::new());
        }

        let weekday = Weekday::from_date(date);
        let Some(hours) = self
            .schedule
            .get_day(provider_id, weekday)
            .await
            .map_err(map_repo)?
        else {
            return Ok(Vec::new());
        };

        let day_start = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        let day_end = day_start + chrono::Duration::days(1);
        let active = self
            .reservations
            .list_active_in_range(provider_id, day_start, day_end)
            .await
            .map_err(map_repo)?;

        Ok(free_slots(
            provider.id,
            date,
            hours,
            self.granularity_minutes,
            &active,
        ))
    }

    /// Create a reservation in PENDING state.
    ///
    /// Fails with `InvalidTimeRange` for past starts or zero durations, and
    /// with `Conflict` when the interval is taken at commit time.
    pub async fn create(
        &self,
        request: CreateReservationRequest,
    ) -> Result<Reservation, BookingError> {
        let duration = request
            .duration_minutes
            .unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration == 0 {
            return Err(BookingError::InvalidTimeRange(
                "duration must be positive".to_string(),
            ));
        }
        if request.start < Local::now().naive_local() {
            return Err(BookingError::InvalidTimeRange(
                "start time is in the past".to_string(),
            ));
        }

        let provider = self.provider(&request.provider_id).await?;
        if !provider.active {
            return Err(BookingError::ProviderNotFound);
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: ReservationId::new(),
            provider_id: provider.id,
            subject_id: request.subject_id,
            start: request.start,
            duration_minutes: duration,
            status: ReservationStatus::Pending,
            price: provider.price,
            payment_ref: None,
            meeting: None,
            crm_event_id: None,
            created_at: now,
            updated_at: now,
        };

        let committed = self
            .reservations
            .reserve(&reservation)
            .await
            .map_err(map_repo)?;
        info!(reservation = %committed.id, provider = %provider.id, "reservation created");
        Ok(committed)
    }

    /// Finalize a PENDING reservation.
    ///
    /// Free appointments confirm immediately; paid ones move to
    /// PAYMENT_PENDING with a recorded charge reference.
    pub async fn finalize(&self, id: &ReservationId) -> Result<Reservation, BookingError> {
        let mut reservation = self.reservation(id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                event: "finalize",
            });
        }

        if reservation.price == 0 {
            return self.confirm(reservation).await;
        }

        reservation.status = ReservationStatus::PaymentPending;
        reservation.payment_ref = Some(new_payment_ref(&reservation.id));
        reservation.updated_at = Utc::now();
        self.reservations
            .update(&reservation, ReservationStatus::Pending)
            .await
            .map_err(map_repo)
    }

    /// Record an asynchronous payment outcome.
    ///
    /// Success confirms the reservation; failure leaves it in
    /// PAYMENT_PENDING so the charge can be retried or cancelled.
    pub async fn record_payment_outcome(
        &self,
        id: &ReservationId,
        success: bool,
        payment_ref: &str,
    ) -> Result<Reservation, BookingError> {
        let reservation = self.reservation(id).await?;
        if reservation.status != ReservationStatus::PaymentPending {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                event: "payment",
            });
        }
        if reservation.payment_ref.as_deref() != Some(payment_ref) {
            return Err(BookingError::PaymentMismatch(format!(
                "reference does not match reservation {id}"
            )));
        }

        if !success {
            info!(reservation = %id, "payment failed, awaiting retry or cancel");
            return Ok(reservation);
        }

        self.confirm(reservation).await
    }

    /// Cancel an active reservation, releasing its interval.
    pub async fn cancel(&self, id: &ReservationId) -> Result<Reservation, BookingError> {
        let mut reservation = self.reservation(id).await?;
        if reservation.status.is_terminal() {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                event: "cancel",
            });
        }

        let from = reservation.status;
        reservation.status = ReservationStatus::Cancelled;
        reservation.updated_at = Utc::now();
        let cancelled = self
            .reservations
            .update(&reservation, from)
            .await
            .map_err(map_repo)?;
        self.effects.reservation_cancelled(&cancelled).await;
        Ok(cancelled)
    }

    /// Move a CONFIRMED reservation to a new interval.
    ///
    /// On conflict the original reservation and its time are untouched.
    pub async fn reschedule(
        &self,
        id: &ReservationId,
        new_start: NaiveDateTime,
        new_duration_minutes: u32,
    ) -> Result<Reservation, BookingError> {
        if new_duration_minutes == 0 {
            return Err(BookingError::InvalidTimeRange(
                "duration must be positive".to_string(),
            ));
        }
        if new_start < Local::now().naive_local() {
            return Err(BookingError::InvalidTimeRange(
                "start time is in the past".to_string(),
            ));
        }

        let reservation = self.reservation(id).await?;
        if reservation.status != ReservationStatus::Confirmed {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                event: "reschedule",
            });
        }

        let moved = self
            .reservations
            .reschedule(id, new_start, new_duration_minutes)
            .await
            .map_err(map_repo)?;
        info!(reservation = %id, start = %new_start, "reservation rescheduled");
        self.effects.reservation_moved(&moved).await;
        Ok(moved)
    }

    /// Administratively mark a CONFIRMED reservation as completed once its
    /// interval has passed.
    pub async fn complete(&self, id: &ReservationId) -> Result<Reservation, BookingError> {
        let mut reservation = self.reservation(id).await?;
        if reservation.status != ReservationStatus::Confirmed
            || Local::now().naive_local() < reservation.end()
        {
            return Err(BookingError::InvalidTransition {
                from: reservation.status,
                event: "complete",
            });
        }

        reservation.status = ReservationStatus::Completed;
        reservation.updated_at = Utc::now();
        self.reservations
            .update(&reservation, ReservationStatus::Confirmed)
            .await
            .map_err(map_repo)
    }

    /// All reservations made by a subject, newest first.
    pub async fn reservations_for_subject(
        &self,
        subject_id: &SubjectId,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.reservations
            .list_for_subject(subject_id)
            .await
            .map_err(map_repo)
    }

    /// Get a reservation by id.
    pub async fn get_reservation(
        &self,
        id: &ReservationId,
    ) -> Result<Reservation, BookingError> {
        self.reservation(id).await
    }

    /// Commit the CONFIRMED transition, then dispatch external effects.
    ///
    /// Both writes carry a status precondition, so a concurrent cancel
    /// committed in between fails this call instead of being overwritten.
    /// Collaborator failures (and even a failure to record the gathered
    /// external refs) never undo the confirmation.
    async fn confirm(&self, mut reservation: Reservation) -> Result<Reservation, BookingError> {
        let from = reservation.status;
        reservation.status = ReservationStatus::Confirmed;
        reservation.updated_at = Utc::now();
        let mut confirmed = self
            .reservations
            .update(&reservation, from)
            .await
            .map_err(map_repo)?;

        let provider = self.provider(&confirmed.provider_id).await?;
        let effects = self.effects.reservation_confirmed(&confirmed, &provider).await;
        if effects.meeting.is_some() || effects.crm_event_id.is_some() {
            confirmed.meeting = effects.meeting;
            confirmed.crm_event_id = effects.crm_event_id;
            confirmed.updated_at = Utc::now();
            match self
                .reservations
                .update(&confirmed, ReservationStatus::Confirmed)
                .await
            {
                Ok(updated) => confirmed = updated,
                Err(err) => {
                    warn!(reservation = %confirmed.id, "failed to record external refs: {err}");
                }
            }
        }

        Ok(confirmed)
    }

    async fn provider(&self, id: &ProviderId) -> Result<Provider, BookingError> {
        self.providers
            .get_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or(BookingError::ProviderNotFound)
    }

    async fn reservation(&self, id: &ReservationId) -> Result<Reservation, BookingError> {
        self.reservations
            .get_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or(BookingError::ReservationNotFound)
    }
}

/// Opaque charge reference recorded when a paid reservation is finalized.
fn new_payment_ref(id: &ReservationId) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("booking_{id}_{}", &nonce[..8])
}

fn map_repo(err: RepositoryError) -> BookingError {
    match err {
        RepositoryError::Conflict(msg) => BookingError::Conflict(msg),
        RepositoryError::NotFound => BookingError::ReservationNotFound,
        other => BookingError::Storage(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::effects::ConfirmedEffects;
    use bookline_types::error::RepositoryError;
    use bookline_types::reservation::MeetingRef;
    use bookline_types::schedule::{TimeRange, WeeklyTemplate};
    use chrono::Days;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct InMemoryProviders(Mutex<HashMap<ProviderId, Provider>>);

    impl ProviderRepository for InMemoryProviders {
        async fn create(&self, provider: &Provider) -> Result<Provider, RepositoryError> {
            self.0
                .lock()
                .unwrap()
                .insert(provider.id, provider.clone());
            Ok(provider.clone())
        }

        async fn get_by_id(&self, id: &ProviderId) -> Result<Option<Provider>, RepositoryError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn list(&self, active_only: bool) -> Result<Vec<Provider>, RepositoryError> {
            let mut providers: Vec<Provider> = self
                .0
                .lock()
                .unwrap()
                .values()
                .filter(|p| !active_only || p.active)
                .cloned()
                .collect();
            providers.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(providers)
        }

        async fn update(&self, provider: &Provider) -> Result<Provider, RepositoryError> {
            self.0
                .lock()
                .unwrap()
                .insert(provider.id, provider.clone());
            Ok(provider.clone())
        }
    }

    struct InMemorySchedule(Mutex<HashMap<(ProviderId, u8), TimeRange>>);

    impl ScheduleRepository for InMemorySchedule {
        async fn get_day(
            &self,
            provider_id: &ProviderId,
            weekday: Weekday,
        ) -> Result<Option<TimeRange>, RepositoryError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .get(&(*provider_id, weekday.index()))
                .copied())
        }

        async fn set_day(
            &self,
            provider_id: &ProviderId,
            weekday: Weekday,
            range: TimeRange,
        ) -> Result<(), RepositoryError> {
            self.0
                .lock()
                .unwrap()
                .insert((*provider_id, weekday.index()), range);
            Ok(())
        }

        async fn clear_day(
            &self,
            provider_id: &ProviderId,
            weekday: Weekday,
        ) -> Result<(), RepositoryError> {
            self.0
                .lock()
                .unwrap()
                .remove(&(*provider_id, weekday.index()));
            Ok(())
        }

        async fn apply_template(
            &self,
            provider_id: &ProviderId,
            template: &WeeklyTemplate,
        ) -> Result<(), RepositoryError> {
            let mut days = self.0.lock().unwrap();
            for weekday in Weekday::ALL {
                match template.day(weekday) {
                    Some(range) => days.insert((*provider_id, weekday.index()), range),
                    None => days.remove(&(*provider_id, weekday.index())),
                };
            }
            Ok(())
        }

        async fn week(
            &self,
            provider_id: &ProviderId,
        ) -> Result<WeeklyTemplate, RepositoryError> {
            let days = self.0.lock().unwrap();
            let mut template = WeeklyTemplate { days: [None; 7] };
            for weekday in Weekday::ALL {
                template.days[weekday.index() as usize] =
                    days.get(&(*provider_id, weekday.index())).copied();
            }
            Ok(template)
        }
    }

    struct InMemoryReservations(Mutex<Vec<Reservation>>);

    impl InMemoryReservations {
        fn overlap_exists(
            rows: &[Reservation],
            provider_id: &ProviderId,
            start: NaiveDateTime,
            end: NaiveDateTime,
            skip: Option<&ReservationId>,
        ) -> bool {
            rows.iter().any(|r| {
                r.provider_id == *provider_id
                    && r.status.is_active()
                    && Some(&r.id) != skip
                    && crate::booking::slots::overlaps(start, end, r.start, r.end())
            })
        }
    }

    impl ReservationRepository for InMemoryReservations {
        async fn reserve(
            &self,
            reservation: &Reservation,
        ) -> Result<Reservation, RepositoryError> {
            // Check and insert under the same lock, mirroring the atomic
            // transaction contract.
            let mut rows = self.0.lock().unwrap();
            if Self::overlap_exists(
                &rows,
                &reservation.provider_id,
                reservation.start,
                reservation.end(),
                None,
            ) {
                return Err(RepositoryError::Conflict(format!(
                    "interval starting {} is taken",
                    reservation.start
                )));
            }
            rows.push(reservation.clone());
            Ok(reservation.clone())
        }

        async fn get_by_id(
            &self,
            id: &ReservationId,
        ) -> Result<Option<Reservation>, RepositoryError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == *id)
                .cloned())
        }

        async fn list_active_in_range(
            &self,
            provider_id: &ProviderId,
            from: NaiveDateTime,
            to: NaiveDateTime,
        ) -> Result<Vec<Reservation>, RepositoryError> {
            let mut rows: Vec<Reservation> = self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|r| {
                    r.provider_id == *provider_id
                        && r.status.is_active()
                        && crate::booking::slots::overlaps(from, to, r.start, r.end())
                })
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.start);
            Ok(rows)
        }

        async fn list_for_subject(
            &self,
            subject_id: &SubjectId,
        ) -> Result<Vec<Reservation>, RepositoryError> {
            let mut rows: Vec<Reservation> = self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.subject_id == *subject_id)
                .cloned()
                .collect();
            rows.sort_by_key(|r| std::cmp::Reverse(r.start));
            Ok(rows)
        }

        async fn update(
            &self,
            reservation: &Reservation,
            expected: ReservationStatus,
        ) -> Result<Reservation, RepositoryError> {
            let mut rows = self.0.lock().unwrap();
            let row = rows
                .iter_mut()
                .find(|r| r.id == reservation.id)
                .ok_or(RepositoryError::NotFound)?;
            if row.status != expected {
                return Err(RepositoryError::Conflict(format!(
                    "reservation {} is {}, not {expected}",
                    reservation.id, row.status
                )));
            }
            *row = reservation.clone();
            Ok(reservation.clone())
        }

        async fn reschedule(
            &self,
            id: &ReservationId,
            new_start: NaiveDateTime,
            new_duration_minutes: u32,
        ) -> Result<Reservation, RepositoryError> {
            let mut rows = self.0.lock().unwrap();
            let new_end = new_start + chrono::Duration::minutes(new_duration_minutes as i64);
            let provider_id = rows
                .iter()
                .find(|r| r.id == *id)
                .map(|r| r.provider_id)
                .ok_or(RepositoryError::NotFound)?;
            if Self::overlap_exists(&rows, &provider_id, new_start, new_end, Some(id)) {
                return Err(RepositoryError::Conflict(format!(
                    "interval starting {new_start} is taken"
                )));
            }
            let row = rows.iter_mut().find(|r| r.id == *id).unwrap();
            row.start = new_start;
            row.duration_minutes = new_duration_minutes;
            row.updated_at = Utc::now();
            Ok(row.clone())
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        confirmed: Mutex<Vec<ReservationId>>,
        moved: Mutex<Vec<ReservationId>>,
        cancelled: Mutex<Vec<ReservationId>>,
    }

    impl EffectsDispatcher for RecordingDispatcher {
        async fn reservation_confirmed(
            &self,
            reservation: &Reservation,
            _provider: &Provider,
        ) -> ConfirmedEffects {
            self.confirmed.lock().unwrap().push(reservation.id);
            ConfirmedEffects {
                meeting: Some(MeetingRef {
                    external_id: "mtg-1".to_string(),
                    join_url: "https://meet.example.com/mtg-1".to_string(),
                }),
                crm_event_id: Some("evt-1".to_string()),
                ..Default::default()
            }
        }

        async fn reservation_moved(&self, reservation: &Reservation) {
            self.moved.lock().unwrap().push(reservation.id);
        }

        async fn reservation_cancelled(&self, reservation: &Reservation) {
            self.cancelled.lock().unwrap().push(reservation.id);
        }
    }

    type TestService =
        BookingService<InMemoryProviders, InMemorySchedule, InMemoryReservations, RecordingDispatcher>;

    async fn service_with_provider(price: i64) -> (TestService, ProviderId) {
        let provider = Provider {
            id: ProviderId::new(),
            name: "Dr. Aliyev".to_string(),
            description: String::new(),
            price,
            active: true,
            crm_owner_ref: Some("42".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let provider_id = provider.id;

        let providers = InMemoryProviders(Mutex::new(HashMap::new()));
        providers.create(&provider).await.unwrap();

        let schedule = InMemorySchedule(Mutex::new(HashMap::new()));
        let workday = TimeRange::parse("09:00", "17:00").unwrap();
        for weekday in Weekday::ALL {
            schedule.set_day(&provider_id, weekday, workday).await.unwrap();
        }

        let service = BookingService::new(
            providers,
            schedule,
            InMemoryReservations(Mutex::new(Vec::new())),
            RecordingDispatcher::default(),
            30,
        );
        (service, provider_id)
    }

    fn slot_tomorrow(h: u32, m: u32) -> NaiveDateTime {
        let date = Local::now()
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap();
        date.and_hms_opt(h, m, 0).unwrap()
    }

    fn request(provider_id: ProviderId, start: NaiveDateTime) -> CreateReservationRequest {
        CreateReservationRequest {
            provider_id,
            subject_id: SubjectId::new(),
            start,
            duration_minutes: None,
        }
    }

    #[tokio::test]
    async fn test_compute_slots_full_day() {
        let (service, provider_id) = service_with_provider(0).await;
        let date = Local::now().date_naive().checked_add_days(Days::new(1)).unwrap();
        let slots = service.compute_slots(&provider_id, date).await.unwrap();
        assert_eq!(slots.len(), 16);
    }

    #[tokio::test]
    async fn test_compute_slots_day_off_is_empty() {
        let (service, provider_id) = service_with_provider(0).await;
        let date = Local::now().date_naive().checked_add_days(Days::new(1)).unwrap();
        service
            .schedule
            .clear_day(&provider_id, Weekday::from_date(date))
            .await
            .unwrap();
        let slots = service.compute_slots(&provider_id, date).await.unwrap();
        assert!(slots.is_empty());
    }

    #[tokio::test]
    async fn test_compute_slots_unknown_provider() {
        let (service, _) = service_with_provider(0).await;
        let date = Local::now().date_naive().checked_add_days(Days::new(1)).unwrap();
        let err = service
            .compute_slots(&ProviderId::new(), date)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::ProviderNotFound));
    }

    #[tokio::test]
    async fn test_create_rejects_past_start() {
        let (service, provider_id) = service_with_provider(0).await;
        let yesterday = Local::now().naive_local() - chrono::Duration::days(1);
        let err = service
            .create(request(provider_id, yesterday))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::InvalidTimeRange(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_zero_duration() {
        let (service, provider_id) = service_with_provider(0).await;
        let mut req = request(provider_id, slot_tomorrow(10, 0));
        req.duration_minutes = Some(0);
        let err = service.create(req).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTimeRange(_)));
    }

    #[tokio::test]
    async fn test_create_overlap_conflicts() {
        let (service, provider_id) = service_with_provider(0).await;
        service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        let err = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_booked_slot_disappears_from_computation() {
        let (service, provider_id) = service_with_provider(0).await;
        let start = slot_tomorrow(10, 0);
        service.create(request(provider_id, start)).await.unwrap();

        let slots = service
            .compute_slots(&provider_id, start.date())
            .await
            .unwrap();
        assert_eq!(slots.len(), 15);
        assert!(!slots.iter().any(|s| s.start == start));
    }

    #[tokio::test]
    async fn test_finalize_free_confirms_and_dispatches() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();

        let confirmed = service.finalize(&created.id).await.unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert_eq!(
            confirmed.meeting.as_ref().map(|m| m.external_id.as_str()),
            Some("mtg-1")
        );
        assert_eq!(confirmed.crm_event_id.as_deref(), Some("evt-1"));
        assert_eq!(
            service.effects.confirmed.lock().unwrap().as_slice(),
            &[created.id]
        );
    }

    #[tokio::test]
    async fn test_finalize_paid_gates_on_payment() {
        let (service, provider_id) = service_with_provider(50_000).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();

        let pending = service.finalize(&created.id).await.unwrap();
        assert_eq!(pending.status, ReservationStatus::PaymentPending);
        let payment_ref = pending.payment_ref.clone().unwrap();
        assert!(payment_ref.starts_with(&format!("booking_{}", created.id)));
        assert!(service.effects.confirmed.lock().unwrap().is_empty());

        let confirmed = service
            .record_payment_outcome(&created.id, true, &payment_ref)
            .await
            .unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
        assert_eq!(
            service.effects.confirmed.lock().unwrap().as_slice(),
            &[created.id]
        );
    }

    #[tokio::test]
    async fn test_payment_wrong_ref_is_mismatch() {
        let (service, provider_id) = service_with_provider(50_000).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&created.id).await.unwrap();

        let err = service
            .record_payment_outcome(&created.id, true, "booking_bogus_deadbeef")
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::PaymentMismatch(_)));
    }

    #[tokio::test]
    async fn test_payment_failure_keeps_pending() {
        let (service, provider_id) = service_with_provider(50_000).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        let pending = service.finalize(&created.id).await.unwrap();
        let payment_ref = pending.payment_ref.clone().unwrap();

        let still_pending = service
            .record_payment_outcome(&created.id, false, &payment_ref)
            .await
            .unwrap();
        assert_eq!(still_pending.status, ReservationStatus::PaymentPending);

        // Retry succeeds
        let confirmed = service
            .record_payment_outcome(&created.id, true, &payment_ref)
            .await
            .unwrap();
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_finalize_twice_is_invalid() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&created.id).await.unwrap();

        let err = service.finalize(&created.id).await.unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: ReservationStatus::Confirmed,
                event: "finalize",
            }
        ));
    }

    #[tokio::test]
    async fn test_cancel_releases_interval() {
        let (service, provider_id) = service_with_provider(0).await;
        let start = slot_tomorrow(10, 0);
        let created = service.create(request(provider_id, start)).await.unwrap();

        let cancelled = service.cancel(&created.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(
            service.effects.cancelled.lock().unwrap().as_slice(),
            &[created.id]
        );

        // Slot is bookable again and shows up in computation
        let slots = service
            .compute_slots(&provider_id, start.date())
            .await
            .unwrap();
        assert!(slots.iter().any(|s| s.start == start));
        service.create(request(provider_id, start)).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_confirm_cannot_resurrect_cancelled() {
        let (service, provider_id) = service_with_provider(50_000).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&created.id).await.unwrap();
        service.cancel(&created.id).await.unwrap();

        // A writer still holding the payment_pending snapshot loses the race
        let mut stale = created.clone();
        stale.status = ReservationStatus::Confirmed;
        let err = service
            .reservations
            .update(&stale, ReservationStatus::PaymentPending)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let stored = service.get_reservation(&created.id).await.unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_terminal_is_invalid() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.cancel(&created.id).await.unwrap();

        let err = service.cancel(&created.id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reschedule_moves_confirmed() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&created.id).await.unwrap();

        let moved = service
            .reschedule(&created.id, slot_tomorrow(14, 0), 30)
            .await
            .unwrap();
        assert_eq!(moved.start, slot_tomorrow(14, 0));
        assert_eq!(moved.status, ReservationStatus::Confirmed);
        assert_eq!(
            service.effects.moved.lock().unwrap().as_slice(),
            &[created.id]
        );
    }

    #[tokio::test]
    async fn test_reschedule_conflict_leaves_original() {
        let (service, provider_id) = service_with_provider(0).await;
        let first = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&first.id).await.unwrap();
        let second = service
            .create(request(provider_id, slot_tomorrow(11, 0)))
            .await
            .unwrap();
        service.finalize(&second.id).await.unwrap();

        let err = service
            .reschedule(&second.id, slot_tomorrow(10, 0), 30)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Conflict(_)));

        let unchanged = service.get_reservation(&second.id).await.unwrap();
        assert_eq!(unchanged.start, slot_tomorrow(11, 0));
        assert!(service.effects.moved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_pending_is_invalid() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();

        let err = service
            .reschedule(&created.id, slot_tomorrow(14, 0), 30)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::InvalidTransition {
                from: ReservationStatus::Pending,
                event: "reschedule",
            }
        ));
    }

    #[tokio::test]
    async fn test_complete_before_end_is_invalid() {
        let (service, provider_id) = service_with_provider(0).await;
        let created = service
            .create(request(provider_id, slot_tomorrow(10, 0)))
            .await
            .unwrap();
        service.finalize(&created.id).await.unwrap();

        let err = service.complete(&created.id).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_reservations_for_subject() {
        let (service, provider_id) = service_with_provider(0).await;
        let subject = SubjectId::new();
        let mut req = request(provider_id, slot_tomorrow(10, 0));
        req.subject_id = subject;
        service.create(req).await.unwrap();

        let mine = service.reservations_for_subject(&subject).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(
            service
                .reservations_for_subject(&SubjectId::new())
                .await
                .unwrap()
                .is_empty()
        );
    }

}
