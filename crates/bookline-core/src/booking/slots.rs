//! Slot computation: derive bookable start times for a provider and date.
//!
//! Pure functions only -- the repository wiring lives in
//! [`super::lifecycle::BookingService::compute_slots`]. Candidates are
//! generated at a fixed granularity inside the working-hours range, then
//! every candidate whose interval intersects an active reservation is
//! removed.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use bookline_types::provider::ProviderId;
use bookline_types::reservation::{Reservation, Slot};
use bookline_types::schedule::TimeRange;

/// Two half-open intervals `[a_start, a_end)` and `[b_start, b_end)` intersect
/// iff `max(starts) < min(ends)`.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start.max(b_start) < a_end.min(b_end)
}

/// Bookable slots for one provider on one date.
///
/// Candidates start at `hours.start` and advance in `granularity_minutes`
/// steps; a candidate whose end would pass `hours.end` is excluded. Every
/// candidate overlapping an active reservation's interval is removed. The
/// result is ordered ascending by start time.
pub fn free_slots(
    provider_id: ProviderId,
    date: NaiveDate,
    hours: TimeRange,
    granularity_minutes: u32,
    active: &[Reservation],
) -> Vec<Slot> {
    let step = Duration::minutes(granularity_minutes as i64);
    let day_start = date.and_time(hours.start);
    let day_end = date.and_time(hours.end);

    let mut slots = Vec::new();
    let mut cursor = day_start;
    while cursor + step <= day_end {
        let slot_end = cursor + step;
        let taken = active
            .iter()
            .any(|r| overlaps(cursor, slot_end, r.start, r.end()));
        if !taken {
            slots.push(Slot {
                provider_id,
                start: cursor,
                duration_minutes: granularity_minutes,
            });
        }
        cursor = slot_end;
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookline_types::reservation::{ReservationId, ReservationStatus, SubjectId};
    use chrono::Utc;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        monday().and_hms_opt(h, m, 0).unwrap()
    }

    fn reservation(provider_id: ProviderId, start: NaiveDateTime, minutes: u32) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            provider_id,
            subject_id: SubjectId::new(),
            start,
            duration_minutes: minutes,
            status: ReservationStatus::Confirmed,
            price: 0,
            payment_ref: None,
            meeting: None,
            crm_event_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_overlaps_half_open() {
        // Touching intervals do not overlap
        assert!(!overlaps(at(9, 0), at(9, 30), at(9, 30), at(10, 0)));
        assert!(overlaps(at(9, 0), at(9, 31), at(9, 30), at(10, 0)));
        assert!(overlaps(at(9, 0), at(17, 0), at(10, 0), at(10, 30)));
    }

    #[test]
    fn test_full_day_slot_count() {
        let hours = TimeRange::parse("09:00", "17:00").unwrap();
        let slots = free_slots(ProviderId::new(), monday(), hours, 30, &[]);
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start, at(9, 0));
        assert_eq!(slots[15].start, at(16, 30));
    }

    #[test]
    fn test_slots_ordered_and_disjoint() {
        let hours = TimeRange::parse("09:00", "12:00").unwrap();
        let slots = free_slots(ProviderId::new(), monday(), hours, 30, &[]);
        for pair in slots.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(!overlaps(
                pair[0].start,
                pair[0].end(),
                pair[1].start,
                pair[1].end()
            ));
        }
    }

    #[test]
    fn test_booked_slot_removed() {
        let provider_id = ProviderId::new();
        let hours = TimeRange::parse("09:00", "17:00").unwrap();
        let booked = reservation(provider_id, at(10, 0), 30);
        let slots = free_slots(provider_id, monday(), hours, 30, &[booked]);
        assert_eq!(slots.len(), 15);
        assert!(!slots.iter().any(|s| s.start == at(10, 0)));
        assert!(slots.iter().any(|s| s.start == at(10, 30)));
    }

    #[test]
    fn test_long_reservation_removes_spanned_slots() {
        let provider_id = ProviderId::new();
        let hours = TimeRange::parse("09:00", "12:00").unwrap();
        // 10:00-10:45 blocks both the 10:00 and 10:30 candidates
        let booked = reservation(provider_id, at(10, 0), 45);
        let slots = free_slots(provider_id, monday(), hours, 30, &[booked]);
        assert!(!slots.iter().any(|s| s.start == at(10, 0)));
        assert!(!slots.iter().any(|s| s.start == at(10, 30)));
        assert!(slots.iter().any(|s| s.start == at(11, 0)));
    }

    #[test]
    fn test_partial_slot_beyond_end_excluded() {
        let hours = TimeRange::parse("09:00", "09:50").unwrap();
        let slots = free_slots(ProviderId::new(), monday(), hours, 30, &[]);
        // 09:30 + 30min would pass 09:50
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, at(9, 0));
    }

    #[test]
    fn test_off_grid_reservation_blocks_neighbours() {
        let provider_id = ProviderId::new();
        let hours = TimeRange::parse("09:00", "12:00").unwrap();
        // 09:45-10:15 straddles the 09:30 and 10:00 candidates
        let booked = reservation(provider_id, at(9, 45), 30);
        let slots = free_slots(provider_id, monday(), hours, 30, &[booked]);
        assert!(slots.iter().any(|s| s.start == at(9, 0)));
        assert!(!slots.iter().any(|s| s.start == at(9, 30)));
        assert!(!slots.iter().any(|s| s.start == at(10, 0)));
        assert!(slots.iter().any(|s| s.start == at(10, 30)));
    }
}
