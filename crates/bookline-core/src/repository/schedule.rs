//! Weekly schedule repository trait definition.

use bookline_types::error::RepositoryError;
use bookline_types::provider::ProviderId;
use bookline_types::schedule::{TimeRange, Weekday, WeeklyTemplate};

/// Repository trait for per-provider weekly working hours.
///
/// At most one contiguous range exists per (provider, weekday); a missing
/// entry is a day off, not an error.
pub trait ScheduleRepository: Send + Sync {
    /// Working-hours range for one weekday, if the provider works that day.
    fn get_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
    ) -> impl std::future::Future<Output = Result<Option<TimeRange>, RepositoryError>> + Send;

    /// Set (insert or replace) the range for one weekday.
    fn set_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
        range: TimeRange,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Mark one weekday as a day off.
    fn clear_day(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace all seven weekday entries atomically with the template.
    fn apply_template(
        &self,
        provider_id: &ProviderId,
        template: &WeeklyTemplate,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All seven entries for a provider (for admin listing).
    fn week(
        &self,
        provider_id: &ProviderId,
    ) -> impl std::future::Future<Output = Result<WeeklyTemplate, RepositoryError>> + Send;
}
