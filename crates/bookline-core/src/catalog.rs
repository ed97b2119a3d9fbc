//! Provider catalog administration: CRUD over providers and their weekly
//! working hours.
//!
//! Kept separate from [`crate::booking::lifecycle::BookingService`] so the
//! booking path never carries admin-only dependencies.

use chrono::Utc;
use tracing::info;

use bookline_types::error::BookingError;
use bookline_types::provider::{CreateProviderRequest, Provider, ProviderId, UpdateProviderRequest};
use bookline_types::schedule::{TimeRange, Weekday, WeeklyTemplate};

use crate::repository::provider::ProviderRepository;
use crate::repository::schedule::ScheduleRepository;

pub struct CatalogService<P, S> {
    providers: P,
    schedule: S,
}

impl<P, S> CatalogService<P, S>
where
    P: ProviderRepository,
    S: ScheduleRepository,
{
    pub fn new(providers: P, schedule: S) -> Self {
        Self { providers, schedule }
    }

    /// Register a provider and seed its schedule with the default weekday
    /// template.
    pub async fn create_provider(
        &self,
        request: CreateProviderRequest,
    ) -> Result<Provider, BookingError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(BookingError::Validation("provider name is empty".to_string()));
        }
        let price = request.price.unwrap_or(0);
        if price < 0 {
            return Err(BookingError::Validation("price must not be negative".to_string()));
        }

        let now = Utc::now();
        let provider = Provider {
            id: ProviderId::new(),
            name: name.to_string(),
            description: request.description.unwrap_or_default(),
            price,
            active: true,
            crm_owner_ref: request.crm_owner_ref,
            created_at: now,
            updated_at: now,
        };
        let created = self.providers.create(&provider).await.map_err(map_repo)?;

        self.schedule
            .apply_template(&created.id, &WeeklyTemplate::default())
            .await
            .map_err(map_repo)?;
        info!(provider = %created.id, name = %created.name, "provider registered");
        Ok(created)
    }

    pub async fn get_provider(&self, id: &ProviderId) -> Result<Provider, BookingError> {
        self.providers
            .get_by_id(id)
            .await
            .map_err(map_repo)?
            .ok_or(BookingError::ProviderNotFound)
    }

    /// List providers, optionally restricted to active ones.
    pub async fn list_providers(&self, active_only: bool) -> Result<Vec<Provider>, BookingError> {
        self.providers.list(active_only).await.map_err(map_repo)
    }

    /// Apply a partial update. Absent fields keep their stored values.
    pub async fn update_provider(
        &self,
        id: &ProviderId,
        request: UpdateProviderRequest,
    ) -> Result<Provider, BookingError> {
        let mut provider = self.get_provider(id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(BookingError::Validation("provider name is empty".to_string()));
            }
            provider.name = name;
        }
        if let Some(description) = request.description {
            provider.description = description;
        }
        if let Some(price) = request.price {
            if price < 0 {
                return Err(BookingError::Validation("price must not be negative".to_string()));
            }
            provider.price = price;
        }
        if let Some(active) = request.active {
            provider.active = active;
        }
        if let Some(crm_owner_ref) = request.crm_owner_ref {
            provider.crm_owner_ref = Some(crm_owner_ref);
        }
        provider.updated_at = Utc::now();

        self.providers.update(&provider).await.map_err(map_repo)
    }

    /// Full weekly schedule for a provider, days off as `None`.
    pub async fn weekly_schedule(
        &self,
        provider_id: &ProviderId,
    ) -> Result<WeeklyTemplate, BookingError> {
        self.get_provider(provider_id).await?;
        self.schedule.week(provider_id).await.map_err(map_repo)
    }

    /// Set working hours for one weekday.
    ///
    /// Existing reservations outside the new hours stay booked; only future
    /// slot computation changes.
    pub async fn set_working_hours(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
        range: TimeRange,
    ) -> Result<(), BookingError> {
        self.get_provider(provider_id).await?;
        self.schedule
            .set_day(provider_id, weekday, range)
            .await
            .map_err(map_repo)
    }

    /// Mark one weekday as a day off.
    pub async fn clear_working_hours(
        &self,
        provider_id: &ProviderId,
        weekday: Weekday,
    ) -> Result<(), BookingError> {
        self.get_provider(provider_id).await?;
        self.schedule
            .clear_day(provider_id, weekday)
            .await
            .map_err(map_repo)
    }

    /// Replace the whole week atomically with a template.
    pub async fn apply_weekly_template(
        &self,
        provider_id: &ProviderId,
        template: &WeeklyTemplate,
    ) -> Result<(), BookingError> {
        self.get_provider(provider_id).await?;
        self.schedule
            .apply_template(provider_id, template)
            .await
            .map_err(map_repo)
    }
}

fn map_repo(err: bookline_types::error::RepositoryError) -> BookingError {
    use bookline_types::error::RepositoryError;
    match err {
        RepositoryError::Conflict(msg) => BookingError::Conflict(msg),
        RepositoryError::NotFound => BookingError::ProviderNotFound,
        other => BookingError::Storage(other.to_string()),
    }
}
