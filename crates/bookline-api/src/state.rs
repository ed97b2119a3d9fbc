//! Application state wiring all services together.
//!
//! Services are generic over repository/dispatcher traits; AppState pins
//! them to the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bookline_core::booking::effects::CollaboratorDispatcher;
use bookline_core::booking::lifecycle::BookingService;
use bookline_core::catalog::CatalogService;
use bookline_infra::collab::{HttpCalendarService, TracingNotifier, WebhookCrmService};
use bookline_infra::config::{data_dir, load_config};
use bookline_infra::sqlite::pool::DatabasePool;
use bookline_infra::sqlite::provider::SqliteProviderRepository;
use bookline_infra::sqlite::reservation::SqliteReservationRepository;
use bookline_infra::sqlite::schedule::SqliteScheduleRepository;
use bookline_types::config::BooklineConfig;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteDispatcher =
    CollaboratorDispatcher<HttpCalendarService, WebhookCrmService, TracingNotifier>;

pub type ConcreteBookingService = BookingService<
    SqliteProviderRepository,
    SqliteScheduleRepository,
    SqliteReservationRepository,
    ConcreteDispatcher,
>;

pub type ConcreteCatalogService =
    CatalogService<SqliteProviderRepository, SqliteScheduleRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub booking_service: Arc<ConcreteBookingService>,
    pub catalog_service: Arc<ConcreteCatalogService>,
    pub config: Arc<BooklineConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to DB, wire services.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("bookline.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        let timeout = Duration::from_secs(config.collaborators.timeout_secs);
        let calendar = HttpCalendarService::new(
            config.collaborators.calendar_base_url.clone(),
            config.collaborators.calendar_token.clone(),
            timeout,
        )
        .map_err(|e| anyhow::anyhow!("calendar client: {e}"))?;
        let crm = WebhookCrmService::new(config.collaborators.crm_webhook_url.clone(), timeout)
            .map_err(|e| anyhow::anyhow!("CRM client: {e}"))?;
        let dispatcher =
            CollaboratorDispatcher::new(calendar, crm, TracingNotifier::default(), timeout);

        let booking_service = BookingService::new(
            SqliteProviderRepository::new(db_pool.clone()),
            SqliteScheduleRepository::new(db_pool.clone()),
            SqliteReservationRepository::new(db_pool.clone()),
            dispatcher,
            config.booking.slot_granularity_minutes,
        );

        // The catalog service gets its own repository instances; they share
        // the underlying pool.
        let catalog_service = CatalogService::new(
            SqliteProviderRepository::new(db_pool.clone()),
            SqliteScheduleRepository::new(db_pool.clone()),
        );

        Ok(Self {
            booking_service: Arc::new(booking_service),
            catalog_service: Arc::new(catalog_service),
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}
