//! Provider catalog repository trait definition.

use bookline_types::error::RepositoryError;
use bookline_types::provider::{Provider, ProviderId};

/// Repository trait for provider persistence.
///
/// Implementations live in bookline-infra (e.g., SqliteProviderRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ProviderRepository: Send + Sync {
    /// Create a new provider. Returns the created provider.
    fn create(
        &self,
        provider: &Provider,
    ) -> impl std::future::Future<Output = Result<Provider, RepositoryError>> + Send;

    /// Get a provider by its unique ID.
    fn get_by_id(
        &self,
        id: &ProviderId,
    ) -> impl std::future::Future<Output = Result<Option<Provider>, RepositoryError>> + Send;

    /// List providers, optionally restricted to active ones, ordered by name.
    fn list(
        &self,
        active_only: bool,
    ) -> impl std::future::Future<Output = Result<Vec<Provider>, RepositoryError>> + Send;

    /// Update an existing provider. Returns the updated provider.
    fn update(
        &self,
        provider: &Provider,
    ) -> impl std::future::Future<Output = Result<Provider, RepositoryError>> + Send;
}
