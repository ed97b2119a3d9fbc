use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a service provider, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderId(pub Uuid);

impl ProviderId {
    /// Create a new ProviderId using UUID v7 (time-sortable, guaranteed ordering).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create a ProviderId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProviderId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A schedulable staff entity that subjects book appointments with.
///
/// Providers own a weekly availability table (one optional contiguous
/// working-hours range per weekday) and are referenced by reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    /// Display name shown to booking subjects.
    pub name: String,
    /// Short description for listings.
    pub description: String,
    /// Price per appointment in the smallest currency unit; 0 = free.
    pub price: i64,
    /// Inactive providers are hidden from booking and slot computation.
    pub active: bool,
    /// Opaque owner reference in the external CRM, if linked.
    pub crm_owner_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a provider. Only `name` is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub crm_owner_ref: Option<String>,
}

/// Partial update of a provider's mutable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub active: Option<bool>,
    pub crm_owner_ref: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_display_roundtrip() {
        let id = ProviderId::new();
        let s = id.to_string();
        let parsed: ProviderId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_provider_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<ProviderId>().is_err());
    }

    #[test]
    fn test_create_request_defaults() {
        let req = CreateProviderRequest {
            name: "Dr. Aliyev".to_string(),
            description: None,
            price: None,
            crm_owner_ref: None,
        };
        assert_eq!(req.name, "Dr. Aliyev");
        assert!(req.price.is_none());
    }
}
