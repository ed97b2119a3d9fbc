//! HTTP clients for external collaborators.
//!
//! Each client implements a trait from `bookline_core::booking::effects` and
//! degrades to `CollaboratorError::Unconfigured` when its endpoint is absent
//! from the config, so a bare deployment runs without any collaborators.

pub mod crm;
pub mod meeting;
pub mod notify;

pub use crm::WebhookCrmService;
pub use meeting::HttpCalendarService;
pub use notify::TracingNotifier;

/// Wire format for interval timestamps sent to collaborators.
pub(crate) const WIRE_TIME_FMT: &str = "%Y-%m-%dT%H:%M:%S";
