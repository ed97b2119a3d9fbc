//! Notification sink that writes to the tracing pipeline.
//!
//! Stands in for a chat or email notifier; operators tail the logs.

use bookline_core::booking::effects::NotificationSink;

#[derive(Default, Clone)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    async fn notify(&self, audience: &str, message: &str) {
        tracing::info!(audience, "{message}");
    }
}
