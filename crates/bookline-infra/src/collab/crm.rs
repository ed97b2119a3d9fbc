//! CRM webhook client.
//!
//! Talks to a CRM's inbound-webhook REST API: `{webhook}/calendar.event.add`
//! creates a calendar event on the owner's account, `{webhook}/calendar.event.update`
//! moves one. Responses carry a `result` field on success and an `error`
//! field on rejection, both with HTTP 200.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use bookline_core::booking::effects::CrmService;
use bookline_types::error::CollaboratorError;

use super::WIRE_TIME_FMT;

pub struct WebhookCrmService {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

#[derive(Serialize)]
struct CreateEventBody {
    #[serde(rename = "type")]
    owner_type: &'static str,
    #[serde(rename = "ownerId")]
    owner_id: String,
    name: String,
    #[serde(rename = "dateFrom")]
    date_from: String,
    #[serde(rename = "dateTo")]
    date_to: String,
    description: String,
}

#[derive(Serialize)]
struct UpdateEventBody {
    id: String,
    #[serde(rename = "dateFrom")]
    date_from: String,
    #[serde(rename = "dateTo")]
    date_to: String,
}

#[derive(Deserialize)]
struct CrmResponse {
    result: Option<serde_json::Value>,
    error: Option<String>,
}

impl WebhookCrmService {
    pub fn new(
        webhook_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Http(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url,
        })
    }

    fn webhook(&self) -> Result<&str, CollaboratorError> {
        self.webhook_url.as_deref().ok_or_else(|| {
            CollaboratorError::Unconfigured("CRM webhook URL missing".to_string())
        })
    }

    async fn post<B: Serialize>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<serde_json::Value, CollaboratorError> {
        let webhook = self.webhook()?;

        let response = self
            .client
            .post(format!("{webhook}/{method}"))
            .json(body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Rejected(format!(
                "HTTP {status}: {error_body}"
            )));
        }

        let parsed: CrmResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Http(format!("invalid response: {e}")))?;

        match (parsed.result, parsed.error) {
            (Some(result), _) => Ok(result),
            (None, Some(error)) => Err(CollaboratorError::Rejected(error)),
            (None, None) => Err(CollaboratorError::Rejected(
                "empty CRM response".to_string(),
            )),
        }
    }
}

fn interval_strings(start: NaiveDateTime, duration_minutes: u32) -> (String, String) {
    let end = start + chrono::Duration::minutes(duration_minutes as i64);
    (
        start.format(WIRE_TIME_FMT).to_string(),
        end.format(WIRE_TIME_FMT).to_string(),
    )
}

impl CrmService for WebhookCrmService {
    async fn create_event(
        &self,
        owner_ref: &str,
        title: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
        description: &str,
    ) -> Result<String, CollaboratorError> {
        let (date_from, date_to) = interval_strings(start, duration_minutes);
        let body = CreateEventBody {
            owner_type: "user",
            owner_id: owner_ref.to_string(),
            name: title.to_string(),
            date_from,
            date_to,
            description: description.to_string(),
        };

        let result = self.post("calendar.event.add", &body).await?;
        let event_id = match result {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(event_id)
    }

    async fn update_event(
        &self,
        external_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<(), CollaboratorError> {
        let (date_from, date_to) = interval_strings(start, duration_minutes);
        let body = UpdateEventBody {
            id: external_id.to_string(),
            date_from,
            date_to,
        };

        self.post("calendar.event.update", &body).await?;
        Ok(())
    }
}
