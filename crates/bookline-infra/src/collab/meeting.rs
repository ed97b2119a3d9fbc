//! Meeting platform client.
//!
//! Creates and moves scheduled video meetings over a bearer-token REST API:
//! `POST {base}/meetings` to create, `PATCH {base}/meetings/{id}` to move.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use bookline_core::booking::effects::CalendarService;
use bookline_types::error::CollaboratorError;
use bookline_types::reservation::MeetingRef;

use super::WIRE_TIME_FMT;

pub struct HttpCalendarService {
    client: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
}

#[derive(Serialize)]
struct CreateMeetingBody {
    topic: String,
    start_time: String,
    duration: u32,
}

#[derive(Serialize)]
struct UpdateMeetingBody {
    start_time: String,
    duration: u32,
}

#[derive(Deserialize)]
struct MeetingResponse {
    id: serde_json::Value,
    join_url: String,
}

impl HttpCalendarService {
    pub fn new(
        base_url: Option<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self) -> Result<(&str, &str), CollaboratorError> {
        match (self.base_url.as_deref(), self.token.as_deref()) {
            (Some(base), Some(token)) => Ok((base, token)),
            _ => Err(CollaboratorError::Unconfigured(
                "calendar base URL or token missing".to_string(),
            )),
        }
    }
}

impl CalendarService for HttpCalendarService {
    async fn create_meeting(
        &self,
        topic: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<MeetingRef, CollaboratorError> {
        let (base, token) = self.endpoint()?;

        let body = CreateMeetingBody {
            topic: topic.to_string(),
            start_time: start.format(WIRE_TIME_FMT).to_string(),
            duration: duration_minutes,
        };

        let response = self
            .client
            .post(format!("{base}/meetings"))
            .bearer_auth(token)
            .json(&body)
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

        let meeting: MeetingResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Http(format!("invalid response: {e}")))?;

        // The platform returns numeric ids; keep them opaque strings
        let external_id = match meeting.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        Ok(MeetingRef {
            external_id,
            join_url: meeting.join_url,
        })
    }

    async fn update_meeting(
        &self,
        external_id: &str,
        start: NaiveDateTime,
        duration_minutes: u32,
    ) -> Result<(), CollaboratorError> {
        let (base, token) = self.endpoint()?;

        let body = UpdateMeetingBody {
            start_time: start.format(WIRE_TIME_FMT).to_string(),
            duration: duration_minutes,
        };

        let response = self
            .client
            .patch(format!("{base}/meetings/{external_id}"))
            .bearer_auth(token)
            .json(&body)
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

        Ok(())
    }
}
