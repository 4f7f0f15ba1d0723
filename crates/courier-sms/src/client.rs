// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use courier_core::{CourierError, SenderError};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

use crate::SmsChannelConfig;

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Minimal client for `POST /2010-04-01/Accounts/{sid}/Messages.json`.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
}

impl TwilioClient {
    pub fn new(timeout: Duration) -> Result<Self, CourierError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Sends one message and returns its Twilio SID.
    pub async fn send(
        &self,
        config: &SmsChannelConfig,
        to: &str,
        body: &str,
    ) -> Result<String, SenderError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base_url.trim_end_matches('/'),
            config.account_sid
        );
        let fields = [("To", to), ("From", config.from.as_str()), ("Body", body)];
        let form = serde_urlencoded::to_string(fields)
            .map_err(|e| SenderError::internal(format!("encode sms form: {e}")))?;

        let response = self
            .http
            .post(&url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form)
            .send()
            .await
            .map_err(|e| classify_request_error(&e))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(status = %status, "twilio response received");

        if !status.is_success() {
            let details = match serde_json::from_str::<ApiError>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("twilio error {code}: {}", err.message),
                    None => format!("twilio error: {}", err.message),
                },
                Err(_) => format!("twilio returned {status}"),
            };
            return Err(SenderError::from_http_status(status.as_u16(), details));
        }

        serde_json::from_str::<MessageResource>(&text)
            .map(|m| m.sid)
            .map_err(|e| SenderError::unknown(format!("unexpected twilio response: {e}")))
    }
}

fn classify_request_error(err: &reqwest::Error) -> SenderError {
    if err.is_timeout() {
        SenderError::timeout(format!("twilio request timed out: {err}"))
    } else if err.is_connect() || err.is_request() {
        SenderError::transport(format!("twilio unreachable: {err}"))
    } else {
        SenderError::unknown(format!("twilio request failed: {err}"))
    }
}
