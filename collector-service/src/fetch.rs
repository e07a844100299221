use std::time::Duration;

use reqwest::Client;
use time::{macros::format_description, Date};

use crate::pipeline::PipelineError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Credentials are only used when both parts are non-empty.
    pub fn from_parts(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        }
    }
}

/// Single-shot HTTP GET client shared by the collectors. No retries: a failed
/// fetch is retried by the next scheduler tick.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Connect(format!("failed to build http client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url` and return the body as text. Non-2xx answers are errors.
    pub async fn get_text(&self, url: &str, auth: Option<&BasicAuth>) -> Result<String, PipelineError> {
        let mut req = self.client.get(url);
        if let Some(auth) = auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PipelineError::Connect(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|e| PipelineError::Connect(format!("reading body from {url} failed: {e}")))
    }
}

/// `{base}/reserve_data?date=YYYYMMDD`.
pub fn reserve_url(base_url: &str, date: Date) -> String {
    let fmt = format_description!("[year][month][day]");
    // Formatting a calendar date with numeric components cannot fail.
    let day = date.format(&fmt).unwrap_or_default();
    format!("{}/reserve_data?date={day}", base_url.trim_end_matches('/'))
}
