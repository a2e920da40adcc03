use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;

use crate::config::DashboardConfig;
use crate::snapshot::SessionSnapshot;

const SESSIONS_PATH: &str = "/api/admin/sessions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("API host not configured")]
    HostNotConfigured,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Admits one sessions request at a time and tags it, so a result that
/// arrives after [`FetchGate::invalidate`] can be told apart and dropped.
#[derive(Debug, Default)]
pub struct FetchGate {
    epoch: u64,
    in_flight: bool,
}

impl FetchGate {
    /// Start a request unless one is already running. Returns its tag.
    pub fn begin(&mut self) -> Option<u64> {
        if self.in_flight {
            return None;
        }
        self.in_flight = true;
        Some(self.epoch)
    }

    /// A result tagged `epoch` arrived. False when it was invalidated.
    pub fn finish(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.in_flight = false;
        true
    }

    /// Disown the running request, if any, and reopen the gate.
    pub fn invalidate(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.in_flight = false;
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Full URL of the sessions endpoint.
pub fn sessions_url(config: &DashboardConfig) -> Result<String, FetchError> {
    let host = config.host().ok_or(FetchError::HostNotConfigured)?;
    Ok(format!("{host}{SESSIONS_PATH}"))
}

/// Attach `Authorization: Bearer <token>` when a credential is present.
pub fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Fetch the full session array. Blocking; call off the UI thread.
pub fn fetch_sessions(
    config: &DashboardConfig,
    token: Option<&str>,
) -> Result<Vec<SessionSnapshot>, FetchError> {
    let url = sessions_url(config)?;
    tracing::debug!("fetching sessions from {url}");
    let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let response = authorize(client.get(&url), token).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let body = response.text()?;
    let snapshots = parse_sessions(&body)?;
    tracing::info!("fetched {} session(s)", snapshots.len());
    Ok(snapshots)
}

/// Decode the response body. A non-array body counts as an empty list.
pub fn parse_sessions(body: &str) -> Result<Vec<SessionSnapshot>, FetchError> {
    let value: Value = serde_json::from_str(body)?;
    let items = match value {
        Value::Array(items) => items,
        other => {
            tracing::warn!("sessions response is not an array ({})", type_name(&other));
            Vec::new()
        }
    };
    Ok(items.into_iter().map(SessionSnapshot::from_value).collect())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
