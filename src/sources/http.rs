//! Shared JSON-over-HTTP plumbing for the REST and RDAP sources

use crate::error::SourceError;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Build a client with the source's timeout
pub(crate) fn client(timeout: Duration) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("asn-collector/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SourceError::Fatal(format!("failed to build HTTP client: {e}")))
}

/// GET a JSON document
///
/// `Ok(None)` for "no such object" answers (404), transient errors for
/// throttling and server faults, fatal errors for rejected requests and
/// bodies that are not JSON.
pub(crate) async fn get_json(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<Value>, SourceError> {
    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json, application/rdap+json")
        .send()
        .await?;

    let status = response.status();
    if let Some(outcome) = classify_status(status) {
        return outcome.map(|()| None);
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| SourceError::Fatal(format!("invalid JSON from {url}: {e}")))
}

/// Map a non-success status to its outcome; `None` for success
fn classify_status(status: StatusCode) -> Option<Result<(), SourceError>> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => Ok(()),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => {
            Err(SourceError::Transient(format!("status {status}")))
        }
        s if s.is_server_error() => Err(SourceError::Transient(format!("status {s}"))),
        s => Err(SourceError::Fatal(format!("status {s}"))),
    })
}

/// Follow a path of object keys and array indices
pub(crate) fn pointer_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer)?.as_str()
}

/// Read a field that may be a string or a number
pub(crate) fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
