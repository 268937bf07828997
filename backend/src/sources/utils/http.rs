use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::sources::SourceError;

pub const USER_AGENT: &str = "CapCompare/1.0";

/// Send `request` and decode a JSON body, mapping transport, status and
/// decode failures onto [`SourceError`].
pub async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, source: &str) -> Result<T, SourceError> {
    let response = request.header("User-Agent", USER_AGENT).send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        debug!("{} returned 404", source);
        return Err(SourceError::NotFound(format!("{} returned 404", source)));
    }
    if !status.is_success() {
        error!("❌ {} API error: Status {}", source, status);
        return Err(SourceError::Unavailable(format!("{} returned status {}", source, status)));
    }

    let body = response.text().await?;
    if body.trim().is_empty() {
        return Err(SourceError::SchemaMismatch(format!("Empty response from {}", source)));
    }

    serde_json::from_str(&body).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        SourceError::SchemaMismatch(format!("Failed to parse {} response: {} - Response: {}", source, e, preview))
    })
}
