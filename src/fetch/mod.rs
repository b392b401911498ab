//! Forecast acquisition.
//!
//! [`HttpClient`] is the transport seam, [`ForecastSource`] the per-city
//! contract the pipeline runs against, and [`UrlSource`] the implementation
//! backed by the city list.

mod basic;
mod client;
mod source;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use source::{ForecastSource, UrlSource};

use crate::error::FetchError;
use crate::forecast::{ForecastDocument, parse_forecast};

/// Performs a GET and returns the body.
///
/// # Errors
///
/// [`FetchError::SourceUnavailable`] on an unparsable URL, a transport
/// failure, or a non-success status.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>, FetchError> {
    let url = url
        .parse::<reqwest::Url>()
        .map_err(|e| FetchError::SourceUnavailable(format!("invalid URL {url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, url);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::SourceUnavailable(format!(
            "{} returned status {}",
            resp.url(),
            status
        )));
    }
    Ok(resp.bytes().await?.to_vec())
}

/// Loads a forecast document from a URL (`http`/`https`) or a local file path.
#[tracing::instrument(skip(client))]
pub async fn load_forecast<C: HttpClient>(
    client: &C,
    location: &str,
) -> Result<ForecastDocument, FetchError> {
    let bytes = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_bytes(client, location).await?
    } else {
        tokio::fs::read(location)
            .await
            .map_err(|e| FetchError::SourceUnavailable(format!("cannot read {location}: {e}")))?
    };
    tracing::debug!(bytes = bytes.len(), "Forecast bytes received, parsing");
    parse_forecast(&bytes)
}
