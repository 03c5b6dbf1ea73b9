// src/utils/http.rs

//! HTTP client utilities.

use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Create a configured asynchronous HTTP client.
///
/// The timeout applies to every request made through the client.
pub fn create_async_client(config: &SourceConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// GET a URL and return the body of a 2xx response.
///
/// Any other status is reported as [`AppError::Status`]; nothing is retried.
pub async fn fetch_bytes(client: &Client, url: Url) -> Result<Vec<u8>> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::status(url.as_str(), status.as_u16()));
    }
    Ok(response.bytes().await?.to_vec())
}
