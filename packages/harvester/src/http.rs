//! HTTP client wrapper for the listing site and the law search APIs.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};

use crate::config::{listing_url, Category, FTC_BASE_URL, HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::error::{HarvesterError, Result};

/// Create a configured HTTP client.
///
/// Sends browser-like headers with a Korean language preference and the
/// first listing page as referer.
pub fn create_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    if let Ok(first) = Category::new(1) {
        if let Ok(referer) = HeaderValue::from_str(&listing_url(FTC_BASE_URL, first)) {
            headers.insert(REFERER, referer);
        }
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Fetch a URL and return the body as text.
///
/// Non-success statuses are reported as [`HarvesterError::Status`]. There
/// is no retry: callers degrade to sentinel values instead.
pub fn download_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(HarvesterError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let client = create_client();
        assert!(client.is_ok());
    }
}
