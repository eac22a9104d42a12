//! HTTP client for the organization lookup provider.

use std::time::Duration;

use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    query::LookupQuery,
    types::{OrganizationRecord, Response},
    Error,
};

/// Default request timeout for lookups.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the organization lookup provider.
///
/// The underlying `reqwest::Client` is built once and reused; every request
/// carries the configured timeout so a slow provider cannot stall callers.
pub struct Client {
    client: reqwest::Client,
    /// Base URL for the API. Defaults to `https://kb.firmlink.org/v1`.
    base_api_url: String,
    api_key: Option<String>,
}

impl Client {
    /// Creates a client pointing at the default provider.
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url("https://kb.firmlink.org/v1")
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        Self::with_base_url_and_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and request timeout.
    pub fn with_base_url_and_timeout(base_url: &str, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                Error::RequestFailed
            })?;
        Ok(Self {
            client,
            base_api_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    /// Attaches an API key, sent as a bearer token.
    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }

    fn get_url(&self, path: &str, query: Option<&LookupQuery>) -> Result<Url, Error> {
        let url = Url::parse(format!("{}{}", &self.base_api_url, path).as_str()).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::RequestFailed
        })?;
        Ok(match query {
            Some(query) => query.add_to_url(&url),
            None => url,
        })
    }

    /// Performs a GET request. A 404 maps to `Ok(None)`.
    async fn get<T>(&self, path: &str, query: Option<&LookupQuery>) -> Result<Option<T>, Error>
    where
        T: DeserializeOwned,
    {
        let url = self.get_url(path, query)?;
        let mut request = self
            .client
            .get(url)
            .header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::warn!("Lookup timed out: {}", e);
                Error::Timeout
            } else {
                tracing::error!("Failed to get resource: {}", e);
                Error::RequestFailed
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                tracing::error!("Failed to read response body: {}", e);
                Error::RequestFailed
            }
        })?;

        if !status.is_success() {
            let snippet = truncate_body(&body);
            tracing::error!("Request failed with status {}: {}", status, snippet);
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let parsed = serde_json::from_str::<T>(&body).map_err(|e| {
            let snippet = truncate_body(&body);
            tracing::error!("Failed to parse resource: {} | body: {}", e, snippet);
            Error::RequestFailed
        })?;

        Ok(Some(parsed))
    }

    /// Looks up a single organization. Returns `Ok(None)` when the provider
    /// has no record for the query.
    pub async fn lookup_organization(
        &self,
        query: &LookupQuery,
    ) -> Result<Option<OrganizationRecord>, Error> {
        if query.is_empty() {
            return Ok(None);
        }
        let resp = self
            .get::<Response<OrganizationRecord>>("/organizations/lookup", Some(query))
            .await?;
        Ok(resp.map(|r| r.data))
    }

    /// Fetches a single organization by provider id.
    pub async fn get_organization(&self, id: &str) -> Result<Option<OrganizationRecord>, Error> {
        let resp = self
            .get::<Response<OrganizationRecord>>(format!("/organizations/{}", id).as_str(), None)
            .await?;
        Ok(resp.map(|r| r.data))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
    }

    #[test]
    fn truncate_cuts_long_bodies_on_char_boundary() {
        let body = "é".repeat(1500);
        let out = truncate_body(&body);
        assert!(out.ends_with("...[truncated]"));
        assert!(out.len() <= 2000 + "...[truncated]".len());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = Client::with_base_url("http://localhost:9999/v1/").unwrap();
        let url = client.get_url("/organizations/Q95", None).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9999/v1/organizations/Q95");
    }
}
