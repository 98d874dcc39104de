//! reqwest-backed Flickr client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::response::parse_search_response;
use super::{ImageFetcher, PhotoSearch, SearchPage, SearchQuery};
use crate::config::TouristConfig;
use crate::error::{Result, TouristError};

/// Flickr REST client.
///
/// Constructed explicitly from a [`TouristConfig`] and passed to whoever
/// needs it; the API key is captured once here.
pub struct FlickrClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl FlickrClient {
    /// Create a new client from the process configuration.
    #[instrument(level = "debug", skip_all, fields(
        api_url = %config.api_url,
        timeout_ms = config.request_timeout.as_millis() as u64
    ))]
    pub fn new(config: &TouristConfig) -> Result<Self> {
        let api_key = config.api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                warn!(error = %e, "Failed to create HTTP client");
                TouristError::Transport(e)
            })?;

        debug!("Flickr client created");
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
        })
    }

    /// Issue a GET and return the body of a 2xx response
    async fn get_bytes(&self, request: reqwest::RequestBuilder) -> Result<Vec<u8>> {
        let start = Instant::now();

        let response = request.send().await.map_err(|e| {
            warn!(
                error = %e,
                latency_ms = start.elapsed().as_millis() as u64,
                "Request failed"
            );
            TouristError::Transport(e)
        })?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        if !status.is_success() {
            warn!(
                status = %status,
                latency_ms = start.elapsed().as_millis() as u64,
                "Non-2xx HTTP status"
            );
            return Err(TouristError::HttpStatus(status));
        }

        let body = response.bytes().await?;
        debug!(
            bytes = body.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request completed successfully"
        );
        Ok(body.to_vec())
    }
}

#[async_trait]
impl PhotoSearch for FlickrClient {
    #[instrument(level = "info", skip(self), fields(page = query.page))]
    async fn search_photos(&self, query: &SearchQuery) -> Result<SearchPage> {
        let request = self
            .client
            .get(&self.api_url)
            .query(&query.to_params(&self.api_key));

        let body = self.get_bytes(request).await?;
        let page = parse_search_response(&body, query.page).map_err(|e| {
            warn!(error = %e, "Unusable search response");
            e
        })?;

        info!(
            photos = page.photos.len(),
            total = ?page.total,
            "Search completed"
        );
        Ok(page)
    }
}

#[async_trait]
impl ImageFetcher for FlickrClient {
    #[instrument(level = "debug", skip(self))]
    async fn download_photo(&self, url: &str) -> Result<Vec<u8>> {
        self.get_bytes(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client() {
        let config = TouristConfig::with_api_key("test-key");
        let client = FlickrClient::new(&config).unwrap();
        assert_eq!(client.api_key, "test-key");
        assert_eq!(client.api_url, crate::config::DEFAULT_API_URL);
    }

    #[test]
    fn test_client_needs_api_key() {
        let config = TouristConfig::without_api_key();
        assert!(matches!(FlickrClient::new(&config), Err(TouristError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let mut config = TouristConfig::with_api_key("test-key");
        config.api_url = "http://127.0.0.1:9/services/rest".into();
        let client = FlickrClient::new(&config).unwrap();

        let result = client.search_photos(&SearchQuery::new(0.0, 0.0, 1)).await;
        assert!(matches!(result, Err(TouristError::Transport(_))));
    }

    // Run with: FLICKR_API_KEY=... cargo test flickr_real_api -- --ignored
    #[tokio::test]
    #[ignore = "requires network access and a Flickr API key"]
    async fn test_flickr_real_api() {
        let config = TouristConfig::from_env().unwrap();
        let client = FlickrClient::new(&config).unwrap();
        let page = client
            .search_photos(&SearchQuery::new(48.8584, 2.2945, 1))
            .await
            .unwrap();
        assert!(page.photos.len() <= 21);
    }
}
