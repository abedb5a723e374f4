use async_trait::async_trait;
use futures::Stream;
use futures::TryStreamExt;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use thiserror::Error;
use tracing::debug;

use super::models::SyncConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(u16),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Where the course catalog HTML comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_catalog(&self) -> Result<String>;
}

/// Plain HTTP access to the portal, authenticated by the configured session cookie.
#[derive(Clone)]
pub struct PortalClient {
    config: SyncConfig,
    client: Client,
}

impl PortalClient {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.config.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    /// Start downloading a file, returning (total_size, body stream).
    pub async fn download_file_stream(
        &self,
        download_url: &str,
    ) -> Result<(Option<u64>, impl Stream<Item = Result<bytes::Bytes>>)> {
        let response = self.get(download_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let total_size = response.content_length();
        let stream = response.bytes_stream().map_err(ApiError::RequestError);

        Ok((total_size, stream))
    }
}

#[async_trait]
impl CatalogSource for PortalClient {
    /// Fetch the raw HTML of the course catalog page.
    async fn fetch_catalog(&self) -> Result<String> {
        let url = self.config.catalog_url();
        debug!("Fetching course catalog: {}", url);

        let response = self.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}
