//! Shared HTTP plumbing for the catalog clients.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;

use crate::error::CatalogError;
use crate::retry::retry_with_backoff;

const USER_AGENT: &str = "recfuse/0.1 (recommendations)";
const BACKOFF_BASE_MS: u64 = 200;

/// Connection settings common to every catalog client.
#[derive(Debug, Clone)]
pub struct CatalogHttpConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct CatalogHttp {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl CatalogHttp {
    pub(crate) fn new(config: &CatalogHttpConfig) -> Result<Self, CatalogError> {
        let trimmed = config.base_url.trim_end_matches('/');
        Url::parse(trimmed).map_err(|e| {
            CatalogError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            max_retries: config.max_retries,
        })
    }

    /// GET `path` relative to the base URL and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        headers: &[(&'static str, String)],
        context: &str,
    ) -> Result<T, CatalogError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let url = url.as_str();
        let bytes = retry_with_backoff(self.max_retries, BACKOFF_BASE_MS, || {
            let mut request = self.client.get(url).query(query);
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }
            async move {
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(CatalogError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.to_owned(),
                    });
                }
                Ok(response.bytes().await?)
            }
        })
        .await?;

        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Deserialize {
            context: context.to_owned(),
            source,
        })
    }
}
