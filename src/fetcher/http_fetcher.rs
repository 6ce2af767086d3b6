use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::app::{BonusError, Result};
use crate::fetcher::Fetcher;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("bonusvarsler/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BonusError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn check_url_blocked(&self, url: &str) -> bool {
        // Any HTTP status means the request left the machine.
        match self.client.head(url).send().await {
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(url, error = %e, "Probe request failed");
                true
            }
        }
    }
}
