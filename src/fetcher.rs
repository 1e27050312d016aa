use crate::{Config, CrawlerError};
use tokio::sync::Semaphore;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client shared by all concurrent tasks of a run. The semaphore caps
/// the number of simultaneous outbound requests.
pub struct Fetcher {
    client: reqwest::Client,
    semaphore: Semaphore,
    max_retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &Config) -> Result<Fetcher, CrawlerError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Fetcher {
            client,
            semaphore: Semaphore::new(config.max_in_flight),
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    /// Fetch `url` and return the response body. Network and non-2xx
    /// protocol errors are retried with a fixed delay until the retry
    /// budget runs out, then surfaced as `RetriesExhausted`.
    pub async fn fetch(&self, url: &str) -> Result<String, CrawlerError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("fetch semaphore closed");

        let mut remaining = self.max_retries;
        loop {
            match self.get(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if remaining == 0 {
                        warn!("[fail] {}: {}", url, e);
                        return Err(CrawlerError::RetriesExhausted {
                            url: url.to_string(),
                            source: e,
                        });
                    }
                    debug!("[retry {}] {}: {}", remaining, url, e);
                    tokio::time::sleep(self.retry_delay).await;
                    remaining -= 1;
                }
            }
        }
    }

    async fn get(&self, url: &str) -> Result<String, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let response = response.error_for_status()?;
        let body = response.text().await?;
        info!("[done] {} {}", url, status);
        Ok(body)
    }
}
