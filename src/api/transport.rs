use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, error};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::http::pool::create_http_client;
use crate::utils::time::elapsed_ms;

#[async_trait]
pub trait DocumentTransport: Send + Sync {
    /// Deliver an already-encoded document. Any non-2xx answer is an error.
    async fn send(&self, body: String, signature: &str) -> Result<()>;
}

/// Posts documents to the remote create-document endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    authorization: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = create_http_client(config)?;
        Ok(Self::with_client(client, config.api_url.clone(), &config.token))
    }

    pub fn with_client(client: Client, url: String, token: &str) -> Self {
        Self {
            client,
            url,
            authorization: format!("Bearer {}", token.trim()),
        }
    }
}

#[async_trait]
impl DocumentTransport for HttpTransport {
    async fn send(&self, body: String, signature: &str) -> Result<()> {
        let start = tokio::time::Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, &self.authorization)
            .header("Signature", signature)
            .body(body)
            .send()
            .await
            .map_err(AppError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to create document: {} {}", status.as_u16(), body);
            return Err(AppError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!("Document accepted in {}ms", elapsed_ms(start));
        Ok(())
    }
}
