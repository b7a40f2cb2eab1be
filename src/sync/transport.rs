use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::sync::payload::SyncPayload;

/// Delivery seam for the dispatcher. Returns the HTTP status code; `Err`
/// means the request never completed (network failure, teardown).
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        payload: &SyncPayload,
    ) -> Result<u16>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SyncTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        payload: &SyncPayload,
    ) -> Result<u16> {
        let mut request = self.client.post(url).json(payload);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("sync POST to {url} failed"))?;
        Ok(response.status().as_u16())
    }
}
