//! Client for polling node-info services

use super::{CallerIpResponse, HealthResponse, NodeIpResponse, NodeTimeResponse};
use crate::error::{Result, SwarmError};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Polls a node-info service at a base URL such as `http://10.0.0.5:8000`
#[derive(Debug, Clone)]
pub struct NodeInfoClient {
    base_url: String,
    http: reqwest::Client,
}

impl NodeInfoClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .no_proxy()
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwarmError::NodeInfo(format!("GET {} returned {}: {}", url, status, body)));
        }

        Ok(response.json().await?)
    }

    /// Whether the service reports itself healthy
    pub async fn health(&self) -> Result<bool> {
        let health: HealthResponse = self.get("/health").await?;
        Ok(health.status == "OK")
    }

    pub async fn node_ip(&self) -> Result<String> {
        let resp: NodeIpResponse = self.get("/get_node_ip").await?;
        Ok(resp.node_ip)
    }

    pub async fn caller_ip(&self) -> Result<String> {
        let resp: CallerIpResponse = self.get("/get_caller_ip").await?;
        Ok(resp.ip)
    }

    /// Node clock in nanoseconds since the Unix epoch
    pub async fn node_time(&self) -> Result<i64> {
        let resp: NodeTimeResponse = self.get("/get_node_time").await?;
        Ok(resp.time)
    }
}
