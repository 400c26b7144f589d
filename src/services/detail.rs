// src/services/detail.rs

//! Plugin detail fetcher.

use reqwest::Client;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, EndpointConfig, PluginId, PluginRecord};
use crate::utils::http;

/// Resolves plugin ids to full detail records.
#[derive(Clone)]
pub struct DetailFetcher {
    client: Client,
    endpoints: EndpointConfig,
}

impl DetailFetcher {
    pub fn new(config: &Config, client: Client) -> Self {
        Self {
            client,
            endpoints: config.endpoints.clone(),
        }
    }

    /// Fetch one plugin.
    ///
    /// Transport failures and non-200 answers surface as network errors, a
    /// body that is not JSON as a parse error, and a body without
    /// `data._source` as a shape error.
    pub async fn fetch(&self, id: PluginId) -> Result<PluginRecord> {
        let url = self.endpoints.detail_url_for(id);
        let body = http::fetch_text(&self.client, &url).await?;
        let record = parse_detail(&body, &url)?;

        if record.id() != id {
            log::debug!("Detail for {} reports script_id {}", id, record.id());
        }
        Ok(record)
    }
}

/// Extract the record under `data._source` from a detail response body.
pub fn parse_detail(body: &str, context: &str) -> Result<PluginRecord> {
    let mut json: Value = serde_json::from_str(body)?;
    let source = json
        .pointer_mut("/data/_source")
        .map(Value::take)
        .ok_or_else(|| AppError::shape(context, "missing 'data._source'"))?;

    PluginRecord::from_source(source).map_err(|e| AppError::shape(context, e))
}
