//! Identity status oracle.
//!
//! Statuses come from a node's JSON-RPC endpoint when one is configured, with
//! the public indexer as fallback. Lookups never fail from the caller's point
//! of view: anything that cannot be resolved is [`IdentityStatus::Undefined`].

use std::sync::Arc;

use async_trait::async_trait;
use rolegate_db::{Address, IdentityStatus};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::TtlCache;
use crate::config::OracleConfig;
use crate::http::rolegate_reqwest_client;

/// Source of identity statuses used by the reconciliation engine.
#[async_trait]
pub trait IdentityOracle: Send + Sync {
    /// Current status of `address`. Never fails.
    async fn get_status(&self, address: &Address) -> IdentityStatus;
}

#[derive(Debug, Error)]
pub(crate) enum LookupError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("oracle reported an error: {0}")]
    Remote(String),
}

/// Extract `result.state` from a `{"result": ..}` / `{"error": ..}` envelope.
///
/// Both the node and the indexer answer in this shape.
pub(crate) fn parse_envelope(body: &str) -> Result<String, LookupError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| LookupError::Malformed(e.to_string()))?;

    match value.get("error") {
        None | Some(Value::Null) => {}
        Some(error) => {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(LookupError::Remote(message));
        }
    }

    value
        .get("result")
        .and_then(|result| result.get("state"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| LookupError::Malformed("missing result.state".to_string()))
}

/// HTTP-backed [`IdentityOracle`] with a per-address status cache.
#[derive(Debug, Clone)]
pub struct OracleClient {
    http: reqwest::Client,
    rpc_url: Option<String>,
    rpc_key: Option<String>,
    fallback_url: String,
    cache: Arc<TtlCache<Address, IdentityStatus>>,
}

impl OracleClient {
    pub fn new(
        http: reqwest::Client,
        rpc_url: Option<String>,
        rpc_key: Option<String>,
        fallback_url: impl Into<String>,
        cache: Arc<TtlCache<Address, IdentityStatus>>,
    ) -> Self {
        Self {
            http,
            rpc_url,
            rpc_key,
            fallback_url: fallback_url.into(),
            cache,
        }
    }

    pub fn from_config(config: &OracleConfig) -> reqwest::Result<Self> {
        Ok(Self::new(
            rolegate_reqwest_client(config.timeout())?,
            config.rpc_url.clone(),
            config.rpc_key.clone(),
            config.fallback_url.clone(),
            Arc::new(TtlCache::new(config.cache_ttl())),
        ))
    }

    pub fn cache(&self) -> &Arc<TtlCache<Address, IdentityStatus>> {
        &self.cache
    }

    async fn lookup(&self, address: &Address) -> Result<IdentityStatus, LookupError> {
        if let Some(rpc_url) = &self.rpc_url {
            match self.lookup_node(rpc_url, address).await {
                Ok(state) => return Ok(IdentityStatus::normalize(&state)),
                Err(e) => debug!("Node lookup for {} failed, using indexer: {}", address, e),
            }
        }

        match self.lookup_indexer(address).await {
            Ok(state) => Ok(IdentityStatus::normalize(&state)),
            Err(LookupError::Remote(message)) => {
                debug!("Indexer has no identity for {}: {}", address, message);
                Ok(IdentityStatus::Undefined)
            }
            Err(e) => Err(e),
        }
    }

    async fn lookup_node(&self, rpc_url: &str, address: &Address) -> Result<String, LookupError> {
        let request = json!({
            "method": "dna_identity",
            "params": [address.as_str()],
            "id": 1,
            "key": self.rpc_key.as_deref().unwrap_or_default(),
        });

        let response = self.http.post(rpc_url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }
        parse_envelope(&response.text().await?)
    }

    async fn lookup_indexer(&self, address: &Address) -> Result<String, LookupError> {
        let url = format!(
            "{}/api/Identity/{}",
            self.fallback_url.trim_end_matches('/'),
            address
        );

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // the indexer may pair an error envelope with a 4xx
        match parse_envelope(&body) {
            Err(LookupError::Malformed(_)) if !status.is_success() => {
                Err(LookupError::Status(status))
            }
            other => other,
        }
    }
}

#[async_trait]
impl IdentityOracle for OracleClient {
    async fn get_status(&self, address: &Address) -> IdentityStatus {
        if let Some(status) = self.cache.get(address) {
            return status;
        }

        match self.lookup(address).await {
            Ok(status) => {
                debug!("Identity {} is {}", address, status.as_str());
                self.cache.insert(address.clone(), status);
                status
            }
            Err(e) => {
                warn!("Identity oracle unavailable for {}: {}", address, e);
                IdentityStatus::Undefined
            }
        }
    }
}
