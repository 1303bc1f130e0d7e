use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::VaultsFyiConfig;
use super::normalize::{ApiIdleAsset, ApiList, ApiPosition, ApiVault};
use super::plan::{ApiPlan, ExecutionPlan, PlanRequest, Planner};
use crate::error::{ActionError, Result};

const PER_PAGE: &str = "250";

/// Error body returned with non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Listing filters passed through as query parameters.
#[derive(Debug, Clone, Default)]
pub struct VaultFilter {
    pub network: Option<String>,
    pub token: Option<String>,
    pub protocol: Option<String>,
    pub min_tvl: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct VaultsFyiClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl VaultsFyiClient {
    pub fn new(config: &VaultsFyiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ActionError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            client,
        })
    }

    /// GET `path`; non-2xx responses become "Failed to {op}: {error}, {message}".
    async fn get<T: DeserializeOwned>(
        &self,
        op: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, op, "vaults.fyi request");

        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: ApiErrorBody = response.json().await.unwrap_or_default();
            return Err(ActionError::PlanningFailed {
                op: op.to_string(),
                error: body
                    .error
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_else(|| status.as_u16().to_string()),
                message: body.message.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn list_vaults(&self, filter: &VaultFilter) -> Result<Vec<ApiVault>> {
        let mut query = vec![("per_page", PER_PAGE.to_string())];
        if let Some(network) = &filter.network {
            query.push(("network", network.clone()));
        }
        if let Some(token) = &filter.token {
            query.push(("token", token.clone()));
        }
        if let Some(protocol) = &filter.protocol {
            query.push(("protocol", protocol.clone()));
        }
        if let Some(min_tvl) = filter.min_tvl {
            query.push(("tvl_min", min_tvl.to_string()));
        }
        let list: ApiList<ApiVault> = self.get("fetch vaults", "/detailed/vaults", &query).await?;
        Ok(list.data)
    }

    pub async fn vault(&self, network: &str, vault: Address) -> Result<ApiVault> {
        self.get(
            "fetch vault details",
            &format!("/vaults/{network}/{vault}"),
            &[],
        )
        .await
    }

    pub async fn positions(&self, user: Address, network: Option<&str>) -> Result<Vec<ApiPosition>> {
        let query: Vec<(&str, String)> = network
            .map(|n| vec![("network", n.to_string())])
            .unwrap_or_default();
        let list: ApiList<ApiPosition> = self
            .get("fetch positions", &format!("/portfolio/positions/{user}"), &query)
            .await?;
        Ok(list.data)
    }

    pub async fn idle_assets(&self, user: Address) -> Result<Vec<ApiIdleAsset>> {
        let list: ApiList<ApiIdleAsset> = self
            .get("fetch idle assets", &format!("/portfolio/idle-assets/{user}"), &[])
            .await?;
        Ok(list.data)
    }
}

#[async_trait]
impl Planner for VaultsFyiClient {
    async fn plan(&self, request: &PlanRequest) -> Result<ExecutionPlan> {
        let mut query = vec![
            ("sender", request.sender.to_string()),
            ("network", request.network.clone()),
            ("vault_address", request.vault_address.to_string()),
            ("asset_address", request.asset_address.to_string()),
        ];
        if let Some(amount) = request.amount {
            query.push(("amount", amount.to_string()));
        }
        let plan: ApiPlan = self
            .get(
                request.intent.verb(),
                &format!("/transactions/vaults/{}", request.intent.endpoint()),
                &query,
            )
            .await?;
        ExecutionPlan::from_api(request.intent, plan)
    }
}
