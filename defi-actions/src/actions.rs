//! Action surface exposed to the host agent framework.
//!
//! Each protocol is an [`ActionProvider`] contributing a fixed set of named
//! actions. The [`ActionRegistry`] is built once at startup and maps every
//! action name to its provider; expected failures come back as text so the
//! agent can read them, and only unexpected faults propagate as `Err`.

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::aave::AaveActionProvider;
use crate::error::{ActionError, Result};
use crate::networks::Network;
use crate::vaultsfyi::{VaultsFyiActionProvider, VaultsFyiConfig};
use crate::wallet::WalletProvider;

/// One declared argument of an action.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// A named operation with its declared argument schema.
#[derive(Debug, Clone, Copy)]
pub struct ActionDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
}

#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Short identifier, e.g. `"aave"`.
    fn id(&self) -> &'static str;

    fn actions(&self) -> &'static [ActionDefinition];

    fn supports_network(&self, network: &Network) -> bool;

    async fn invoke(
        &self,
        action: &str,
        args: serde_json::Value,
        wallet: &dyn WalletProvider,
    ) -> Result<String>;

    /// Text returned to the agent when `action` fails with an expected error.
    fn describe_failure(&self, action: &str, error: &ActionError) -> String {
        format!("Error running {action}: {error}")
    }
}

struct RegisteredAction {
    definition: &'static ActionDefinition,
    provider: Arc<dyn ActionProvider>,
}

/// Registry: map action name → (declared schema, provider).
pub struct ActionRegistry {
    actions: BTreeMap<&'static str, RegisteredAction>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    /// Registry with the Aave and vaults.fyi providers.
    pub fn with_builtins(vaults_config: &VaultsFyiConfig) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(AaveActionProvider::new()))?;
        registry.register(Arc::new(VaultsFyiActionProvider::new(vaults_config)?))?;
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn ActionProvider>) -> Result<()> {
        for definition in provider.actions() {
            if self.actions.contains_key(definition.name) {
                return Err(ActionError::Config(format!(
                    "Action {} registered twice",
                    definition.name
                )));
            }
            self.actions.insert(
                definition.name,
                RegisteredAction {
                    definition,
                    provider: Arc::clone(&provider),
                },
            );
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ActionDefinition> {
        self.actions.get(name).map(|a| a.definition)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values().map(|a| a.definition)
    }

    /// Actions whose provider supports `network`.
    pub fn available_for(&self, network: &Network) -> Vec<&ActionDefinition> {
        self.actions
            .values()
            .filter(|a| a.provider.supports_network(network))
            .map(|a| a.definition)
            .collect()
    }

    /// Run an action by name. Expected failures become `Ok(message)`.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
        wallet: &dyn WalletProvider,
    ) -> Result<String> {
        let Some(entry) = self.actions.get(name) else {
            return Ok(ActionError::UnknownAction(name.to_string()).to_string());
        };

        let network = wallet.network();
        if !entry.provider.supports_network(&network) {
            let err = ActionError::UnsupportedNetwork(network.display_id());
            return Ok(entry.provider.describe_failure(name, &err));
        }

        info!(action = name, provider = entry.provider.id(), "invoking action");
        match entry.provider.invoke(name, args, wallet).await {
            Ok(message) => Ok(message),
            Err(e) if e.is_expected() => {
                warn!(action = name, kind = ?e.kind(), "action failed: {e}");
                Ok(entry.provider.describe_failure(name, &e))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize an action's JSON arguments, treating `null` as `{}`.
pub fn parse_args<T: DeserializeOwned>(action: &str, args: serde_json::Value) -> Result<T> {
    let args = if args.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| ActionError::InvalidArguments(format!("{action}: {e}")))
}

pub fn parse_address(field: &str, value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| ActionError::InvalidArguments(format!("{field} '{value}' is not an address: {e}")))
}

/// Parse an optional address argument, falling back to `default`.
pub fn address_or(field: &str, value: Option<&str>, default: Address) -> Result<Address> {
    value.map_or(Ok(default), |v| parse_address(field, v))
}
