//! Static per-network configuration: known EVM networks, Aave V3 markets and
//! their supported assets, and vaults.fyi network names.
//!
//! All tables are immutable and compiled into the binary.

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, Result};

/// The network a wallet is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub protocol_family: String,
    pub network_id: Option<String>,
    pub chain_id: Option<u64>,
}

impl Network {
    /// Build an EVM network from a chain id, filling in the well-known id.
    pub fn from_chain_id(chain_id: u64) -> Self {
        Self {
            protocol_family: "evm".into(),
            network_id: network_id_for_chain(chain_id).map(str::to_string),
            chain_id: Some(chain_id),
        }
    }

    /// Network id, or a descriptive placeholder for error messages.
    pub fn display_id(&self) -> String {
        match (&self.network_id, self.chain_id) {
            (Some(id), _) => id.clone(),
            (None, Some(chain_id)) => format!("chain {chain_id}"),
            (None, None) => "unknown network".into(),
        }
    }

    pub fn is_evm(&self) -> bool {
        self.protocol_family == "evm"
    }
}

const NETWORKS: &[(u64, &str)] = &[
    (1, "ethereum-mainnet"),
    (8453, "base-mainnet"),
    (84532, "base-sepolia"),
    (42161, "arbitrum-mainnet"),
    (10, "optimism-mainnet"),
    (137, "polygon-mainnet"),
];

pub fn network_id_for_chain(chain_id: u64) -> Option<&'static str> {
    NETWORKS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| *name)
}

/// A symbolic asset resolved to its on-chain identity for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetReference {
    pub id: &'static str,
    pub symbol: &'static str,
    pub address: Address,
    pub decimals: u8,
}

/// An Aave V3 deployment on one network.
#[derive(Debug)]
pub struct AaveMarket {
    pub network_id: &'static str,
    pub pool: Address,
    pub assets: &'static [AssetReference],
}

impl AaveMarket {
    pub fn asset(&self, asset_id: &str) -> Result<&AssetReference> {
        let wanted = asset_id.trim().to_ascii_lowercase();
        self.assets
            .iter()
            .find(|a| a.id == wanted)
            .ok_or_else(|| ActionError::UnsupportedAsset {
                asset: asset_id.to_string(),
                network: self.network_id.to_string(),
            })
    }
}

const fn asset(id: &'static str, symbol: &'static str, address: Address, decimals: u8) -> AssetReference {
    AssetReference {
        id,
        symbol,
        address,
        decimals,
    }
}

static ETHEREUM_ASSETS: [AssetReference; 4] = [
    asset("weth", "WETH", address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), 18),
    asset("usdc", "USDC", address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), 6),
    asset("cbeth", "cbETH", address!("0xBe9895146f7AF43049ca1c1AE358B0541Ea49704"), 18),
    asset("wsteth", "wstETH", address!("0x7f39C581F595B53c5cb19bD0b3f8dA6c935E2Ca0"), 18),
];

static BASE_ASSETS: [AssetReference; 4] = [
    asset("weth", "WETH", address!("0x4200000000000000000000000000000000000006"), 18),
    asset("usdc", "USDC", address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"), 6),
    asset("cbeth", "cbETH", address!("0x2Ae3F1Ec7F1F5012CFEab0185bfc7aa3cf0DEc22"), 18),
    asset("wsteth", "wstETH", address!("0xc1CBa3fCea344f92D9239c08C0568f6F2F0ee452"), 18),
];

static BASE_SEPOLIA_ASSETS: [AssetReference; 2] = [
    asset("weth", "WETH", address!("0x4200000000000000000000000000000000000006"), 18),
    asset("usdc", "USDC", address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"), 6),
];

static ARBITRUM_ASSETS: [AssetReference; 3] = [
    asset("weth", "WETH", address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"), 18),
    asset("usdc", "USDC", address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831"), 6),
    asset("wsteth", "wstETH", address!("0x5979D7b546E38E414F7E9822514be443A4800529"), 18),
];

static AAVE_MARKETS: [AaveMarket; 4] = [
    AaveMarket {
        network_id: "ethereum-mainnet",
        pool: address!("0x87870Bca3F3fD6335C3F4ce8392D69350B4fA4E2"),
        assets: &ETHEREUM_ASSETS,
    },
    AaveMarket {
        network_id: "base-mainnet",
        pool: address!("0xA238Dd80C259a72e81d7e4664a9801593F98d1c5"),
        assets: &BASE_ASSETS,
    },
    AaveMarket {
        network_id: "base-sepolia",
        pool: address!("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951"),
        assets: &BASE_SEPOLIA_ASSETS,
    },
    AaveMarket {
        network_id: "arbitrum-mainnet",
        pool: address!("0x794a61358D6845594F94dc1DB02A252b5b4814aD"),
        assets: &ARBITRUM_ASSETS,
    },
];

/// Look up the Aave V3 market for a network.
pub fn aave_market(network: &Network) -> Result<&'static AaveMarket> {
    let id = network
        .network_id
        .as_deref()
        .ok_or_else(|| ActionError::UnsupportedNetwork(network.display_id()))?;
    AAVE_MARKETS
        .iter()
        .find(|m| m.network_id == id)
        .ok_or_else(|| ActionError::UnsupportedNetwork(id.to_string()))
}

pub fn aave_supports(network: &Network) -> bool {
    network.is_evm() && aave_market(network).is_ok()
}

const VAULTSFYI_NETWORKS: &[(&str, &str)] = &[
    ("ethereum-mainnet", "mainnet"),
    ("base-mainnet", "base"),
    ("arbitrum-mainnet", "arbitrum"),
    ("optimism-mainnet", "optimism"),
    ("polygon-mainnet", "polygon"),
];

/// Map a wallet network onto the name vaults.fyi uses for it.
pub fn vaultsfyi_network(network: &Network) -> Result<&'static str> {
    let id = network
        .network_id
        .as_deref()
        .ok_or_else(|| ActionError::UnsupportedNetwork(network.display_id()))?;
    VAULTSFYI_NETWORKS
        .iter()
        .find(|(wallet_id, _)| *wallet_id == id)
        .map(|(_, name)| *name)
        .ok_or_else(|| ActionError::UnsupportedNetwork(id.to_string()))
}

/// Accept either a wallet network id or a vaults.fyi name.
pub fn vaultsfyi_network_name(value: &str) -> Option<&'static str> {
    let value = value.trim().to_ascii_lowercase();
    VAULTSFYI_NETWORKS
        .iter()
        .find(|(id, name)| *id == value || *name == value)
        .map(|(_, name)| *name)
}
