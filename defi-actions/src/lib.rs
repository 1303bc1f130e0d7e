pub mod actions;
pub mod amount;
pub mod contracts;
pub mod error;
pub mod networks;
pub mod token;
pub mod wallet;

pub mod aave;
pub mod vaultsfyi;

pub use actions::{ActionDefinition, ActionProvider, ActionRegistry, ParamSpec};
pub use amount::{AmountSpec, check_amount, from_base_units, to_base_units};
pub use error::{ActionError, ErrorKind, Result};
pub use networks::Network;
pub use vaultsfyi::VaultsFyiConfig;
pub use wallet::{EvmWalletConfig, EvmWalletProvider, TxReceipt, TxRequest, WalletProvider};
