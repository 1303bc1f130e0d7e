//! Operator CLI for the DeFi action providers.
//!
//! Connects an alloy-backed wallet from `RPC_URL`, `PRIVATE_KEY` and
//! `CHAIN_ID` (a `.env` file is loaded first), then lists the actions
//! available on that chain or invokes one by name with JSON arguments.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use defi_actions::{
    ActionDefinition, ActionRegistry, EvmWalletConfig, EvmWalletProvider, Network, VaultsFyiConfig,
    WalletProvider,
};

#[derive(Parser, Debug)]
#[command(name = "defi-actions", version, about = "Run Aave and vaults.fyi actions from the command line")]
struct Cli {
    /// JSON-RPC endpoint of the chain
    #[arg(long, env = "RPC_URL", global = true)]
    rpc_url: Option<String>,

    /// Hex private key of the signing wallet
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true, global = true)]
    private_key: Option<String>,

    #[arg(long, env = "CHAIN_ID", default_value_t = 8453, global = true)]
    chain_id: u64,

    /// Seconds to wait for a transaction receipt
    #[arg(long, env = "RECEIPT_TIMEOUT_SECS", default_value_t = 120, global = true)]
    receipt_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the actions available on the configured chain
    List {
        /// Include actions whose provider does not support the chain
        #[arg(long)]
        all: bool,
    },
    /// Invoke one action and print its result
    Invoke {
        /// Action name, e.g. aave_supply
        action: String,
        /// JSON object of arguments
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_log();

    let cli = Cli::parse();
    let registry = ActionRegistry::with_builtins(&VaultsFyiConfig::from_env()?)?;

    match &cli.command {
        Command::List { all } => {
            let network = Network::from_chain_id(cli.chain_id);
            let definitions: Vec<&ActionDefinition> = if *all {
                registry.definitions().collect()
            } else {
                registry.available_for(&network)
            };
            tracing::debug!(network = %network.display_id(), count = definitions.len(), "listing actions");
            for definition in definitions {
                println!("{}", render_definition(definition));
            }
        }
        Command::Invoke { action, args } => {
            let args: serde_json::Value =
                serde_json::from_str(args).with_context(|| format!("arguments for {action} are not JSON"))?;
            let wallet = connect_wallet(&cli).await?;
            tracing::info!(address = %wallet.address(), chain_id = cli.chain_id, %action, "invoking");
            let output = registry.invoke(action, args, &wallet).await?;
            println!("{output}");
        }
    }

    Ok(())
}

async fn connect_wallet(cli: &Cli) -> Result<EvmWalletProvider> {
    let (Some(rpc_url), Some(private_key)) = (&cli.rpc_url, &cli.private_key) else {
        bail!("RPC_URL and PRIVATE_KEY must be set to invoke actions");
    };
    let mut config = EvmWalletConfig::new(rpc_url, private_key, cli.chain_id);
    config.receipt_timeout = Duration::from_secs(cli.receipt_timeout_secs);

    let wallet = EvmWalletProvider::new(&config)?;
    wallet
        .verify_chain()
        .await
        .context("RPC endpoint check failed")?;
    Ok(wallet)
}

fn render_definition(definition: &ActionDefinition) -> String {
    let mut out = format!("{}\n    {}", definition.name, definition.description);
    for param in definition.params {
        let marker = if param.required { "" } else { " (optional)" };
        out.push_str(&format!("\n    --  {}{marker}: {}", param.name, param.description));
    }
    out
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};
    if tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_invoke_defaults_to_empty_args() {
        let cli = Cli::try_parse_from(["defi-actions", "--chain-id", "1", "invoke", "aave_portfolio"]).unwrap();
        assert_eq!(cli.chain_id, 1);
        match cli.command {
            Command::Invoke { action, args } => {
                assert_eq!(action, "aave_portfolio");
                assert_eq!(args, "{}");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_render_definition() {
        let registry = ActionRegistry::with_builtins(&VaultsFyiConfig::default()).unwrap();
        let text = render_definition(registry.get("aave_withdraw").unwrap());
        assert!(text.starts_with("aave_withdraw\n"));
        assert!(text.contains("to (optional)"));
    }
}
