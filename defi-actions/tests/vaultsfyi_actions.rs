//! vaults.fyi actions against a wiremock API and the recording wallet.

mod common;

use alloy::primitives::{Address, U256};
use common::MockWallet;
use defi_actions::contracts::IERC20;
use defi_actions::{ActionRegistry, VaultsFyiConfig, WalletProvider};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE: u64 = 8453;

fn vault_address() -> Address {
    Address::repeat_byte(0x11)
}

fn asset_address() -> Address {
    Address::repeat_byte(0x22)
}

fn registry(server: &MockServer) -> ActionRegistry {
    let config = VaultsFyiConfig {
        base_url: server.uri(),
        api_key: Some("test-key".into()),
        ..VaultsFyiConfig::default()
    };
    ActionRegistry::with_builtins(&config).unwrap()
}

/// Wallet on Base holding a 6-decimal asset.
fn wallet() -> MockWallet {
    let wallet = MockWallet::new(BASE);
    wallet.on_read_value::<IERC20::decimalsCall, _>(asset_address(), 6u16);
    wallet.on_read_value::<IERC20::decimalsCall, _>(vault_address(), 18u16);
    wallet.on_read_value::<IERC20::balanceOfCall, _>(vault_address(), U256::from(5u64));
    wallet
}

fn step(to: Address, data: &str, value: &str, chain_id: u64, description: &str) -> Value {
    json!({
        "tx": { "to": to.to_string(), "data": data, "value": value, "chainId": chain_id },
        "description": description
    })
}

async fn mount_plan(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/transactions/vaults/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn deposit_args(amount: &str) -> Value {
    json!({
        "vault_address": vault_address().to_string(),
        "asset_address": asset_address().to_string(),
        "amount": amount
    })
}

fn vault_record(name: &str, tvl: f64, apy_bps: f64) -> Value {
    json!({
        "name": name,
        "address": format!("0x{:0>40}", name.len()),
        "network": "base",
        "protocol": "morpho",
        "tvlDetailed": { "tvlUsd": tvl.to_string() },
        "token": { "name": "USD Coin", "assetAddress": "0xusdc", "symbol": "USDC", "decimals": 6 },
        "apy": { "base": { "7day": apy_bps }, "total": { "7day": apy_bps } },
        "isTransactional": true
    })
}

#[tokio::test]
async fn test_vault_listing_sorted_and_truncated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/detailed/vaults"))
        .and(query_param("network", "base"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                vault_record("Small", 10.0, 900.0),
                vault_record("Largest", 3000.0, 100.0),
                vault_record("Middle", 500.0, 400.0),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = registry(&server)
        .invoke(
            "vaultsfyi_vaults",
            json!({"network": "base-mainnet", "sort": "tvl", "take": 2}),
            &wallet(),
        )
        .await
        .unwrap();

    let listing: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(listing["totalResults"], 3);
    assert_eq!(listing["nextPage"], true);
    let names: Vec<_> = listing["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, ["Largest", "Middle"]);
    assert_eq!(listing["results"][0]["tvlInUsd"], 3000.0);
    assert!(listing["results"][0].get("isTransactional").is_none());
    assert!(
        listing["results"][0]["link"]
            .as_str()
            .unwrap()
            .starts_with("https://app.vaults.fyi/opportunity/base/0x")
    );
}

#[tokio::test]
async fn test_planning_failure_surfaces_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/vaults/deposit"))
        .and(query_param("amount", "1500000"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Bad Request",
            "message": "Vault is not accepting deposits"
        })))
        .mount(&server)
        .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("1.5"), &wallet)
        .await
        .unwrap();

    assert_eq!(out, "Failed to deposit: Bad Request, Vault is not accepting deposits");
    assert!(wallet.sent().is_empty());
}

#[tokio::test]
async fn test_deposit_runs_every_step_in_order() {
    let server = MockServer::start().await;
    mount_plan(
        &server,
        "deposit",
        json!({
            "currentActionIndex": 0,
            "actions": [
                step(asset_address(), "0x095ea7b3", "0", BASE, "Approve USDC"),
                step(vault_address(), "0x6e553f65", "0", BASE, "Deposit into vault"),
            ]
        }),
    )
    .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("2"), &wallet)
        .await
        .unwrap();

    assert_eq!(out, "Deposit successful");
    let sent = wallet.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, asset_address());
    assert_eq!(sent[1].to, vault_address());
}

#[tokio::test]
async fn test_failed_step_stops_the_plan() {
    let server = MockServer::start().await;
    let third = Address::repeat_byte(0x33);
    mount_plan(
        &server,
        "deposit",
        json!({
            "currentActionIndex": 0,
            "actions": [
                step(asset_address(), "0x095ea7b3", "0", BASE, "Approve USDC"),
                step(vault_address(), "0x6e553f65", "0", BASE, "Deposit into vault"),
                step(third, "0x01", "0", BASE, "Stake shares"),
            ]
        }),
    )
    .await;
    let wallet = wallet();
    wallet.revert_sends_to(vault_address());

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("2"), &wallet)
        .await
        .unwrap();

    assert!(
        out.starts_with("Failed to deposit: step 2 of 3 (Deposit into vault) failed: transaction 0x"),
        "{out}"
    );
    assert!(out.ends_with("reverted"));
    let sent = wallet.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, asset_address());
    assert_eq!(sent[1].to, vault_address());
}

#[tokio::test]
async fn test_redeem_resumes_from_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/transactions/vaults/redeem"))
        .and(query_param("amount", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "currentActionIndex": 1,
            "actions": [
                step(vault_address(), "0x01", "0", BASE, "Already done"),
                step(vault_address(), "0xba087652", "0", BASE, "Redeem shares"),
            ]
        })))
        .mount(&server)
        .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_redeem", deposit_args("max"), &wallet)
        .await
        .unwrap();

    assert_eq!(out, "Redeem successful");
    let sent = wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0].data[..], &[0xba, 0x08, 0x76, 0x52]);
}

#[tokio::test]
async fn test_chain_mismatch_fails_before_submission() {
    let server = MockServer::start().await;
    mount_plan(
        &server,
        "deposit",
        json!({
            "currentActionIndex": 0,
            "actions": [ step(vault_address(), "0x6e553f65", "0", 1, "Deposit into vault") ]
        }),
    )
    .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("1"), &wallet)
        .await
        .unwrap();

    assert_eq!(
        out,
        "Failed to deposit: step 1 of 1 (Deposit into vault) failed: step targets chain 1 but the wallet is on chain 8453"
    );
    assert!(wallet.sent().is_empty());
}

#[tokio::test]
async fn test_native_value_step_uses_transfer() {
    let server = MockServer::start().await;
    mount_plan(
        &server,
        "deposit",
        json!({
            "currentActionIndex": 0,
            "actions": [
                step(asset_address(), "0x", "1000", BASE, "Wrap ETH"),
                step(vault_address(), "0x6e553f65", "0", BASE, "Deposit into vault"),
            ]
        }),
    )
    .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("1"), &wallet)
        .await
        .unwrap();

    assert_eq!(out, "Deposit successful");
    assert_eq!(wallet.native_transfers(), vec![(asset_address(), U256::from(1000u64))]);
    assert_eq!(wallet.sent().len(), 1);
}

#[tokio::test]
async fn test_claim_with_completed_plan_sends_nothing() {
    let server = MockServer::start().await;
    mount_plan(
        &server,
        "claim-rewards",
        json!({
            "currentActionIndex": 1,
            "actions": [ step(vault_address(), "0x01", "0", BASE, "Claim") ]
        }),
    )
    .await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke(
            "vaultsfyi_claim",
            json!({
                "vault_address": vault_address().to_string(),
                "asset_address": asset_address().to_string()
            }),
            &wallet,
        )
        .await
        .unwrap();

    assert_eq!(out, "Claim successful");
    assert!(wallet.sent().is_empty());
}

#[tokio::test]
async fn test_deposit_unsupported_network() {
    let server = MockServer::start().await;
    let wallet = MockWallet::new(84532);

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("1"), &wallet)
        .await
        .unwrap();

    assert_eq!(out, "Failed to deposit: Network base-sepolia is not supported");
    assert!(wallet.log().is_empty());
}

#[tokio::test]
async fn test_positions_rescaled() {
    let server = MockServer::start().await;
    let wallet = wallet();
    Mock::given(method("GET"))
        .and(path(format!("/portfolio/positions/{}", wallet.address())))
        .and(query_param("network", "base"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "vaultName": "Steakhouse USDC",
                "vaultAddress": vault_address().to_string(),
                "network": "base",
                "asset": { "name": "USD Coin", "assetAddress": asset_address().to_string(), "symbol": "USDC", "decimals": 6 },
                "balanceNative": "20099",
                "balanceLp": "19500",
                "balanceUsd": 0.02,
                "apy": { "base": 450, "rewards": 50, "total": 500 }
            }]
        })))
        .mount(&server)
        .await;

    let out = registry(&server)
        .invoke("vaultsfyi_positions", json!({}), &wallet)
        .await
        .unwrap();

    let positions: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(positions[0]["name"], "Steakhouse USDC");
    assert_eq!(positions[0]["underlyingTokenBalance"], "0.020099");
    assert_eq!(positions[0]["lpTokenBalance"], "0.0195");
    assert_eq!(positions[0]["apy"]["total"], 5.0);
}

#[tokio::test]
async fn test_idle_assets_rescaled() {
    let server = MockServer::start().await;
    let wallet = wallet();
    Mock::given(method("GET"))
        .and(path(format!("/portfolio/idle-assets/{}", wallet.address())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "address": asset_address().to_string(),
                "name": "USD Coin",
                "symbol": "USDC",
                "decimals": 6,
                "network": "base",
                "balanceNative": "1250000",
                "balanceUsd": "1.25"
            }]
        })))
        .mount(&server)
        .await;

    let out = registry(&server)
        .invoke("vaultsfyi_idle_assets", Value::Null, &wallet)
        .await
        .unwrap();

    let assets: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(assets[0]["balance"], "1.25");
    assert_eq!(assets[0]["usdValue"], 1.25);
}

#[tokio::test]
async fn test_malformed_amount_rejected_before_any_read() {
    let server = MockServer::start().await;
    let wallet = wallet();

    let out = registry(&server)
        .invoke("vaultsfyi_deposit", deposit_args("abc"), &wallet)
        .await
        .unwrap();

    assert!(out.starts_with("Failed to deposit:"), "{out}");
    assert!(out.contains("abc is not a number"), "{out}");
    assert_eq!(wallet.read_count(), 0);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
