//! Execution of planner-produced transaction sequences.
//!
//! A plan is requested once, then its steps run strictly in order starting at
//! the planner's cursor. Each step is mined before the next is sent. The first
//! failure stops the run; confirmed steps stay confirmed.

use std::fmt;

use alloy::primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{ActionError, Result};
use crate::wallet::{TxRequest, WalletProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Deposit,
    Redeem,
    Claim,
}

impl Intent {
    /// Path segment of the planning endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            Intent::Deposit => "deposit",
            Intent::Redeem => "redeem",
            Intent::Claim => "claim-rewards",
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Intent::Deposit => "deposit",
            Intent::Redeem => "redeem",
            Intent::Claim => "claim",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Intent::Deposit => "Deposit successful",
            Intent::Redeem => "Redeem successful",
            Intent::Claim => "Claim successful",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequest {
    pub intent: Intent,
    pub sender: Address,
    /// vaults.fyi network name, e.g. `base`.
    pub network: String,
    pub vault_address: Address,
    pub asset_address: Address,
    /// Base units. `None` for claims.
    pub amount: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStep {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub chain_id: Option<u64>,
    pub description: String,
}

impl TransactionStep {
    /// Empty calldata with value attached is a plain transfer.
    pub fn is_native_transfer(&self) -> bool {
        self.data.is_empty() && !self.value.is_zero()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub steps: Vec<TransactionStep>,
    /// Index of the first step still to run.
    pub current_action_index: usize,
}

impl ExecutionPlan {
    pub fn remaining(&self) -> &[TransactionStep] {
        self.steps.get(self.current_action_index..).unwrap_or_default()
    }

    pub fn initial_state(&self) -> PlanState {
        if self.current_action_index >= self.steps.len() {
            PlanState::Done
        } else {
            PlanState::Executing(self.current_action_index)
        }
    }

    /// Convert an upstream plan. A cursor past the last step is malformed.
    pub fn from_api(intent: Intent, plan: ApiPlan) -> Result<Self> {
        let malformed = |message: String| ActionError::PlanningFailed {
            op: intent.verb().to_string(),
            error: "Malformed plan".to_string(),
            message,
        };

        let total = plan.actions.len();
        if plan.current_action_index > total {
            return Err(malformed(format!(
                "currentActionIndex {} exceeds {total} steps",
                plan.current_action_index
            )));
        }

        let steps = plan
            .actions
            .into_iter()
            .enumerate()
            .map(|(i, action)| action.into_step().map_err(|e| malformed(format!("step {}: {e}", i + 1))))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            steps,
            current_action_index: plan.current_action_index,
        })
    }
}

// ── Upstream plan shape ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPlan {
    #[serde(default)]
    pub current_action_index: usize,
    #[serde(default)]
    pub actions: Vec<ApiPlanAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPlanAction {
    pub tx: ApiTx,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTx {
    pub to: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

fn parse_value(value: Option<&serde_json::Value>) -> std::result::Result<U256, String> {
    let text = match value {
        None | Some(serde_json::Value::Null) => return Ok(U256::ZERO),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => return Err(format!("value {other} is not a number")),
    };
    if text.is_empty() {
        return Ok(U256::ZERO);
    }
    text.parse::<U256>()
        .map_err(|e| format!("value '{text}' is not an integer: {e}"))
}

impl ApiPlanAction {
    fn into_step(self) -> std::result::Result<TransactionStep, String> {
        let to = self
            .tx
            .to
            .parse::<Address>()
            .map_err(|e| format!("to '{}': {e}", self.tx.to))?;
        let data = match self.tx.data.as_deref().map(str::trim) {
            None | Some("") | Some("0x") => Bytes::new(),
            Some(data) => hex::decode(data.trim_start_matches("0x"))
                .map(Bytes::from)
                .map_err(|e| format!("data is not hex: {e}"))?,
        };
        let value = parse_value(self.tx.value.as_ref())?;
        Ok(TransactionStep {
            to,
            data,
            value,
            chain_id: self.tx.chain_id,
            description: self.description,
        })
    }
}

/// Source of execution plans.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> Result<ExecutionPlan>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanState {
    Requesting,
    Executing(usize),
    Done,
    Failed { step: usize, reason: String },
}

pub struct PlanExecutor<'a> {
    planner: &'a dyn Planner,
    wallet: &'a dyn WalletProvider,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(planner: &'a dyn Planner, wallet: &'a dyn WalletProvider) -> Self {
        Self { planner, wallet }
    }

    /// Request a plan for `request` and run it to completion.
    pub async fn run(&self, request: &PlanRequest) -> Result<String> {
        debug!(intent = %request.intent, state = ?PlanState::Requesting, "requesting plan");
        let plan = self.planner.plan(request).await?;
        info!(
            intent = %request.intent,
            steps = plan.steps.len(),
            cursor = plan.current_action_index,
            "plan received"
        );
        self.execute(request.intent, &plan).await?;
        Ok(request.intent.success_message().to_string())
    }

    /// Run `plan` from its cursor. Returns the hashes of the steps sent.
    pub async fn execute(&self, intent: Intent, plan: &ExecutionPlan) -> Result<Vec<B256>> {
        let total = plan.steps.len();
        let mut hashes = Vec::with_capacity(plan.remaining().len());
        let mut state = plan.initial_state();

        loop {
            state = match state {
                PlanState::Executing(i) => {
                    let step = &plan.steps[i];
                    debug!(step = i + 1, total, description = %step.description, "executing step");
                    match self.execute_step(step).await {
                        Ok(tx_hash) => {
                            hashes.push(tx_hash);
                            if i + 1 < total {
                                PlanState::Executing(i + 1)
                            } else {
                                PlanState::Done
                            }
                        }
                        Err(reason) => PlanState::Failed { step: i, reason },
                    }
                }
                PlanState::Done => {
                    info!(%intent, sent = hashes.len(), "plan complete");
                    return Ok(hashes);
                }
                PlanState::Failed { step, reason } => {
                    warn!(%intent, step = step + 1, total, "plan step failed: {reason}");
                    return Err(ActionError::StepFailed {
                        op: intent.verb().to_string(),
                        step: step + 1,
                        total,
                        description: plan.steps[step].description.clone(),
                        reason,
                    });
                }
                PlanState::Requesting => {
                    return Err(ActionError::Unexpected(
                        "plan execution started before a plan was received".to_string(),
                    ));
                }
            };
        }
    }

    async fn execute_step(&self, step: &TransactionStep) -> std::result::Result<B256, String> {
        if let (Some(wanted), Some(current)) = (step.chain_id, self.wallet.network().chain_id) {
            if wanted != current {
                return Err(format!(
                    "step targets chain {wanted} but the wallet is on chain {current}"
                ));
            }
        }

        let sent = if step.is_native_transfer() {
            self.wallet.native_transfer(step.to, step.value).await
        } else {
            self.wallet
                .send_transaction(TxRequest {
                    to: step.to,
                    data: step.data.clone(),
                    value: step.value,
                })
                .await
        };
        let tx_hash = sent.map_err(|e| format!("submission failed: {e}"))?;

        let receipt = self
            .wallet
            .wait_for_transaction_receipt(tx_hash)
            .await
            .map_err(|e| format!("{tx_hash}: {e}"))?;
        if !receipt.success {
            return Err(format!("transaction {tx_hash} reverted"));
        }
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn api_plan(value: serde_json::Value) -> ApiPlan {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_plan() {
        let plan = ExecutionPlan::from_api(
            Intent::Deposit,
            api_plan(json!({
                "currentActionIndex": 0,
                "actions": [
                    { "tx": { "to": "0x1111111111111111111111111111111111111111", "data": "0x095ea7b3", "value": "0", "chainId": 8453 }, "description": "Approve USDC" },
                    { "tx": { "to": "0x2222222222222222222222222222222222222222", "data": "0x6e553f65", "chainId": 8453 }, "description": "Deposit" }
                ]
            })),
        )
        .unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].description, "Approve USDC");
        assert_eq!(plan.steps[0].data.len(), 4);
        assert_eq!(plan.steps[1].value, U256::ZERO);
        assert_eq!(plan.steps[1].chain_id, Some(8453));
        assert_eq!(plan.initial_state(), PlanState::Executing(0));
    }

    #[test]
    fn test_native_transfer_step() {
        let plan = ExecutionPlan::from_api(
            Intent::Deposit,
            api_plan(json!({
                "actions": [
                    { "tx": { "to": "0x1111111111111111111111111111111111111111", "data": "0x", "value": "1000" }, "description": "Wrap" }
                ]
            })),
        )
        .unwrap();
        assert!(plan.steps[0].is_native_transfer());
        assert_eq!(plan.steps[0].value, U256::from(1000u64));
    }

    #[test]
    fn test_cursor_at_end_is_done() {
        let plan = ExecutionPlan::from_api(
            Intent::Claim,
            api_plan(json!({
                "currentActionIndex": 1,
                "actions": [
                    { "tx": { "to": "0x1111111111111111111111111111111111111111", "data": "0x01" }, "description": "Claim" }
                ]
            })),
        )
        .unwrap();
        assert_eq!(plan.initial_state(), PlanState::Done);
        assert!(plan.remaining().is_empty());
    }

    #[test]
    fn test_cursor_past_end_rejected() {
        let err = ExecutionPlan::from_api(
            Intent::Redeem,
            api_plan(json!({ "currentActionIndex": 3, "actions": [] })),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("Failed to redeem: Malformed plan"));
    }

    #[test]
    fn test_bad_address_rejected() {
        let err = ExecutionPlan::from_api(
            Intent::Deposit,
            api_plan(json!({ "actions": [ { "tx": { "to": "nope" }, "description": "x" } ] })),
        )
        .unwrap_err();
        assert!(err.to_string().contains("step 1"));
    }

    #[test]
    fn test_hex_value() {
        assert_eq!(parse_value(Some(&json!("0x10"))).unwrap(), U256::from(16u64));
        assert_eq!(parse_value(Some(&json!(5))).unwrap(), U256::from(5u64));
        assert_eq!(parse_value(None).unwrap(), U256::ZERO);
        assert!(parse_value(Some(&json!(true))).is_err());
    }

    #[test]
    fn test_intent_strings() {
        assert_eq!(Intent::Claim.endpoint(), "claim-rewards");
        assert_eq!(Intent::Redeem.success_message(), "Redeem successful");
    }
}
