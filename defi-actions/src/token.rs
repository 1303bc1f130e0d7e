//! ERC-20 reads and the approve-before-spend helper.

use alloy::primitives::{Address, B256, U256};
use tracing::info;

use crate::contracts::IERC20;
use crate::error::{ActionError, Result};
use crate::wallet::{TxRequest, WalletProvider, read_call, submit_and_confirm};

pub async fn decimals(wallet: &dyn WalletProvider, token: Address) -> Result<u8> {
    read_call(wallet, token, IERC20::decimalsCall {}).await
}

pub async fn balance_of(wallet: &dyn WalletProvider, token: Address, account: Address) -> Result<U256> {
    read_call(wallet, token, IERC20::balanceOfCall { account }).await
}

/// Fails with [`ActionError::InsufficientAllowance`] when `spender` may move
/// less than `amount` of `owner`'s tokens.
pub async fn check_allowance(
    wallet: &dyn WalletProvider,
    token: Address,
    owner: Address,
    spender: Address,
    amount: U256,
) -> Result<()> {
    let have = read_call(wallet, token, IERC20::allowanceCall { owner, spender }).await?;
    if have < amount {
        return Err(ActionError::InsufficientAllowance {
            have: have.to_string(),
            need: amount.to_string(),
        });
    }
    Ok(())
}

/// Approve `spender` for exactly `amount` when the current allowance is short.
/// Returns the approval hash if one was sent; the approval is mined before
/// this returns.
pub async fn ensure_allowance(
    wallet: &dyn WalletProvider,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<Option<B256>> {
    let owner = wallet.address();
    match check_allowance(wallet, token, owner, spender, amount).await {
        Ok(()) => Ok(None),
        Err(ActionError::InsufficientAllowance { have, need }) => {
            info!(%token, %spender, %have, %need, "approving token spend");
            let call = IERC20::approveCall { spender, amount };
            let tx_hash = submit_and_confirm(wallet, TxRequest::call(token, &call), "approve").await?;
            Ok(Some(tx_hash))
        }
        Err(e) => Err(e),
    }
}
