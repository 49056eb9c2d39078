//! Balance reads via JSON-RPC
//!
//! Read-only chain queries backing the pre-trade checks: collateral
//! balance/allowance (ERC-20) and outcome token balance (ERC-1155). The
//! client is constructed once at process start and passed by reference, so
//! tests can point it at a mock endpoint.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use forkast_core::{format_micro, CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Polygon RPC endpoint
const DEFAULT_RPC_URL: &str = "https://polygon-rpc.com";

/// Per-request timeout; transport failures surface without retry
const RPC_TIMEOUT: Duration = Duration::from_secs(8);

sol! {
    function balanceOf(address account) external view returns (uint256);
    function allowance(address owner, address spender) external view returns (uint256);
}

// ERC-1155 balanceOf has a different arity; separate module avoids the
// name conflict with the ERC-20 version.
mod erc1155_abi {
    alloy::sol! {
        function balanceOf(address account, uint256 id) external view returns (uint256);
    }
}

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    params: Vec<serde_json::Value>,
    id: u64,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// Chain read client, injected wherever balance checks are needed
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url: url.into(),
        }
    }

    /// Client for the endpoint named by FORKAST_RPC_URL, defaulting to the
    /// public Polygon endpoint
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var("FORKAST_RPC_URL").unwrap_or_else(|_| DEFAULT_RPC_URL.to_string());
        Self::new(url)
    }

    /// Raw eth_call against a contract
    async fn eth_call(&self, to: Address, calldata: &[u8]) -> CoreResult<U256> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method: "eth_call",
            params: vec![
                serde_json::json!({
                    "to": format!("{:?}", to),
                    "data": format!("0x{}", hex::encode(calldata)),
                }),
                serde_json::json!("latest"),
            ],
            id: 1,
        };

        debug!("eth_call to {:?}, {} calldata bytes", to, calldata.len());

        let response = self.client.post(&self.url).json(&request).send().await?;
        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(CoreError::api(format!("RPC error: {}", error.message)));
        }

        let result = rpc_response
            .result
            .ok_or_else(|| CoreError::protocol("No result in RPC response"))?;
        let hex_str = result.strip_prefix("0x").unwrap_or(&result);
        if hex_str.is_empty() {
            return Ok(U256::ZERO);
        }
        U256::from_str_radix(hex_str, 16)
            .map_err(|e| CoreError::protocol(format!("Failed to parse eth_call result: {}", e)))
    }

    /// ERC-20 balance of `owner` on `token`, in raw units
    pub async fn erc20_balance(&self, token: Address, owner: Address) -> CoreResult<U256> {
        let call = balanceOfCall { account: owner };
        self.eth_call(token, &call.abi_encode()).await
    }

    /// ERC-20 allowance granted by `owner` to `spender` on `token`
    pub async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> CoreResult<U256> {
        let call = allowanceCall { owner, spender };
        self.eth_call(token, &call.abi_encode()).await
    }

    /// ERC-1155 balance of `owner` for one outcome token id
    pub async fn erc1155_balance(
        &self,
        contract: Address,
        owner: Address,
        token_id: U256,
    ) -> CoreResult<U256> {
        let call = erc1155_abi::balanceOfCall {
            account: owner,
            id: token_id,
        };
        self.eth_call(contract, &call.abi_encode()).await
    }
}

/// Verify the wallet holds enough shares to cover a sell
///
/// Both quantities are micro-units. Fails with a user-facing message when
/// the requested amount exceeds the held balance by even one micro-unit.
pub fn ensure_shares_available(balance: U256, requested: U256) -> CoreResult<()> {
    if requested > balance {
        return Err(CoreError::validation(format!(
            "Insufficient shares available: have {}, need {}",
            format_micro(balance.try_into().unwrap_or(u128::MAX)),
            format_micro(requested.try_into().unwrap_or(u128::MAX)),
        )));
    }
    Ok(())
}
