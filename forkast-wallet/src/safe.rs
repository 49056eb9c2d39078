//! Safe transaction hashing and owner signature packing
//!
//! The proxy wallet verifies one EIP-712 signature from its single owner.
//! The typed data covers the aggregated call plus fixed zero gas fields;
//! those zeros travel with the relay submission verbatim because they are
//! part of what was signed.

use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use forkast_core::{CoreError, CoreResult};
use serde::Serialize;

use crate::calls::CallDescriptor;

// The struct MUST be named "SafeTx" for the correct EIP-712 type hash.
sol! {
    #[derive(Debug)]
    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}

/// EIP-712 domain for the proxy wallet
///
/// The wallet's domain carries only chain id and verifying contract, no
/// name or version.
pub fn wallet_domain(chain_id: u64, wallet: Address) -> Eip712Domain {
    Eip712Domain {
        name: None,
        version: None,
        chain_id: Some(U256::from(chain_id)),
        verifying_contract: Some(wallet),
        salt: None,
    }
}

/// The fixed gas fields the relay must receive exactly as signed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureParams {
    pub gas_price: String,
    pub operation: String,
    pub safe_txn_gas: String,
    pub base_gas: String,
    pub gas_token: String,
    pub refund_receiver: String,
}

impl SignatureParams {
    /// Params for a call descriptor; everything but the operation kind is
    /// zero in this deployment
    pub fn for_call(call: &CallDescriptor) -> Self {
        Self {
            gas_price: "0".to_string(),
            operation: call.kind.as_u8().to_string(),
            safe_txn_gas: "0".to_string(),
            base_gas: "0".to_string(),
            gas_token: format!("{:?}", Address::ZERO),
            refund_receiver: format!("{:?}", Address::ZERO),
        }
    }
}

/// Compute the EIP-712 signing hash for a wallet transaction
///
/// The nonce must be fetched fresh from the relay immediately before
/// calling this; a reused nonce makes the signature unusable.
pub fn safe_tx_signing_hash(
    chain_id: u64,
    wallet: Address,
    call: &CallDescriptor,
    nonce: U256,
) -> B256 {
    let tx = SafeTx {
        to: call.to,
        value: call.value,
        data: call.data.clone().into(),
        operation: call.kind.as_u8(),
        safeTxGas: U256::ZERO,
        baseGas: U256::ZERO,
        gasPrice: U256::ZERO,
        gasToken: Address::ZERO,
        refundReceiver: Address::ZERO,
        nonce,
    };

    let domain = wallet_domain(chain_id, wallet);
    tx.eip712_signing_hash(&domain)
}

/// Pack a raw 65-byte ECDSA signature into the wallet's layout
///
/// The wallet expects `r(32) ‖ s(32) ‖ v'(1)` where v' marks an eth_sign
/// style owner signature: recovery ids 0/1 become 31/32 and canonical
/// 27/28 become 31/32. Any other v means the wrong signer or digest was
/// used upstream and is fatal.
pub fn pack_signature(raw: &[u8; 65]) -> CoreResult<[u8; 65]> {
    let v = raw[64];
    let packed_v = match v {
        0 | 1 => v + 31,
        27 | 28 => v + 4,
        other => {
            return Err(CoreError::protocol(format!(
                "Invalid signature recovery id: {}",
                other
            )))
        }
    };

    let mut packed = *raw;
    packed[64] = packed_v;
    Ok(packed)
}

/// Recover the canonical 27/28 recovery id from a packed signature
///
/// Inverse of [`pack_signature`]; both input branches collapse onto the
/// same packed values, so recovery always yields the 27/28 form.
pub fn unpack_signature(packed: &[u8; 65]) -> CoreResult<[u8; 65]> {
    let v = packed[64];
    let raw_v = match v {
        31 | 32 => v - 4,
        other => {
            return Err(CoreError::protocol(format!(
                "Invalid packed signature v: {}",
                other
            )))
        }
    };

    let mut raw = *packed;
    raw[64] = raw_v;
    Ok(raw)
}
