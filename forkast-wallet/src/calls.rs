//! Call encoding for proxy wallet operations
//!
//! Each operation maps to exactly one target contract from the registry and
//! ABI-encodes into a canonical call descriptor. Inputs are validated up
//! front; no partial encoding is ever emitted.

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use forkast_core::{CoreError, CoreResult};

use crate::registry::ContractRegistry;

// Contract function signatures for ABI encoding
sol! {
    function approve(address spender, uint256 amount);

    function setApprovalForAll(address operator, bool approved);

    function transfer(address to, uint256 amount);

    function setReferral(address referrer);

    function splitPosition(
        address collateralToken,
        bytes32 parentCollectionId,
        bytes32 conditionId,
        uint256[] partition,
        uint256 amount
    );

    function mergePositions(
        address collateralToken,
        bytes32 parentCollectionId,
        bytes32 conditionId,
        uint256[] partition,
        uint256 amount
    );

    function redeemPositions(
        address collateralToken,
        bytes32 parentCollectionId,
        bytes32 conditionId,
        uint256[] indexSets
    );
}

/// How the wallet executes a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CallKind {
    Call = 0,
    DelegateCall = 1,
}

impl CallKind {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Canonical on-chain call descriptor
///
/// Created once per operation and consumed by aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub kind: CallKind,
}

/// A proxy wallet operation, pre-validation
#[derive(Debug, Clone)]
pub enum ProxyOp {
    /// ERC-20 approve on the collateral token
    Approve { spender: Address, amount: U256 },
    /// ERC-1155 operator approval on the conditional token contract
    SetApprovalForAll { operator: Address, approved: bool },
    /// Split collateral into a full outcome pair
    SplitPosition { condition_id: B256, amount: U256 },
    /// Merge a full outcome pair back into collateral
    MergePositions { condition_id: B256, amount: U256 },
    /// Redeem resolved outcome tokens
    RedeemPositions {
        condition_id: B256,
        index_sets: Vec<u32>,
    },
    /// ERC-20 transfer of the collateral token
    Transfer { to: Address, amount: U256 },
    /// Register a referral address with the exchange
    SetReferral { referrer: Address, neg_risk: bool },
}

impl ProxyOp {
    /// Encode this operation into a call descriptor against the registry
    ///
    /// Split/merge always use the root collection and the binary `[1, 2]`
    /// partition; the conditional token contract has no other layout in
    /// this deployment.
    pub fn encode(&self, registry: &ContractRegistry) -> CallDescriptor {
        let (to, data) = match self {
            ProxyOp::Approve { spender, amount } => (
                registry.collateral,
                approveCall {
                    spender: *spender,
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ProxyOp::SetApprovalForAll { operator, approved } => (
                registry.ctf,
                setApprovalForAllCall {
                    operator: *operator,
                    approved: *approved,
                }
                .abi_encode(),
            ),
            ProxyOp::SplitPosition {
                condition_id,
                amount,
            } => (
                registry.ctf,
                splitPositionCall {
                    collateralToken: registry.collateral,
                    parentCollectionId: B256::ZERO,
                    conditionId: *condition_id,
                    partition: vec![U256::from(1), U256::from(2)],
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ProxyOp::MergePositions {
                condition_id,
                amount,
            } => (
                registry.ctf,
                mergePositionsCall {
                    collateralToken: registry.collateral,
                    parentCollectionId: B256::ZERO,
                    conditionId: *condition_id,
                    partition: vec![U256::from(1), U256::from(2)],
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ProxyOp::RedeemPositions {
                condition_id,
                index_sets,
            } => (
                registry.ctf,
                redeemPositionsCall {
                    collateralToken: registry.collateral,
                    parentCollectionId: B256::ZERO,
                    conditionId: *condition_id,
                    indexSets: index_sets.iter().map(|&i| U256::from(i)).collect(),
                }
                .abi_encode(),
            ),
            ProxyOp::Transfer { to, amount } => (
                registry.collateral,
                transferCall {
                    to: *to,
                    amount: *amount,
                }
                .abi_encode(),
            ),
            ProxyOp::SetReferral { referrer, neg_risk } => (
                registry.exchange_for(*neg_risk),
                setReferralCall {
                    referrer: *referrer,
                }
                .abi_encode(),
            ),
        };

        CallDescriptor {
            to,
            value: U256::ZERO,
            data: data.into(),
            kind: CallKind::Call,
        }
    }
}

/// Parse a 20-byte address, rejecting anything malformed
pub fn parse_address(address: &str) -> CoreResult<Address> {
    address
        .trim()
        .parse()
        .map_err(|e| CoreError::validation(format!("Invalid address '{}': {}", address, e)))
}

/// Parse a 32-byte condition id hex string
pub fn parse_condition_id(condition_id: &str) -> CoreResult<B256> {
    let hex_str = condition_id.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let bytes = hex::decode(hex_str)
        .map_err(|e| CoreError::validation(format!("Invalid condition id hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(CoreError::validation(format!(
            "Condition id must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Parse a micro-unit amount from a decimal string
pub fn parse_amount_micro(amount: &str) -> CoreResult<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() || trimmed.starts_with('-') {
        return Err(CoreError::validation(format!(
            "Amount must be a non-negative integer, got '{}'",
            amount
        )));
    }
    U256::from_str_radix(trimmed, 10)
        .map_err(|e| CoreError::validation(format!("Invalid amount '{}': {}", amount, e)))
}

/// Compute the CTF position id (ERC-1155 token id) for an outcome
///
/// For markets with a root parent collection:
///   collectionId = keccak256(conditionId ‖ indexSet)
///   positionId = keccak256(collateralToken ‖ collectionId)
pub fn compute_position_id(condition_id: &B256, index_set: u32, collateral: &Address) -> U256 {
    let mut packed = Vec::with_capacity(64);
    packed.extend_from_slice(condition_id.as_slice());
    packed.extend_from_slice(&U256::from(index_set).to_be_bytes::<32>());
    let collection_id = keccak256(&packed);

    let mut packed2 = Vec::with_capacity(52);
    packed2.extend_from_slice(collateral.as_slice());
    packed2.extend_from_slice(collection_id.as_slice());
    U256::from_be_bytes(keccak256(&packed2).into())
}
