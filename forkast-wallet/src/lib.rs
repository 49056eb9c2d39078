//! Forkast Wallet - Proxy Wallet Execution
//!
//! This crate provides:
//! - Call encoding for on-chain operations (approvals, split/merge/redeem,
//!   transfers, referral registration)
//! - Multi-send batching of calls into one atomic transaction
//! - EIP-712 Safe transaction hashing and owner signature packing
//! - Balance reads via an injected JSON-RPC client
//! - Relay submission with builder authentication

pub mod balance;
pub mod calls;
pub mod multisend;
pub mod registry;
pub mod relay;
pub mod safe;
pub mod signer;

pub use balance::{ensure_shares_available, RpcClient};
pub use calls::{CallDescriptor, CallKind, ProxyOp};
pub use multisend::{aggregate_calls, unpack_transactions};
pub use registry::ContractRegistry;
pub use relay::{BuilderCredentials, RelayClient, RelayResponse};
pub use safe::{pack_signature, safe_tx_signing_hash, unpack_signature, SignatureParams};
pub use signer::{LocalOwnerSigner, OwnerSigner};
