//! Multi-send batching of call descriptors
//!
//! A single call passes through untouched. Two or more calls are packed
//! into the MultiSend wire format and wrapped as one delegate-call to the
//! multi-send contract, so the whole batch executes atomically. Packing is
//! deterministic: the same input list always yields identical bytes, which
//! the signing path depends on.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use forkast_core::{CoreError, CoreResult};

use crate::calls::{CallDescriptor, CallKind};

sol! {
    function multiSend(bytes transactions);
}

/// Fixed overhead of one packed call: kind(1) + to(20) + value(32) + len(32)
const PACKED_HEADER_LEN: usize = 85;

/// Pack one call into the MultiSend segment layout
///
/// `kind(1) ‖ to(20) ‖ value(32 BE) ‖ len(data)(32 BE) ‖ data`
fn pack_call(call: &CallDescriptor) -> Vec<u8> {
    let mut packed = Vec::with_capacity(PACKED_HEADER_LEN + call.data.len());
    packed.push(call.kind.as_u8());
    packed.extend_from_slice(call.to.as_slice());
    packed.extend_from_slice(&call.value.to_be_bytes::<32>());
    packed.extend_from_slice(&U256::from(call.data.len()).to_be_bytes::<32>());
    packed.extend_from_slice(&call.data);
    packed
}

/// Collapse an ordered list of calls into one descriptor
///
/// Order is preserved exactly as supplied; callers sequence any required
/// ordering themselves (approve before split, for example).
pub fn aggregate_calls(calls: Vec<CallDescriptor>, multisend: Address) -> CoreResult<CallDescriptor> {
    match calls.len() {
        0 => Err(CoreError::validation("Cannot aggregate an empty call list")),
        1 => Ok(calls.into_iter().next().unwrap()),
        _ => {
            let mut transactions = Vec::new();
            for call in &calls {
                transactions.extend_from_slice(&pack_call(call));
            }

            let data = multiSendCall {
                transactions: transactions.into(),
            }
            .abi_encode();

            Ok(CallDescriptor {
                to: multisend,
                value: U256::ZERO,
                data: data.into(),
                kind: CallKind::DelegateCall,
            })
        }
    }
}

/// Decode a packed MultiSend byte stream back into call descriptors
///
/// Inverse of the packing above; used to verify batches in tests and to
/// audit what a signature actually covers.
pub fn unpack_transactions(mut packed: &[u8]) -> CoreResult<Vec<CallDescriptor>> {
    let mut calls = Vec::new();
    while !packed.is_empty() {
        if packed.len() < PACKED_HEADER_LEN {
            return Err(CoreError::protocol(format!(
                "Truncated multi-send segment: {} bytes remaining",
                packed.len()
            )));
        }

        let kind = match packed[0] {
            0 => CallKind::Call,
            1 => CallKind::DelegateCall,
            other => {
                return Err(CoreError::protocol(format!(
                    "Unknown call kind {} in multi-send segment",
                    other
                )))
            }
        };
        let to = Address::from_slice(&packed[1..21]);
        let value = U256::from_be_slice(&packed[21..53]);
        let data_len = U256::from_be_slice(&packed[53..85]);
        let data_len: usize = data_len
            .try_into()
            .map_err(|_| CoreError::protocol("Multi-send data length overflows usize"))?;

        if packed.len() < PACKED_HEADER_LEN + data_len {
            return Err(CoreError::protocol(format!(
                "Multi-send segment declares {} data bytes but only {} remain",
                data_len,
                packed.len() - PACKED_HEADER_LEN
            )));
        }

        let data = Bytes::copy_from_slice(&packed[85..85 + data_len]);
        calls.push(CallDescriptor {
            to,
            value,
            data,
            kind,
        });
        packed = &packed[85 + data_len..];
    }
    Ok(calls)
}
