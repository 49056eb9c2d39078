//! EIP-712 typed data for exchange orders
//!
//! Orders are signed over the exchange contract's domain; neg-risk markets
//! verify against the neg-risk exchange instead, so the flag must match
//! the market or the exchange rejects the signature.

use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use forkast_core::CoreResult;
use forkast_wallet::{ContractRegistry, OwnerSigner};
use tracing::debug;

// The struct MUST be named "Order" for the correct EIP-712 type hash.
sol! {
    #[derive(Debug)]
    struct Order {
        uint256 salt;
        address maker;
        address signer;
        address taker;
        uint256 tokenId;
        uint256 makerAmount;
        uint256 takerAmount;
        uint256 expiration;
        uint256 nonce;
        uint256 feeRateBps;
        uint8 side;
        uint8 signatureType;
    }
}

/// EIP-712 domain for the exchange contract handling this market
pub fn exchange_domain(chain_id: u64, exchange: Address) -> Eip712Domain {
    eip712_domain! {
        name: "Forkast CTF Exchange",
        version: "1",
        chain_id: chain_id,
        verifying_contract: exchange,
    }
}

/// The EIP-712 signing hash of an order
pub fn order_signing_hash(order: &crate::types::Order, registry: &ContractRegistry, neg_risk: bool) -> B256 {
    let eip712_order = Order {
        salt: order.salt,
        maker: order.maker,
        signer: order.signer,
        taker: order.taker,
        tokenId: order.token_id,
        makerAmount: order.maker_amount,
        takerAmount: order.taker_amount,
        expiration: order.expiration,
        nonce: order.nonce,
        feeRateBps: order.fee_rate_bps,
        side: order.side,
        signatureType: order.signature_type,
    };

    let domain = exchange_domain(registry.chain_id, registry.exchange_for(neg_risk));
    eip712_order.eip712_signing_hash(&domain)
}

/// Sign an order with the owner signer, returning a 0x-prefixed hex string
pub async fn sign_order<S: OwnerSigner>(
    order: &crate::types::Order,
    registry: &ContractRegistry,
    neg_risk: bool,
    signer: &S,
) -> CoreResult<String> {
    let signing_hash = order_signing_hash(order, registry, neg_risk);
    debug!(
        "Order signing hash: 0x{} (neg_risk={})",
        hex::encode(signing_hash),
        neg_risk
    );

    let signature = signer.sign_digest(signing_hash).await?;
    Ok(format!("0x{}", hex::encode(signature)))
}

/// Generate a random salt for order uniqueness
///
/// Salt stays in u64 range (the wire serializes it as an integer) and
/// mixes the millisecond clock with random bits to avoid collisions.
pub fn generate_salt() -> U256 {
    use rand::Rng;
    let mut rng = rand::rng();

    let timestamp_ms = chrono::Utc::now().timestamp_millis() as u64;
    let random_bits: u32 = rng.random();
    let salt = timestamp_ms.wrapping_mul(1000).wrapping_add(random_bits as u64);

    U256::from(salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignatureType;
    use forkast_wallet::LocalOwnerSigner;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn sample_order(maker: Address) -> crate::types::Order {
        crate::types::Order {
            salt: U256::from(424242u64),
            maker,
            signer: maker,
            taker: Address::ZERO,
            condition_id: "0xabc".to_string(),
            token_id: U256::from(987654321u64),
            maker_amount: U256::from(6_500_000u64),
            taker_amount: U256::from(10_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            fee_rate_bps: U256::ZERO,
            side: 1,
            signature_type: SignatureType::ContractWallet as u8,
        }
    }

    #[test]
    fn test_generate_salt_unique_and_u64() {
        let a = generate_salt();
        let b = generate_salt();
        assert_ne!(a, b);
        assert!(a <= U256::from(u64::MAX));
    }

    #[test]
    fn test_domain_selects_exchange() {
        let registry = ContractRegistry::polygon();
        let order = sample_order(Address::from([0x11u8; 20]));
        let binary = order_signing_hash(&order, &registry, false);
        let neg_risk = order_signing_hash(&order, &registry, true);
        // Different verifying contract, different hash
        assert_ne!(binary, neg_risk);
    }

    #[tokio::test]
    async fn test_sign_order_shape() {
        let registry = ContractRegistry::polygon();
        let signer = LocalOwnerSigner::from_private_key(TEST_KEY).unwrap();
        let order = sample_order(signer.address());

        let signature = sign_order(&order, &registry, false, &signer).await.unwrap();
        assert!(signature.starts_with("0x"));
        // 65 bytes = 130 hex chars + "0x" prefix
        assert_eq!(signature.len(), 132);
    }
}
