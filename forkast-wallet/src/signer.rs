//! Owner signer abstraction
//!
//! The proxy wallet's owner signs raw EIP-712 digests. In production the
//! signature comes from the user's connected wallet; the local signer here
//! backs tests and server-managed wallets.

use alloy::primitives::{Address, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use forkast_core::{CoreError, CoreResult};
use std::str::FromStr;
use tracing::info;

/// Anything able to sign a raw digest on behalf of the wallet owner
pub trait OwnerSigner {
    /// The owner's address
    fn address(&self) -> Address;

    /// Sign a raw 32-byte digest, returning the conventional
    /// `r ‖ s ‖ v` layout with v in {27, 28}
    fn sign_digest(
        &self,
        digest: B256,
    ) -> impl std::future::Future<Output = CoreResult<[u8; 65]>> + Send;
}

/// Owner signer backed by a local private key
#[derive(Clone)]
pub struct LocalOwnerSigner {
    signer: PrivateKeySigner,
    address: Address,
}

impl LocalOwnerSigner {
    /// Create a signer from a private key hex string
    pub fn from_private_key(private_key: &str) -> CoreResult<Self> {
        let key = private_key.strip_prefix("0x").unwrap_or(private_key);

        let key_bytes = B256::from_str(key)
            .map_err(|e| CoreError::config(format!("Invalid private key format: {}", e)))?;

        let signer = PrivateKeySigner::from_bytes(&key_bytes)
            .map_err(|e| CoreError::config(format!("Failed to create signer: {}", e)))?;

        let address = signer.address();
        info!("Loaded owner signer: {}", address);

        Ok(Self { signer, address })
    }

    /// Load the signer from the FORKAST_OWNER_KEY environment variable
    pub fn from_env() -> CoreResult<Self> {
        dotenvy::dotenv().ok();

        let private_key = std::env::var("FORKAST_OWNER_KEY").map_err(|_| {
            CoreError::config("FORKAST_OWNER_KEY environment variable not set".to_string())
        })?;

        Self::from_private_key(&private_key)
    }

    /// Generate a fresh random signer
    pub fn generate() -> Self {
        let signer = PrivateKeySigner::random();
        let address = signer.address();
        info!("Generated owner signer: {}", address);
        Self { signer, address }
    }

    /// The owner address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }
}

impl OwnerSigner for LocalOwnerSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_digest(&self, digest: B256) -> CoreResult<[u8; 65]> {
        let signature = self
            .signer
            .sign_hash(&digest)
            .await
            .map_err(|e| CoreError::protocol(format!("Failed to sign digest: {}", e)))?;

        // as_bytes() yields r ‖ s ‖ v with v already in the 27/28 form
        Ok(signature.as_bytes())
    }
}

impl std::fmt::Debug for LocalOwnerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalOwnerSigner")
            .field("address", &self.address)
            .finish()
    }
}
