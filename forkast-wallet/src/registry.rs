//! Contract registry for the Polygon deployment
//!
//! Every proxy operation targets exactly one of these contracts. The
//! defaults are the production deployment; each can be overridden via
//! environment for test networks.

use alloy::primitives::Address;
use forkast_core::{CoreError, CoreResult};

/// USDC.e on Polygon (6 decimals) - the collateral token
pub const COLLATERAL_ADDRESS: &str = "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174";

/// Conditional Token Framework on Polygon
pub const CTF_ADDRESS: &str = "0x4D97DCd97eC945f40cF65F87097ACe5EA0476045";

/// Gnosis MultiSend contract used for batched delegate-calls
pub const MULTISEND_ADDRESS: &str = "0xA238CBeb142c10Ef7Ad8442C6D1f9E89e07e7761";

/// Forkast CTF Exchange (binary markets)
pub const EXCHANGE_ADDRESS: &str = "0x4bfb41d5b3570defd03c39a9a4d8de6bd8b8982e";

/// Forkast Neg Risk CTF Exchange (multi-outcome markets)
pub const NEG_RISK_EXCHANGE_ADDRESS: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";

/// Polygon chain id
pub const POLYGON_CHAIN_ID: u64 = 137;

/// Resolved contract addresses plus chain id
#[derive(Debug, Clone)]
pub struct ContractRegistry {
    pub collateral: Address,
    pub ctf: Address,
    pub multisend: Address,
    pub exchange: Address,
    pub neg_risk_exchange: Address,
    pub chain_id: u64,
}

impl ContractRegistry {
    /// Registry for the production Polygon deployment
    pub fn polygon() -> Self {
        // Parsing the fixed constants above cannot fail.
        Self {
            collateral: COLLATERAL_ADDRESS.parse().unwrap(),
            ctf: CTF_ADDRESS.parse().unwrap(),
            multisend: MULTISEND_ADDRESS.parse().unwrap(),
            exchange: EXCHANGE_ADDRESS.parse().unwrap(),
            neg_risk_exchange: NEG_RISK_EXCHANGE_ADDRESS.parse().unwrap(),
            chain_id: POLYGON_CHAIN_ID,
        }
    }

    /// Build a registry from the environment, falling back to the Polygon
    /// deployment for anything unset
    pub fn from_env() -> CoreResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::polygon();
        Ok(Self {
            collateral: env_address("FORKAST_COLLATERAL_ADDRESS", defaults.collateral)?,
            ctf: env_address("FORKAST_CTF_ADDRESS", defaults.ctf)?,
            multisend: env_address("FORKAST_MULTISEND_ADDRESS", defaults.multisend)?,
            exchange: env_address("FORKAST_EXCHANGE_ADDRESS", defaults.exchange)?,
            neg_risk_exchange: env_address(
                "FORKAST_NEG_RISK_EXCHANGE_ADDRESS",
                defaults.neg_risk_exchange,
            )?,
            chain_id: match std::env::var("FORKAST_CHAIN_ID") {
                Ok(v) => v
                    .parse()
                    .map_err(|e| CoreError::config(format!("Invalid FORKAST_CHAIN_ID: {}", e)))?,
                Err(_) => defaults.chain_id,
            },
        })
    }

    /// Exchange contract for a market, selected by the neg-risk flag
    pub fn exchange_for(&self, neg_risk: bool) -> Address {
        if neg_risk {
            self.neg_risk_exchange
        } else {
            self.exchange
        }
    }
}

fn env_address(var: &str, default: Address) -> CoreResult<Address> {
    match std::env::var(var) {
        Ok(v) => v
            .parse()
            .map_err(|e| CoreError::config(format!("Invalid {}: {}", var, e))),
        Err(_) => Ok(default),
    }
}
