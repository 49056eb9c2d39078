//! Market and outcome metadata
//!
//! These mirror the locally stored market records that exchange-reported
//! orders and volumes are reconciled against. Lookup keys (condition ids,
//! token ids) are always trimmed and lower-cased before use.

use serde::{Deserialize, Serialize};

/// Locally known market, keyed by condition id
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMeta {
    /// On-chain condition id (32-byte hex string)
    pub condition_id: String,

    /// Market title
    pub title: String,

    /// URL slug
    #[serde(default)]
    pub slug: Option<String>,

    /// Whether the market is accepting orders
    #[serde(default)]
    pub active: bool,

    /// Whether the market has resolved
    #[serde(default)]
    pub resolved: bool,

    /// Whether orders trade against the neg-risk exchange
    #[serde(default)]
    pub neg_risk: bool,
}

/// One outcome of a binary market, keyed by CLOB token id
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeMeta {
    /// CLOB token id for this outcome (decimal string)
    pub token_id: String,

    /// Condition id of the parent market
    pub condition_id: String,

    /// Outcome index (0 or 1 for binary markets)
    pub outcome_index: u8,

    /// Outcome text (e.g. "Yes")
    pub outcome: String,
}

/// Normalize an exchange identifier for map lookup
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}
