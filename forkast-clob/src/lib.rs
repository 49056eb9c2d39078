//! Forkast CLOB - Exchange Trade Execution
//!
//! This crate provides:
//! - Order building with side-dependent micro-unit amount derivation
//! - EIP-712 order signing against the exchange domain
//! - HMAC-authenticated exchange API client
//! - Reconciliation of exchange-reported orders and volumes against
//!   locally known market metadata

pub mod auth;
pub mod client;
pub mod eip712;
pub mod order;
pub mod reconcile;
pub mod types;

pub use auth::ApiCredentials;
pub use client::ClobClient;
pub use order::{OrderBuilder, OrderKind};
pub use reconcile::{
    reconcile_orders, ExchangeVolumeSource, OrderReconciler, ReconciledOrder, VolumeReconciler,
    VolumeSource, VolumeSyncReport,
};
pub use types::*;
