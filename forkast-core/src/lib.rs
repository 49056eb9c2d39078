//! Core types for the Forkast trading stack
//!
//! This crate defines the shared data structures used across the stack:
//! market and outcome metadata, the workspace error taxonomy, and the
//! micro-unit fixed-point helpers every wire amount goes through.

pub mod error;
pub mod market;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use market::{MarketMeta, OutcomeMeta};
pub use units::{floor_to_micro, format_micro, round_to_micro, MICRO_UNIT};
