//! Order building for the Forkast CLOB
//!
//! Human inputs (side, amount, price) become a signable order payload with
//! both legs in micro-units. Every validation failure carries its own
//! user-facing reason; nothing here touches the network.

use alloy::primitives::{Address, U256};
use forkast_core::{floor_to_micro, round_to_micro, CoreError, CoreResult};
use forkast_wallet::{ensure_shares_available, ContractRegistry, OwnerSigner};
use rust_decimal::Decimal;

use crate::eip712::{generate_salt, sign_order};
use crate::types::{Order, Side, SignatureType, SignedOrder};

/// Minimum shares for a resting limit order. A business rule of the
/// exchange, not a protocol constraint.
const MIN_LIMIT_SHARES: u64 = 5;

/// Order kind for submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// Fill immediately at the best available price
    Market,
    /// Rest in the book at a fixed price
    Limit,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Market => "FOK",
            OrderKind::Limit => "GTC",
        }
    }
}

/// Builder for Forkast orders
#[derive(Debug, Clone)]
pub struct OrderBuilder {
    /// CLOB token id for the outcome being traded
    token_id: String,
    /// Condition id of the market
    condition_id: String,
    side: Side,
    kind: OrderKind,
    /// Price as a fraction of one share, in (0, 1)
    price: Decimal,
    /// Number of shares
    shares: Decimal,
    /// Maker - must be the caller's deployed proxy wallet
    maker: Address,
    /// Owner address that signs the order
    signer: Address,
    /// Expiration timestamp (0 for no expiry)
    expiration: u64,
    /// Fee rate in basis points
    fee_rate_bps: u64,
    /// Whether this market trades on the neg-risk exchange
    neg_risk: bool,
    /// Available balance of the maker leg, in micro-units, if known
    available_balance: Option<U256>,
}

impl OrderBuilder {
    /// Limit order: fixed price, explicit share count
    pub fn limit(
        token_id: impl Into<String>,
        condition_id: impl Into<String>,
        side: Side,
        price: Decimal,
        shares: Decimal,
        maker: Address,
        signer: Address,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            condition_id: condition_id.into(),
            side,
            kind: OrderKind::Limit,
            price,
            shares,
            maker,
            signer,
            expiration: 0,
            fee_rate_bps: 0,
            neg_risk: false,
            available_balance: None,
        }
    }

    /// Market order: human amount plus a price hint
    ///
    /// For a BUY the amount is collateral to spend and the hint converts
    /// it to shares; for a SELL the amount already is shares.
    pub fn market(
        token_id: impl Into<String>,
        condition_id: impl Into<String>,
        side: Side,
        amount: Decimal,
        price_hint: Decimal,
        maker: Address,
        signer: Address,
    ) -> Self {
        let shares = match side {
            Side::Buy if price_hint > Decimal::ZERO => amount / price_hint,
            Side::Buy => Decimal::ZERO,
            Side::Sell => amount,
        };
        Self {
            token_id: token_id.into(),
            condition_id: condition_id.into(),
            side,
            kind: OrderKind::Market,
            price: price_hint,
            shares,
            maker,
            signer,
            expiration: 0,
            fee_rate_bps: 0,
            neg_risk: false,
            available_balance: None,
        }
    }

    /// Set expiration timestamp (0 keeps the order open indefinitely)
    pub fn with_expiration(mut self, expiration: u64) -> Self {
        self.expiration = expiration;
        self
    }

    /// Set fee rate in basis points
    pub fn with_fee_rate(mut self, fee_rate_bps: u64) -> Self {
        self.fee_rate_bps = fee_rate_bps;
        self
    }

    /// Mark this as a neg-risk market
    pub fn with_neg_risk(mut self, neg_risk: bool) -> Self {
        self.neg_risk = neg_risk;
        self
    }

    /// Provide the known balance of the maker leg for a pre-sign check
    pub fn with_available_balance(mut self, balance_micro: U256) -> Self {
        self.available_balance = Some(balance_micro);
        self
    }

    pub fn is_neg_risk(&self) -> bool {
        self.neg_risk
    }

    /// Validate order parameters against the proxy wallet address
    ///
    /// Each failure mode has a distinct message: validation errors for bad
    /// amounts or prices, an authorization error for a maker mismatch.
    fn validate(&self, proxy_wallet: Address) -> CoreResult<()> {
        if self.maker != proxy_wallet {
            return Err(CoreError::auth(format!(
                "Order maker {} does not match your proxy wallet {}",
                self.maker.to_checksum(None),
                proxy_wallet.to_checksum(None)
            )));
        }

        if self.token_id.is_empty() {
            return Err(CoreError::validation("Token ID cannot be empty"));
        }

        if self.shares <= Decimal::ZERO {
            return Err(CoreError::validation(format!(
                "Amount must be positive, got {}",
                self.shares
            )));
        }

        if self.price <= Decimal::ZERO || self.price >= Decimal::ONE {
            return Err(CoreError::validation(format!(
                "Price must be between 0 and 1 exclusive, got {}",
                self.price
            )));
        }

        // Prices are quoted in cents with one decimal place (e.g. 65.5¢)
        let tenths_of_cents = self.price * Decimal::from(1000);
        if tenths_of_cents != tenths_of_cents.trunc() {
            return Err(CoreError::validation(format!(
                "Price must have at most one decimal place of a cent, got {}",
                self.price
            )));
        }

        if self.kind == OrderKind::Limit && self.shares < Decimal::from(MIN_LIMIT_SHARES) {
            return Err(CoreError::validation(format!(
                "Limit orders require at least {} shares, got {}",
                MIN_LIMIT_SHARES, self.shares
            )));
        }

        Ok(())
    }

    /// Derive the two order legs in micro-units
    ///
    /// BUY: maker gives collateral (shares x price), receives shares.
    /// SELL: maker gives shares, receives collateral. Amounts past the
    /// representable micro-unit range are rejected here rather than
    /// truncated into an inconsistent pair of legs.
    fn amounts(&self) -> CoreResult<(U256, U256)> {
        let share_units = U256::from(round_to_micro(self.shares)?);

        let collateral = self.shares * self.price;
        let collateral_units = match (self.kind, self.side) {
            // A market buy spends the collateral amount the caller stated;
            // floor so the order never commits more than that.
            (OrderKind::Market, Side::Buy) => U256::from(floor_to_micro(collateral)?),
            _ => U256::from(round_to_micro(collateral)?),
        };

        Ok(match self.side {
            Side::Buy => (collateral_units, share_units),
            Side::Sell => (share_units, collateral_units),
        })
    }

    /// Build the order payload (unsigned)
    ///
    /// The nonce is exchange-assigned and must be fetched fresh by the
    /// caller right before building.
    pub fn build(&self, proxy_wallet: Address, nonce: U256) -> CoreResult<Order> {
        self.validate(proxy_wallet)?;

        let token_id = U256::from_str_radix(self.token_id.trim(), 10)
            .map_err(|e| CoreError::validation(format!("Invalid token ID: {}", e)))?;

        let (maker_amount, taker_amount) = self.amounts()?;

        if let Some(balance) = self.available_balance {
            match self.side {
                Side::Sell => ensure_shares_available(balance, maker_amount)?,
                Side::Buy if maker_amount > balance => {
                    return Err(CoreError::validation(format!(
                        "Insufficient balance: have {}, need {}",
                        forkast_core::format_micro(balance.try_into().unwrap_or(u128::MAX)),
                        forkast_core::format_micro(maker_amount.try_into().unwrap_or(u128::MAX)),
                    )));
                }
                Side::Buy => {}
            }
        }

        Ok(Order {
            salt: generate_salt(),
            maker: self.maker,
            signer: self.signer,
            taker: Address::ZERO,
            condition_id: self.condition_id.clone(),
            token_id,
            maker_amount,
            taker_amount,
            expiration: U256::from(self.expiration),
            nonce,
            fee_rate_bps: U256::from(self.fee_rate_bps),
            side: self.side.as_u8(),
            signature_type: SignatureType::ContractWallet as u8,
        })
    }

    /// Build and sign the order
    pub async fn build_and_sign<S: OwnerSigner>(
        &self,
        proxy_wallet: Address,
        nonce: U256,
        registry: &ContractRegistry,
        signer: &S,
    ) -> CoreResult<SignedOrder> {
        let order = self.build(proxy_wallet, nonce)?;
        let signature = sign_order(&order, registry, self.neg_risk, signer).await?;

        Ok(SignedOrder { order, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn proxy() -> Address {
        Address::from([0x11u8; 20])
    }

    fn owner() -> Address {
        Address::from([0x22u8; 20])
    }

    fn limit(side: Side, price: Decimal, shares: Decimal) -> OrderBuilder {
        OrderBuilder::limit("123456", "0xabc", side, price, shares, proxy(), owner())
    }

    #[test]
    fn test_buy_amounts() {
        // Buy 100 shares at 0.50: give 50 collateral, receive 100 shares
        let order = limit(Side::Buy, dec!(0.50), dec!(100)).build(proxy(), U256::ZERO).unwrap();
        assert_eq!(order.maker_amount, U256::from(50_000_000u64));
        assert_eq!(order.taker_amount, U256::from(100_000_000u64));
    }

    #[test]
    fn test_sell_amounts_swapped() {
        // Sell 10 shares at 0.65: give 10 shares, receive 6.5 collateral
        let order = limit(Side::Sell, dec!(0.65), dec!(10)).build(proxy(), U256::ZERO).unwrap();
        assert_eq!(order.maker_amount, U256::from(10_000_000u64));
        assert_eq!(order.taker_amount, U256::from(6_500_000u64));
    }

    #[test]
    fn test_one_tenth_cent_price_granularity() {
        assert!(limit(Side::Buy, dec!(0.655), dec!(10)).build(proxy(), U256::ZERO).is_ok());
        let err = limit(Side::Buy, dec!(0.6555), dec!(10))
            .build(proxy(), U256::ZERO)
            .unwrap_err();
        assert!(err.to_string().contains("decimal place"));
    }

    #[test]
    fn test_price_bounds() {
        assert!(limit(Side::Buy, dec!(0), dec!(10)).build(proxy(), U256::ZERO).is_err());
        assert!(limit(Side::Buy, dec!(1), dec!(10)).build(proxy(), U256::ZERO).is_err());
        assert!(limit(Side::Buy, dec!(0.001), dec!(10)).build(proxy(), U256::ZERO).is_ok());
    }

    #[test]
    fn test_minimum_limit_shares() {
        let err = limit(Side::Buy, dec!(0.5), dec!(4.9))
            .build(proxy(), U256::ZERO)
            .unwrap_err();
        assert!(err.to_string().contains("at least 5 shares"));
    }

    #[test]
    fn test_maker_mismatch_is_auth_error() {
        let other_wallet = Address::from([0x33u8; 20]);
        let err = limit(Side::Buy, dec!(0.5), dec!(10))
            .build(other_wallet, U256::ZERO)
            .unwrap_err();
        assert!(matches!(err, CoreError::Auth(_)));
        assert!(err.to_string().contains("does not match your proxy wallet"));
    }

    #[test]
    fn test_sell_share_check_exact_and_over() {
        // Exactly 10 shares held: selling 10 passes
        let ok = limit(Side::Sell, dec!(0.65), dec!(10))
            .with_available_balance(U256::from(10_000_000u64))
            .build(proxy(), U256::ZERO);
        assert!(ok.is_ok());

        // 10.000001 requested against 10 held fails
        let err = limit(Side::Sell, dec!(0.65), dec!(10.000001))
            .with_available_balance(U256::from(10_000_000u64))
            .build(proxy(), U256::ZERO)
            .unwrap_err();
        assert!(err.to_string().contains("Insufficient shares available"));
    }

    #[test]
    fn test_market_buy_converts_amount_to_shares() {
        // Spend 50 collateral at 0.50: 100 shares
        let order = OrderBuilder::market(
            "123456",
            "0xabc",
            Side::Buy,
            dec!(50),
            dec!(0.50),
            proxy(),
            owner(),
        )
        .build(proxy(), U256::ZERO)
        .unwrap();
        assert_eq!(order.taker_amount, U256::from(100_000_000u64));
        assert_eq!(order.maker_amount, U256::from(50_000_000u64));
    }

    #[test]
    fn test_ratio_within_one_micro_unit() {
        // makerAmount/takerAmount tracks the price for BUY
        let order = limit(Side::Buy, dec!(0.333), dec!(7)).build(proxy(), U256::ZERO).unwrap();
        let maker: u128 = order.maker_amount.try_into().unwrap();
        let taker: u128 = order.taker_amount.try_into().unwrap();
        let expected = (Decimal::from(taker as u64) * dec!(0.333)).round();
        let diff = (Decimal::from(maker as u64) - expected).abs();
        assert!(diff <= Decimal::ONE);
    }

    #[test]
    fn test_oversized_amount_rejected_not_truncated() {
        // 3e13 shares scale past u64::MAX; the build must fail instead of
        // emitting an order whose collateral leg collapsed to zero
        let err = limit(Side::Sell, dec!(0.5), dec!(30000000000000))
            .build(proxy(), U256::ZERO)
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("micro-unit range"));

        let err = limit(Side::Buy, dec!(0.5), dec!(30000000000000))
            .build(proxy(), U256::ZERO)
            .unwrap_err();
        assert!(err.to_string().contains("micro-unit range"));
    }

    #[test]
    fn test_market_buy_spend_is_floored() {
        // Sub-micro spend precision floors: 10.0000007 collateral becomes
        // 10.000000, never 10.000001
        let order = OrderBuilder::market(
            "123456",
            "0xabc",
            Side::Buy,
            dec!(10.0000007),
            dec!(0.5),
            proxy(),
            owner(),
        )
        .build(proxy(), U256::ZERO)
        .unwrap();
        assert_eq!(order.maker_amount, U256::from(10_000_000u64));
    }

    #[test]
    fn test_nonce_and_expiration_carried() {
        let order = limit(Side::Buy, dec!(0.5), dec!(10))
            .with_expiration(1_900_000_000)
            .with_fee_rate(20)
            .build(proxy(), U256::from(7))
            .unwrap();
        assert_eq!(order.nonce, U256::from(7));
        assert_eq!(order.expiration, U256::from(1_900_000_000u64));
        assert_eq!(order.fee_rate_bps, U256::from(20u64));
    }
}
