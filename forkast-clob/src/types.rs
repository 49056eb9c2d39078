//! Wire types for the Forkast CLOB
//!
//! The exchange is strict about JSON shapes: salt travels as an integer,
//! every other numeric field as a base-10 string in micro-units, addresses
//! in checksum format, and side as "BUY"/"SELL".

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serialize U256 as a decimal string (e.g. "1000000", never hex)
fn serialize_u256_as_decimal<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

fn deserialize_u256_from_decimal<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
}

/// Serialize salt as a plain u64 number; the exchange rejects string salts
fn serialize_salt_as_u64<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let salt_u64: u64 = (*value)
        .try_into()
        .map_err(|_| serde::ser::Error::custom("Salt value too large for u64"))?;
    serializer.serialize_u64(salt_u64)
}

fn deserialize_salt_from_u64<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    let n: u64 = Deserialize::deserialize(deserializer)?;
    Ok(U256::from(n))
}

/// Serialize Address in checksum format; the exchange rejects lowercase
fn serialize_address_checksum<S>(value: &Address, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_checksum(None))
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_u8(&self) -> u8 {
        match self {
            Side::Buy => 0,
            Side::Sell => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

fn serialize_side_as_string<S>(value: &u8, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let side_str = match value {
        0 => "BUY",
        1 => "SELL",
        _ => return Err(serde::ser::Error::custom("Invalid side value")),
    };
    serializer.serialize_str(side_str)
}

fn deserialize_side_from_string<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    match s.as_str() {
        "BUY" => Ok(0),
        "SELL" => Ok(1),
        _ => Err(serde::de::Error::custom(format!("Invalid side: {}", s))),
    }
}

/// Signature scheme attached to an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SignatureType {
    /// Direct EOA signature
    Eoa = 0,
    /// Proxy wallet owner signature
    ProxyWallet = 1,
    /// Safe-style contract wallet signature
    ContractWallet = 2,
}

/// Exchange order payload
///
/// Salt is serialized as a u64 integer, other numeric fields as decimal
/// strings, addresses in checksum format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(
        serialize_with = "serialize_salt_as_u64",
        deserialize_with = "deserialize_salt_from_u64"
    )]
    pub salt: U256,
    /// Maker address - the proxy wallet whose funds move
    #[serde(
        serialize_with = "serialize_address_checksum",
        deserialize_with = "deserialize_address"
    )]
    pub maker: Address,
    /// Signer address - the wallet owner
    #[serde(
        serialize_with = "serialize_address_checksum",
        deserialize_with = "deserialize_address"
    )]
    pub signer: Address,
    /// Taker address (zero for open orders)
    #[serde(
        serialize_with = "serialize_address_checksum",
        deserialize_with = "deserialize_address"
    )]
    pub taker: Address,
    /// Condition id of the market (hex string, not part of the signed struct)
    pub condition_id: String,
    /// CLOB token id for the outcome
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub token_id: U256,
    /// Amount the maker gives, in micro-units
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub maker_amount: U256,
    /// Amount the maker wants to receive, in micro-units
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub taker_amount: U256,
    /// Expiration timestamp, 0 for no expiry
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub expiration: U256,
    /// Exchange-assigned nonce
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub nonce: U256,
    /// Fee rate in basis points
    #[serde(
        serialize_with = "serialize_u256_as_decimal",
        deserialize_with = "deserialize_u256_from_decimal"
    )]
    pub fee_rate_bps: U256,
    /// Order side (0 = Buy, 1 = Sell), serialized as "BUY"/"SELL"
    #[serde(
        serialize_with = "serialize_side_as_string",
        deserialize_with = "deserialize_side_from_string"
    )]
    pub side: u8,
    pub signature_type: u8,
}

/// Signed order ready for submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    #[serde(flatten)]
    pub order: Order,
    /// EIP-712 signature, 0x-prefixed hex
    pub signature: String,
}

/// POST /order request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOrderRequest {
    pub order: SignedOrder,
    pub order_type: String,
    pub owner: String,
}

/// POST /order response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Raw open order as reported by GET /data/orders
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOrderRecord {
    pub id: String,
    /// Condition id of the market
    pub market: String,
    /// Token id of the outcome being traded
    pub asset_id: String,
    pub side: String,
    pub original_size: String,
    pub size_matched: String,
    pub price: String,
    pub status: String,
    pub created_at: String,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
}

/// One market entry of a POST /data/volumes request
#[derive(Debug, Clone, Serialize)]
pub struct VolumeCondition {
    pub condition_id: String,
    pub token_ids: Vec<String>,
}

/// POST /data/volumes request body
#[derive(Debug, Serialize)]
pub struct VolumeBatchRequest {
    pub include_24h: bool,
    pub conditions: Vec<VolumeCondition>,
}

/// One item of a POST /data/volumes response
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeRecord {
    pub condition_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub volume_24h: Option<f64>,
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use std::str::FromStr;

    fn sample_order() -> Order {
        Order {
            salt: U256::from(12345u64),
            maker: Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap(),
            signer: Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap(),
            taker: Address::ZERO,
            condition_id: "0xabc123".to_string(),
            token_id: U256::from(123456789u64),
            maker_amount: U256::from(6_500_000u64),
            taker_amount: U256::from(10_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            fee_rate_bps: U256::ZERO,
            side: 0,
            signature_type: SignatureType::ContractWallet as u8,
        }
    }

    #[test]
    fn test_order_wire_format() {
        let json = serde_json::to_value(sample_order()).unwrap();

        // Salt is a JSON number, amounts are decimal strings
        assert!(json["salt"].is_number());
        assert_eq!(json["makerAmount"], "6500000");
        assert_eq!(json["takerAmount"], "10000000");
        assert_eq!(json["tokenId"], "123456789");
        assert_eq!(json["side"], "BUY");
        // Address is checksummed, not lowercase
        assert_eq!(json["maker"], "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(json["conditionId"], "0xabc123");
    }

    #[test]
    fn test_order_round_trips() {
        let order = sample_order();
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back.salt, order.salt);
        assert_eq!(back.maker_amount, order.maker_amount);
        assert_eq!(back.side, order.side);
    }

    #[test]
    fn test_signed_order_flattens() {
        let signed = SignedOrder {
            order: sample_order(),
            signature: "0xdeadbeef".to_string(),
        };
        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["signature"], "0xdeadbeef");
        assert_eq!(json["side"], "BUY");
        assert!(json.get("order").is_none());
    }

    #[test]
    fn test_side_rejects_unknown_string() {
        let json = r#"{"salt":1,"maker":"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "signer":"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "taker":"0x0000000000000000000000000000000000000000",
            "conditionId":"0xabc","tokenId":"1","makerAmount":"1","takerAmount":"1",
            "expiration":"0","nonce":"0","feeRateBps":"0","side":"HOLD","signatureType":0}"#;
        assert!(serde_json::from_str::<Order>(json).is_err());
    }
}
