//! Relay submission for proxy wallet transactions
//!
//! The relay executes signed wallet transactions gaslessly. Submission is
//! authenticated with builder HMAC headers; the body carries the call
//! descriptor, the packed owner signature, and the signature params
//! exactly as they were signed.

use alloy::primitives::{Address, U256};
use base64::Engine;
use forkast_core::{CoreError, CoreResult};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::calls::{CallDescriptor, ProxyOp};
use crate::multisend::aggregate_calls;
use crate::registry::ContractRegistry;
use crate::safe::{pack_signature, safe_tx_signing_hash, SignatureParams};
use crate::signer::OwnerSigner;

type HmacSha256 = Hmac<Sha256>;

/// Default relay endpoint
const DEFAULT_RELAY_URL: &str = "https://relay.forkast.trade";

const HEADER_BUILDER_TIMESTAMP: &str = "FORKAST_BUILDER_TIMESTAMP";
const HEADER_BUILDER_SIGNATURE: &str = "FORKAST_BUILDER_SIGNATURE";
const HEADER_BUILDER_API_KEY: &str = "FORKAST_BUILDER_API_KEY";
const HEADER_BUILDER_PASSPHRASE: &str = "FORKAST_BUILDER_PASSPHRASE";

/// Polling cadence for submitted transactions
const POLL_INTERVAL: Duration = Duration::from_secs(2);
const POLL_ATTEMPTS: u32 = 30;

/// Builder credentials for relay authentication
///
/// Read fresh from the secret store per call path; never cached across
/// requests.
#[derive(Debug, Clone)]
pub struct BuilderCredentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl BuilderCredentials {
    pub fn from_env() -> CoreResult<Self> {
        dotenvy::dotenv().ok();
        let get = |var: &str| {
            std::env::var(var)
                .map_err(|_| CoreError::config(format!("{} environment variable not set", var)))
        };
        Ok(Self {
            api_key: get("FORKAST_BUILDER_API_KEY")?,
            secret: get("FORKAST_BUILDER_SECRET")?,
            passphrase: get("FORKAST_BUILDER_PASSPHRASE")?,
        })
    }
}

/// Outcome of a relayed wallet transaction
#[derive(Debug, Deserialize)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Client for the wallet relay service
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(8))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let url =
            std::env::var("FORKAST_RELAY_URL").unwrap_or_else(|_| DEFAULT_RELAY_URL.to_string());
        Self::new(url)
    }

    /// Execute a batch of proxy operations as one atomic wallet transaction
    ///
    /// Encodes every operation, collapses them through the multi-send
    /// aggregator, fetches a fresh nonce, signs the Safe transaction hash
    /// with the owner signer, packs the signature, and submits. Callers
    /// must keep at most one in-flight transaction per wallet; concurrent
    /// submissions race on the nonce.
    pub async fn execute<S: OwnerSigner>(
        &self,
        ops: &[ProxyOp],
        registry: &ContractRegistry,
        proxy_wallet: Address,
        signer: &S,
        credentials: &BuilderCredentials,
        metadata: &str,
    ) -> CoreResult<RelayResponse> {
        let calls: Vec<CallDescriptor> = ops.iter().map(|op| op.encode(registry)).collect();
        let call = aggregate_calls(calls, registry.multisend)?;

        info!(
            "Relay execute: {} op(s), target {:?}, {} calldata bytes",
            ops.len(),
            call.to,
            call.data.len()
        );

        // Nonce must be fetched immediately before signing and used once.
        let nonce = self.get_nonce(signer.address(), credentials).await?;
        let nonce_u256 = U256::from_str_radix(&nonce, 10)
            .map_err(|e| CoreError::protocol(format!("Relay returned bad nonce '{}': {}", nonce, e)))?;

        let digest = safe_tx_signing_hash(registry.chain_id, proxy_wallet, &call, nonce_u256);
        let raw_sig = signer.sign_digest(digest).await?;
        let packed = pack_signature(&raw_sig)?;
        let sig_hex = format!("0x{}", hex::encode(packed));

        self.submit(
            signer.address(),
            proxy_wallet,
            &call,
            &nonce,
            &sig_hex,
            credentials,
            metadata,
        )
        .await
    }

    /// Fetch the wallet's next transaction nonce from the relay
    pub async fn get_nonce(
        &self,
        owner: Address,
        credentials: &BuilderCredentials,
    ) -> CoreResult<String> {
        let path = format!("/nonce?address={:?}&type=SAFE", owner);
        let response = self
            .authed_get(&path, credentials)
            .await?
            .error_for_status()
            .map_err(|e| CoreError::api(format!("Nonce request failed: {}", e)))?;

        #[derive(Deserialize)]
        struct NonceResponse {
            nonce: serde_json::Value,
        }

        let resp: NonceResponse = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(format!("Failed to parse nonce response: {}", e)))?;

        match &resp.nonce {
            serde_json::Value::Number(n) => Ok(n.to_string()),
            serde_json::Value::String(s) => Ok(s.clone()),
            other => Err(CoreError::protocol(format!(
                "Unexpected nonce format: {:?}",
                other
            ))),
        }
    }

    /// Submit a signed wallet transaction and poll until it settles
    #[allow(clippy::too_many_arguments)]
    async fn submit(
        &self,
        from: Address,
        proxy_wallet: Address,
        call: &CallDescriptor,
        nonce: &str,
        signature_hex: &str,
        credentials: &BuilderCredentials,
        metadata: &str,
    ) -> CoreResult<RelayResponse> {
        let body = serde_json::json!({
            "type": "SAFE",
            "from": format!("{:?}", from),
            "to": format!("{:?}", call.to),
            "proxyWallet": format!("{:?}", proxy_wallet),
            "data": format!("0x{}", hex::encode(&call.data)),
            "nonce": nonce,
            "signature": signature_hex,
            "signatureParams": SignatureParams::for_call(call),
            "metadata": metadata,
        });
        let body = serde_json::to_string(&body)?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let payload = format!("{}POST/submit{}", timestamp, body);
        let hmac_sig = compute_builder_hmac(&credentials.secret, &payload)?;

        debug!("Relay submit: nonce={}, {} body bytes", nonce, body.len());

        let response = self
            .client
            .post(format!("{}/submit", self.base_url))
            .header("Content-Type", "application/json")
            .header(HEADER_BUILDER_TIMESTAMP, &timestamp)
            .header(HEADER_BUILDER_SIGNATURE, &hmac_sig)
            .header(HEADER_BUILDER_API_KEY, &credentials.api_key)
            .header(HEADER_BUILDER_PASSPHRASE, &credentials.passphrase)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            warn!("Relay submit failed: {} - {}", status, error_body);
            return Ok(RelayResponse {
                success: false,
                transaction_hash: None,
                error: Some(format!("Relay error {}: {}", status, error_body)),
            });
        }

        #[derive(Debug, Deserialize)]
        struct SubmitResponse {
            #[serde(default, rename = "transactionID")]
            transaction_id: Option<String>,
        }

        let submit_resp: SubmitResponse = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(format!("Failed to parse submit response: {}", e)))?;

        let tx_id = submit_resp.transaction_id.unwrap_or_default();
        if tx_id.is_empty() {
            return Ok(RelayResponse {
                success: false,
                transaction_hash: None,
                error: Some("No transaction ID returned".to_string()),
            });
        }
        info!("Relay submitted: tx_id={}, nonce={}", tx_id, nonce);

        self.poll_transaction(&tx_id, credentials).await
    }

    /// Poll for transaction completion
    async fn poll_transaction(
        &self,
        tx_id: &str,
        credentials: &BuilderCredentials,
    ) -> CoreResult<RelayResponse> {
        for attempt in 0..POLL_ATTEMPTS {
            tokio::time::sleep(POLL_INTERVAL).await;

            let path = format!("/transaction?id={}", tx_id);
            let response = match self.authed_get(&path, credentials).await {
                Ok(r) => r,
                Err(_) => continue,
            };

            let Ok(txns) = response.json::<Vec<serde_json::Value>>().await else {
                continue;
            };
            let Some(txn) = txns.first() else { continue };

            let state = txn.get("state").and_then(|s| s.as_str()).unwrap_or("");
            let tx_hash = txn
                .get("transactionHash")
                .and_then(|h| h.as_str())
                .map(|s| s.to_string());

            match state {
                "STATE_MINED" | "STATE_CONFIRMED" => {
                    info!("Relay transaction confirmed: tx={:?}", tx_hash);
                    return Ok(RelayResponse {
                        success: true,
                        transaction_hash: tx_hash,
                        error: None,
                    });
                }
                "STATE_FAILED" | "STATE_INVALID" => {
                    warn!("Relay transaction {}: hash={:?}", state, tx_hash);
                    return Ok(RelayResponse {
                        success: false,
                        transaction_hash: tx_hash,
                        error: Some(format!("Transaction {}", state)),
                    });
                }
                _ => {
                    if attempt % 5 == 0 {
                        debug!(
                            "Relay polling: state={}, attempt {}/{}",
                            state,
                            attempt + 1,
                            POLL_ATTEMPTS
                        );
                    }
                }
            }
        }

        warn!("Relay polling timed out for tx_id={}", tx_id);
        Err(CoreError::timeout(format!(
            "Transaction {} still pending after {} polls",
            tx_id, POLL_ATTEMPTS
        )))
    }

    async fn authed_get(
        &self,
        path: &str,
        credentials: &BuilderCredentials,
    ) -> CoreResult<reqwest::Response> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let payload = format!("{}GET{}", timestamp, path);
        let hmac_sig = compute_builder_hmac(&credentials.secret, &payload)?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .header(HEADER_BUILDER_TIMESTAMP, &timestamp)
            .header(HEADER_BUILDER_SIGNATURE, &hmac_sig)
            .header(HEADER_BUILDER_API_KEY, &credentials.api_key)
            .header(HEADER_BUILDER_PASSPHRASE, &credentials.passphrase)
            .send()
            .await?;
        Ok(response)
    }
}

/// HMAC-SHA256 over the relay request payload
///
/// The secret is base64; both URL-safe flavors and the standard alphabet
/// appear in the wild, so try each before giving up.
fn compute_builder_hmac(secret: &str, payload: &str) -> CoreResult<String> {
    let secret_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(secret)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(secret))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(secret))
        .map_err(|e| CoreError::config(format!("Failed to decode builder secret: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|e| CoreError::protocol(format!("Invalid HMAC key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(base64::engine::general_purpose::URL_SAFE.encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_hmac_is_deterministic() {
        let secret = base64::engine::general_purpose::URL_SAFE.encode(b"test-secret");
        let a = compute_builder_hmac(&secret, "1700000000GET/nonce").unwrap();
        let b = compute_builder_hmac(&secret, "1700000000GET/nonce").unwrap();
        assert_eq!(a, b);
        // URL-safe base64 with padding
        assert!(a.ends_with('='));
    }

    #[test]
    fn test_builder_hmac_accepts_unpadded_secret() {
        let padded = base64::engine::general_purpose::URL_SAFE.encode(b"secret-bytes!");
        let unpadded = padded.trim_end_matches('=').to_string();
        let a = compute_builder_hmac(&padded, "payload").unwrap();
        let b = compute_builder_hmac(&unpadded, "payload").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_builder_hmac_rejects_garbage_secret() {
        assert!(compute_builder_hmac("!!not-base64!!", "payload").is_err());
    }
}
