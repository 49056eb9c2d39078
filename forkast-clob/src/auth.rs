//! Exchange request authentication
//!
//! Every authenticated request carries an HMAC-SHA256 signature over the
//! exact concatenation `timestamp ‖ method ‖ path ‖ body` plus the API
//! key, passphrase, and timestamp as headers. The timestamp must be
//! wall-clock now at send time; a stale one is rejected by the exchange,
//! not here.

use base64::Engine;
use forkast_core::{CoreError, CoreResult};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ADDRESS: &str = "FORKAST_ADDRESS";
pub const HEADER_API_KEY: &str = "FORKAST_API_KEY";
pub const HEADER_PASSPHRASE: &str = "FORKAST_PASSPHRASE";
pub const HEADER_TIMESTAMP: &str = "FORKAST_TIMESTAMP";
pub const HEADER_SIGNATURE: &str = "FORKAST_SIGNATURE";

/// API credentials for exchange authentication
///
/// Fetched fresh from the secret store per request path; never cached.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl ApiCredentials {
    pub fn new(api_key: String, secret: String, passphrase: String) -> Self {
        Self {
            api_key,
            secret,
            passphrase,
        }
    }

    pub fn from_env() -> CoreResult<Self> {
        dotenvy::dotenv().ok();
        let get = |var: &str| {
            std::env::var(var)
                .map_err(|_| CoreError::config(format!("{} environment variable not set", var)))
        };
        Ok(Self {
            api_key: get("FORKAST_API_KEY")?,
            secret: get("FORKAST_SECRET")?,
            passphrase: get("FORKAST_PASSPHRASE")?,
        })
    }
}

/// HMAC signature over one request
///
/// The secret is URL-safe base64; missing padding is tolerated. The
/// output is URL-safe base64 WITH padding - the exchange rejects the
/// unpadded form.
pub fn build_hmac_signature(
    secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
) -> CoreResult<String> {
    let secret_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(secret)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(secret))
        .or_else(|_| {
            let padded = match secret.len() % 4 {
                2 => format!("{}==", secret),
                3 => format!("{}=", secret),
                _ => secret.to_string(),
            };
            base64::engine::general_purpose::URL_SAFE.decode(&padded)
        })
        .map_err(|e| CoreError::auth(format!("Invalid secret encoding: {}", e)))?;

    let message = format!("{}{}{}{}", timestamp, method, path, body);

    let mut mac = HmacSha256::new_from_slice(&secret_bytes)
        .map_err(|e| CoreError::auth(format!("Failed to create HMAC: {}", e)))?;
    mac.update(message.as_bytes());

    Ok(base64::engine::general_purpose::URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// Build the full authenticated header set for one request
pub fn build_auth_headers(
    credentials: &ApiCredentials,
    address: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &str,
) -> CoreResult<HeaderMap> {
    let signature = build_hmac_signature(&credentials.secret, timestamp, method, path, body)?;

    let mut headers = HeaderMap::new();
    let mut insert = |name: &'static str, value: &str| -> CoreResult<()> {
        headers.insert(
            name,
            HeaderValue::from_str(value)
                .map_err(|e| CoreError::api(format!("Invalid header value: {}", e)))?,
        );
        Ok(())
    };

    insert("Accept", "application/json")?;
    insert(HEADER_ADDRESS, address)?;
    insert(HEADER_API_KEY, &credentials.api_key)?;
    insert(HEADER_PASSPHRASE, &credentials.passphrase)?;
    insert(HEADER_TIMESTAMP, timestamp)?;
    insert(HEADER_SIGNATURE, &signature)?;

    Ok(headers)
}

/// Current UNIX timestamp in seconds
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> String {
        base64::engine::general_purpose::URL_SAFE.encode(b"exchange-shared-secret")
    }

    #[test]
    fn test_signature_covers_all_parts() {
        let base = build_hmac_signature(&secret(), "1700000000", "GET", "/data/orders", "").unwrap();

        // Changing any component changes the signature
        let other_ts =
            build_hmac_signature(&secret(), "1700000001", "GET", "/data/orders", "").unwrap();
        let other_method =
            build_hmac_signature(&secret(), "1700000000", "POST", "/data/orders", "").unwrap();
        let other_path =
            build_hmac_signature(&secret(), "1700000000", "GET", "/data/trades", "").unwrap();
        let with_body =
            build_hmac_signature(&secret(), "1700000000", "GET", "/data/orders", "{}").unwrap();

        assert_ne!(base, other_ts);
        assert_ne!(base, other_method);
        assert_ne!(base, other_path);
        assert_ne!(base, with_body);
    }

    #[test]
    fn test_signature_deterministic_and_padded() {
        let a = build_hmac_signature(&secret(), "1700000000", "POST", "/order", "{\"x\":1}").unwrap();
        let b = build_hmac_signature(&secret(), "1700000000", "POST", "/order", "{\"x\":1}").unwrap();
        assert_eq!(a, b);
        // SHA-256 output is 32 bytes -> 44 base64 chars ending in '='
        assert_eq!(a.len(), 44);
        assert!(a.ends_with('='));
    }

    #[test]
    fn test_unpadded_secret_accepted() {
        let padded = secret();
        let unpadded = padded.trim_end_matches('=').to_string();
        let a = build_hmac_signature(&padded, "1700000000", "GET", "/p", "").unwrap();
        let b = build_hmac_signature(&unpadded, "1700000000", "GET", "/p", "").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_auth_headers_complete() {
        let creds = ApiCredentials::new("key".into(), secret(), "phrase".into());
        let headers = build_auth_headers(
            &creds,
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "1700000000",
            "GET",
            "/data/orders",
            "",
        )
        .unwrap();

        assert!(headers.contains_key(HEADER_ADDRESS));
        assert!(headers.contains_key(HEADER_API_KEY));
        assert!(headers.contains_key(HEADER_PASSPHRASE));
        assert!(headers.contains_key(HEADER_TIMESTAMP));
        assert!(headers.contains_key(HEADER_SIGNATURE));
        assert_eq!(headers.get("Accept").unwrap(), "application/json");
    }
}
