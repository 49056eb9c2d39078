//! Authenticated Forkast CLOB API client
//!
//! Each request is signed with the HMAC scheme from [`crate::auth`] using
//! credentials passed in per call; nothing is cached between requests.
//! Transport failures surface as one generic error and are never retried
//! here.

use std::time::Duration;

use forkast_core::{CoreError, CoreResult};
use tracing::{debug, error, info, warn};

use crate::auth::{build_auth_headers, current_timestamp, ApiCredentials};
use crate::order::OrderKind;
use crate::types::{
    ExchangeOrderRecord, OrderResponse, PostOrderRequest, SignedOrder, VolumeBatchRequest,
    VolumeRecord,
};

/// Default CLOB endpoint
const DEFAULT_CLOB_URL: &str = "https://clob.forkast.trade";

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

/// Filters for the open-orders query
#[derive(Debug, Default, Clone)]
pub struct OpenOrdersQuery {
    pub market: Option<String>,
    pub maker: Option<String>,
    pub id: Option<String>,
    pub asset_id: Option<String>,
}

impl OpenOrdersQuery {
    /// Render the path plus query string; the query is part of what gets
    /// HMAC-signed, so it must match the sent URL byte for byte.
    fn to_path(&self) -> String {
        let mut params = Vec::new();
        if let Some(market) = &self.market {
            params.push(format!("market={}", market));
        }
        if let Some(maker) = &self.maker {
            params.push(format!("maker={}", maker));
        }
        if let Some(id) = &self.id {
            params.push(format!("id={}", id));
        }
        if let Some(asset_id) = &self.asset_id {
            params.push(format!("asset_id={}", asset_id));
        }
        if params.is_empty() {
            "/data/orders".to_string()
        } else {
            format!("/data/orders?{}", params.join("&"))
        }
    }
}

/// Authenticated client for the Forkast CLOB API
#[derive(Debug, Clone)]
pub struct ClobClient {
    http_client: reqwest::Client,
    base_url: String,
    /// Checksummed owner address sent in the FORKAST_ADDRESS header
    address: String,
}

impl ClobClient {
    pub fn new(base_url: impl Into<String>, address: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("forkast-terminal/1.0")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http_client,
            base_url: base_url.into(),
            address: address.into(),
        }
    }

    /// Client for the endpoint named by FORKAST_CLOB_URL
    pub fn from_env(address: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();
        let url =
            std::env::var("FORKAST_CLOB_URL").unwrap_or_else(|_| DEFAULT_CLOB_URL.to_string());
        Self::new(url, address)
    }

    /// Submit a signed order
    ///
    /// HTTP 201 with an order id is an acceptance; HTTP 200 carrying an
    /// errorMsg is a soft rejection (the exchange parsed the order but
    /// refused it); anything else is a hard failure.
    pub async fn post_order(
        &self,
        signed_order: SignedOrder,
        kind: OrderKind,
        credentials: &ApiCredentials,
    ) -> CoreResult<OrderResponse> {
        let path = "/order";
        let request = PostOrderRequest {
            order: signed_order,
            order_type: kind.as_str().to_string(),
            owner: credentials.api_key.clone(),
        };
        let body = serde_json::to_string(&request)?;

        let timestamp = current_timestamp().to_string();
        let headers =
            build_auth_headers(credentials, &self.address, &timestamp, "POST", path, &body)?;

        debug!("Submitting order, {} body bytes", body.len());

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        match status.as_u16() {
            201 => {
                let order_response: OrderResponse = response
                    .json()
                    .await
                    .map_err(|e| CoreError::protocol(format!("Bad order response: {}", e)))?;
                info!("Order accepted: {:?}", order_response.order_id);
                Ok(order_response)
            }
            200 => {
                // Soft rejection: the order was parsed but refused
                let order_response: OrderResponse = response
                    .json()
                    .await
                    .map_err(|e| CoreError::protocol(format!("Bad order response: {}", e)))?;
                let msg = order_response
                    .error_msg
                    .unwrap_or_else(|| "Order rejected".to_string());
                warn!("Order rejected: {}", msg);
                Err(CoreError::api(msg))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!("Order submission failed: {} - {}", status, body);
                Err(CoreError::api(format!(
                    "Order submission failed: {} - {}",
                    status, body
                )))
            }
        }
    }

    /// Fetch open orders, optionally filtered
    pub async fn get_open_orders(
        &self,
        query: &OpenOrdersQuery,
        credentials: &ApiCredentials,
    ) -> CoreResult<Vec<ExchangeOrderRecord>> {
        let path = query.to_path();
        let timestamp = current_timestamp().to_string();
        let headers =
            build_auth_headers(credentials, &self.address, &timestamp, "GET", &path, "")?;

        debug!("Fetching open orders: {}", path);

        let response = self
            .http_client
            .get(format!("{}{}", self.base_url, path))
            .headers(headers)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::api(format!(
                "Failed to get orders: {} - {}",
                status, body
            )));
        }

        let orders: Vec<ExchangeOrderRecord> = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(format!("Bad orders response: {}", e)))?;
        Ok(orders)
    }

    /// Fetch volumes for a batch of markets
    pub async fn get_volumes(
        &self,
        request: &VolumeBatchRequest,
        credentials: &ApiCredentials,
    ) -> CoreResult<Vec<VolumeRecord>> {
        let path = "/data/volumes";
        let body = serde_json::to_string(request)?;
        let timestamp = current_timestamp().to_string();
        let headers =
            build_auth_headers(credentials, &self.address, &timestamp, "POST", path, &body)?;

        debug!(
            "Fetching volumes for {} condition(s)",
            request.conditions.len()
        );

        let response = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::api(format!(
                "Failed to get volumes: {} - {}",
                status, body
            )));
        }

        let records: Vec<VolumeRecord> = response
            .json()
            .await
            .map_err(|e| CoreError::protocol(format!("Bad volumes response: {}", e)))?;
        Ok(records)
    }

    /// Cancel an order by id
    pub async fn cancel_order(
        &self,
        order_id: &str,
        credentials: &ApiCredentials,
    ) -> CoreResult<()> {
        info!("Cancelling order: {}", order_id);

        let path = "/order";
        let body = serde_json::json!({ "orderID": order_id }).to_string();
        let timestamp = current_timestamp().to_string();
        let headers =
            build_auth_headers(credentials, &self.address, &timestamp, "DELETE", path, &body)?;

        let response = self
            .http_client
            .delete(format!("{}{}", self.base_url, path))
            .headers(headers)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::api(format!(
                "Failed to cancel order: {} - {}",
                status, body
            )));
        }

        Ok(())
    }

    /// Cancel all open orders
    pub async fn cancel_all_orders(&self, credentials: &ApiCredentials) -> CoreResult<()> {
        info!("Cancelling all orders");

        let path = "/cancel-all";
        let timestamp = current_timestamp().to_string();
        let headers =
            build_auth_headers(credentials, &self.address, &timestamp, "DELETE", path, "")?;

        let response = self
            .http_client
            .delete(format!("{}{}", self.base_url, path))
            .headers(headers)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::api(format!(
                "Failed to cancel all orders: {} - {}",
                status, body
            )));
        }

        Ok(())
    }
}
