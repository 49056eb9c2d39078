//! Reconciliation of exchange-reported data against local metadata
//!
//! Exchange responses are joined to locally known market and outcome
//! metadata before they reach the UI. Records for unknown markets are
//! stale (the order book outlives local listings) and are dropped without
//! failing the page.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use forkast_core::market::normalize_id;
use forkast_core::{round_to_micro, MarketMeta, OutcomeMeta};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use forkast_core::CoreResult;

use crate::auth::ApiCredentials;
use crate::client::ClobClient;
use crate::types::{ExchangeOrderRecord, Side, VolumeBatchRequest, VolumeCondition, VolumeRecord};

/// Hard cap on a reconciled page, bounding response size
const MAX_PAGE_LIMIT: usize = 100;

/// Maximum condition ids per volume batch call
const VOLUME_BATCH_SIZE: usize = 20;

/// An exchange order joined with local metadata, ready for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledOrder {
    pub order_id: String,
    pub condition_id: String,
    pub token_id: String,
    pub market_title: String,
    pub market_slug: Option<String>,
    pub market_active: bool,
    pub market_resolved: bool,
    pub outcome: String,
    pub outcome_index: u8,
    pub side: Side,
    /// Price as a fraction of one share, clamped to [0, 1]
    pub price: Decimal,
    pub original_size: Decimal,
    pub size_matched: Decimal,
    /// Maker leg in micro-units, recomputed from size x price so the
    /// display mirrors what was signed
    pub maker_amount: String,
    /// Taker leg in micro-units
    pub taker_amount: String,
    pub expiration: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Joins exchange order records with market and outcome metadata
#[derive(Debug, Clone)]
pub struct OrderReconciler {
    /// Markets keyed by normalized condition id
    markets: HashMap<String, MarketMeta>,
    /// Outcomes keyed by normalized token id
    outcomes: HashMap<String, OutcomeMeta>,
}

impl OrderReconciler {
    pub fn new(
        markets: impl IntoIterator<Item = MarketMeta>,
        outcomes: impl IntoIterator<Item = OutcomeMeta>,
    ) -> Self {
        Self {
            markets: markets
                .into_iter()
                .map(|m| (normalize_id(&m.condition_id), m))
                .collect(),
            outcomes: outcomes
                .into_iter()
                .map(|o| (normalize_id(&o.token_id), o))
                .collect(),
        }
    }

    /// Resolve the outcome for a record
    ///
    /// Tries the asset id, then the textual outcome field, then the
    /// substring before a colon - some venues compose "tokenId:variant"
    /// keys.
    fn resolve_outcome(&self, record: &ExchangeOrderRecord) -> Option<&OutcomeMeta> {
        let asset_key = normalize_id(&record.asset_id);
        if let Some(outcome) = self.outcomes.get(&asset_key) {
            return Some(outcome);
        }

        if let Some(outcome_field) = &record.outcome {
            if let Some(outcome) = self.outcomes.get(&normalize_id(outcome_field)) {
                return Some(outcome);
            }
        }

        if let Some((prefix, _)) = asset_key.split_once(':') {
            if let Some(outcome) = self.outcomes.get(prefix) {
                return Some(outcome);
            }
        }

        None
    }

    fn reconcile_one(&self, record: &ExchangeOrderRecord) -> Option<ReconciledOrder> {
        let condition_key = normalize_id(&record.market);
        let market = self.markets.get(&condition_key)?;

        let (outcome, outcome_index) = match self.resolve_outcome(record) {
            Some(meta) => (meta.outcome.clone(), meta.outcome_index),
            None => (String::new(), 0),
        };

        let side = match record.side.to_uppercase().as_str() {
            "SELL" => Side::Sell,
            _ => Side::Buy,
        };

        let price = record
            .price
            .parse::<Decimal>()
            .unwrap_or(Decimal::ZERO)
            .clamp(Decimal::ZERO, Decimal::ONE);
        let original_size = record.original_size.parse::<Decimal>().unwrap_or(Decimal::ZERO);
        let size_matched = record.size_matched.parse::<Decimal>().unwrap_or(Decimal::ZERO);

        // Recompute both legs from total size x price with the same side
        // rule used at signing time. A size past the micro-unit range is
        // garbage data; drop the record like any other mismatch.
        let share_units = round_to_micro(original_size).ok()?;
        let collateral_units = round_to_micro(original_size * price).ok()?;
        let (maker_amount, taker_amount) = match side {
            Side::Buy => (collateral_units, share_units),
            Side::Sell => (share_units, collateral_units),
        };

        let created_at = record
            .created_at
            .parse::<DateTime<Utc>>()
            .unwrap_or_else(|_| DateTime::<Utc>::UNIX_EPOCH);

        Some(ReconciledOrder {
            order_id: record.id.clone(),
            condition_id: condition_key,
            token_id: normalize_id(&record.asset_id),
            market_title: market.title.clone(),
            market_slug: market.slug.clone(),
            market_active: market.active,
            market_resolved: market.resolved,
            outcome,
            outcome_index,
            side,
            price,
            original_size,
            size_matched,
            maker_amount: maker_amount.to_string(),
            taker_amount: taker_amount.to_string(),
            expiration: record.expiration.clone(),
            status: record.status.clone(),
            created_at,
        })
    }

    /// Reconcile a page of exchange records
    ///
    /// Records without a matching market are dropped and counted; the
    /// remainder is sorted newest-first (unparseable timestamps sort as
    /// epoch zero, oldest) and windowed by offset/limit.
    pub fn reconcile(
        &self,
        records: &[ExchangeOrderRecord],
        offset: usize,
        limit: usize,
    ) -> Vec<ReconciledOrder> {
        let mut dropped = 0usize;
        let mut reconciled: Vec<ReconciledOrder> = records
            .iter()
            .filter_map(|record| {
                let result = self.reconcile_one(record);
                if result.is_none() {
                    dropped += 1;
                }
                result
            })
            .collect();

        if dropped > 0 {
            debug!("Dropped {} order(s) with no matching market", dropped);
        }

        reconciled.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let limit = limit.min(MAX_PAGE_LIMIT);
        reconciled.into_iter().skip(offset).take(limit).collect()
    }
}

/// Convenience wrapper for one-shot reconciliation
pub fn reconcile_orders(
    records: &[ExchangeOrderRecord],
    markets: impl IntoIterator<Item = MarketMeta>,
    outcomes: impl IntoIterator<Item = OutcomeMeta>,
    offset: usize,
    limit: usize,
) -> Vec<ReconciledOrder> {
    OrderReconciler::new(markets, outcomes).reconcile(records, offset, limit)
}

/// Reconciled volume for one market, in whole collateral units
#[derive(Debug, Clone, Serialize)]
pub struct MarketVolume {
    pub condition_id: String,
    pub volume: Decimal,
    pub volume_24h: Option<Decimal>,
}

/// One failed item of a volume sync
#[derive(Debug, Clone, Serialize)]
pub struct VolumeSyncError {
    pub context: String,
    pub error: String,
}

/// Outcome of a volume sync run
#[derive(Debug, Default, Serialize)]
pub struct VolumeSyncReport {
    pub updated: Vec<MarketVolume>,
    pub failed: usize,
    pub errors: Vec<VolumeSyncError>,
    /// True when the wall-clock budget ran out before all batches were
    /// scheduled; the run reports partial completion instead of failing
    pub deadline_hit: bool,
}

/// Anything able to serve one volume batch request
///
/// The exchange client is the production source; tests substitute scripted
/// responses.
pub trait VolumeSource {
    fn fetch_volumes(
        &self,
        request: VolumeBatchRequest,
    ) -> impl std::future::Future<Output = CoreResult<Vec<VolumeRecord>>> + Send;
}

/// Volume source backed by the authenticated CLOB client
pub struct ExchangeVolumeSource<'a> {
    pub client: &'a ClobClient,
    pub credentials: &'a ApiCredentials,
}

impl VolumeSource for ExchangeVolumeSource<'_> {
    async fn fetch_volumes(&self, request: VolumeBatchRequest) -> CoreResult<Vec<VolumeRecord>> {
        self.client.get_volumes(&request, self.credentials).await
    }
}

/// Batched volume sync with a wall-clock budget
#[derive(Debug, Clone)]
pub struct VolumeReconciler {
    batch_size: usize,
    time_budget: Duration,
    include_24h: bool,
}

impl VolumeReconciler {
    pub fn new(time_budget: Duration) -> Self {
        Self {
            batch_size: VOLUME_BATCH_SIZE,
            time_budget,
            include_24h: true,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, VOLUME_BATCH_SIZE);
        self
    }

    pub fn with_include_24h(mut self, include_24h: bool) -> Self {
        self.include_24h = include_24h;
        self
    }

    /// Fetch and normalize volumes for the given markets
    ///
    /// Individual item failures are recorded and skipped; a single bad
    /// market never aborts the run. When the time budget is exhausted no
    /// further batches are scheduled and the report says so.
    pub async fn sync<S: VolumeSource>(
        &self,
        source: &S,
        conditions: Vec<VolumeCondition>,
    ) -> VolumeSyncReport {
        let started = Instant::now();
        let mut report = VolumeSyncReport::default();

        for chunk in conditions.chunks(self.batch_size) {
            if started.elapsed() >= self.time_budget {
                warn!(
                    "Volume sync deadline hit after {} updated, {} failed; stopping",
                    report.updated.len(),
                    report.failed
                );
                report.deadline_hit = true;
                break;
            }

            let request = VolumeBatchRequest {
                include_24h: self.include_24h,
                conditions: chunk.to_vec(),
            };

            let records = match source.fetch_volumes(request).await {
                Ok(records) => records,
                Err(e) => {
                    // The whole batch failed; record each item and move on.
                    for condition in chunk {
                        report.failed += 1;
                        report.errors.push(VolumeSyncError {
                            context: condition.condition_id.clone(),
                            error: e.to_string(),
                        });
                    }
                    continue;
                }
            };

            let by_id: HashMap<String, &VolumeRecord> = records
                .iter()
                .map(|r| (normalize_id(&r.condition_id), r))
                .collect();

            for condition in chunk {
                let key = normalize_id(&condition.condition_id);
                match by_id.get(&key) {
                    Some(record) if record.status.as_deref() == Some("error") => {
                        report.failed += 1;
                        report.errors.push(VolumeSyncError {
                            context: condition.condition_id.clone(),
                            error: "exchange reported error status".to_string(),
                        });
                    }
                    Some(record) => {
                        let volume = normalize_volume(record.volume.unwrap_or(0.0));
                        let volume_24h = record.volume_24h.map(normalize_volume);
                        report.updated.push(MarketVolume {
                            condition_id: key,
                            volume,
                            volume_24h,
                        });
                    }
                    None => {
                        report.failed += 1;
                        report.errors.push(VolumeSyncError {
                            context: condition.condition_id.clone(),
                            error: "missing from response".to_string(),
                        });
                    }
                }
            }
        }

        debug!(
            "Volume sync: {} updated, {} failed, deadline_hit={}",
            report.updated.len(),
            report.failed,
            report.deadline_hit
        );
        report
    }
}

/// Normalize a third-party volume figure to whole collateral units
///
/// Payloads arrive in inconsistent scale: some markets report raw
/// micro-units, others already-scaled values. The 10_000 cutoff is
/// inferred from observed data, not a documented contract; keep it
/// bit-compatible with the exchange until upstream reports one scale.
fn normalize_volume(value: f64) -> Decimal {
    let scaled = if value > 10_000.0 {
        value / 1_000_000.0
    } else {
        value
    };
    Decimal::from_f64(scaled).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market(condition_id: &str, title: &str) -> MarketMeta {
        MarketMeta {
            condition_id: condition_id.to_string(),
            title: title.to_string(),
            slug: Some("test-market".to_string()),
            active: true,
            resolved: false,
            neg_risk: false,
        }
    }

    fn outcome(token_id: &str, index: u8, text: &str) -> OutcomeMeta {
        OutcomeMeta {
            token_id: token_id.to_string(),
            condition_id: "0xcond".to_string(),
            outcome_index: index,
            outcome: text.to_string(),
        }
    }

    fn record(id: &str, market: &str, asset_id: &str, side: &str, created_at: &str) -> ExchangeOrderRecord {
        ExchangeOrderRecord {
            id: id.to_string(),
            market: market.to_string(),
            asset_id: asset_id.to_string(),
            side: side.to_string(),
            original_size: "10".to_string(),
            size_matched: "2".to_string(),
            price: "0.65".to_string(),
            status: "LIVE".to_string(),
            created_at: created_at.to_string(),
            outcome: None,
            expiration: None,
            order_type: None,
        }
    }

    fn reconciler() -> OrderReconciler {
        OrderReconciler::new(
            vec![market("0xCOND", "Will it rain?")],
            vec![outcome("abc", 0, "Yes"), outcome("def", 1, "No")],
        )
    }

    #[test]
    fn test_unknown_market_dropped() {
        let records = vec![
            record("o1", "0xcond", "abc", "BUY", "2024-01-02T00:00:00Z"),
            record("o2", "0xother", "abc", "BUY", "2024-01-02T00:00:00Z"),
        ];
        let result = reconciler().reconcile(&records, 0, 50);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].order_id, "o1");
    }

    #[test]
    fn test_ids_normalized_case_insensitively() {
        // Market stored as "0xCOND", record reports "0xCond"
        let records = vec![record("o1", " 0xCond ", "ABC", "BUY", "2024-01-02T00:00:00Z")];
        let result = reconciler().reconcile(&records, 0, 50);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].condition_id, "0xcond");
        assert_eq!(result[0].outcome, "Yes");
    }

    #[test]
    fn test_colon_prefix_outcome_fallback() {
        // "abc:1" is not in the outcome map, "abc" is
        let records = vec![record("o1", "0xcond", "abc:1", "BUY", "2024-01-02T00:00:00Z")];
        let result = reconciler().reconcile(&records, 0, 50);
        assert_eq!(result[0].outcome, "Yes");
        assert_eq!(result[0].outcome_index, 0);
    }

    #[test]
    fn test_outcome_field_fallback() {
        let mut rec = record("o1", "0xcond", "unknown-token", "BUY", "2024-01-02T00:00:00Z");
        rec.outcome = Some("DEF".to_string());
        let result = reconciler().reconcile(&[rec], 0, 50);
        assert_eq!(result[0].outcome, "No");
        assert_eq!(result[0].outcome_index, 1);
    }

    #[test]
    fn test_amounts_follow_side_rule() {
        let buy = record("o1", "0xcond", "abc", "BUY", "2024-01-02T00:00:00Z");
        let sell = record("o2", "0xcond", "abc", "SELL", "2024-01-02T00:00:00Z");
        let result = reconciler().reconcile(&[buy, sell], 0, 50);

        let buy_order = result.iter().find(|o| o.order_id == "o1").unwrap();
        // 10 shares at 0.65: collateral leg 6.5, share leg 10
        assert_eq!(buy_order.maker_amount, "6500000");
        assert_eq!(buy_order.taker_amount, "10000000");

        let sell_order = result.iter().find(|o| o.order_id == "o2").unwrap();
        assert_eq!(sell_order.maker_amount, "10000000");
        assert_eq!(sell_order.taker_amount, "6500000");
    }

    #[test]
    fn test_price_clamped() {
        let mut rec = record("o1", "0xcond", "abc", "BUY", "2024-01-02T00:00:00Z");
        rec.price = "1.7".to_string();
        let result = reconciler().reconcile(&[rec], 0, 50);
        assert_eq!(result[0].price, dec!(1));
    }

    #[test]
    fn test_sort_newest_first_bad_timestamps_oldest() {
        let records = vec![
            record("old", "0xcond", "abc", "BUY", "2024-01-01T00:00:00Z"),
            record("bad", "0xcond", "abc", "BUY", "not-a-timestamp"),
            record("new", "0xcond", "abc", "BUY", "2024-06-01T00:00:00Z"),
        ];
        let result = reconciler().reconcile(&records, 0, 50);
        let ids: Vec<_> = result.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "bad"]);
    }

    #[test]
    fn test_pagination_and_limit_clamp() {
        let records: Vec<_> = (0..150)
            .map(|i| {
                record(
                    &format!("o{}", i),
                    "0xcond",
                    "abc",
                    "BUY",
                    "2024-01-01T00:00:00Z",
                )
            })
            .collect();
        let reconciler = reconciler();

        assert_eq!(reconciler.reconcile(&records, 0, 500).len(), 100);
        assert_eq!(reconciler.reconcile(&records, 140, 50).len(), 10);
        assert_eq!(reconciler.reconcile(&records, 0, 10).len(), 10);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let records = vec![
            record("o1", "0xcond", "abc", "BUY", "2024-01-02T00:00:00Z"),
            record("o2", "0xcond", "def", "SELL", "2024-01-03T00:00:00Z"),
        ];
        let reconciler = reconciler();
        let a = reconciler.reconcile(&records, 0, 50);
        let b = reconciler.reconcile(&records, 0, 50);
        assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
    }

    use forkast_core::CoreError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedSource {
        responses: Mutex<VecDeque<CoreResult<Vec<VolumeRecord>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<CoreResult<Vec<VolumeRecord>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl VolumeSource for ScriptedSource {
        async fn fetch_volumes(
            &self,
            _request: VolumeBatchRequest,
        ) -> CoreResult<Vec<VolumeRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(vec![]))
        }
    }

    fn condition(id: &str) -> VolumeCondition {
        VolumeCondition {
            condition_id: id.to_string(),
            token_ids: vec![format!("{}-token", id)],
        }
    }

    fn volume_record(id: &str, status: Option<&str>, volume: f64) -> VolumeRecord {
        VolumeRecord {
            condition_id: id.to_string(),
            status: status.map(|s| s.to_string()),
            volume: Some(volume),
            volume_24h: None,
        }
    }

    #[tokio::test]
    async fn test_volume_sync_deadline_stops_scheduling() {
        let source = ScriptedSource::new(vec![]);
        let conditions: Vec<_> = (0..25).map(|i| condition(&format!("0xc{}", i))).collect();

        // An exhausted budget means no batch may be scheduled at all
        let report = VolumeReconciler::new(Duration::ZERO)
            .sync(&source, conditions)
            .await;

        assert!(report.deadline_hit);
        assert!(report.updated.is_empty());
        assert_eq!(report.failed, 0);
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_volume_sync_mixed_failures_do_not_abort() {
        // Batch 1: one good item, one exchange-side error status.
        // Batch 2: the whole HTTP call fails.
        let source = ScriptedSource::new(vec![
            Ok(vec![
                volume_record("0xc1", None, 6_500_000.0),
                volume_record("0xc2", Some("error"), 0.0),
            ]),
            Err(CoreError::network("connection reset")),
        ]);
        let conditions = vec![
            condition("0xc1"),
            condition("0xc2"),
            condition("0xc3"),
            condition("0xc4"),
        ];

        let report = VolumeReconciler::new(Duration::from_secs(60))
            .with_batch_size(2)
            .sync(&source, conditions)
            .await;

        assert!(!report.deadline_hit);
        assert_eq!(source.call_count(), 2);

        // The good item survives, scale-normalized
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].condition_id, "0xc1");
        assert_eq!(report.updated[0].volume, dec!(6.5));

        // One error status plus two from the failed batch
        assert_eq!(report.failed, 3);
        let contexts: Vec<_> = report.errors.iter().map(|e| e.context.as_str()).collect();
        assert_eq!(contexts, vec!["0xc2", "0xc3", "0xc4"]);
    }

    #[tokio::test]
    async fn test_volume_sync_missing_item_counted() {
        let source = ScriptedSource::new(vec![Ok(vec![])]);
        let report = VolumeReconciler::new(Duration::from_secs(60))
            .sync(&source, vec![condition("0xc9")])
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].error, "missing from response");
    }

    #[test]
    fn test_volume_scale_heuristic() {
        // Raw micro-units get scaled down
        assert_eq!(normalize_volume(6_500_000.0), dec!(6.5));
        // Already-scaled values pass through
        assert_eq!(normalize_volume(42.0), dec!(42));
        // Values at the cutoff are treated as already scaled
        assert_eq!(normalize_volume(10_000.0), dec!(10000));
    }
}
