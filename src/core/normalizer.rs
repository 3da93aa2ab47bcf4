//! Normalizer - heterogeneous upstream swaps → canonical records
//!
//! Upstream tiers disagree on naming (`block_timestamp` vs `blockTimestamp`),
//! on nesting (`bought.amount`), on units (seconds vs ms) and on which derived
//! fields they bother to send. All field access goes through [`Field`], one
//! alias table per canonical field, so the rest of the module never sees a
//! raw key.
//!
//! `normalize` is pure: same input, same output. It does not drop
//! unclassified records; callers apply [`retain_trades`] right after.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::types::{NormalizedRecord, NormalizedTransaction, PairContext, TradeSide};
use crate::providers::swaps::TierPage;
use crate::utils::address::{is_address, is_tx_hash, same_address};
use crate::utils::constants::SECONDS_TIMESTAMP_THRESHOLD;

// ============================================
// FIELD LOOKUP TABLE
// ============================================

/// Canonical fields and the upstream names they appear under.
/// Dotted names walk nested objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hash,
    Timestamp,
    Side,
    BaseAmount,
    QuoteAmount,
    PriceUsd,
    TotalValueUsd,
    QuotePriceUsd,
    /// Base priced in quote units
    BaseQuoteRate,
    BoughtToken,
    SoldToken,
    BoughtAmount,
    SoldAmount,
    BoughtUsdPrice,
    SoldUsdPrice,
    Source,
}

impl Field {
    pub const fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::Hash => &[
                "hash",
                "tx_hash",
                "txHash",
                "transaction_hash",
                "transactionHash",
                "signature",
                "id",
            ],
            Field::Timestamp => &[
                "block_timestamp",
                "blockTimestamp",
                "timestamp",
                "block_time",
                "blockTime",
                "time",
                "date",
            ],
            Field::Side => &[
                "type",
                "transaction_type",
                "transactionType",
                "tx_type",
                "txType",
                "side",
                "trade_type",
                "tradeType",
                "kind",
            ],
            Field::BaseAmount => &[
                "base_token_amount",
                "baseTokenAmount",
                "base_amount",
                "baseAmount",
                "amount_base",
                "amountBase",
                "token_amount",
                "tokenAmount",
            ],
            Field::QuoteAmount => &[
                "quote_token_amount",
                "quoteTokenAmount",
                "quote_amount",
                "quoteAmount",
                "amount_quote",
                "amountQuote",
            ],
            Field::PriceUsd => &[
                "price_usd",
                "priceUsd",
                "base_token_price_usd",
                "baseTokenPriceUsd",
                "token_price_usd",
                "tokenPriceUsd",
                "price",
            ],
            Field::TotalValueUsd => &[
                "total_value_usd",
                "totalValueUsd",
                "value_usd",
                "valueUsd",
                "amount_usd",
                "amountUsd",
                "volume_usd",
                "volumeUsd",
                "bought.usdAmount",
                "sold.usdAmount",
                "bought.usd_amount",
                "sold.usd_amount",
            ],
            Field::QuotePriceUsd => &[
                "quote_token_price_usd",
                "quoteTokenPriceUsd",
                "quote_price_usd",
                "quotePriceUsd",
            ],
            Field::BaseQuoteRate => &[
                "base_quote_price",
                "baseQuotePrice",
                "price_native",
                "priceNative",
                "exchange_rate",
                "exchangeRate",
            ],
            Field::BoughtToken => &[
                "bought.address",
                "bought_token_address",
                "boughtTokenAddress",
                "token_bought_address",
                "tokenBoughtAddress",
            ],
            Field::SoldToken => &[
                "sold.address",
                "sold_token_address",
                "soldTokenAddress",
                "token_sold_address",
                "tokenSoldAddress",
            ],
            Field::BoughtAmount => &[
                "bought.amount",
                "bought_amount",
                "boughtAmount",
                "token_bought_amount",
                "tokenBoughtAmount",
            ],
            Field::SoldAmount => &[
                "sold.amount",
                "sold_amount",
                "soldAmount",
                "token_sold_amount",
                "tokenSoldAmount",
            ],
            Field::BoughtUsdPrice => &["bought.usdPrice", "bought.usd_price", "bought_usd_price", "boughtUsdPrice"],
            Field::SoldUsdPrice => &["sold.usdPrice", "sold.usd_price", "sold_usd_price", "soldUsdPrice"],
            Field::Source => &["source", "data_source", "dataSource", "provider"],
        }
    }
}

/// Maker-wallet candidates, in priority order
pub const MAKER_FIELDS: [&str; 23] = [
    "wallet_address",
    "walletAddress",
    "wallet",
    "maker",
    "maker_address",
    "makerAddress",
    "trader",
    "trader_address",
    "traderAddress",
    "from",
    "from_address",
    "fromAddress",
    "sender",
    "sender_address",
    "senderAddress",
    "to",
    "to_address",
    "toAddress",
    "receiver",
    "receiver_address",
    "receiverAddress",
    "recipient",
    "recipientAddress",
];

/// Read-only view over one raw record
struct RawRecord<'a> {
    obj: &'a Map<String, Value>,
}

impl<'a> RawRecord<'a> {
    fn lookup(&self, path: &str) -> Option<&'a Value> {
        let mut parts = path.split('.');
        let mut current = self.obj.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        (!current.is_null()).then_some(current)
    }

    fn value(&self, field: Field) -> Option<&'a Value> {
        field.aliases().iter().find_map(|path| self.lookup(path))
    }

    fn text(&self, field: Field) -> Option<&'a str> {
        field.aliases().iter().find_map(|path| {
            self.lookup(path)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
    }

    /// Positive finite magnitude under any alias
    fn magnitude(&self, field: Field) -> Option<f64> {
        field
            .aliases()
            .iter()
            .find_map(|path| self.lookup(path).and_then(as_number))
            .map(f64::abs)
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    fn maker_wallet(&self) -> Option<String> {
        MAKER_FIELDS.iter().find_map(|key| {
            let candidate = self.lookup(key)?.as_str()?.trim();
            (is_address(candidate) && !is_tx_hash(candidate)).then(|| candidate.to_string())
        })
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Milliseconds since epoch from a number or string; 0 when unparseable
pub fn parse_timestamp_ms(value: Option<&Value>) -> i64 {
    let Some(value) = value else {
        return 0;
    };

    let numeric = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    if let Some(n) = numeric.filter(|n| n.is_finite() && *n > 0.0) {
        let n = n as i64;
        return if n < SECONDS_TIMESTAMP_THRESHOLD { n * 1000 } else { n };
    }

    let Some(text) = value.as_str().map(str::trim) else {
        return 0;
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return dt.timestamp_millis();
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return naive.and_utc().timestamp_millis();
        }
    }
    0
}

// ============================================
// NORMALIZATION
// ============================================

/// Normalize a raw batch. Records without an upstream source are labelled
/// "upstream".
pub fn normalize(raw: &[Value], context: &PairContext, current_price_usd: f64) -> Vec<NormalizedRecord> {
    normalize_with_source(raw, context, current_price_usd, "upstream")
}

/// Normalize a tier page; records inherit the page's source label, then the
/// tier name.
pub fn normalize_page(page: &TierPage, context: &PairContext, current_price_usd: f64) -> Vec<NormalizedRecord> {
    let fallback = page.source.as_deref().unwrap_or(page.tier.as_str());
    normalize_with_source(&page.transactions, context, current_price_usd, fallback)
}

fn normalize_with_source(
    raw: &[Value],
    context: &PairContext,
    current_price_usd: f64,
    fallback_source: &str,
) -> Vec<NormalizedRecord> {
    raw.iter()
        .filter_map(|value| match value.as_object() {
            Some(obj) => Some(normalize_one(
                &RawRecord { obj },
                context,
                current_price_usd,
                fallback_source,
            )),
            None => {
                debug!("⏭️ Ignoring non-object raw record");
                None
            }
        })
        .collect()
}

fn normalize_one(
    rec: &RawRecord<'_>,
    context: &PairContext,
    current_price_usd: f64,
    fallback_source: &str,
) -> NormalizedRecord {
    let stable = context.quote_is_stable;

    // Which side of the swap holds the base token
    let bought_is_base = rec
        .text(Field::BoughtToken)
        .map(|addr| same_address(addr, &context.base_token));
    let sold_is_base = rec
        .text(Field::SoldToken)
        .map(|addr| same_address(addr, &context.base_token));

    // 1. Type
    let side = rec
        .text(Field::Side)
        .and_then(TradeSide::parse)
        .or(match (bought_is_base, sold_is_base) {
            (Some(true), _) => Some(TradeSide::Buy),
            (_, Some(true)) => Some(TradeSide::Sell),
            _ => None,
        });

    let base_is_bought = match (bought_is_base, sold_is_base) {
        (Some(true), _) => Some(true),
        (_, Some(true)) => Some(false),
        _ => side.map(|s| s == TradeSide::Buy),
    };

    let (base_leg_amount, quote_leg_amount, base_leg_price, quote_leg_price) = match base_is_bought {
        Some(true) => (
            rec.magnitude(Field::BoughtAmount),
            rec.magnitude(Field::SoldAmount),
            rec.magnitude(Field::BoughtUsdPrice),
            rec.magnitude(Field::SoldUsdPrice),
        ),
        Some(false) => (
            rec.magnitude(Field::SoldAmount),
            rec.magnitude(Field::BoughtAmount),
            rec.magnitude(Field::SoldUsdPrice),
            rec.magnitude(Field::BoughtUsdPrice),
        ),
        None => (None, None, None, None),
    };

    let mut base = rec.magnitude(Field::BaseAmount).or(base_leg_amount);
    let mut quote = rec.magnitude(Field::QuoteAmount).or(quote_leg_amount);
    let quote_price = rec.magnitude(Field::QuotePriceUsd).or(quote_leg_price);
    let rate = rec.magnitude(Field::BaseQuoteRate);
    let current = Some(current_price_usd).filter(|p| p.is_finite() && *p > 0.0);

    // 2. Price, first applicable wins
    let mut price = rec
        .magnitude(Field::PriceUsd)
        .or(base_leg_price)
        .or(current)
        .or_else(|| ratio(rec.magnitude(Field::TotalValueUsd), base))
        .or_else(|| match (quote, quote_price) {
            (Some(q), Some(qp)) => ratio(Some(q * qp), base),
            _ => None,
        })
        .or_else(|| rate.filter(|_| stable));

    // 3. Total value
    let mut total = rec
        .magnitude(Field::TotalValueUsd)
        .or_else(|| quote.filter(|_| stable))
        .or_else(|| product(base, price));

    // 4. Back-fill amounts, never overwriting
    if base.is_none() {
        base = ratio(total, price).or_else(|| ratio(quote, rate));
    }
    if quote.is_none() {
        quote = product(base, rate)
            .or_else(|| total.filter(|_| stable))
            .or_else(|| ratio(total, quote_price));
    }
    if price.is_none() {
        price = ratio(total, base).or_else(|| if stable { ratio(quote, base) } else { None });
    }
    if total.is_none() {
        total = product(base, price);
    }

    let timestamp_ms = parse_timestamp_ms(rec.value(Field::Timestamp));
    let base_amount = base.unwrap_or(0.0);
    let total_value_usd = total.unwrap_or(0.0);

    let hash = rec
        .text(Field::Hash)
        .map(|h| if is_tx_hash(h) { h.to_lowercase() } else { h.to_string() })
        .unwrap_or_else(|| {
            format!(
                "synthetic:{}:{}:{}:{}",
                timestamp_ms,
                side.map_or("unknown", |s| s.as_str()),
                base_amount,
                total_value_usd
            )
        });

    NormalizedRecord {
        hash,
        timestamp_ms,
        side,
        base_amount,
        quote_amount: quote.unwrap_or(0.0),
        price_usd: price.unwrap_or(0.0),
        total_value_usd,
        maker_wallet: rec.maker_wallet(),
        source: rec
            .text(Field::Source)
            .unwrap_or(fallback_source)
            .to_string(),
    }
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d).filter(|v| v.is_finite() && *v > 0.0),
        _ => None,
    }
}

fn product(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a * b).filter(|v| v.is_finite() && *v > 0.0),
        _ => None,
    }
}

/// Keep only records classified as buy or sell
pub fn retain_trades(records: Vec<NormalizedRecord>) -> Vec<NormalizedTransaction> {
    records
        .into_iter()
        .filter_map(|record| match NormalizedTransaction::try_from(record) {
            Ok(tx) => Some(tx),
            Err(e) => {
                debug!("⏭️ {}", e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "0x1111111111111111111111111111111111111111";
    const QUOTE: &str = "0x2222222222222222222222222222222222222222";
    const WALLET: &str = "0x3333333333333333333333333333333333333333";
    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    fn weth_ctx() -> PairContext {
        PairContext::new("ethereum", BASE, "WETH")
    }

    fn usdc_ctx() -> PairContext {
        PairContext::new("ethereum", BASE, "USDC")
    }

    fn one(raw: Value, ctx: &PairContext, price: f64) -> NormalizedRecord {
        normalize(&[raw], ctx, price).remove(0)
    }

    #[test]
    fn test_price_from_total_over_base() {
        let rec = one(
            json!({"type": "buy", "base_token_amount": "10", "total_value_usd": "100"}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.side, Some(TradeSide::Buy));
        assert_eq!(rec.price_usd, 10.0);
        assert_eq!(rec.total_value_usd, 100.0);
        assert_eq!(rec.base_amount, 10.0);
    }

    #[test]
    fn test_current_price_precedes_derivation() {
        let rec = one(
            json!({"type": "sell", "base_token_amount": "10", "total_value_usd": "100"}),
            &weth_ctx(),
            12.5,
        );
        assert_eq!(rec.price_usd, 12.5);
        // total stays upstream, never recomputed from the fallback price
        assert_eq!(rec.total_value_usd, 100.0);
    }

    #[test]
    fn test_upstream_price_wins() {
        let rec = one(
            json!({"type": "buy", "priceUsd": "3", "baseTokenAmount": 2, "totalValueUsd": 100}),
            &weth_ctx(),
            50.0,
        );
        assert_eq!(rec.price_usd, 3.0);
        assert_eq!(rec.total_value_usd, 100.0);
    }

    #[test]
    fn test_field_casing_is_equivalent() {
        let ctx = weth_ctx();
        let snake = one(
            json!({"hash": HASH, "type": "buy", "block_timestamp": "2024-05-01T12:00:00Z",
                   "base_token_amount": "5", "total_value_usd": "50"}),
            &ctx,
            0.0,
        );
        let camel = one(
            json!({"txHash": HASH, "transactionType": "buy", "blockTimestamp": "2024-05-01T12:00:00Z",
                   "baseTokenAmount": "5", "totalValueUsd": "50"}),
            &ctx,
            0.0,
        );
        assert_eq!(snake, camel);
        assert_eq!(snake.timestamp_ms, 1_714_564_800_000);
    }

    #[test]
    fn test_field_casing_merges_to_one_entry() {
        use crate::core::reconcile::TransactionWindow;

        let raw = [
            json!({"hash": HASH, "type": "buy", "block_timestamp": 1_714_564_800_000i64,
                   "base_token_amount": "5", "total_value_usd": "50"}),
            json!({"txHash": HASH, "transactionType": "buy", "blockTimestamp": 1_714_564_800_000i64,
                   "baseTokenAmount": "5", "totalValueUsd": "50"}),
        ];
        let trades = retain_trades(normalize(&raw, &weth_ctx(), 0.0));
        assert_eq!(trades.len(), 2);

        let mut window = TransactionWindow::new(60);
        window.seed(Vec::new());
        let outcome = window.merge(trades);

        assert_eq!(window.len(), 1);
        assert!(window.contains(HASH));
        assert_eq!(outcome.new_hashes, vec![HASH.to_string()]);
    }

    #[test]
    fn test_maker_skips_tx_hash() {
        let rec = one(
            json!({"type": "buy", "maker": HASH, "from": WALLET}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.maker_wallet.as_deref(), Some(WALLET));

        let rec = one(json!({"type": "buy", "maker": HASH}), &weth_ctx(), 0.0);
        assert_eq!(rec.maker_wallet, None);
    }

    #[test]
    fn test_maker_priority_order() {
        let other = "0x4444444444444444444444444444444444444444";
        let rec = one(
            json!({"type": "sell", "to": other, "walletAddress": WALLET}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.maker_wallet.as_deref(), Some(WALLET));
    }

    #[test]
    fn test_infers_side_from_bought_sold_legs() {
        let ctx = weth_ctx();
        let raw = json!({
            "transactionHash": HASH,
            "blockTimestamp": 1_714_564_800,
            "bought": {"address": BASE.to_uppercase().replace("0X", "0x"), "amount": "1000", "usdPrice": 0.02},
            "sold": {"address": QUOTE, "amount": "-0.005", "usdPrice": 4000.0, "usdAmount": 20.0},
        });
        let rec = one(raw, &ctx, 0.0);
        assert_eq!(rec.side, Some(TradeSide::Buy));
        assert_eq!(rec.base_amount, 1000.0);
        assert_eq!(rec.quote_amount, 0.005);
        assert_eq!(rec.price_usd, 0.02);
        assert_eq!(rec.total_value_usd, 20.0);
        assert_eq!(rec.timestamp_ms, 1_714_564_800_000);

        let raw = json!({
            "sold": {"address": BASE, "amount": "250"},
            "bought": {"address": QUOTE, "amount": "0.5"},
        });
        let rec = one(raw, &ctx, 0.0);
        assert_eq!(rec.side, Some(TradeSide::Sell));
        assert_eq!(rec.base_amount, 250.0);
        assert_eq!(rec.quote_amount, 0.5);
    }

    #[test]
    fn test_explicit_type_beats_inference() {
        let rec = one(
            json!({"type": "sell", "bought": {"address": BASE}}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.side, Some(TradeSide::Sell));
    }

    #[test]
    fn test_stable_quote_derivations() {
        let ctx = usdc_ctx();
        // total from quote, price from total / base
        let rec = one(
            json!({"type": "buy", "base_amount": 4, "quote_amount": 10}),
            &ctx,
            0.0,
        );
        assert_eq!(rec.total_value_usd, 10.0);
        assert_eq!(rec.price_usd, 2.5);

        // price from exchange rate, base back-filled from quote / rate
        let rec = one(
            json!({"type": "sell", "quoteAmount": "30", "priceNative": "1.5"}),
            &ctx,
            0.0,
        );
        assert_eq!(rec.price_usd, 1.5);
        assert_eq!(rec.base_amount, 20.0);
        assert_eq!(rec.total_value_usd, 30.0);
    }

    #[test]
    fn test_quote_price_derivation() {
        let rec = one(
            json!({"type": "buy", "base_amount": 100, "quote_amount": 0.5, "quote_price_usd": 3000}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.price_usd, 15.0);
        assert_eq!(rec.total_value_usd, 1500.0);
    }

    #[test]
    fn test_amounts_back_filled() {
        let rec = one(
            json!({"type": "buy", "price_usd": 2, "total_value_usd": 50, "exchange_rate": 0.5}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.base_amount, 25.0);
        assert_eq!(rec.quote_amount, 12.5);
    }

    #[test]
    fn test_amounts_are_magnitudes() {
        let rec = one(
            json!({"type": "sell", "base_token_amount": "-42", "quote_token_amount": -1, "total_value_usd": "-84"}),
            &weth_ctx(),
            0.0,
        );
        assert_eq!(rec.base_amount, 42.0);
        assert_eq!(rec.quote_amount, 1.0);
        assert_eq!(rec.total_value_usd, 84.0);
        assert_eq!(rec.price_usd, 2.0);
    }

    #[test]
    fn test_unclassified_records_are_kept_then_filtered() {
        let ctx = weth_ctx();
        let raw = vec![
            json!({"hash": "a", "type": "buy"}),
            json!({"hash": "b", "type": "addLiquidity"}),
            json!({"hash": "c"}),
            json!("not an object"),
        ];
        let records = normalize(&raw, &ctx, 1.0);
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].side, None);

        let trades = retain_trades(records);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].hash, "a");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let ctx = usdc_ctx();
        let raw = vec![
            json!({"type": "buy", "base_token_amount": "3", "quote_token_amount": "9"}),
            json!({"type": "sell", "timestamp": "1714564800123", "price": "1.1"}),
        ];
        assert_eq!(normalize(&raw, &ctx, 2.0), normalize(&raw, &ctx, 2.0));
    }

    #[test]
    fn test_synthetic_hash_and_source() {
        let rec = one(json!({"type": "buy", "timestamp": 1_700_000_000_000i64}), &weth_ctx(), 0.0);
        assert!(rec.hash.starts_with("synthetic:1700000000000:buy"));
        assert_eq!(rec.source, "upstream");

        let page = TierPage {
            tier: crate::models::types::SourceTier::PoolSwaps,
            transactions: vec![json!({"type": "buy"}), json!({"type": "sell", "source": "moralis"})],
            source: None,
        };
        let records = normalize_page(&page, &weth_ctx(), 0.0);
        assert_eq!(records[0].source, "pool_swaps");
        assert_eq!(records[1].source, "moralis");
    }

    #[test]
    fn test_tx_hash_lowercased() {
        let rec = one(json!({"hash": HASH.to_uppercase().replace("0X", "0x"), "type": "buy"}), &weth_ctx(), 0.0);
        assert_eq!(rec.hash, HASH);
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp_ms(Some(&json!(1_714_564_800))), 1_714_564_800_000);
        assert_eq!(parse_timestamp_ms(Some(&json!(1_714_564_800_500i64))), 1_714_564_800_500);
        assert_eq!(parse_timestamp_ms(Some(&json!("1714564800"))), 1_714_564_800_000);
        assert_eq!(parse_timestamp_ms(Some(&json!("2024-05-01 12:00:00"))), 1_714_564_800_000);
        assert_eq!(parse_timestamp_ms(Some(&json!("2024-05-01T12:00:00.000Z"))), 1_714_564_800_000);
        assert_eq!(parse_timestamp_ms(Some(&json!("yesterday"))), 0);
        assert_eq!(parse_timestamp_ms(Some(&json!(true))), 0);
        assert_eq!(parse_timestamp_ms(None), 0);
    }
}
