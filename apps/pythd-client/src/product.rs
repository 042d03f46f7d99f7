//! Oracle Product Records
//!
//! Typed records for the payloads returned by the pythd product RPCs.
//! These map directly to pythd's JSON result shapes.
//!
//! # Record Shapes
//!
//! - [`Product`]: full record from `get_all_products` — product account,
//!   attribute dictionary, and nested price accounts with their publisher
//!   accounts.
//! - [`ProductSummary`]: abbreviated record from `get_product_list` —
//!   product account, attribute dictionary, and price-account stubs.
//!
//! Every struct tolerates omitted fields (`#[serde(default)]`): pythd
//! drops attributes and price fields it has no value for.

use serde::{Deserialize, Serialize};

/// Publishing status of a price.
///
/// # Wire Format (JSON)
/// ```json
/// "trading"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceStatus {
    /// Actively publishing a price.
    Trading,
    /// Publisher down for maintenance, or the market is closed.
    #[default]
    Unknown,
    /// Reserved; a well-behaved publisher should never emit it (typically
    /// an expired ticker, e.g. a contract).
    Halted,
}

impl PriceStatus {
    /// Get the wire-format name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trading => "trading",
            Self::Unknown => "unknown",
            Self::Halted => "halted",
        }
    }
}

/// Reference-data attributes attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAttributes {
    /// Asset class, e.g. "Crypto" or "Equity".
    pub asset_type: String,
    /// Trading symbol.
    pub symbol: String,
    /// Listing country.
    pub country: String,
    /// Quote currency.
    pub quote_currency: String,
    /// Human-readable description.
    pub description: String,
    /// Tenor for derivative products.
    pub tenor: String,
    /// Vendor-neutral symbol.
    pub generic_symbol: String,
    /// CMS symbol.
    pub cms_symbol: String,
    /// CQS symbol.
    pub cqs_symbol: String,
    /// Nasdaq symbol.
    pub nasdaq_symbol: String,
}

/// One publisher's contribution to a price account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherAccount {
    /// Publisher account key.
    pub account: String,
    /// Publishing status reported by this publisher.
    pub status: PriceStatus,
    /// Published price in scaled integer units.
    pub price: i64,
    /// Confidence interval in the same units.
    pub conf: u64,
    /// Slot the price was published in.
    pub slot: u64,
}

/// A full price account with its aggregate price and per-publisher detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceAccount {
    /// Price account key.
    pub account: String,
    /// Price type, e.g. "price".
    pub price_type: String,
    /// Decimal exponent: the real price is `price * 10^price_exponent`.
    pub price_exponent: i32,
    /// Aggregate publishing status.
    pub status: PriceStatus,
    /// Aggregate price in scaled integer units.
    pub price: i64,
    /// Aggregate confidence interval.
    pub conf: u64,
    /// Exponentially-weighted moving average price.
    pub ema_price: i64,
    /// Exponentially-weighted moving average confidence.
    pub ema_confidence: u64,
    /// Last slot with a valid aggregate.
    pub valid_slot: u64,
    /// Slot the aggregate was published in.
    pub pub_slot: u64,
    /// Previous valid slot.
    pub prev_slot: u64,
    /// Aggregate price at the previous valid slot.
    pub prev_price: i64,
    /// Confidence at the previous valid slot.
    pub prev_conf: u64,
    /// Per-publisher component prices.
    pub publisher_accounts: Vec<PublisherAccount>,
}

/// Full product record returned by `get_all_products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    /// Product account key.
    pub account: String,
    /// Reference-data attributes.
    pub attr_dict: ProductAttributes,
    /// Price accounts belonging to this product.
    pub price_accounts: Vec<PriceAccount>,
}

/// Price-account stub inside a [`ProductSummary`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceAccountSummary {
    /// Price account key.
    pub account: String,
    /// Decimal exponent for prices on this account.
    pub price_exponent: i32,
    /// Price type, e.g. "price".
    pub price_type: String,
}

/// Summary product record returned by `get_product_list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSummary {
    /// Product account key.
    pub account: String,
    /// Reference-data attributes.
    pub attr_dict: ProductAttributes,
    /// Price-account stubs.
    pub price: Vec<PriceAccountSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(PriceStatus::Trading, "\"trading\"" ; "trading")]
    #[test_case(PriceStatus::Unknown, "\"unknown\"" ; "unknown")]
    #[test_case(PriceStatus::Halted, "\"halted\"" ; "halted")]
    fn status_serializes_lowercase(status: PriceStatus, expected: &str) {
        assert_eq!(serde_json::to_string(&status).unwrap(), expected);
        assert_eq!(
            serde_json::from_str::<PriceStatus>(expected).unwrap(),
            status
        );
    }

    #[test]
    fn full_product_decodes() {
        let json = serde_json::json!({
            "account": "BjG2b1...product",
            "attr_dict": {
                "asset_type": "Crypto",
                "symbol": "BTC/USD",
                "quote_currency": "USD",
                "description": "Bitcoin / US Dollar"
            },
            "price_accounts": [{
                "account": "HVGyZ...price",
                "price_type": "price",
                "price_exponent": -8,
                "status": "trading",
                "price": 4_212_345_000_000_i64,
                "conf": 125_000_000,
                "ema_price": 4_210_000_000_000_i64,
                "ema_confidence": 130_000_000,
                "valid_slot": 189_000_211,
                "pub_slot": 189_000_212,
                "publisher_accounts": [{
                    "account": "9xYt...pub",
                    "status": "trading",
                    "price": 4_212_300_000_000_i64,
                    "conf": 150_000_000,
                    "slot": 189_000_212
                }]
            }]
        });

        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.attr_dict.symbol, "BTC/USD");
        assert_eq!(product.price_accounts.len(), 1);

        let price = &product.price_accounts[0];
        assert_eq!(price.price_exponent, -8);
        assert_eq!(price.status, PriceStatus::Trading);
        assert_eq!(price.publisher_accounts[0].slot, 189_000_212);
        // omitted fields fall back to defaults
        assert_eq!(price.prev_slot, 0);
    }

    #[test]
    fn summary_product_decodes() {
        let json = serde_json::json!({
            "account": "BjG2b1...product",
            "attr_dict": {
                "symbol": "EUR/USD",
                "asset_type": "FX",
                "nasdaq_symbol": ""
            },
            "price": [
                { "account": "3m1y...price", "price_exponent": -5, "price_type": "price" }
            ]
        });

        let product: ProductSummary = serde_json::from_value(json).unwrap();
        assert_eq!(product.attr_dict.symbol, "EUR/USD");
        assert_eq!(product.price[0].price_exponent, -5);
    }

    #[test]
    fn empty_object_decodes_to_defaults() {
        let product: Product = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(product.account.is_empty());
        assert!(product.price_accounts.is_empty());
        assert_eq!(
            product.attr_dict.symbol,
            ProductAttributes::default().symbol
        );
    }
}
