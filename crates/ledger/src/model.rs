use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where a fact (and therefore a record's latest state) came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Amazon,
    Ebay,
    Manual,
}

impl Source {
    /// Prefix used for synthetic keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amazon => "amazon",
            Self::Ebay => "ebay",
            Self::Manual => "manual",
        }
    }

    /// Human label shown when a record has no displayable id.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Amazon => "Amazon Order",
            Self::Ebay => "eBay Order",
            Self::Manual => "Manual Entry",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Carrier {
    #[serde(rename = "UPS")]
    Ups,
    #[serde(rename = "USPS")]
    Usps,
    #[serde(rename = "FedEx")]
    FedEx,
    #[serde(rename = "DHL")]
    Dhl,
    Other,
}

impl Carrier {
    /// Map a scraped carrier label onto the known set. Anything unrecognized
    /// (OnTrac, LaserShip, "Amazon Logistics", ...) is `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "ups" => Self::Ups,
            "usps" => Self::Usps,
            "fedex" => Self::FedEx,
            "dhl" => Self::Dhl,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ups => "UPS",
            Self::Usps => "USPS",
            Self::FedEx => "FedEx",
            Self::Dhl => "DHL",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
}

impl Item {
    /// Quantity is clamped to at least 1.
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.max(1),
            price_cents: None,
        }
    }

    pub fn with_price_cents(mut self, cents: i64) -> Self {
        self.price_cents = Some(cents);
        self
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One observation pulled off a single page or event. Every field except
/// `source` and `observed_at` may be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFact {
    pub source: Source,
    pub order_id: Option<String>,
    pub tracking_id: Option<String>,
    pub carrier: Option<Carrier>,
    /// Opaque site item identifier (eBay `itemid`), used instead of an order id.
    pub item_id: Option<String>,
    pub items: Vec<Item>,
    pub total_cents: Option<i64>,
    pub order_date: Option<NaiveDate>,
    pub observed_at: DateTime<Utc>,
}

impl ObservedFact {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            order_id: None,
            tracking_id: None,
            carrier: None,
            item_id: None,
            items: Vec::new(),
            total_cents: None,
            order_date: None,
            observed_at: Utc::now(),
        }
    }

    pub fn order_id(mut self, id: impl Into<String>) -> Self {
        self.order_id = Some(id.into());
        self
    }

    pub fn tracking_id(mut self, id: impl Into<String>) -> Self {
        self.tracking_id = Some(id.into());
        self
    }

    pub fn carrier(mut self, carrier: Carrier) -> Self {
        self.carrier = Some(carrier);
        self
    }

    pub fn item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn total_cents(mut self, cents: i64) -> Self {
        self.total_cents = Some(cents);
        self
    }

    pub fn order_date(mut self, date: NaiveDate) -> Self {
        self.order_date = Some(date);
        self
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    pub fn order_id_str(&self) -> Option<&str> {
        non_empty(&self.order_id)
    }

    pub fn tracking_id_str(&self) -> Option<&str> {
        non_empty(&self.tracking_id)
    }

    pub fn item_id_str(&self) -> Option<&str> {
        non_empty(&self.item_id)
    }

    /// Trimmed name of the first item, if it has one.
    pub fn primary_item_name(&self) -> Option<&str> {
        self.items
            .first()
            .map(|i| i.name.trim())
            .filter(|n| !n.is_empty())
    }

    /// A fact with no order id, no tracking id and no usable item name
    /// carries nothing to key a record on.
    pub fn is_reconcilable(&self) -> bool {
        self.order_id_str().is_some()
            || self.tracking_id_str().is_some()
            || self.primary_item_name().is_some()
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<Carrier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<NaiveDate>,
    pub source: Source,
    pub last_updated: DateTime<Utc>,
}

impl OrderRecord {
    pub fn new(key: impl Into<String>, source: Source, now: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            order_id: None,
            tracking_id: None,
            carrier: None,
            item_id: None,
            items: Vec::new(),
            total_cents: None,
            order_date: None,
            source,
            last_updated: now,
        }
    }

    pub fn first_item_name(&self) -> Option<&str> {
        self.items
            .first()
            .map(|i| i.name.trim())
            .filter(|n| !n.is_empty())
    }

    pub fn has_tracking(&self) -> bool {
        non_empty(&self.tracking_id).is_some()
    }

    pub fn tracking_matches(&self, tracking_id: &str) -> bool {
        non_empty(&self.tracking_id).is_some_and(|t| t.eq_ignore_ascii_case(tracking_id))
    }
}

/// Reverse-index entry: tracking number → record key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRef {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<Carrier>,
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// A record typed in by the user rather than scraped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEntry {
    pub tracking_id: String,
    pub description: String,
    pub quantity: u32,
    pub value_cents: Option<i64>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `None` for absent, empty or whitespace-only strings.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a scraped decimal amount ("9.99", "$1,299.00", "12") into cents.
/// More than two fractional digits is rejected rather than rounded.
pub fn parse_cents(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if frac.len() > 2
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !frac.chars().all(|c| c.is_ascii_digit())
    {
        return None;
    }
    let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().ok()? * 10,
        _ => frac.parse().ok()?,
    };
    let cents = whole.checked_mul(100)?.checked_add(frac)?;
    Some(if negative { -cents } else { cents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cents_variants() {
        assert_eq!(parse_cents("9.99"), Some(999));
        assert_eq!(parse_cents("$1,299.00"), Some(129_900));
        assert_eq!(parse_cents("12"), Some(1200));
        assert_eq!(parse_cents("4.5"), Some(450));
        assert_eq!(parse_cents(".75"), Some(75));
        assert_eq!(parse_cents("-3.10"), Some(-310));
        assert_eq!(parse_cents("9.999"), None);
        assert_eq!(parse_cents("abc"), None);
        assert_eq!(parse_cents(""), None);
    }

    #[test]
    fn carrier_labels() {
        assert_eq!(Carrier::from_label(" ups "), Carrier::Ups);
        assert_eq!(Carrier::from_label("FedEx"), Carrier::FedEx);
        assert_eq!(Carrier::from_label("Amazon Logistics"), Carrier::Other);
        assert_eq!(Carrier::Usps.to_string(), "USPS");
    }

    #[test]
    fn blank_fields_are_absent() {
        let fact = ObservedFact::new(Source::Ebay)
            .order_id("   ")
            .item(Item::new("  ", 1));
        assert_eq!(fact.order_id_str(), None);
        assert_eq!(fact.primary_item_name(), None);
        assert!(!fact.is_reconcilable());
    }

    #[test]
    fn item_quantity_clamped() {
        assert_eq!(Item::new("Widget", 0).quantity, 1);
    }

    #[test]
    fn record_serializes_camel_case() {
        let now = Utc::now();
        let mut rec = OrderRecord::new("111-1", Source::Amazon, now);
        rec.order_id = Some("111-1".into());
        rec.carrier = Some(Carrier::Ups);
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["orderId"], "111-1");
        assert_eq!(json["carrier"], "UPS");
        assert_eq!(json["source"], "amazon");
        assert!(json.get("trackingId").is_none());
    }
}
