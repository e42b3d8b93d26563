//! Units sold per product, counted from stored order contents.
//!
//! An order's `content` column holds the cart it was placed with: a JSON
//! object (or array) of cart rows, each carrying the product `id` and the
//! `qty` bought.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct CartRow {
    id: Value,
    #[serde(default)]
    qty: Value,
}

#[derive(Clone, Debug, Default)]
pub struct SalesLedger {
    sold: HashMap<i64, u64>,
}

impl SalesLedger {
    /// Malformed contents are skipped.
    pub fn from_contents<'a>(contents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut ledger = Self::default();
        for content in contents {
            if let Err(error) = ledger.record(content) {
                tracing::warn!(%error, "skipping unreadable order content");
            }
        }
        ledger
    }

    pub fn record(&mut self, content: &str) -> Result<(), serde_json::Error> {
        let rows: Vec<CartRow> = match serde_json::from_str::<Value>(content)? {
            Value::Object(map) => map.into_iter().map(|(_, row)| serde_json::from_value(row)).collect::<Result<_, _>>()?,
            other => serde_json::from_value(other)?,
        };
        for row in rows {
            if let (Some(id), Some(qty)) = (as_integer(&row.id), as_integer(&row.qty)) {
                let sold = self.sold.entry(id).or_default();
                *sold = sold.saturating_add(qty.max(0) as u64);
            }
        }
        Ok(())
    }

    pub fn units_sold(&self, product_id: i64) -> u64 { self.sold.get(&product_id).copied().unwrap_or(0) }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
