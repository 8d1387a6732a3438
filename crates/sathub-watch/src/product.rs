//! Capture time from SatDump `product.cbor` descriptors.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use ciborium::Value;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Name of the product descriptor inside a product directory.
pub const PRODUCT_FILE: &str = "product.cbor";

/// Marks a sample with no captured time.
const MISSING_TIMESTAMP: f64 = -1.0;

/// The part of a product descriptor we care about. Everything else in the
/// map is ignored.
#[derive(Debug, Deserialize)]
struct ProductDescriptor {
    #[serde(default)]
    timestamps: Vec<Value>,
}

/// Resolve the capture time of the product at `path`.
pub async fn resolve_timestamp(path: &Path) -> Result<DateTime<Utc>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| Error::Product(format!("failed to open {}: {}", path.display(), e)))?;
    earliest_timestamp(bytes.as_slice())
}

/// Earliest valid per-sample timestamp of a CBOR product descriptor.
///
/// Entries of exactly -1 are skipped; the result is truncated to whole
/// seconds.
pub fn earliest_timestamp(reader: impl Read) -> Result<DateTime<Utc>> {
    let product: ProductDescriptor = ciborium::from_reader(reader)
        .map_err(|e| Error::Product(format!("failed to parse CBOR data: {}", e)))?;

    if product.timestamps.is_empty() {
        return Err(Error::Product("no timestamps found in CBOR".to_string()));
    }

    let earliest = product
        .timestamps
        .iter()
        .filter_map(epoch_seconds)
        .filter(|secs| *secs != MISSING_TIMESTAMP)
        .min_by(f64::total_cmp)
        .ok_or_else(|| Error::Product("no valid timestamps found in CBOR".to_string()))?;

    let timestamp = DateTime::from_timestamp(earliest.trunc() as i64, 0)
        .ok_or_else(|| Error::Product(format!("timestamp {} out of range", earliest)))?;

    debug!(
        "Extracted earliest timestamp {} from {} samples",
        timestamp,
        product.timestamps.len()
    );
    Ok(timestamp)
}

fn epoch_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(i128::from(*i) as f64),
        Value::Float(f) if f.is_finite() => Some(*f),
        _ => None,
    }
}
