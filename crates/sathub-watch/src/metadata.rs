//! Pass metadata extraction from `dataset.json`.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the metadata document in a pass directory.
pub const DATASET_FILE: &str = "dataset.json";

/// Satellite name used when the document does not provide one.
pub const UNKNOWN_SATELLITE: &str = "Unknown";

const TIMESTAMP_KEY: &str = "timestamp";
const NAME_KEYS: [&str; 3] = ["satellite_name", "satellite", "name"];

/// A loosely typed metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// JSON null
    Null,
    /// Boolean
    Bool(bool),
    /// Integer or floating point number
    Number(serde_json::Number),
    /// String
    String(String),
    /// Ordered list
    Array(Vec<MetadataValue>),
    /// Nested string-keyed map
    Object(Metadata),
}

/// Ordered string-keyed metadata map.
pub type Metadata = BTreeMap<String, MetadataValue>;

impl From<Value> for MetadataValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl MetadataValue {
    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalized description of one satellite pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassRecord {
    timestamp: DateTime<Utc>,
    satellite_name: String,
    metadata: Metadata,
}

impl PassRecord {
    /// Create a record.
    pub fn new(
        timestamp: DateTime<Utc>,
        satellite_name: impl Into<String>,
        metadata: Metadata,
    ) -> Self {
        Self {
            timestamp,
            satellite_name: satellite_name.into(),
            metadata,
        }
    }

    /// The same record with a different capture time.
    pub fn with_timestamp(self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..self }
    }

    /// Capture time.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Capture time as RFC 3339 with second precision.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Satellite name, `"Unknown"` if the document had none.
    pub fn satellite_name(&self) -> &str {
        &self.satellite_name
    }

    /// Every metadata field not consumed for the timestamp or name.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Residual metadata serialized as a JSON object string.
    pub fn metadata_json(&self) -> String {
        serde_json::to_string(&self.metadata).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Read and extract `dataset.json` from a pass directory.
pub async fn read_dataset(dir: &Path) -> Result<PassRecord> {
    let path = dir.join(DATASET_FILE);
    let document = tokio::fs::read(&path)
        .await
        .map_err(|e| Error::Metadata(format!("cannot read {}: {}", path.display(), e)))?;

    extract_metadata(&document)
        .map_err(|e| Error::Metadata(format!("{}: {}", path.display(), e)))
}

/// Build a record from a metadata document.
///
/// The document must be a JSON object. A missing or unparsable `timestamp`
/// falls back to the current time.
pub fn extract_metadata(document: &[u8]) -> Result<PassRecord> {
    let value: Value = serde_json::from_slice(document)
        .map_err(|e| Error::Metadata(format!("not valid JSON: {}", e)))?;

    let Value::Object(object) = value else {
        return Err(Error::Metadata("document is not a JSON object".to_string()));
    };

    let mut metadata: Metadata = object
        .into_iter()
        .map(|(k, v)| (k, MetadataValue::from(v)))
        .collect();

    let timestamp = match metadata.get(TIMESTAMP_KEY).and_then(MetadataValue::as_str) {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => {
                debug!("Parsed timestamp: {}", parsed);
                parsed.with_timezone(&Utc)
            }
            Err(e) => {
                warn!(raw_timestamp = raw, "Invalid timestamp format, using current time: {}", e);
                Utc::now()
            }
        },
        None => {
            warn!("No timestamp found, using current time");
            Utc::now()
        }
    };

    let satellite_name = NAME_KEYS
        .iter()
        .find_map(|key| {
            metadata
                .get(*key)
                .and_then(MetadataValue::as_str)
                .filter(|name| !name.is_empty())
        })
        .unwrap_or(UNKNOWN_SATELLITE)
        .to_string();
    info!("Parsed satellite name: {}", satellite_name);

    log_pass_details(&metadata);

    metadata.remove(TIMESTAMP_KEY);
    for key in NAME_KEYS {
        metadata.remove(key);
    }
    debug!("Parsed {} with {} residual fields", DATASET_FILE, metadata.len());

    Ok(PassRecord::new(timestamp, satellite_name, metadata))
}

fn log_pass_details(metadata: &Metadata) {
    if let Some(MetadataValue::Number(norad)) = metadata.get("norad") {
        debug!("NORAD ID: {}", norad);
    }
    if let Some(MetadataValue::Number(frequency)) = metadata.get("frequency") {
        debug!("Frequency: {}", frequency);
    }
    if let Some(modulation) = metadata.get("modulation").and_then(MetadataValue::as_str) {
        debug!("Modulation: {}", modulation);
    }

    for key in ["datasets", "products"] {
        if let Some(MetadataValue::Array(items)) = metadata.get(key) {
            debug!("Found {} {}", items.len(), key);
            for (i, item) in items.iter().enumerate() {
                if let MetadataValue::Object(fields) = item {
                    if let Some(name) = fields.get("name").and_then(MetadataValue::as_str) {
                        debug!("  {} {}: {}", key, i + 1, name);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_extracts_name_and_timestamp() {
        let record = extract_metadata(
            br#"{"satellite_name":"NOAA-19","timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(record.satellite_name(), "NOAA-19");
        assert_eq!(
            record.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert!(record.metadata().is_empty());
        assert_eq!(record.metadata_json(), "{}");
    }

    #[test]
    fn test_offset_timestamp_is_normalized() {
        let record = extract_metadata(br#"{"timestamp":"2024-03-05T12:30:00+02:00"}"#).unwrap();
        assert_eq!(record.timestamp_rfc3339(), "2024-03-05T10:30:00Z");
    }

    #[test]
    fn test_name_fallback_order() {
        let record = extract_metadata(br#"{"satellite":"X","name":"Y"}"#).unwrap();
        assert_eq!(record.satellite_name(), "X");

        let record = extract_metadata(br#"{"satellite_name":"","name":"Y"}"#).unwrap();
        assert_eq!(record.satellite_name(), "Y");

        let record = extract_metadata(br#"{"satellite_name":42}"#).unwrap();
        assert_eq!(record.satellite_name(), UNKNOWN_SATELLITE);
    }

    #[test]
    fn test_missing_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let record = extract_metadata(br#"{"satellite":"METEOR-M2 3"}"#).unwrap();
        let after = Utc::now();

        assert!(record.timestamp() >= before && record.timestamp() <= after);
    }

    #[test]
    fn test_invalid_timestamp_falls_back_to_now() {
        let record = extract_metadata(br#"{"timestamp":"yesterday"}"#).unwrap();
        let drift = Utc::now() - record.timestamp();
        assert!(drift.num_seconds().abs() < 5);
    }

    #[test]
    fn test_consumed_keys_removed_and_rest_kept() {
        let record = extract_metadata(
            br#"{
                "timestamp": "2024-01-01T00:00:00Z",
                "satellite_name": "NOAA-19",
                "satellite": "NOAA 19",
                "name": "noaa_19",
                "norad": 33591,
                "frequency": 137.1,
                "products": [{"name": "AVHRR"}],
                "pipeline": {"id": "noaa_apt", "live": false}
            }"#,
        )
        .unwrap();

        let keys: Vec<&str> = record.metadata().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["frequency", "norad", "pipeline", "products"]);
        assert_eq!(
            record.metadata()["products"],
            MetadataValue::Array(vec![MetadataValue::Object(
                [("name".to_string(), MetadataValue::String("AVHRR".to_string()))]
                    .into_iter()
                    .collect()
            )])
        );

        let json: Value = serde_json::from_str(&record.metadata_json()).unwrap();
        assert_eq!(json["norad"], 33591);
        assert_eq!(json["frequency"], 137.1);
        assert_eq!(json["pipeline"]["live"], false);
    }

    #[test]
    fn test_non_object_document_is_rejected() {
        assert!(matches!(extract_metadata(b"[1, 2, 3]"), Err(Error::Metadata(_))));
        assert!(matches!(extract_metadata(b"\"NOAA-19\""), Err(Error::Metadata(_))));
        assert!(matches!(extract_metadata(b"{not json"), Err(Error::Metadata(_))));
    }

    #[tokio::test]
    async fn test_read_dataset_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_dataset(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains(DATASET_FILE));
    }

    #[test]
    fn test_with_timestamp_keeps_fields() {
        let record = extract_metadata(br#"{"name":"FENGYUN-3E","norad":49008}"#).unwrap();
        let moved = record
            .clone()
            .with_timestamp(Utc.timestamp_opt(100, 0).unwrap());

        assert_eq!(moved.timestamp().timestamp(), 100);
        assert_eq!(moved.satellite_name(), record.satellite_name());
        assert_eq!(moved.metadata(), record.metadata());
    }
}
