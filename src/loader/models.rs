use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::bucket::Bucket;
use crate::constants::TIME_SLOT_FIELD;

/// One bundle record. Everything apart from `timeSlot` is opaque to the loader.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub time_slot: DateTime<Utc>,
    pub fields: Map<String, Value>,
}

impl Bundle {
    pub fn from_raw(raw: Value) -> Result<Self, String> {
        let Value::Object(fields) = raw else {
            return Err("bundle is not an object".to_string());
        };
        let time_slot = time_slot_of(&fields)?;
        Ok(Self { time_slot, fields })
    }

    /// Re-reads `time_slot` from the `timeSlot` field after the fields were edited.
    pub fn sync_time_slot(&mut self) -> Result<(), String> {
        self.time_slot = time_slot_of(&self.fields)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

fn time_slot_of(fields: &Map<String, Value>) -> Result<DateTime<Utc>, String> {
    let slot = fields
        .get(TIME_SLOT_FIELD)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("bundle has no {TIME_SLOT_FIELD}"))?;
    parse_time_slot(slot).ok_or_else(|| format!("unparseable {TIME_SLOT_FIELD}: {slot}"))
}

fn parse_time_slot(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

/// Bundles served for one bucket.
#[derive(Debug, Clone)]
pub struct BucketChunk {
    pub bucket: Bucket,
    pub date: String,
    pub hour: Option<String>,
    pub bundles: Vec<Bundle>,
}

impl BucketChunk {
    pub fn new(bucket: Bucket, bundles: Vec<Bundle>) -> Self {
        Self {
            bucket,
            date: bucket.date_label(),
            hour: bucket.hour_label(),
            bundles,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "granularity": self.bucket.granularity.as_str(),
            "date": self.date,
            "hour": self.hour,
            "rumBundles": self.bundles.iter().map(Bundle::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Outcome of a range query: the requested bounds plus one chunk per planned bucket,
/// in plan order.
#[derive(Debug, Clone, Default)]
pub struct RangeResult {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub chunks: Vec<BucketChunk>,
}

impl RangeResult {
    pub fn buckets(&self) -> Vec<Bucket> {
        self.chunks.iter().map(|c| c.bucket).collect()
    }

    pub fn bundles(&self) -> impl Iterator<Item = &Bundle> {
        self.chunks.iter().flat_map(|c| c.bundles.iter())
    }

    pub fn into_bundles(self) -> Vec<Bundle> {
        self.chunks.into_iter().flat_map(|c| c.bundles).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.bundles.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "start": self.start.map(|t| t.to_rfc3339()),
            "end": self.end.map(|t| t.to_rfc3339()),
            "chunks": self.chunks.iter().map(BucketChunk::to_json).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn from_raw_requires_an_object_with_time_slot() {
        let ok = Bundle::from_raw(serde_json::json!({
            "id": "a1",
            "timeSlot": "2024-01-02T03:00:00+00:00",
            "weight": 100
        }))
        .unwrap();
        assert_eq!(
            ok.time_slot,
            Utc.with_ymd_and_hms(2024, 1, 2, 3, 0, 0).single().unwrap()
        );
        assert_eq!(ok.get("weight").and_then(|v| v.as_u64()), Some(100));

        assert!(Bundle::from_raw(serde_json::json!([1, 2])).is_err());
        assert!(Bundle::from_raw(serde_json::json!({ "id": "x" })).is_err());
        assert!(Bundle::from_raw(serde_json::json!({ "timeSlot": "soon" })).is_err());
    }

    #[test]
    fn naive_time_slots_are_read_as_utc() {
        let b = Bundle::from_raw(serde_json::json!({ "timeSlot": "2024-01-02T03:04:05.250" }))
            .unwrap();
        assert_eq!(b.time_slot.timestamp_millis() % 1000, 250);
    }
}
