//! Versioned record envelopes.
//!
//! Every key is stored as `{"version": N, "data": ...}`. Blobs without an
//! envelope were written by the first app release (bare JSON arrays and
//! objects) and are treated as version 0; each record type knows how to
//! migrate that shape. The next write stores the current version.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TrackerError};

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// A value that can live under one durable-store key.
pub trait Record: Serialize + DeserializeOwned + Default {
    /// Convert an unversioned (version 0) payload to the current shape.
    fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    data: Value,
}

pub fn encode<T: Record>(key: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        version: SCHEMA_VERSION,
        data: value,
    })
    .map_err(|e| TrackerError::codec(key, e))
}

pub fn decode<T: Record>(key: &str, blob: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(blob).map_err(|e| TrackerError::codec(key, e))?;

    if !is_envelope(&value) {
        log::info!("[Codec] Migrating unversioned '{}' to v{}", key, SCHEMA_VERSION);
        return T::migrate_legacy(value).map_err(|e| TrackerError::codec(key, e));
    }

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| TrackerError::codec(key, e))?;

    match envelope.version {
        SCHEMA_VERSION => {
            serde_json::from_value(envelope.data).map_err(|e| TrackerError::codec(key, e))
        }
        0 => T::migrate_legacy(envelope.data).map_err(|e| TrackerError::codec(key, e)),
        version => Err(TrackerError::UnsupportedSchema {
            key: key.to_string(),
            version,
        }),
    }
}

fn is_envelope(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.len() == 2 && map.get("version").is_some_and(Value::is_u64) && map.contains_key("data")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    impl Record for Counter {
        fn migrate_legacy(value: Value) -> serde_json::Result<Self> {
            #[derive(Deserialize)]
            struct Legacy {
                n: u32,
            }
            let legacy: Legacy = serde_json::from_value(value)?;
            Ok(Counter { count: legacy.n })
        }
    }

    #[test]
    fn test_envelope_shape() {
        let blob = encode("counter", &Counter { count: 3 }).unwrap();
        let value: Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(value["version"], SCHEMA_VERSION);
        assert_eq!(value["data"]["count"], 3);
        assert_eq!(decode::<Counter>("counter", &blob).unwrap(), Counter { count: 3 });
    }

    #[test]
    fn test_unversioned_blob_is_migrated() {
        let decoded: Counter = decode("counter", br#"{"n": 7}"#).unwrap();
        assert_eq!(decoded, Counter { count: 7 });
    }

    #[test]
    fn test_future_version_rejected() {
        let err = decode::<Counter>("counter", br#"{"version": 99, "data": {"count": 1}}"#)
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::UnsupportedSchema {
                key: "counter".to_string(),
                version: 99
            }
        );
    }

    #[test]
    fn test_garbage_is_codec_error() {
        assert!(matches!(
            decode::<Counter>("counter", b"\x00\x01not json"),
            Err(TrackerError::Codec { .. })
        ));
    }
}
