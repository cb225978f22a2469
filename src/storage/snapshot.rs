//! Snapshot wire format for the card collection.
//!
//! Snapshots are written as a versioned envelope carrying the serialized
//! card array plus a SHA-256 checksum of that payload. Decoding also accepts
//! a bare top-level array so snapshots written before the envelope existed
//! still load.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

use crate::card::Card;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported snapshot version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("snapshot checksum mismatch")]
    ChecksumMismatch,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    #[serde(with = "time::serde::rfc3339")]
    saved_at: OffsetDateTime,
    checksum: String,
    data: serde_json::Value,
}

pub fn encode(cards: &[Card]) -> Result<String, SnapshotError> {
    // Checksum over the `Value` serialization on both ends, so key ordering
    // cannot drift between write and verify.
    let data = serde_json::to_value(cards)?;
    let payload = serde_json::to_string(&data)?;
    let envelope = Envelope {
        version: SNAPSHOT_VERSION,
        saved_at: OffsetDateTime::now_utc(),
        checksum: checksum_hex(&payload),
        data,
    };
    Ok(serde_json::to_string(&envelope)?)
}

pub fn decode(raw: &str) -> Result<Vec<Card>, SnapshotError> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    if value.is_array() {
        // Legacy layout: the card array at top level, no metadata.
        return Ok(serde_json::from_value(value)?);
    }

    let envelope: Envelope = serde_json::from_value(value)?;
    if envelope.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            found: envelope.version,
            expected: SNAPSHOT_VERSION,
        });
    }
    let payload = serde_json::to_string(&envelope.data)?;
    if checksum_hex(&payload) != envelope.checksum {
        return Err(SnapshotError::ChecksumMismatch);
    }
    Ok(serde_json::from_value(envelope.data)?)
}

fn checksum_hex(payload: &str) -> String {
    use std::fmt::Write as _;

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardColor;
    use assert_matches::assert_matches;

    #[test]
    fn round_trip_preserves_cards_and_timestamps() {
        let cards = vec![
            Card::empty(CardColor::Blue).renamed("Groceries"),
            Card::empty(CardColor::Pink),
        ];
        let encoded = encode(&cards).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, cards);
    }

    #[test]
    fn accepts_legacy_bare_array() {
        let cards = vec![Card::empty(CardColor::Green)];
        let raw = serde_json::to_string(&cards).unwrap();
        let decoded = decode(&raw).unwrap();
        assert_eq!(decoded, cards);
    }

    #[test]
    fn rejects_version_mismatch() {
        let cards = vec![Card::empty(CardColor::White)];
        let encoded = encode(&cards).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        value["version"] = serde_json::json!(99);
        let raw = serde_json::to_string(&value).unwrap();
        assert_matches!(
            decode(&raw),
            Err(SnapshotError::VersionMismatch { found: 99, .. })
        );
    }

    #[test]
    fn rejects_tampered_payload() {
        let cards = vec![Card::empty(CardColor::White).renamed("Original")];
        let encoded = encode(&cards).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&encoded).unwrap();
        value["data"][0]["title"] = serde_json::json!("Tampered");
        let raw = serde_json::to_string(&value).unwrap();
        assert_matches!(decode(&raw), Err(SnapshotError::ChecksumMismatch));
    }

    #[test]
    fn rejects_garbage() {
        assert_matches!(decode("not json"), Err(SnapshotError::Malformed(_)));
        assert_matches!(decode(r#"{"hello": 1}"#), Err(SnapshotError::Malformed(_)));
    }
}
