//! Record envelope for stored rows.

use crate::error::Error;
use crate::value::RecordData;
use rkyv::{Archive, Deserialize, Serialize};

/// A stored row with write metadata.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Record {
    /// JSON-encoded row data.
    pub data: Vec<u8>,

    /// Creation timestamp in microseconds since Unix epoch.
    pub created_at: u64,

    /// Last write timestamp in microseconds since Unix epoch.
    pub updated_at: u64,
}

impl Record {
    /// Create a new record stamped with the current time.
    pub fn new(data: &RecordData) -> Result<Self, Error> {
        let now = super::key::current_timestamp();
        Ok(Self {
            data: encode_data(data)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Produce the next revision of this record with new data.
    pub fn revise(&self, data: &RecordData) -> Result<Self, Error> {
        Ok(Self {
            data: encode_data(data)?,
            created_at: self.created_at,
            updated_at: super::key::current_timestamp(),
        })
    }

    /// Decode the row data.
    pub fn decode_data(&self) -> Result<RecordData, Error> {
        serde_json::from_slice(&self.data).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // sled values carry no alignment guarantee
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

fn encode_data(data: &RecordData) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn sample_data() -> RecordData {
        let mut data = RecordData::new();
        data.insert("subjectId".into(), Value::Id("math-1".into()));
        data.insert("name".into(), Value::String("Algebra".into()));
        data
    }

    #[test]
    fn test_record_roundtrip() {
        let record = Record::new(&sample_data()).unwrap();
        let decoded = Record::from_bytes(&record.to_bytes().unwrap()).unwrap();

        assert_eq!(record, decoded);
        assert_eq!(decoded.decode_data().unwrap(), sample_data());
    }

    #[test]
    fn test_revise_keeps_creation_time() {
        let record = Record::new(&sample_data()).unwrap();

        let mut changed = sample_data();
        changed.insert("name".into(), Value::String("Geometry".into()));
        let revised = record.revise(&changed).unwrap();

        assert_eq!(revised.created_at, record.created_at);
        assert!(revised.updated_at >= record.updated_at);
        assert_eq!(revised.decode_data().unwrap(), changed);
    }
}
