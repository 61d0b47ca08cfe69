//! Row key encoding.

use std::fmt;

/// Separator between identifier components in an encoded key.
const SEPARATOR: u8 = 0;

/// Key addressing a row within one entity's collection.
///
/// Key format: `value1 \0 value2 \0 ...` in identifier order. Single-field
/// identifiers encode to the raw value bytes, so sled's ordering matches
/// string ordering of the identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    values: Vec<String>,
}

impl RecordKey {
    /// Create a key from identifier values in identifier order.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Identifier component values.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Encode the key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                buf.push(SEPARATOR);
            }
            buf.extend_from_slice(value.as_bytes());
        }
        buf
    }

    /// Decode a key from bytes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let values = bytes
            .split(|b| *b == SEPARATOR)
            .map(|part| String::from_utf8(part.to_vec()).ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self { values })
    }

    /// Opaque pagination token for this key.
    pub fn to_token(&self) -> String {
        hex::encode(self.encode())
    }

    /// Parse a pagination token.
    pub fn from_token(token: &str) -> Option<Self> {
        let bytes = hex::decode(token).ok()?;
        Self::decode(&bytes)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.values.join("#"))
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordKey").field(&self.values).finish()
    }
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_key_is_raw() {
        let key = RecordKey::new(["stu-001"]);
        assert_eq!(key.encode(), b"stu-001".to_vec());
        assert_eq!(key.to_string(), "stu-001");
    }

    #[test]
    fn test_composite_key_decodes() {
        let key = RecordKey::new(["2024", "stu-001"]);
        let decoded = RecordKey::decode(&key.encode()).unwrap();

        assert_eq!(decoded, key);
        assert_eq!(decoded.to_string(), "2024#stu-001");
    }

    #[test]
    fn test_token_roundtrip() {
        let key = RecordKey::new(["op-42"]);
        assert_eq!(RecordKey::from_token(&key.to_token()), Some(key));
        assert!(RecordKey::from_token("not-hex").is_none());
    }

    #[test]
    fn test_ordering_follows_strings() {
        let a = RecordKey::new(["a-1"]).encode();
        let b = RecordKey::new(["b-1"]).encode();
        assert!(a < b);
    }
}
