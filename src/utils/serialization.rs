// Every stored record goes through these two functions so the on-disk encoding
// stays in one place.
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Serialize data using bincode 2.0 with standard configuration
pub fn serialize<T: Serialize + bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    let config = bincode::config::standard();
    bincode::encode_to_vec(data, config)
        .map_err(|e| LedgerError::Serialization(format!("Serialization failed: {e}")))
}

/// Deserialize data using bincode 2.0 with standard configuration
///
/// Any decode failure, and any bytes left over after the value, is reported
/// as [`LedgerError::CorruptRecord`].
pub fn deserialize<T>(bytes: &[u8]) -> Result<T>
where
    T: for<'de> Deserialize<'de> + bincode::Decode<()>,
{
    let config = bincode::config::standard();
    let (data, consumed) = bincode::decode_from_slice(bytes, config)
        .map_err(|e| LedgerError::CorruptRecord(format!("Deserialization failed: {e}")))?;
    if consumed != bytes.len() {
        return Err(LedgerError::CorruptRecord(format!(
            "Deserialization left {} trailing bytes",
            bytes.len() - consumed
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
    struct Record {
        id: i64,
        owner: String,
        indices: Vec<i32>,
    }

    #[test]
    fn test_serialize_deserialize() {
        let original = Record {
            id: -7,
            owner: "alice".to_string(),
            indices: vec![-1, 0, 3],
        };

        let serialized = serialize(&original).expect("Serialization should work");
        let deserialized: Record = deserialize(&serialized).expect("Deserialization should work");

        assert_eq!(original, deserialized);
    }

    #[test]
    fn test_deserialize_invalid_data_is_corrupt_record() {
        let invalid_bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        let result: Result<Record> = deserialize(&invalid_bytes);
        assert!(matches!(result, Err(LedgerError::CorruptRecord(_))));
    }

    #[test]
    fn test_trailing_bytes_are_corrupt_record() {
        let record = Record {
            id: 1,
            owner: "bob".to_string(),
            indices: vec![0],
        };
        let mut bytes = serialize(&record).unwrap();
        bytes.extend_from_slice(&[0xDE, 0xAD]);

        let result: Result<Record> = deserialize(&bytes);
        assert!(matches!(result, Err(LedgerError::CorruptRecord(_))));
    }
}
