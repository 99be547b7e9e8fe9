//! Error handling for the ledger
//!
//! Every core operation reports failure through [`LedgerError`]; nothing in
//! the library terminates the process.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error kinds surfaced by the ledger, the storage layer and the UTXO scanner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A chain already exists at the configured storage location
    LedgerAlreadyExists,
    /// No chain exists at the configured storage location
    LedgerNotFound,
    /// Open/read/write failure on the underlying store
    StorageUnavailable(String),
    /// A stored block or transaction could not be decoded, or is missing
    CorruptRecord(String),
    /// Requested spend exceeds the address's total unspent value
    InsufficientFunds { required: u64, available: u64 },
    /// Transaction rejected before mining
    InvalidTransaction(String),
    /// Block rejected before mining, or failed a chain audit
    InvalidBlock(String),
    /// Proof-of-work search failed
    Mining(String),
    /// Encoding a record failed
    Serialization(String),
    /// Configuration errors
    Config(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::LedgerAlreadyExists => write!(f, "Ledger already exists"),
            LedgerError::LedgerNotFound => {
                write!(f, "No existing ledger found. Create one first.")
            }
            LedgerError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {msg}"),
            LedgerError::CorruptRecord(msg) => write!(f, "Corrupt record: {msg}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            LedgerError::Mining(msg) => write!(f, "Mining error: {msg}"),
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::CorruptRecord(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_message() {
        let err = LedgerError::InsufficientFunds {
            required: 100,
            available: 6,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: required 100, available 6"
        );
    }

    #[test]
    fn test_io_error_maps_to_storage_unavailable() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: LedgerError = io.into();
        assert!(matches!(err, LedgerError::StorageUnavailable(_)));
    }
}
