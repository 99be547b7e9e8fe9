//! Utility functions and helpers
//!
//! Hashing, timestamps, random filler and the bincode record encoding.

pub mod crypto;
pub mod serialization;

pub use crypto::{current_timestamp, random_hex, sha256_digest};

pub use serialization::{deserialize, serialize};
