//! Configuration management
//!
//! The storage location and chain parameters travel as an explicit
//! [`Config`] value; there is no process-global configuration.

pub mod settings;

pub use settings::{Config, DEFAULT_DIFFICULTY, DEFAULT_SUBSIDY, GENESIS_COINBASE_DATA};
