//! # UTXO Ledger
//!
//! An append-only, hash-linked chain of blocks secured by proof-of-work, with
//! balances derived by scanning unspent transaction outputs.
//!
//! ## Layout
//! - `core/`: blocks, proof-of-work, transactions and the ledger itself
//! - `storage/`: the key-value store the ledger writes through, and the UTXO scanner
//! - `config/`: storage location and chain parameters
//! - `error/`: the error type every operation returns
//! - `utils/`: hashing, timestamps and record encoding
//! - `cli/`: argument parsing for the binary
//!
//! ## Invariants
//! - The store maps key `"l"` to the current tip hash, and every block is
//!   retrievable by its own hash. Both are written in one atomic batch.
//! - Every block hash is below `2^(256 - difficulty)`.
//! - An output is spendable once: `Ledger::mine_block` rejects any input that
//!   refers to an unknown, already spent or unauthorized output.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, Ledger, LedgerIterator, ProofOfWork, TXInput, TXOutput, Transaction, Unlock, SUBSIDY,
};
pub use error::{LedgerError, Result};
pub use storage::{KvStore, MemoryStore, SledStore, UTXOSet};
pub use utils::{current_timestamp, sha256_digest};
