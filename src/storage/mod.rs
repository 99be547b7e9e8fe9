//! Data storage and persistence
//!
//! The key-value abstraction the ledger writes through, its sled and
//! in-memory backends, and the UTXO scanner that derives balances from the
//! stored chain.

pub mod memory_store;
pub mod store;
pub mod utxo_set;

pub use memory_store::MemoryStore;
pub use store::{KvStore, SledStore, BLOCKS_TREE};
pub use utxo_set::UTXOSet;
