//! Core ledger functionality
//!
//! Blocks, proof-of-work, the transaction model and the ledger that chains
//! them together.

pub mod block;
pub mod ledger;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use ledger::{Ledger, LedgerIterator, DIFFICULTY_KEY, TIP_BLOCK_HASH_KEY};
pub use proof_of_work::ProofOfWork;
pub use transaction::{TXInput, TXOutput, Transaction, Unlock, COINBASE_VOUT, SUBSIDY};
