//! Test utilities for ledger testing

use crate::config::Config;
use crate::core::{Block, Ledger, Transaction};
use crate::error::Result;
use crate::storage::{MemoryStore, SledStore};
use tempfile::TempDir;

/// Easy difficulty keeps mining in the hundreds of hashes
pub const TEST_DIFFICULTY: u32 = 8;

pub fn test_config() -> Config {
    Config {
        difficulty: TEST_DIFFICULTY,
        ..Default::default()
    }
}

/// In-memory ledger whose genesis pays the default subsidy to `address`
pub fn create_test_ledger(address: &str) -> Ledger<MemoryStore> {
    Ledger::create_with_store(MemoryStore::new(), &test_config(), address)
        .expect("in-memory ledger creation should not fail")
}

/// On-disk ledger in a fresh temporary directory
pub fn create_disk_ledger(address: &str) -> Result<(Ledger<SledStore>, TempDir)> {
    let temp_dir = tempfile::tempdir()?;
    let config = Config::with_data_dir(temp_dir.path().join("test_ledger"));
    let ledger = Ledger::create(&config, address)?;
    Ok((ledger, temp_dir))
}

/// Mines `count` coinbase-only blocks paying `address`
pub fn mine_coinbase_blocks<S: crate::storage::KvStore>(
    ledger: &Ledger<S>,
    address: &str,
    count: usize,
) -> Result<Vec<Block>> {
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let coinbase = Transaction::new_coinbase_tx(address, "")?;
        blocks.push(ledger.mine_block(&[coinbase])?);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_ledger() {
        let ledger = create_test_ledger("Alice");
        assert_eq!(ledger.chain_length().unwrap(), 1);
        assert_eq!(ledger.difficulty(), TEST_DIFFICULTY);
    }

    #[test]
    fn test_create_disk_ledger() {
        let (ledger, _temp_dir) = create_disk_ledger("Alice").unwrap();
        assert_eq!(ledger.get_balance("Alice").unwrap(), 10);
    }

    #[test]
    fn test_mine_coinbase_blocks() {
        let ledger = create_test_ledger("Alice");
        let blocks = mine_coinbase_blocks(&ledger, "Bob", 2).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(ledger.get_balance("Bob").unwrap(), 20);
        assert_eq!(ledger.verify_chain().unwrap(), 3);
    }
}
