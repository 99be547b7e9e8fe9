use crate::core::Block;
use crate::error::{LedgerError, Result};
use crate::utils::sha256_digest;
use log::debug;
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;

/// Hash puzzle for one block: find the smallest nonce whose hash, read as a
/// big-endian integer, is below `2^(256 - difficulty)`.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigInt,
    difficulty: u32,
}

const MAX_NONCE: i64 = i64::MAX;

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block, difficulty: u32) -> ProofOfWork<'a> {
        let mut target = BigInt::from(1);
        target.shl_assign(256 - difficulty.min(256));
        ProofOfWork {
            block,
            target,
            difficulty,
        }
    }

    pub fn get_target(&self) -> &BigInt {
        &self.target
    }

    /// Checks the block's stored nonce and timestamp against the target
    pub fn validate(&self) -> bool {
        let hash = self.hash_with_nonce(self.block.get_nonce());
        self.meets_target(&hash)
    }

    /// Block hash for a given nonce
    pub fn hash_with_nonce(&self, nonce: i64) -> Vec<u8> {
        let data = self.prepare_data(nonce);
        sha256_digest(data.as_slice())
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        let hash_int = BigInt::from_bytes_be(Sign::Plus, hash);
        hash_int < self.target
    }

    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_pre_block_hash());
        data_bytes.extend(self.block.hash_transactions());
        data_bytes.extend(self.block.get_timestamp().to_be_bytes());
        data_bytes.extend(i64::from(self.difficulty).to_be_bytes());
        data_bytes.extend(nonce.to_be_bytes());
        data_bytes
    }

    /// Sequential search from nonce 0. Returns the first winning nonce and its hash.
    pub fn run(&self) -> Result<(i64, Vec<u8>)> {
        debug!("Mining the block (difficulty {})", self.difficulty);
        let mut nonce = 0;
        while nonce < MAX_NONCE {
            let hash = self.hash_with_nonce(nonce);
            if self.meets_target(&hash) {
                debug!("Found nonce {nonce}");
                return Ok((nonce, hash));
            }
            nonce += 1;
        }
        Err(LedgerError::Mining(format!(
            "nonce space exhausted at difficulty {}",
            self.difficulty
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn template(timestamp: i64) -> Block {
        let coinbase = Transaction::new_coinbase_tx("Alice", "fixed").unwrap();
        Block::new_test_block(timestamp, vec![], &[coinbase], 0)
    }

    #[test]
    fn test_mined_block_validates() {
        let coinbase = Transaction::new_coinbase_tx("Alice", "").unwrap();
        let block = Block::new_block(vec![], &[coinbase], 8).unwrap();

        assert!(ProofOfWork::new_proof_of_work(&block, 8).validate());
    }

    #[test]
    fn test_run_is_deterministic() {
        let block = template(1_700_000_000_000);
        let first = ProofOfWork::new_proof_of_work(&block, 10).run().unwrap();
        let second = ProofOfWork::new_proof_of_work(&block.clone(), 10)
            .run()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_returns_smallest_nonce() {
        let block = template(42);
        let pow = ProofOfWork::new_proof_of_work(&block, 8);
        let (nonce, hash) = pow.run().unwrap();

        assert_eq!(hash, pow.hash_with_nonce(nonce));
        for earlier in 0..nonce {
            assert!(!pow.meets_target(&pow.hash_with_nonce(earlier)));
        }
    }

    #[test]
    fn test_validate_uses_stored_nonce() {
        // Pick a template whose winning nonce is not 0 so nonce-1 must fail
        let mut timestamp = 1;
        let (block, nonce) = loop {
            let block = template(timestamp);
            let (nonce, _) = ProofOfWork::new_proof_of_work(&block, 8).run().unwrap();
            if nonce > 0 {
                break (block, nonce);
            }
            timestamp += 1;
        };

        let good = Block::new_test_block(
            block.get_timestamp(),
            vec![],
            block.get_transactions(),
            nonce,
        );
        let bad = Block::new_test_block(
            block.get_timestamp(),
            vec![],
            block.get_transactions(),
            nonce - 1,
        );
        assert!(ProofOfWork::new_proof_of_work(&good, 8).validate());
        assert!(!ProofOfWork::new_proof_of_work(&bad, 8).validate());
    }

    #[test]
    fn test_higher_difficulty_has_smaller_target() {
        let block = template(0);
        let easy = ProofOfWork::new_proof_of_work(&block, 4);
        let hard = ProofOfWork::new_proof_of_work(&block, 12);

        assert!(hard.get_target() < easy.get_target());
        assert_eq!(*easy.get_target(), BigInt::from(1) << 252);
    }

    #[test]
    fn test_prepare_data_layout() {
        let block = template(7);
        let pow = ProofOfWork::new_proof_of_work(&block, 8);

        let data = pow.prepare_data(12345);
        // empty prev hash + 32-byte tx hash + timestamp + difficulty + nonce
        assert_eq!(data.len(), 32 + 8 + 8 + 8);
        assert_eq!(&data[data.len() - 8..], &12345i64.to_be_bytes());
        assert_ne!(data, pow.prepare_data(54321));
    }
}
