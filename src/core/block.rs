use crate::core::{ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use log::info;
use serde::{Deserialize, Serialize};

/// A mined block. Immutable once `new_block` returns.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    timestamp: i64,
    pre_block_hash: Vec<u8>,
    hash: Vec<u8>,
    transactions: Vec<Transaction>,
    nonce: i64,
}

impl Block {
    /// Stamps the current time and runs proof-of-work at `difficulty`
    pub fn new_block(
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        difficulty: u32,
    ) -> Result<Block> {
        let timestamp = current_timestamp()?;
        Self::mine_at(timestamp, pre_block_hash, transactions, difficulty)
    }

    pub fn generate_genesis_block(transaction: &Transaction, difficulty: u32) -> Result<Block> {
        Block::new_block(vec![], std::slice::from_ref(transaction), difficulty)
    }

    /// Mines a block with a caller-chosen timestamp
    pub(crate) fn mine_at(
        timestamp: i64,
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        difficulty: u32,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            timestamp,
            pre_block_hash,
            hash: vec![],
            transactions: transactions.to_vec(),
            nonce: 0,
        };

        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block, difficulty).run()?;
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Proof-of-work completed for block {} (nonce {nonce}, difficulty {difficulty})",
            block.hash_hex()
        );

        Ok(block)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn hash_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.hash)
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    /// Running hash over the transaction ids, in block order
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in &self.transactions {
            txhashs.extend(transaction.get_id());
        }

        sha256_digest(txhashs.as_slice())
    }

    /// Unmined block with a fixed timestamp and nonce (for testing only)
    #[cfg(test)]
    pub(crate) fn new_test_block(
        timestamp: i64,
        pre_block_hash: Vec<u8>,
        transactions: &[Transaction],
        nonce: i64,
    ) -> Block {
        Block {
            timestamp,
            pre_block_hash,
            hash: vec![],
            transactions: transactions.to_vec(),
            nonce,
        }
    }

    /// Copy with a different nonce and everything else, hash included, unchanged
    #[cfg(test)]
    pub(crate) fn with_nonce(&self, nonce: i64) -> Block {
        Block {
            nonce,
            ..self.clone()
        }
    }

    /// Copy with a different parent link and everything else unchanged
    #[cfg(test)]
    pub(crate) fn with_pre_block_hash(&self, pre_block_hash: Vec<u8>) -> Block {
        Block {
            pre_block_hash,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_DIFFICULTY: u32 = 8;

    #[test]
    fn test_empty_block_rejected() {
        let result = Block::new_block(vec![1, 2, 3], &[], TEST_DIFFICULTY);
        assert!(matches!(result, Err(LedgerError::InvalidBlock(_))));
    }

    #[test]
    fn test_genesis_has_empty_prev_hash() {
        let coinbase = Transaction::new_coinbase_tx("Alice", "genesis").unwrap();
        let genesis = Block::generate_genesis_block(&coinbase, TEST_DIFFICULTY).unwrap();

        assert!(genesis.is_genesis());
        assert!(genesis.get_pre_block_hash().is_empty());
        assert_eq!(genesis.get_hash().len(), 32);
        assert_eq!(genesis.get_transactions(), &[coinbase]);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let coinbase = Transaction::new_coinbase_tx("Alice", "genesis").unwrap();
        let block = Block::new_block(vec![7; 32], &[coinbase], TEST_DIFFICULTY).unwrap();

        let bytes = block.serialize().unwrap();
        let decoded = Block::deserialize(&bytes).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_truncated_record_is_corrupt() {
        let coinbase = Transaction::new_coinbase_tx("Alice", "genesis").unwrap();
        let block = Block::new_block(vec![], &[coinbase], TEST_DIFFICULTY).unwrap();
        let bytes = block.serialize().unwrap();

        let result = Block::deserialize(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(LedgerError::CorruptRecord(_))));
    }

    #[test]
    fn test_hash_transactions_depends_on_order() {
        let a = Transaction::new_coinbase_tx("Alice", "a").unwrap();
        let b = Transaction::new_coinbase_tx("Bob", "b").unwrap();

        let ab = Block::new_test_block(0, vec![], &[a.clone(), b.clone()], 0);
        let ba = Block::new_test_block(0, vec![], &[b, a], 0);
        assert_ne!(ab.hash_transactions(), ba.hash_transactions());
        assert_eq!(ab.hash_transactions(), ab.clone().hash_transactions());
    }
}
