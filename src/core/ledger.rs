// The ledger owns the chain tip and the storage handle. Blocks are stored under
// their own hash; the reserved key "l" always points at the newest block, and
// both are written in one atomic batch so the tip never names a missing block.
// The difficulty the chain is mined at is written once, alongside genesis.

use crate::config::Config;
use crate::core::{Block, ProofOfWork, TXOutput, Transaction, Unlock};
use crate::error::{LedgerError, Result};
use crate::storage::{KvStore, SledStore, UTXOSet};
use data_encoding::HEXLOWER;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

/// Reserved key holding the hash of the latest block
pub const TIP_BLOCK_HASH_KEY: &[u8] = b"l";
/// Reserved key holding the chain difficulty as a big-endian u32
pub const DIFFICULTY_KEY: &[u8] = b"difficulty";

pub struct Ledger<S: KvStore = SledStore> {
    tip_hash: RwLock<Vec<u8>>,
    store: S,
    difficulty: u32,
    subsidy: u64,
    // Serializes genesis creation and mining
    write_lock: Mutex<()>,
}

impl Ledger<SledStore> {
    /// Creates a new chain under `config.data_dir`, paying the genesis subsidy to `address`
    pub fn create(config: &Config, address: &str) -> Result<Ledger> {
        config.validate()?;
        let store = SledStore::open(&config.data_dir)?;
        Self::create_with_store(store, config, address)
    }

    /// Opens the chain under `config.data_dir`
    pub fn open(config: &Config) -> Result<Ledger> {
        config.validate()?;
        if !SledStore::exists(&config.data_dir) {
            return Err(LedgerError::LedgerNotFound);
        }
        let store = SledStore::open(&config.data_dir)?;
        Self::open_with_store(store, config)
    }
}

impl<S: KvStore> Ledger<S> {
    pub fn create_with_store(store: S, config: &Config, address: &str) -> Result<Ledger<S>> {
        if store.contains(TIP_BLOCK_HASH_KEY)? {
            warn!("Refusing to create a ledger over an existing chain");
            return Err(LedgerError::LedgerAlreadyExists);
        }

        let ledger = Ledger {
            tip_hash: RwLock::new(vec![]),
            store,
            difficulty: config.difficulty,
            subsidy: config.subsidy,
            write_lock: Mutex::new(()),
        };

        {
            let _guard = ledger.lock_writer();
            info!("Creating genesis block for address: {address}");
            let coinbase_tx = Transaction::new_coinbase_tx_with_reward(
                address,
                &config.genesis_coinbase_data,
                config.subsidy,
            )?;
            let genesis = Block::generate_genesis_block(&coinbase_tx, config.difficulty)?;
            let block_data = genesis.serialize()?;
            let difficulty = config.difficulty.to_be_bytes();
            ledger.store.put_batch(&[
                (genesis.get_hash(), block_data.as_slice()),
                (DIFFICULTY_KEY, difficulty.as_slice()),
                (TIP_BLOCK_HASH_KEY, genesis.get_hash()),
            ])?;
            ledger.set_tip_hash(genesis.get_hash());
        }

        Ok(ledger)
    }

    /// Opens an existing chain. Fails with `Config` when `config.difficulty`
    /// differs from the difficulty the chain was created with.
    pub fn open_with_store(store: S, config: &Config) -> Result<Ledger<S>> {
        let tip_hash = store
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or(LedgerError::LedgerNotFound)?;

        let stored = store.get(DIFFICULTY_KEY)?.ok_or_else(|| {
            LedgerError::CorruptRecord("Chain difficulty record is missing".to_string())
        })?;
        let stored: [u8; 4] = stored.as_slice().try_into().map_err(|_| {
            LedgerError::CorruptRecord(format!(
                "Chain difficulty record has {} bytes, expected 4",
                stored.len()
            ))
        })?;
        let difficulty = u32::from_be_bytes(stored);
        if difficulty != config.difficulty {
            return Err(LedgerError::Config(format!(
                "Chain was created with difficulty {difficulty}, configured difficulty is {}",
                config.difficulty
            )));
        }

        Ok(Ledger {
            tip_hash: RwLock::new(tip_hash),
            store,
            difficulty,
            subsidy: config.subsidy,
            write_lock: Mutex::new(()),
        })
    }

    pub fn get_store(&self) -> &S {
        &self.store
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn subsidy(&self) -> u64 {
        self.subsidy
    }

    pub fn tip_hash(&self) -> Vec<u8> {
        self.tip_hash
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_tip_hash(&self, new_tip_hash: &[u8]) {
        let mut tip_hash = self
            .tip_hash
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *tip_hash = new_tip_hash.to_vec();
    }

    fn lock_writer(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Block record and tip pointer go down together or not at all
    fn append(&self, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;
        self.store.put_batch(&[
            (block.get_hash(), block_data.as_slice()),
            (TIP_BLOCK_HASH_KEY, block.get_hash()),
        ])?;
        self.set_tip_hash(block.get_hash());
        Ok(())
    }

    /// Validates `transactions`, mines them on top of the current tip and
    /// advances the tip. Nothing is written when any step fails.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        let _guard = self.lock_writer();

        if transactions.is_empty() {
            return Err(LedgerError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }
        self.verify_transactions(transactions)?;

        let last_hash = self
            .store
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or(LedgerError::LedgerNotFound)?;

        info!(
            "Mining block with {} transactions (difficulty: {})",
            transactions.len(),
            self.difficulty
        );
        let block = Block::new_block(last_hash, transactions, self.difficulty)?;
        self.append(&block)?;
        info!("Successfully mined block: {}", block.hash_hex());

        Ok(block)
    }

    pub fn iterator(&self) -> LedgerIterator<'_, S> {
        LedgerIterator::new(self.tip_hash(), &self.store)
    }

    /// Every block from tip to genesis
    pub fn blocks(&self) -> Result<Vec<Block>> {
        self.iterator().collect()
    }

    pub fn chain_length(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iterator() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        match self.store.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn block_exists(&self, block_hash: &[u8]) -> Result<bool> {
        self.store.contains(block_hash)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            for transaction in block.get_transactions() {
                if txid.eq(transaction.get_id()) {
                    return Ok(Some(transaction.clone()));
                }
            }
        }
        Ok(None)
    }

    pub fn is_output_spent(&self, txid: &[u8], vout: i32) -> Result<bool> {
        for block in self.iterator() {
            let block = block?;
            for transaction in block.get_transactions() {
                if transaction.is_coinbase() {
                    continue;
                }
                for input in transaction.get_vin() {
                    if input.get_txid() == txid && input.get_vout() == vout {
                        return Ok(true);
                    }
                }
            }
        }
        Ok(false)
    }

    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        UTXOSet::new(self).find_unspent_transactions(address)
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TXOutput>> {
        UTXOSet::new(self).find_utxo(address)
    }

    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<i32>>)> {
        UTXOSet::new(self).find_spendable_outputs(address, amount)
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        UTXOSet::new(self).get_balance(address)
    }

    /// Walks tip to genesis checking every block's hash, puzzle and
    /// transaction ids. Returns the number of blocks checked.
    pub fn verify_chain(&self) -> Result<usize> {
        let mut checked = 0;

        for block in self.iterator() {
            let block = block?;
            let hash_hex = block.hash_hex();

            let pow = ProofOfWork::new_proof_of_work(&block, self.difficulty);
            if pow.hash_with_nonce(block.get_nonce()) != block.get_hash() {
                return Err(LedgerError::InvalidBlock(format!(
                    "Block {hash_hex} does not hash to its stored hash"
                )));
            }
            if !pow.validate() {
                return Err(LedgerError::InvalidBlock(format!(
                    "Block {hash_hex} fails proof-of-work"
                )));
            }

            for transaction in block.get_transactions() {
                if !transaction.verify_id()? {
                    return Err(LedgerError::InvalidBlock(format!(
                        "Block {hash_hex} holds transaction {} with a mismatched id",
                        HEXLOWER.encode(transaction.get_id())
                    )));
                }
            }
            checked += 1;
        }

        Ok(checked)
    }

    // One pass over the chain: every transaction by id, and every output
    // already consumed by some input.
    fn chain_index(&self) -> Result<(HashMap<Vec<u8>, Transaction>, HashSet<(Vec<u8>, i32)>)> {
        let mut transactions = HashMap::new();
        let mut spent = HashSet::new();

        for block in self.iterator() {
            let block = block?;
            for transaction in block.get_transactions() {
                if !transaction.is_coinbase() {
                    for input in transaction.get_vin() {
                        spent.insert((input.get_txid().to_vec(), input.get_vout()));
                    }
                }
                transactions.insert(transaction.get_id().to_vec(), transaction.clone());
            }
        }

        Ok((transactions, spent))
    }

    fn verify_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let (chain_txs, chain_spent) = self.chain_index()?;
        let mut block_ids: HashSet<&[u8]> = HashSet::new();
        let mut block_spent: HashSet<(&[u8], i32)> = HashSet::new();
        let mut coinbase_count = 0;

        for (i, transaction) in transactions.iter().enumerate() {
            let txid_hex = HEXLOWER.encode(transaction.get_id());

            if !transaction.verify_id()? {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {i} ({txid_hex}) id does not match its content"
                )));
            }
            if chain_txs.contains_key(transaction.get_id())
                || !block_ids.insert(transaction.get_id())
            {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {txid_hex} already exists"
                )));
            }
            if transaction.get_vout().is_empty() {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {txid_hex} has no outputs"
                )));
            }

            if transaction.is_coinbase() {
                coinbase_count += 1;
                if coinbase_count > 1 {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Block holds more than one coinbase transaction ({txid_hex})"
                    )));
                }
                let minted = transaction.output_value()?;
                if minted != self.subsidy {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Coinbase {txid_hex} mints {minted}, subsidy is {}",
                        self.subsidy
                    )));
                }
                continue;
            }
            if transaction.get_vin().is_empty() {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {txid_hex} has no inputs"
                )));
            }

            let mut input_value = 0u64;
            for input in transaction.get_vin() {
                let outpoint = format!("{}:{}", HEXLOWER.encode(input.get_txid()), input.get_vout());

                if !block_spent.insert((input.get_txid(), input.get_vout())) {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Double-spending detected in transaction {i}: output {outpoint} already spent in this block"
                    )));
                }

                let prev_tx = chain_txs.get(input.get_txid()).ok_or_else(|| {
                    LedgerError::InvalidTransaction(format!(
                        "Referenced transaction not found for input {outpoint}"
                    ))
                })?;
                let prev_out = usize::try_from(input.get_vout())
                    .ok()
                    .and_then(|idx| prev_tx.get_vout().get(idx))
                    .ok_or_else(|| {
                        LedgerError::InvalidTransaction(format!(
                            "Invalid output index for input {outpoint}"
                        ))
                    })?;

                if chain_spent.contains(&(input.get_txid().to_vec(), input.get_vout())) {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Input already spent: {outpoint}"
                    )));
                }
                if !prev_out.can_be_unlocked_with(input.get_script_sig()) {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Input {outpoint} is not authorized to spend the referenced output"
                    )));
                }

                input_value = input_value.checked_add(prev_out.get_value()).ok_or_else(|| {
                    LedgerError::InvalidTransaction("Input value overflow".to_string())
                })?;
            }

            let output_value = transaction.output_value()?;
            if input_value != output_value {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {txid_hex} is unbalanced: inputs={input_value}, outputs={output_value}"
                )));
            }
        }

        Ok(())
    }
}

/// Single-use walk from a captured tip back to genesis.
///
/// Yields `Err` once and then stops if a block is missing, cannot be decoded,
/// or links back to a block already visited.
pub struct LedgerIterator<'a, S: KvStore> {
    store: &'a S,
    current_hash: Vec<u8>,
    visited: HashSet<Vec<u8>>,
    failed: bool,
}

impl<'a, S: KvStore> LedgerIterator<'a, S> {
    fn new(tip_hash: Vec<u8>, store: &'a S) -> LedgerIterator<'a, S> {
        LedgerIterator {
            store,
            current_hash: tip_hash,
            visited: HashSet::new(),
            failed: false,
        }
    }

    fn load_current(&self) -> Result<Block> {
        let hash_hex = HEXLOWER.encode(&self.current_hash);
        let data = self.store.get(&self.current_hash)?.ok_or_else(|| {
            LedgerError::CorruptRecord(format!("Block {hash_hex} not found in store"))
        })?;
        let block = Block::deserialize(&data)
            .map_err(|e| LedgerError::CorruptRecord(format!("Block {hash_hex}: {e}")))?;
        if block.get_hash() != self.current_hash.as_slice() {
            return Err(LedgerError::CorruptRecord(format!(
                "Block stored under {hash_hex} carries hash {}",
                block.hash_hex()
            )));
        }
        Ok(block)
    }
}

impl<S: KvStore> Iterator for LedgerIterator<'_, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_hash.is_empty() {
            return None;
        }
        if !self.visited.insert(self.current_hash.clone()) {
            self.failed = true;
            return Some(Err(LedgerError::CorruptRecord(format!(
                "Cycle detected: block {} visited twice",
                HEXLOWER.encode(&self.current_hash)
            ))));
        }
        match self.load_current() {
            Ok(block) => {
                self.current_hash = block.get_pre_block_hash().to_vec();
                Some(Ok(block))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
