// The UTXO set is never persisted. Every query rescans the chain from the tip
// back to genesis: spends are always met before the outputs they consume, so an
// output is reported only when no later input has claimed it.

use crate::core::{Ledger, TXOutput, Transaction, Unlock};
use crate::error::{LedgerError, Result};
use crate::storage::KvStore;
use data_encoding::HEXLOWER;
use log::debug;
use std::collections::{BTreeMap, HashMap};

/// A transaction that still holds outputs spendable by the scanned address
struct UnspentTransaction {
    transaction: Transaction,
    outputs: Vec<i32>,
}

pub struct UTXOSet<'a, S: KvStore> {
    ledger: &'a Ledger<S>,
}

fn output_index(idx: usize) -> Result<i32> {
    i32::try_from(idx)
        .map_err(|_| LedgerError::CorruptRecord(format!("Output index {idx} out of range")))
}

impl<'a, S: KvStore> UTXOSet<'a, S> {
    pub fn new(ledger: &'a Ledger<S>) -> UTXOSet<'a, S> {
        UTXOSet { ledger }
    }

    // ( K -> txid_hex, V -> transaction with its unspent output indices )
    fn scan(&self, address: &str) -> Result<BTreeMap<String, UnspentTransaction>> {
        let mut unspent: BTreeMap<String, UnspentTransaction> = BTreeMap::new();
        let mut spent_txos: HashMap<String, Vec<i32>> = HashMap::new();

        for block in self.ledger.iterator() {
            let block = block?;
            for tx in block.get_transactions() {
                let txid_hex = HEXLOWER.encode(tx.get_id());

                let mut outputs = vec![];
                for (idx, out) in tx.get_vout().iter().enumerate() {
                    let idx = output_index(idx)?;
                    let already_spent = spent_txos
                        .get(txid_hex.as_str())
                        .is_some_and(|outs| outs.contains(&idx));
                    if !already_spent && out.can_be_unlocked_with(address) {
                        outputs.push(idx);
                    }
                }
                if !outputs.is_empty() {
                    unspent.insert(
                        txid_hex.clone(),
                        UnspentTransaction {
                            transaction: tx.clone(),
                            outputs,
                        },
                    );
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    if txin.can_be_unlocked_with(address) {
                        spent_txos
                            .entry(HEXLOWER.encode(txin.get_txid()))
                            .or_default()
                            .push(txin.get_vout());
                    }
                }
            }
        }

        debug!(
            "UTXO scan for {address}: {} transactions with unspent outputs",
            unspent.len()
        );
        Ok(unspent)
    }

    /// Transactions holding at least one unspent output for `address`, sorted by id
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self
            .scan(address)?
            .into_values()
            .map(|entry| entry.transaction)
            .collect())
    }

    /// ( K -> txid_hex, V -> unspent (vout, output) pairs in index order )
    pub fn find_unspent_outputs(
        &self,
        address: &str,
    ) -> Result<BTreeMap<String, Vec<(i32, TXOutput)>>> {
        let mut result = BTreeMap::new();
        for (txid_hex, entry) in self.scan(address)? {
            let mut outs = vec![];
            for vout in entry.outputs {
                // Indices come from enumerating this same transaction's outputs
                if let Some(out) = entry.transaction.get_vout().get(vout as usize) {
                    outs.push((vout, out.clone()));
                }
            }
            result.insert(txid_hex, outs);
        }
        Ok(result)
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TXOutput>> {
        Ok(self
            .find_unspent_outputs(address)?
            .into_values()
            .flatten()
            .map(|(_, out)| out)
            .collect())
    }

    /// Picks unspent outputs in txid order, then index order, until `amount` is
    /// covered. Returns the total picked, which is below `amount` only when the
    /// address cannot cover it.
    pub fn find_spendable_outputs(
        &self,
        address: &str,
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<i32>>)> {
        let mut unspent_outputs: BTreeMap<String, Vec<i32>> = BTreeMap::new();
        let mut accumulated = 0u64;

        'work: for (txid_hex, outs) in self.find_unspent_outputs(address)? {
            for (vout, out) in outs {
                if accumulated >= amount {
                    break 'work;
                }
                accumulated = accumulated.checked_add(out.get_value()).ok_or_else(|| {
                    LedgerError::InvalidTransaction("Accumulated value overflow".to_string())
                })?;
                unspent_outputs.entry(txid_hex.clone()).or_default().push(vout);
            }
        }

        Ok((accumulated, unspent_outputs))
    }

    pub fn get_balance(&self, address: &str) -> Result<u64> {
        let mut balance = 0u64;
        for out in self.find_utxo(address)? {
            balance = balance.checked_add(out.get_value()).ok_or_else(|| {
                LedgerError::InvalidTransaction("Balance overflow".to_string())
            })?;
        }
        Ok(balance)
    }
}
