// Transactions move value by consuming earlier outputs and creating new ones.
// Ownership is a placeholder proof: an output is spendable by whoever presents
// the same string it was locked with. The ledger and the UTXO scanner only ever
// ask `Unlock::can_be_unlocked_with`, so a signature scheme can replace it here.

use crate::core::Ledger;
use crate::error::{LedgerError, Result};
use crate::storage::KvStore;
use crate::utils::{deserialize, random_hex, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};

/// Units minted by a coinbase transaction
pub const SUBSIDY: u64 = 10;

/// Output index carried by the single coinbase input
pub const COINBASE_VOUT: i32 = -1;

const COINBASE_FILLER_BYTES: usize = 20;

/// Authorization capability shared by inputs and outputs
pub trait Unlock {
    fn can_be_unlocked_with(&self, proof: &str) -> bool;
}

/// A reference to output `vout` of transaction `txid`, plus the proof that
/// authorizes spending it
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    txid: Vec<u8>,
    vout: i32,
    script_sig: String,
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i32, script_sig: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            script_sig: script_sig.to_string(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i32 {
        self.vout
    }

    pub fn get_script_sig(&self) -> &str {
        self.script_sig.as_str()
    }
}

impl Unlock for TXInput {
    fn can_be_unlocked_with(&self, proof: &str) -> bool {
        self.script_sig == proof
    }
}

/// `value` units locked to `script_pub_key`
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXOutput {
    value: u64,
    script_pub_key: String,
}

impl TXOutput {
    pub fn new(value: u64, address: &str) -> Result<TXOutput> {
        if value == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Output value must be positive".to_string(),
            ));
        }

        Ok(TXOutput {
            value,
            script_pub_key: address.to_string(),
        })
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_script_pub_key(&self) -> &str {
        self.script_pub_key.as_str()
    }
}

impl Unlock for TXOutput {
    fn can_be_unlocked_with(&self, proof: &str) -> bool {
        self.script_pub_key == proof
    }
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Builds a transaction from explicit inputs and outputs and sets its id
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Coinbase paying [`SUBSIDY`] to `to`. Empty `data` is replaced by random filler.
    pub fn new_coinbase_tx(to: &str, data: &str) -> Result<Transaction> {
        Self::new_coinbase_tx_with_reward(to, data, SUBSIDY)
    }

    pub fn new_coinbase_tx_with_reward(to: &str, data: &str, reward: u64) -> Result<Transaction> {
        let data = if data.is_empty() {
            random_hex(COINBASE_FILLER_BYTES)
        } else {
            data.to_string()
        };

        let txin = TXInput::new(&[], COINBASE_VOUT, &data);
        let txout = TXOutput::new(reward, to)?;
        Self::new(vec![txin], vec![txout])
    }

    /// Spends `amount` from `from` to `to`, returning any surplus to `from` as change.
    ///
    /// Fails with [`LedgerError::InsufficientFunds`] without touching the ledger
    /// when `from` cannot cover `amount`.
    pub fn new_utxo_transaction<S: KvStore>(
        from: &str,
        to: &str,
        amount: u64,
        ledger: &Ledger<S>,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }

        let (accumulated, valid_outputs) = ledger.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                LedgerError::InvalidTransaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out in outs {
                inputs.push(TXInput::new(&txid, out, from));
            }
        }

        let mut outputs = vec![TXOutput::new(amount, to)?];
        let change = accumulated - amount;
        if change > 0 {
            outputs.push(TXOutput::new(change, from)?);
        }

        Self::new(inputs, outputs)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    /// SHA-256 of the encoded transaction with its id cleared
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    /// Whether the stored id still matches the content
    pub fn verify_id(&self) -> Result<bool> {
        Ok(self.hash()? == self.id)
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn output_value(&self) -> Result<u64> {
        let mut total = 0u64;
        for vout in &self.vout {
            total = total.checked_add(vout.get_value()).ok_or_else(|| {
                LedgerError::InvalidTransaction("Output value overflow".to_string())
            })?;
        }
        Ok(total)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}
