// Entry point for the ledger CLI. All real work happens in the library; this
// file maps subcommands onto ledger operations and decides the exit code.
use clap::Parser;
use data_encoding::HEXLOWER;
use log::error;
use serde_json::json;
use std::process;
use utxo_ledger::{Block, Command, Config, Ledger, Opt, ProofOfWork, Transaction};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load(opt.config.as_deref())?;
    if let Some(data_dir) = opt.data_dir {
        config.data_dir = data_dir;
    }

    match opt.command {
        Command::Createblockchain { address } => {
            Ledger::create(&config, &address)?;
            println!("Done!");
        }
        Command::GetBalance { address } => {
            let ledger = Ledger::open(&config)?;
            let balance = ledger.get_balance(&address)?;
            println!("Balance of '{address}': {balance}");
        }
        Command::Send { from, to, amount } => {
            let ledger = Ledger::open(&config)?;
            let transaction = Transaction::new_utxo_transaction(&from, &to, amount, &ledger)?;
            ledger.mine_block(&[transaction])?;
            println!("Success!");
        }
        Command::Printchain { json } => {
            let ledger = Ledger::open(&config)?;
            if json {
                let mut blocks = vec![];
                for block in ledger.iterator() {
                    blocks.push(block_to_json(&block?, ledger.difficulty()));
                }
                println!("{}", serde_json::to_string_pretty(&blocks)?);
            } else {
                for block in ledger.iterator() {
                    print_block(&block?, ledger.difficulty());
                }
            }
        }
        Command::Verifychain => {
            let ledger = Ledger::open(&config)?;
            let count = ledger.verify_chain()?;
            println!("Chain is valid: {count} blocks checked.");
        }
    }
    Ok(())
}

fn print_block(block: &Block, difficulty: u32) {
    let pow = ProofOfWork::new_proof_of_work(block, difficulty);
    println!("Prev. hash: {}", HEXLOWER.encode(block.get_pre_block_hash()));
    println!("Hash: {}", block.hash_hex());
    println!("Timestamp: {}", block.get_timestamp());
    println!("Nonce: {}", block.get_nonce());
    println!("PoW: {}", pow.validate());

    for tx in block.get_transactions() {
        println!("- Transaction {}", HEXLOWER.encode(tx.get_id()));
        if !tx.is_coinbase() {
            for input in tx.get_vin() {
                println!(
                    "-- Input txid = {}, vout = {}, from = {}",
                    HEXLOWER.encode(input.get_txid()),
                    input.get_vout(),
                    input.get_script_sig(),
                );
            }
        }
        for output in tx.get_vout() {
            println!(
                "-- Output value = {}, to = {}",
                output.get_value(),
                output.get_script_pub_key(),
            );
        }
    }
    println!();
}

fn block_to_json(block: &Block, difficulty: u32) -> serde_json::Value {
    let transactions: Vec<serde_json::Value> = block
        .get_transactions()
        .iter()
        .map(|tx| {
            json!({
                "id": HEXLOWER.encode(tx.get_id()),
                "coinbase": tx.is_coinbase(),
                "inputs": tx.get_vin().iter().map(|input| json!({
                    "txid": HEXLOWER.encode(input.get_txid()),
                    "vout": input.get_vout(),
                    "script_sig": input.get_script_sig(),
                })).collect::<Vec<_>>(),
                "outputs": tx.get_vout().iter().map(|output| json!({
                    "value": output.get_value(),
                    "script_pub_key": output.get_script_pub_key(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    json!({
        "prev_hash": HEXLOWER.encode(block.get_pre_block_hash()),
        "hash": block.hash_hex(),
        "timestamp": block.get_timestamp(),
        "nonce": block.get_nonce(),
        "pow_valid": ProofOfWork::new_proof_of_work(block, difficulty).validate(),
        "transactions": transactions,
    })
}
