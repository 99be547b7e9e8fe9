use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "utxo-ledger", about = "Proof-of-work UTXO ledger")]
pub struct Opt {
    #[arg(long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
    #[arg(
        long = "data-dir",
        global = true,
        help = "Directory holding the chain database (overrides the config file)"
    )]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "createblockchain", about = "Create a new chain")]
    Createblockchain {
        #[arg(long, help = "The address to send genesis block reward to")]
        address: String,
    },
    #[command(name = "getbalance", about = "Get the balance of the target address")]
    GetBalance {
        #[arg(long, help = "The address to get balance for")]
        address: String,
    },
    #[command(name = "printchain", about = "Print all blocks from tip to genesis")]
    Printchain {
        #[arg(long, help = "Emit the blocks as JSON")]
        json: bool,
    },
    #[command(name = "send", about = "Send AMOUNT from one address to another and mine it")]
    Send {
        #[arg(long, help = "Source address")]
        from: String,
        #[arg(long, help = "Destination address")]
        to: String,
        #[arg(long, help = "Amount to send")]
        amount: u64,
    },
    #[command(name = "verifychain", about = "Check hashes and proof-of-work of every block")]
    Verifychain,
}
