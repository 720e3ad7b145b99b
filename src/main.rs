//! Split Ledger CLI
//!
//! Reads a group ledger CSV (members, expenses, settlements) and prints
//! balances, a settlement plan, the settlement log or a member summary.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- balances ledger.csv > balances.csv
//! cargo run -- plan ledger.csv
//! cargo run -- summary ledger.csv --member alice
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `SPLIT_LEDGER_STRICT`: Same as `--strict`

use clap::{Parser, Subcommand};
use split_ledger::{summary, Ledger, MemberId, Result};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process;

#[derive(Debug, Parser)]
#[command(name = "split-ledger", version, about = "Shared expense ledger")]
struct Cli {
    /// Fail on the first rejected row or cached total drift
    #[arg(long, global = true, env = "SPLIT_LEDGER_STRICT")]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Net balance of every member
    Balances { input: PathBuf },

    /// Suggested payments that settle every group
    Plan { input: PathBuf },

    /// Recorded settlements, newest first
    Settlements { input: PathBuf },

    /// Per-group summary for one member
    Summary {
        input: PathBuf,

        #[arg(long)]
        member: String,
    },

    /// Totals across all groups of one member
    Dashboard {
        input: PathBuf,

        #[arg(long)]
        member: String,
    },
}

impl Command {
    fn input(&self) -> &PathBuf {
        match self {
            Command::Balances { input }
            | Command::Plan { input }
            | Command::Settlements { input }
            | Command::Summary { input, .. }
            | Command::Dashboard { input, .. } => input,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let file = File::open(cli.command.input())?;
    let reader = BufReader::new(file);

    let mut ledger = Ledger::new().with_strict(cli.strict);
    ledger.process_csv(reader)?;
    ledger.audit_cached_totals()?;

    let stdout = io::stdout();
    let handle = stdout.lock();

    match &cli.command {
        Command::Balances { .. } => ledger.write_balances(handle),
        Command::Plan { .. } => ledger.write_plan(handle),
        Command::Settlements { .. } => ledger.write_settlements(handle),
        Command::Summary { member, .. } => {
            summary::write_summary(&ledger, &MemberId::new(member.as_str()), handle)
        }
        Command::Dashboard { member, .. } => {
            summary::write_dashboard(&ledger, &MemberId::new(member.as_str()), handle)
        }
    }
}
