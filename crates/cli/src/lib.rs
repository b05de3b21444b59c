pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "eorbench",
    about = "EOR quote benchmarking CLI",
    long_about = "Extract comparable prices from provider payloads, rank providers and reconcile enhanced quotes.",
    after_help = "Examples:\n  eorbench extract --provider deel --input deel.json\n  eorbench compare --input quotes.json\n  eorbench reconcile --input request.json --llm\n  eorbench config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Extract one provider's comparable monthly price from a raw payload")]
    Extract {
        #[arg(long, help = "Provider id, e.g. deel, remote, oyster")]
        provider: String,
        #[arg(long, help = "Path to the raw provider payload (JSON)")]
        input: PathBuf,
        #[arg(long, help = "Optional enhanced quote (JSON) that takes precedence over the payload")]
        enhancement: Option<PathBuf>,
        #[arg(long, help = "Months used to amortize one-time add-ons")]
        contract_months: Option<u32>,
    },
    #[command(about = "Rank providers by comparable monthly price")]
    Compare {
        #[arg(long, help = "Path to a JSON array of quotes or {quotes, contractMonths}")]
        input: PathBuf,
        #[arg(long, help = "Months used to amortize one-time add-ons")]
        contract_months: Option<u32>,
    },
    #[command(about = "Reconcile declared totals against recomputed totals")]
    Reconcile {
        #[arg(long, help = "Path to a reconciliation request (JSON)")]
        input: PathBuf,
        #[arg(long, help = "Ask the configured llm for review recommendations")]
        llm: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Extract { provider, input, enhancement, contract_months } => {
            commands::extract::run(&provider, &input, enhancement.as_deref(), contract_months)
        }
        Command::Compare { input, contract_months } => {
            commands::compare::run(&input, contract_months)
        }
        Command::Reconcile { input, llm } => commands::reconcile::run(&input, llm),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
