//! mail-reindex - Rebuild a mail directory's search index from its store.

use clap::Parser;
use console::style;
use reindex_core::ReindexError;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "mail-reindex")]
#[command(about = "Rebuild the search index of a mail directory from its store", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Mail directory containing store, messages and hooks
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,
    /// Replay messages in date order instead of store order
    #[arg(long)]
    pub reorder: bool,
    /// Index messages marked deleted
    #[arg(long)]
    pub index_deleted: bool,
    /// Index messages marked spam
    #[arg(short = 's', long)]
    pub index_spam: bool,
    /// Stop after processing this many messages
    #[arg(short = 'n', long = "num")]
    pub num: Option<u64>,
    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respects RUST_LOG (e.g. RUST_LOG=reindex_core=debug) unless --verbose
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match commands::reindex::run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", style("error:").red().bold(), err);
            if let Some(hint) = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<ReindexError>())
                .and_then(ReindexError::recovery_suggestion)
            {
                eprintln!("  {} {}", style("hint:").cyan(), hint);
            }
            ExitCode::FAILURE
        }
    }
}
