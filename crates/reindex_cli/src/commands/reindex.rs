//! Reindex command implementation.

use crate::Cli;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use reindex_core::{
    Classifier, Config, IndexPolicy, IterationStrategy, MailDir, MessageBlobs, MimeParser,
    Progress, RedbIndex, RedbStore, Reindexer, RunOptions,
};
use std::time::Duration;
use tracing::debug;

/// Replay the store of `cli.dir` into a fresh index under `index-reindexed`.
pub fn run(cli: &Cli) -> Result<()> {
    let dir = MailDir::new(&cli.dir);

    // Guard before anything is opened or created
    dir.ensure_fresh_destination()?;

    let config = Config::load(dir.base())?;
    debug!(dir = %dir.base().display(), ?config, "Loaded configuration");

    let store = RedbStore::open(dir.store_dir())?;
    let blobs = MessageBlobs::open(dir.messages_path()).with_context(|| {
        format!(
            "Failed to open message file {}",
            dir.messages_path().display()
        )
    })?;
    let mut index = RedbIndex::create(dir.index_dir(), config.index.flush_every)?;

    let policy = IndexPolicy {
        index_deleted: cli.index_deleted,
        index_spam: cli.index_spam,
    };
    let strategy = if cli.reorder {
        IterationStrategy::DateSorted
    } else {
        IterationStrategy::Sequential
    };
    let options = RunOptions {
        limit: cli.num,
        progress_interval: config.progress.interval(),
    };

    let classifier = Classifier::new(blobs, MimeParser, policy);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(if cli.reorder {
        "Loading message dates..."
    } else {
        "Reindexing..."
    });

    let on_progress = &mut |progress: &Progress| {
        pb.println(progress.to_string());
        pb.set_message(format!("{} messages processed", progress.processed));
    };

    let result =
        Reindexer::new(&store, &mut index, options).run(strategy, &classifier, on_progress);
    pb.finish_and_clear();
    let stats = result.context("Reindex failed")?;

    let summary = stats.progress();
    println!("{}", summary);
    println!();
    println!("{}", style("Reindex Summary:").bold());
    println!("  Indexed:           {}", style(summary.indexed).green());
    println!("  Spam skipped:      {}", style(summary.spam).cyan());
    println!("  Deleted skipped:   {}", style(summary.deleted).cyan());
    println!(
        "  Malformed:         {}",
        if summary.malformed > 0 {
            style(summary.malformed).yellow()
        } else {
            style(summary.malformed).green()
        }
    );
    println!();
    println!(
        "{} Now replace {} with {}",
        style("✓").green(),
        style(dir.current_index_dir().display()).cyan(),
        style(dir.reindexed_root().display()).cyan()
    );

    Ok(())
}
