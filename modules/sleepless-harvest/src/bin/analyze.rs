//! Offline pass over a saved corpus: score every author's sleep pattern and
//! list the ones that look automated.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sleepless_common::Config;
use sleepless_harvest::load_tolerant;
use sleepless_store::{score_authors, suspects, ActivityStore};

#[derive(Parser)]
#[command(name = "sleepless-analyze", about = "Flag authors who never seem to sleep")]
struct Cli {
    /// Corpus to analyze (overrides SLEEPLESS_CORPUS_PATH)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Bucket count for the author table
    #[arg(long, default_value_t = 100_000)]
    buckets: usize,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sleepless=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let corpus = cli
        .corpus
        .unwrap_or_else(|| Config::files_from_env().corpus_path);

    let mut store = ActivityStore::with_capacity_hint(cli.buckets)?;
    // A bad record ends the load; what was read before it is still scored.
    load_tolerant(&mut store, &corpus);
    info!(
        authors = store.author_count(),
        posts = store.post_count(),
        "Corpus ready for analysis"
    );

    score_authors(&mut store);
    let report = suspects(&store);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for suspect in &report {
        println!(
            "@{} (bucket {}) score {:.3}, longest awake span {:.1}h over {} posts{}",
            suspect.handle,
            suspect.key.bucket(),
            suspect.bot_score,
            suspect.max_awake_span,
            suspect.posts,
            if suspect.self_declared { ", handle says bot" } else { "" }
        );
        if let Some(latest) = store
            .author(&suspect.handle)
            .and_then(|a| a.posts().last())
        {
            println!("{latest}\n");
        }
    }
    println!("{} of {} authors flagged", report.len(), store.author_count());

    Ok(())
}
