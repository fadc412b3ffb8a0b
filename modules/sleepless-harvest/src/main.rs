use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apify_client::ApifyClient;
use sleepless_common::{load_sources, Config, HarvestSettings};
use sleepless_harvest::{resume_corpus, shutdown, Harvester};
use sleepless_store::ActivityStore;

#[derive(Parser)]
#[command(
    name = "sleepless-harvest",
    about = "Harvest geotagged posts into a deduplicated per-author corpus"
)]
struct Cli {
    /// Only poll sources with a population above this
    min_population: u64,

    /// Stop once this many distinct posts are held
    target: usize,

    /// Search query, joined with spaces
    #[arg(required = true, num_args = 1.., trailing_var_arg = true)]
    query: Vec<String>,

    /// Source list (overrides SLEEPLESS_SOURCES_PATH)
    #[arg(long)]
    sources: Option<PathBuf>,

    /// Primary corpus (overrides SLEEPLESS_CORPUS_PATH)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Shutdown snapshot target (overrides SLEEPLESS_SNAPSHOT_PATH)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("sleepless=info".parse()?)
        .add_directive("apify_client=info".parse()?);
    let fmt = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        fmt.json().init();
    } else {
        fmt.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    // Load config
    let mut config = Config::from_env()?;
    if let Some(path) = cli.sources {
        config.sources_path = path;
    }
    if let Some(path) = cli.corpus {
        config.corpus_path = path;
    }
    if let Some(path) = cli.snapshot {
        config.snapshot_path = path;
    }
    config.log_redacted();

    let sources = load_sources(&config.sources_path, cli.min_population).with_context(|| {
        format!("Failed to load source list {}", config.sources_path.display())
    })?;

    // Bucket count follows the target post count
    let mut store = ActivityStore::with_capacity_hint(cli.target)?;
    let started = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    if let Some(aside) = resume_corpus(&mut store, &config.corpus_path, &started)? {
        info!(
            damaged = %aside.display(),
            kept = store.post_count(),
            "Continuing with the readable part of the corpus"
        );
    }

    let client = match config.apify_base_url.clone() {
        Some(base_url) => ApifyClient::with_base_url(config.apify_api_token.clone(), base_url),
        None => ApifyClient::new(config.apify_api_token.clone()),
    };

    let mut harvester = Harvester::builder()
        .source(client)
        .store(store)
        .sources(sources)
        .query(cli.query.join(" "))
        .target(cli.target)
        .settings(HarvestSettings::default())
        .corpus_path(config.corpus_path.clone())
        .snapshot_path(config.snapshot_path.clone())
        .build();

    let stop = shutdown::spawn_signal_listener();
    let report = harvester.run(stop).await?;
    info!("Harvest complete. {report}");

    Ok(())
}
