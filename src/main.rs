//! Corpus-Harvester main entry point
//!
//! This is the command-line interface for the corpus harvester.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use corpus_harvester::archive::{
    fetch_crawl_ids, fetch_index_urls, fetch_segment_paths, write_locators,
    DEFAULT_ARCHIVE_BASE_URL, DEFAULT_COLLINFO_URL, DEFAULT_INDEX_BASE_URL,
};
use corpus_harvester::classify::{
    prepare_text, run_classification, ClassifierLoader, ModelLoader,
};
use corpus_harvester::config::{apply_env_overrides, load_config_with_hash, validate, Config};
use corpus_harvester::crawler::{
    build_http_client, collect_domains, crawl, read_seed_file, write_domain_csv,
};
use corpus_harvester::output::{
    print_crawl_summary, print_pipeline_summary, write_markdown_summary, RunInfo, RunKind,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Corpus-Harvester: a domain-specific text corpus collector
///
/// Crawls seed domains for page text, and filters archived web snapshots
/// through a language classifier, keeping only the target language.
#[derive(Parser, Debug)]
#[command(name = "corpus-harvester")]
#[command(version)]
#[command(about = "Collect a single-language text corpus from the web", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the seed domains and append page text to the corpus file
    Crawl {
        /// Validate config and show what would be crawled without crawling
        #[arg(long)]
        dry_run: bool,
    },

    /// Classify archive segments and keep records in the target language
    Classify {
        /// Read segments from this directory instead of downloading them
        #[arg(long, value_name = "DIR")]
        local_dir: Option<PathBuf>,
    },

    /// Build a seed CSV of distinct domains from URL list CSV files
    Domains {
        /// CSV files whose first column holds URLs
        #[arg(required = true, value_name = "INPUT")]
        inputs: Vec<PathBuf>,

        /// Seed file to write
        #[arg(short, long, default_value = "domain.csv")]
        output: PathBuf,
    },

    /// List archive crawls or download a crawl's segment path list
    Paths {
        /// Crawl id (defaults to the most recent crawl)
        #[arg(long, value_name = "ID")]
        crawl: Option<String>,

        /// Only print the available crawl ids
        #[arg(long)]
        list: bool,

        /// Locator file to write (defaults to the classifier paths file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Collection listing URL
        #[arg(long, default_value = DEFAULT_COLLINFO_URL)]
        collinfo_url: String,
    },

    /// Query a crawl's URL index and write the matching URLs as CSV
    Urls {
        /// Crawl id (defaults to the most recent crawl)
        #[arg(long, value_name = "ID")]
        crawl: Option<String>,

        /// URL pattern understood by the index
        #[arg(long, default_value = "*.mn")]
        pattern: String,

        /// Directory receiving `<crawl id>.csv`
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        /// Index host
        #[arg(long, default_value = DEFAULT_INDEX_BASE_URL)]
        index_url: String,

        /// Collection listing URL
        #[arg(long, default_value = DEFAULT_COLLINFO_URL)]
        collinfo_url: String,
    },

    /// Print the label and confidence the model assigns to a text
    Predict {
        /// Model file (defaults to the classifier model path)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Text to classify
        #[arg(required = true)]
        text: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load(cli.config.as_deref())?;

    match cli.command {
        Command::Crawl { dry_run: true } => handle_dry_run(&config),
        Command::Crawl { dry_run: false } => handle_crawl(&config, config_hash).await,
        Command::Classify { local_dir } => handle_classify(&config, config_hash, local_dir).await,
        Command::Domains { inputs, output } => handle_domains(&inputs, &output),
        Command::Paths {
            crawl,
            list,
            output,
            collinfo_url,
        } => handle_paths(&config, crawl, list, output, &collinfo_url).await,
        Command::Urls {
            crawl,
            pattern,
            output_dir,
            index_url,
            collinfo_url,
        } => {
            handle_urls(
                &config,
                crawl,
                &pattern,
                &output_dir,
                &index_url,
                &collinfo_url,
            )
            .await
        }
        Command::Predict { model, text } => handle_predict(&config, model, &text.join(" ")),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("corpus_harvester=info,warn"),
            1 => EnvFilter::new("corpus_harvester=debug,info"),
            2 => EnvFilter::new("corpus_harvester=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> anyhow::Result<(Config, Option<String>)> {
    match path {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok((config, Some(hash)))
        }
        None => {
            let mut config = Config::default();
            apply_env_overrides(&mut config)?;
            validate(&config)?;
            tracing::debug!("Using default configuration");
            Ok((config, None))
        }
    }
}

/// Cancels the returned token on Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight work");
            trigger.cancel();
        }
    });
    token
}

fn write_summary(config: &Config, info: &RunInfo, kind: &RunKind) -> anyhow::Result<()> {
    if let Some(path) = &config.output.summary_path {
        write_markdown_summary(info, kind, Path::new(path))
            .with_context(|| format!("Failed to write summary {}", path))?;
        println!("✓ Summary written to: {}", path);
    }
    Ok(())
}

/// Handles `crawl --dry-run`: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Corpus-Harvester Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Depth limit: {}", config.crawler.depth_limit);
    println!("  Page budget: {}", config.crawler.page_budget);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Deny patterns: {:?}", config.crawler.deny_patterns);

    println!("\nFetch:");
    println!("  Timeout: {}s", config.fetch.fetch_timeout);
    println!("  Retries: {}", config.fetch.retry_count);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Text: {}", config.output.text_path);
    println!("  Skip report: {}", config.output.skip_report_path);

    let seeds = read_seed_file(Path::new(&config.crawler.seeds_file))
        .with_context(|| format!("Failed to read seeds {}", config.crawler.seeds_file))?;

    println!("\nSeeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: Option<String>) -> anyhow::Result<()> {
    let started_at = Utc::now();
    let cancel = cancel_on_ctrl_c();

    let outcome = match crawl(config, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    print_crawl_summary(&outcome.report.summary, &outcome.report.skips);
    if outcome.write_failures > 0 {
        tracing::warn!("{} pages could not be written", outcome.write_failures);
    }

    let info = RunInfo {
        started_at,
        finished_at: Utc::now(),
        config_hash,
        interrupted: outcome.interrupted,
    };
    write_summary(config, &info, &RunKind::Crawl(outcome.report.summary))
}

/// Handles the archive classification pass
async fn handle_classify(
    config: &Config,
    config_hash: Option<String>,
    local_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let started_at = Utc::now();
    let cancel = cancel_on_ctrl_c();

    let summary = run_classification(config, local_dir, cancel.clone()).await?;
    print_pipeline_summary(&summary);

    let info = RunInfo {
        started_at,
        finished_at: Utc::now(),
        config_hash,
        interrupted: cancel.is_cancelled(),
    };
    write_summary(config, &info, &RunKind::Classify(summary))
}

/// Handles the seed list builder
fn handle_domains(inputs: &[PathBuf], output: &Path) -> anyhow::Result<()> {
    let domains = collect_domains(inputs)?;
    let count = write_domain_csv(output, &domains)?;
    println!("✓ {} domains written to: {}", count, output.display());
    Ok(())
}

/// Handles crawl listing and segment path download
async fn handle_paths(
    config: &Config,
    crawl: Option<String>,
    list: bool,
    output: Option<PathBuf>,
    collinfo_url: &str,
) -> anyhow::Result<()> {
    let classifier = config.classifier.as_ref();
    let timeout = classifier
        .map(|c| c.segment_timeout)
        .unwrap_or(config.fetch.fetch_timeout);
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(timeout),
        Duration::from_secs(config.fetch.connect_timeout),
    )?;

    let base_url = classifier
        .map(|c| c.archive_base_url.clone())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_BASE_URL.to_string());

    let crawl_id = match (crawl, list) {
        (Some(id), false) => id,
        (crawl, _) => {
            let ids = fetch_crawl_ids(&client, collinfo_url).await?;
            if list {
                for id in &ids {
                    println!("{}", id);
                }
                return Ok(());
            }
            match crawl.or_else(|| ids.into_iter().next()) {
                Some(id) => id,
                None => bail!("The archive lists no crawls"),
            }
        }
    };

    let locators = fetch_segment_paths(&client, &base_url, &crawl_id).await?;

    let output = output
        .or_else(|| classifier.map(|c| PathBuf::from(&c.paths_file)))
        .unwrap_or_else(|| PathBuf::from("wet.paths"));
    write_locators(&output, &locators)?;

    println!(
        "✓ {} segment paths of {} written to: {}",
        locators.len(),
        crawl_id,
        output.display()
    );
    Ok(())
}

/// Handles the URL index query
async fn handle_urls(
    config: &Config,
    crawl: Option<String>,
    pattern: &str,
    output_dir: &Path,
    index_url: &str,
    collinfo_url: &str,
) -> anyhow::Result<()> {
    let client = build_http_client(
        &config.user_agent,
        Duration::from_secs(config.fetch.fetch_timeout),
        Duration::from_secs(config.fetch.connect_timeout),
    )?;

    let crawl_id = match crawl {
        Some(id) => id,
        None => match fetch_crawl_ids(&client, collinfo_url).await?.into_iter().next() {
            Some(id) => id,
            None => bail!("The archive lists no crawls"),
        },
    };

    let urls = fetch_index_urls(&client, index_url, &crawl_id, pattern).await?;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let output = output_dir.join(format!("{}.csv", crawl_id));
    let count = write_domain_csv(&output, &urls)?;

    println!(
        "✓ {} URLs of {} matching {} written to: {}",
        count,
        crawl_id,
        pattern,
        output.display()
    );
    Ok(())
}

/// Handles one-off prediction of a text
fn handle_predict(config: &Config, model: Option<PathBuf>, text: &str) -> anyhow::Result<()> {
    let model = match model.or_else(|| {
        config
            .classifier
            .as_ref()
            .map(|c| PathBuf::from(&c.model_path))
    }) {
        Some(model) => model,
        None => bail!("No model given: pass --model or configure [classifier]"),
    };

    let classifier = ModelLoader::new(model).load()?;

    let prepared = prepare_text(text);
    if prepared.is_empty() {
        bail!("Nothing to classify");
    }

    let prediction = classifier.predict(&prepared)?;
    println!("{} {:.4}", prediction.label, prediction.confidence);
    Ok(())
}
