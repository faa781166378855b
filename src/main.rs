use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

use feedprobe::config::Config;
use feedprobe::feed::{build_client, BatchCoordinator, SiteResolver};
use feedprobe::storage::{load_sites, save_sites};

#[derive(Parser, Debug)]
#[command(
    name = "feedprobe",
    version,
    about = "Discover RSS/Atom feeds for a JSON list of websites"
)]
struct Args {
    /// JSON file with the site list; read, then overwritten with the results
    #[arg(value_name = "INPUT_JSON_FILE")]
    sites_file: PathBuf,

    /// Config file (default: ~/.config/feedprobe/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of sites probed at once
    #[arg(long, value_name = "N")]
    site_concurrency: Option<usize>,

    /// Maximum number of requests in flight per site
    #[arg(long, value_name = "N")]
    probe_concurrency: Option<usize>,

    /// Timeout for each probe request, in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

impl Args {
    fn load_config(&self) -> Result<Config> {
        let mut config = match self.config.as_deref() {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?,
            None => match Config::default_path() {
                Some(path) => Config::load(&path).context("Failed to load config file")?,
                None => Config::default(),
            },
        };

        if let Some(n) = self.site_concurrency {
            config.site_concurrency = n;
        }
        if let Some(n) = self.probe_concurrency {
            config.probe_concurrency = n;
        }
        if let Some(secs) = self.timeout_secs {
            config.probe_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    // Diagnostics go to stdout; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                println!("{e}");
                std::process::exit(1);
            }
        },
    };

    if let Err(e) = run(args).await {
        println!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    tracing::debug!(?config, "Effective configuration");

    let mut sites = load_sites(&args.sites_file).await?;

    let client = build_client(&config).context("Failed to build HTTP client")?;
    let resolver = SiteResolver::from_config(client, &config);
    let report = BatchCoordinator::new(resolver, config.site_concurrency)
        .run(&mut sites)
        .await;

    save_sites(&args.sites_file, &sites).await?;

    println!(
        "Processing complete. Updated JSON file: {} ({} found, {} without feed, {} skipped)",
        args.sites_file.display(),
        report.found,
        report.not_found,
        report.skipped
    );
    Ok(())
}
