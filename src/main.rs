mod archive;
mod cache;
mod extract;
mod fetcher;
mod listing;
mod report;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;

#[derive(Parser)]
#[command(name = "play_scraper", about = "Google Play metadata fetcher for package listings")]
struct Cli {
    /// Path to the package listing (';' separated, first field is the package name)
    #[arg(long)]
    package_listing: PathBuf,

    /// Regions to fetch per package, comma separated (e.g. US,FI,JP)
    #[arg(long, value_delimiter = ',', default_value = "US")]
    regions: Vec<String>,

    /// Prefix for output file names, so independent runs keep separate files
    #[arg(long, default_value = "")]
    output_prefix: String,

    /// Rebuild results from previously stored raw HTML instead of fetching
    #[arg(long)]
    replay: bool,

    /// Storefront language code
    #[arg(long, default_value = "en")]
    language: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    // Input listing is checked before anything touches the network.
    let packages = listing::read_package_names(&cli.package_listing)?;
    if packages.is_empty() {
        println!("Package listing is empty, nothing to do.");
        return Ok(());
    }

    let mut ledger = cache::CacheLedger::open(format!("{}cached_pkgs.csv", cli.output_prefix))?;
    let mut reports = report::Reports::open(&cli.output_prefix)?;
    let archive = archive::HtmlArchive::open(format!("{}raw_html_output", cli.output_prefix))?;
    let transport = fetcher::HttpTransport::new(Duration::from_secs(cli.timeout_secs))?;
    let cfg = fetcher::BatchConfig {
        regions: cli.regions,
        language: cli.language,
        replay: cli.replay,
    };

    println!(
        "Fetching {} packages x {} regions{}...",
        packages.len(),
        cfg.regions.len(),
        if cfg.replay { " (replay from stored HTML)" } else { "" }
    );

    let stats = fetcher::run_batch(
        &transport,
        &fetcher::TokioSleeper,
        &mut ledger,
        &mut reports,
        &archive,
        &packages,
        &cfg,
    )
    .await?;

    println!(
        "Done: {} found, {} missing, {} errors, {} skipped, {} replayed.",
        stats.found, stats.missing, stats.errors, stats.skipped, stats.replayed
    );

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("Elapsed: {}", format_duration(elapsed));
    }

    Ok(())
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
