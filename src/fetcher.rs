use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::archive::HtmlArchive;
use crate::cache::CacheLedger;
use crate::extract::{self, AppFields};
use crate::report::{Reports, NO_STATUS};

const BASE_URL: &str = "https://play.google.com/store/apps/details";

// Polite delay after every live request, plus the long suspension after a
// 429 so the pair stays eligible for a future run.
const MIN_DELAY_SECS: f64 = 2.0;
const MAX_DELAY_SECS: f64 = 4.0;
const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(3600);

/// Storefront URL for one (package, language, region) triple. No validation
/// of the identifier; a garbage identifier just yields an eventual 404.
pub fn build_url(pkg: &str, language: &str, region: &str) -> String {
    let mut url = format!("{BASE_URL}?id={pkg}");
    if !region.is_empty() {
        url.push_str(&format!("&gl={region}"));
    }
    if !language.is_empty() {
        url.push_str(&format!("&hl={language}"));
    }
    url
}

/// Raw transport result, before classification.
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// The one outbound call. Failures at this level (connect error, timeout)
/// surface as `Err` and are mapped into [`FetchOutcome::TransportError`] at
/// the classify boundary, never propagated further.
pub trait Transport {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Suspension point, injectable so tests substitute a recorder for the
/// wall clock.
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Classified result of one fetch attempt. Exactly one variant per attempt.
pub enum FetchOutcome {
    Found { fields: AppFields, raw_html: String },
    NotFound(u16),
    RateLimited,
    TransportError { status: i32, message: String },
}

/// Map a transport result onto the outcome taxonomy: 200 runs the extractor,
/// 404 and 429 are their own cases, anything else is error-class.
fn classify(result: Result<HttpResponse>) -> FetchOutcome {
    match result {
        Ok(r) if r.status == 200 => FetchOutcome::Found {
            fields: extract::extract(&r.body),
            raw_html: r.body,
        },
        Ok(r) if r.status == 404 => FetchOutcome::NotFound(r.status),
        Ok(r) if r.status == 429 => FetchOutcome::RateLimited,
        Ok(r) => FetchOutcome::TransportError {
            status: r.status as i32,
            message: format!("unexpected status {}", r.status),
        },
        Err(e) => FetchOutcome::TransportError {
            status: NO_STATUS,
            message: e.to_string(),
        },
    }
}

pub struct BatchConfig {
    pub regions: Vec<String>,
    pub language: String,
    pub replay: bool,
}

#[derive(Default)]
pub struct BatchStats {
    pub found: usize,
    pub missing: usize,
    pub errors: usize,
    pub skipped: usize,
    pub replayed: usize,
}

/// Process packages in input order, regions in input order, one pair at a
/// time, one request in flight at a time. Every completed attempt writes to
/// exactly one outcome stream; only terminal outcomes (found, not-found)
/// mark the pair in the ledger.
pub async fn run_batch<T: Transport, S: Sleeper>(
    transport: &T,
    sleeper: &S,
    ledger: &mut CacheLedger,
    reports: &mut Reports,
    archive: &HtmlArchive,
    packages: &[String],
    cfg: &BatchConfig,
) -> Result<BatchStats> {
    let total = packages.len() * cfg.regions.len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = BatchStats::default();
    for pkg in packages {
        for region in &cfg.regions {
            process_pair(transport, sleeper, ledger, reports, archive, pkg, region, cfg, &mut stats)
                .await?;
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
async fn process_pair<T: Transport, S: Sleeper>(
    transport: &T,
    sleeper: &S,
    ledger: &mut CacheLedger,
    reports: &mut Reports,
    archive: &HtmlArchive,
    pkg: &str,
    region: &str,
    cfg: &BatchConfig,
    stats: &mut BatchStats,
) -> Result<()> {
    let cached = ledger.is_processed(pkg, region);
    if cached && !cfg.replay {
        debug!("{}/{}: cached, skipping", pkg, region);
        stats.skipped += 1;
        return Ok(());
    }

    // Replay reconstructs a Found-shaped result from the archive; pairs
    // never archived fall through to a live fetch.
    if cfg.replay {
        if let Some(html) = archive.load(pkg, region) {
            let fields = extract::extract(&html);
            reports.record_found(pkg, region, &fields)?;
            if !cached {
                ledger.mark_processed(pkg, region)?;
            }
            stats.replayed += 1;
            return Ok(());
        }
    }

    let url = build_url(pkg, &cfg.language, region);
    info!("Collecting {}/{}", pkg, region);

    match classify(transport.get(&url).await) {
        FetchOutcome::Found { fields, raw_html } => {
            reports.record_found(pkg, region, &fields)?;
            archive.save(pkg, region, &raw_html)?;
            ledger.mark_processed(pkg, region)?;
            stats.found += 1;
        }
        FetchOutcome::NotFound(status) => {
            info!("{}/{}: not found ({})", pkg, region, status);
            reports.record_missing(pkg, region, status, &url)?;
            ledger.mark_processed(pkg, region)?;
            stats.missing += 1;
        }
        FetchOutcome::RateLimited => {
            // Pair left unmarked so a later run retries it.
            warn!(
                "{}/{}: rate limited, cooling down for {}s",
                pkg,
                region,
                RATE_LIMIT_COOLDOWN.as_secs()
            );
            reports.record_error(pkg, region, 429, &url, "rate limited")?;
            stats.errors += 1;
            sleeper.sleep(RATE_LIMIT_COOLDOWN).await;
        }
        FetchOutcome::TransportError { status, message } => {
            warn!("{}/{}: request failed ({}): {}", pkg, region, status, message);
            reports.record_error(pkg, region, status, &url, &message)?;
            stats.errors += 1;
        }
    }

    // A live call happened, whatever the outcome: polite random delay
    // before the next pair.
    let delay = Duration::from_secs_f64(rand::rng().random_range(MIN_DELAY_SECS..MAX_DELAY_SECS));
    sleeper.sleep(delay).await;
    Ok(())
}

// ── Tests ──
