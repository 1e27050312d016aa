use category_crawler::kenzo::Kenzo;
use category_crawler::xrpbuy::XrpBuy;
use category_crawler::{crawl, discover, Config, CrawlerError, Fetcher, Site, Store};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SiteKind {
    /// News site: article links per category, one fetch per article.
    News,
    /// Catalog site: item records come straight from the listing pages.
    Catalog,
}

#[derive(Parser, Debug)]
#[command(about = "Crawl a category-structured site into per-category json files")]
struct Args {
    #[arg(value_enum, default_value = "news")]
    site: SiteKind,

    /// Seed url override for the chosen site.
    #[arg(long)]
    seed: Option<String>,

    /// Reuse the previously persisted category map instead of fetching
    /// the seed page again.
    #[arg(long)]
    saved_categories: bool,

    #[arg(long, default_value = "obj")]
    obj_dir: PathBuf,

    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Fixed delay between retry attempts, in seconds.
    #[arg(long, default_value_t = 5)]
    retry_delay: u64,

    /// Cap on simultaneous outbound requests.
    #[arg(long, default_value_t = 10)]
    max_in_flight: usize,
}

async fn run_site<S: Site>(site: &S, config: &Config, saved: bool) -> Result<(), CrawlerError> {
    let fetcher = Fetcher::new(config)?;
    let store = Store::new(config).await?;

    let categories = if saved {
        store.read_categories().await?
    } else {
        discover(site, &fetcher, &store).await?
    };

    let report = crawl(site, &fetcher, &store, &categories).await?;

    info!(
        "Crawled {} categories: {} links, {} records",
        report.categories, report.links, report.records
    );
    for failure in &report.failures {
        warn!("Failed: {} ({})", failure.unit, failure.error);
    }
    if !report.failures.is_empty() {
        warn!("{} units failed", report.failures.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "debug,html5ever=error,selectors=error,hyper=warn,reqwest=info".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();
    let config = Config {
        max_retries: args.retries,
        retry_delay: Duration::from_secs(args.retry_delay),
        max_in_flight: args.max_in_flight,
        obj_dir: args.obj_dir.clone(),
        data_dir: args.data_dir.clone(),
        ..Config::default()
    };

    let start = Instant::now();
    match args.site {
        SiteKind::News => {
            let site = match &args.seed {
                Some(seed) => XrpBuy::new(seed.clone()),
                None => XrpBuy::default(),
            };
            run_site(&site, &config, args.saved_categories).await?;
        }
        SiteKind::Catalog => {
            let site = match &args.seed {
                Some(seed) => Kenzo::new(seed.clone()),
                None => Kenzo::default(),
            };
            run_site(&site, &config, args.saved_categories).await?;
        }
    }
    info!("Finished in {} seconds", start.elapsed().as_secs());

    Ok(())
}
