//! imgscrape main entry point
//!
//! This is the command-line interface for discovering image links on web
//! pages and downloading images from IIIF Image API services.

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use imgscrape::config::{load_config_with_hash, Config};
use imgscrape::context::Context;
use imgscrape::crawler::{build_http_client, resolve_image_sources, Crawler};
use imgscrape::iiif::{Format, IiifClient, Quality, Region, Rotation, Size};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// imgscrape: scrape images for ML purposes
///
/// Collects image links from web pages, or fetches images directly from a
/// IIIF Image API service by identifier.
#[derive(Parser, Debug)]
#[command(name = "imgscrape")]
#[command(version)]
#[command(about = "Scrape images via web crawling or the IIIF protocol", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch pages and list the images they embed
    Crawl(CrawlArgs),

    /// Download images from a IIIF Image API service
    Iiif(IiifArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URLs to fetch
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Resolve relative image sources against the page URL
    #[arg(long)]
    absolute: bool,

    /// Abandon the whole crawl after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<u64>,
}

#[derive(Args, Debug)]
struct IiifArgs {
    /// Image identifiers to fetch
    #[arg(value_name = "ID", required = true)]
    ids: Vec<String>,

    /// The IIIF service base URL (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Region: full, square, x,y,w,h or pct:x,y,w,h
    #[arg(long, default_value = "full")]
    region: Region,

    /// Size: full, max, w,, ,h, pct:n, w,h or !w,h
    #[arg(long, default_value = "full", allow_hyphen_values = true)]
    size: Size,

    /// Rotation in degrees, prefix with '!' to mirror first
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    rotation: Rotation,

    /// Quality: default, color, gray or bitonal
    #[arg(long, default_value = "default")]
    quality: Quality,

    /// Format: jpg, tif, png, gif, jp2, pdf or webp
    #[arg(long, default_value = "jpg")]
    format: Format,

    /// Directory the images are written to
    #[arg(long, short, default_value = ".")]
    output_dir: PathBuf,

    /// Per-image deadline in seconds
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (cfg, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        None => {
            tracing::debug!("No configuration file given, using defaults");
            Config::default()
        }
    };

    let ctx = Context::background();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling outstanding requests");
            interrupt.cancel();
        }
    });

    match cli.command {
        Command::Crawl(args) => handle_crawl(&config, args, &ctx).await,
        Command::Iiif(args) => handle_iiif(&config, args, &ctx).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("imgscrape=info,warn"),
            1 => EnvFilter::new("imgscrape=debug,info"),
            2 => EnvFilter::new("imgscrape=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Handles `imgscrape crawl`: prints one `index, seed, image` line per image
async fn handle_crawl(config: &Config, args: CrawlArgs, ctx: &Context) -> anyhow::Result<()> {
    let client = build_http_client(&config.http)?;
    let mut crawler = Crawler::new(client, config.crawler.clone());
    crawler.register(&args.urls)?;

    tracing::info!(
        "Crawling {} seed URLs ({:?}, at most {} at once)",
        crawler.len(),
        crawler.failure_policy(),
        config.crawler.max_concurrent_fetches
    );

    let run_ctx = match args.deadline_secs {
        Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
        None => ctx.child(),
    };

    let report = crawler.run_with_policy(&run_ctx).await?;

    for entry in report.iter() {
        match &entry.outcome {
            Ok(images) => {
                let images = if args.absolute {
                    resolve_image_sources(images, &entry.url)
                } else {
                    images.clone()
                };
                for image in images {
                    println!("{}\t{}\t{}", entry.index, entry.url, image);
                }
            }
            Err(e) => eprintln!("{}\t{}\terror: {}", entry.index, entry.url, e),
        }
    }

    Ok(())
}

/// Handles `imgscrape iiif`: downloads each identifier into the output directory
async fn handle_iiif(config: &Config, args: IiifArgs, ctx: &Context) -> anyhow::Result<()> {
    let http = build_http_client(&config.http)?;
    let base_url = args.host.as_deref().unwrap_or(&config.iiif.base_url);
    let client = IiifClient::new(http, base_url)
        .with_context(|| format!("invalid IIIF host {}", base_url))?;

    tokio::fs::create_dir_all(&args.output_dir)
        .await
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;

    for id in &args.ids {
        let request = client
            .image(id.as_str())
            .region(args.region)
            .size(args.size)
            .rotation(args.rotation)
            .quality(args.quality)
            .format(args.format);

        let request_ctx = match args.timeout_secs {
            Some(secs) => ctx.with_timeout(Duration::from_secs(secs)),
            None => ctx.child(),
        };

        let path = output_path(&args.output_dir, id, args.format);
        let response = request
            .resolve(&request_ctx)
            .await
            .with_context(|| format!("failed to fetch {}", id))?;

        match response.content_type() {
            Some(received) if !received.starts_with(args.format.mime_type()) => {
                tracing::warn!(
                    "{} was requested as {} but the server sent {}",
                    id,
                    args.format.mime_type(),
                    received
                );
            }
            _ => {}
        }
        if let Some(expected) = response.content_length() {
            tracing::debug!("Downloading {} ({} bytes)", id, expected);
        }

        let mut file = tokio::fs::File::create(&path)
            .await
            .with_context(|| format!("cannot create {}", path.display()))?;

        let written = response
            .copy_to(&mut file)
            .await
            .with_context(|| format!("failed to save {}", path.display()))?;

        tracing::info!("Saved {} ({} bytes) to {}", id, written, path.display());
    }

    Ok(())
}

/// Builds `<dir>/<identifier>.<ext>`, flattening path separators in the identifier
fn output_path(dir: &Path, identifier: &str, format: Format) -> PathBuf {
    let name: String = identifier
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    dir.join(format!("{}.{}", name, format.extension()))
}
