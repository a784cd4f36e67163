//! Plate-Scout main entry point
//!
//! This is the command-line interface for the Plate-Scout photo harvester.

use clap::{Parser, ValueEnum};
use plate_scout::browser::{BrowserLauncher, ChromeLauncher, StaticHtmlLauncher};
use plate_scout::config::{load_config_with_hash, RunConfig};
use plate_scout::crawler::{build_http_client, crawl};
use plate_scout::output::print_summary;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Plate-Scout: a vehicle-listing photo harvester
///
/// Plate-Scout walks the listing pages of a car marketplace, downloads the
/// photos of every listing, and crops the license plates a recognition
/// service finds in them.
#[derive(Parser, Debug)]
#[command(name = "plate-scout")]
#[command(version)]
#[command(about = "A vehicle-listing photo harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Page rendering engine
    #[arg(long, value_enum, default_value_t = Engine::Chrome)]
    engine: Engine,

    /// Show the Chrome window instead of running headless
    #[arg(long)]
    headful: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Engine {
    /// Headless Chrome over the DevTools protocol
    Chrome,
    /// Plain HTTP fetch and HTML parsing, no JavaScript
    Static,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(config, cli.engine, cli.headful).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("plate_scout=info,warn"),
            1 => EnvFilter::new("plate_scout=debug,info"),
            2 => EnvFilter::new("plate_scout=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Plate-Scout Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.url.base_url);
    println!("  Listing selector: {}", config.site.listing_selector);
    println!("  Photo selector: {}", config.site.photo_selector);
    println!("  Wait timeout: {}s", config.site.wait_timeout_secs);

    println!("\nSettings:");
    println!(
        "  Pages: {} to {}",
        config.settings.start_page, config.settings.end_page
    );
    println!("  Max workers: {}", config.settings.max_workers);
    println!("  First car number: {}", config.settings.start_car_number);

    println!("\nRecognition:");
    println!("  API URL: {}", config.api.api_url);
    match config.usable_api_key() {
        Some(_) => println!("  API key: configured"),
        None => println!("  API key: missing (recognition disabled)"),
    }
    println!("  Regions: {}", config.recognition.regions.join(", "));
    println!(
        "  Confidence threshold: {}",
        config.recognition.confidence_threshold
    );
    println!("  Plate pattern: {}", config.recognition.plate_pattern);
    println!("  Skip API on 403: {}", config.api.skip_api_on_403);

    println!("\nOutput:");
    println!("  Photos: {}", config.output.web_images_folder);
    println!("  Crops: {}", config.output.cropped_images_folder);

    println!("\nListing pages ({}):", config.page_range().count());
    for page in config.page_range() {
        println!("  - {}", config.listing_url(page)?);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: RunConfig,
    engine: Engine,
    headful: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let launcher: Arc<dyn BrowserLauncher> = match engine {
        Engine::Chrome => {
            tracing::info!(
                "Using Chrome engine ({})",
                if headful { "headful" } else { "headless" }
            );
            Arc::new(ChromeLauncher::new(!headful))
        }
        Engine::Static => {
            tracing::info!("Using static HTML engine");
            Arc::new(StaticHtmlLauncher::new(build_http_client()?))
        }
    };

    // Run the crawler
    match crawl(config, launcher).await {
        Ok(summary) => {
            tracing::info!("Run completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run failed: {}", e);
            Err(e.into())
        }
    }
}
