//! Disaster Verification CLI
//!
//! Checks whether a recorded disaster corroborates a claim location.
//!
//! Usage:
//!   verify-location --lat 19.0760 --lon 72.8777 --date 2024-11-07
//!   verify-location --image field_photo.jpg --output-dir reports/

use anyhow::{bail, Context, Result};
use claim_geo::{
    exif_timestamp_to_iso, extract_exif_from_path, google_maps_link, Coordinate,
    NominatimGeocoder, ReverseGeocoder,
};
use claim_verification::{
    generate_insurance_report, write_artifacts, DisasterVerifier, DEFAULT_RADIUS_KM,
};
use clap::Parser;
use disaster_feeds::{build_feeds, FeedsConfig};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "verify-location",
    about = "Verify a claim location against public disaster feeds"
)]
struct Args {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lon", conflicts_with = "image")]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true, requires = "lat", conflicts_with = "image")]
    lon: Option<f64>,

    /// Claim date (ISO-8601); overrides the photo timestamp
    #[arg(short, long)]
    date: Option<String>,

    /// Geotagged photo to take location and date from
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Search radius in km
    #[arg(short, long, default_value_t = DEFAULT_RADIUS_KM)]
    radius_km: f64,

    /// Directory for the JSON reports
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Feed request timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout_sec: u64,

    /// Extra attempts for transient feed failures
    #[arg(long, default_value_t = 0)]
    retry_transient: u32,

    /// Dump raw feed payloads into this directory
    #[arg(long)]
    dump_dir: Option<PathBuf>,

    /// Skip the reverse geocoding lookup
    #[arg(long)]
    no_geocode: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{}", "=".repeat(60));
    info!("Crop Claim Disaster Verification");
    info!("{}", "=".repeat(60));

    let (coordinate, date) = resolve_claim_site(&args)?;

    if args.no_geocode {
        info!("Location: {}", coordinate);
    } else {
        let name = NominatimGeocoder::new().location_name(coordinate).await;
        info!("Location: {} ({})", name, coordinate);
    }
    info!("Map: {}", google_maps_link(coordinate));

    let feeds_config = FeedsConfig {
        timeout_sec: args.timeout_sec,
        debug_dump_dir: args.dump_dir.clone(),
        ..FeedsConfig::default()
    };
    let verifier = DisasterVerifier::new(build_feeds(&feeds_config)?)
        .with_retry_transient(args.retry_transient);

    let outcome = verifier
        .verify_with_diagnostics(coordinate, date.as_deref(), args.radius_km)
        .await;
    let summary = generate_insurance_report(&outcome.report);

    for failure in &outcome.failures {
        warn!(
            "{} unavailable ({}): {}",
            failure.source,
            if failure.transient { "transient" } else { "terminal" },
            failure.error
        );
    }

    let paths = write_artifacts(&args.output_dir, "", &outcome.report, &summary)?;

    // Summary
    info!("\n{}", "=".repeat(60));
    info!("SUMMARY");
    info!("{}", "=".repeat(60));
    info!("Claim verifiable: {}", summary.claim_verifiable);
    for disaster in &outcome.report.disasters {
        info!(
            "  {} | {:30} | {}",
            disaster.source,
            disaster.category.chars().take(30).collect::<String>(),
            disaster.title
        );
    }
    info!("Reports: {:?}, {:?}", paths.verification, paths.insurance);

    Ok(())
}

/// Location and date from the flags, or from the photo's EXIF block
fn resolve_claim_site(args: &Args) -> Result<(Coordinate, Option<String>)> {
    if let Some(image) = &args.image {
        let evidence = extract_exif_from_path(image)
            .with_context(|| format!("No EXIF data found in {}", image.display()))?;
        let Some(gps) = evidence.gps else {
            bail!("No GPS info found in the image.");
        };
        let date = args
            .date
            .clone()
            .or_else(|| evidence.timestamp.as_deref().map(exif_timestamp_to_iso));
        return Ok((gps, date));
    }

    match (args.lat, args.lon) {
        (Some(lat), Some(lon)) => Ok((Coordinate::new(lat, lon)?, args.date.clone())),
        _ => bail!("Provide --lat and --lon, or --image"),
    }
}
