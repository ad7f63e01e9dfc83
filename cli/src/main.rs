//! CLI entry point: loads configuration, wires up the real acquisition and
//! catalogue collaborators, submits one playlist for processing, and blocks
//! until the job reaches a terminal state.
//!
//! Persistence is explicitly out of scope (`mixcraft-orchestrator` only
//! ships an in-memory `JobStore`), so there is no separate "check on a job
//! from another invocation" command here: one run submits one playlist and
//! waits it out, the way `mecomp-daemon`'s binary sets up and runs a single
//! long-lived daemon rather than round-tripping through a client.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use mixcraft_acquisition::remote::{FfmpegLoudnessNormalizer, HttpObjectStore, HttpRemoteSearch};
use mixcraft_core::config::Settings;
use mixcraft_core::get_data_dir;
use mixcraft_core::model::{JobOptions, JobStatus};
use mixcraft_orchestrator::catalogue::HttpCatalogueProvider;
use mixcraft_orchestrator::store::InMemoryJobStore;
use mixcraft_orchestrator::Orchestrator;

#[derive(Parser)]
#[command(name = "mixcraft", version = env!("CARGO_PKG_VERSION"), about)]
struct Flags {
    /// Use this config file instead of the one in the default location.
    #[clap(long, short, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,
    /// Override the configured log level.
    #[clap(
        long,
        short,
        value_parser = PossibleValuesParser::new(["off", "trace", "debug", "info", "warn", "error"])
            .map(|s| s.parse::<LevelFilter>().unwrap())
    )]
    log_level: Option<LevelFilter>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a playlist reference and wait for the mix plan.
    Run {
        /// Catalogue playlist reference (passed straight to the catalogue provider).
        playlist_ref: String,
        /// Upper bound on tracks pulled from the playlist, overriding config.
        #[clap(long)]
        max_tracks: Option<u32>,
    },
}

fn config_path(flags: &Flags) -> anyhow::Result<PathBuf> {
    match &flags.config {
        Some(path) if path.exists() => Ok(path.clone()),
        Some(path) => anyhow::bail!("config file does not exist at {}", path.display()),
        None => Ok(Settings::get_config_path()?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let flags = Flags::parse();
    let settings = Settings::init(config_path(&flags)?, flags.log_level)?;

    mixcraft_core::logger::init_logger(settings.orchestrator.log_level);
    let subscriber = mixcraft_core::logger::init_tracing(tracing::level_filters::LevelFilter::INFO);
    tracing::subscriber::set_global_default(subscriber).expect("tracing subscriber already set");

    let Command::Run { playlist_ref, max_tracks } = flags.command;

    let data_dir = get_data_dir()?;
    let local_cache_dir = data_dir.join("cache");
    std::fs::create_dir_all(&local_cache_dir)?;

    let object_store_base = settings
        .acquisition
        .object_store
        .endpoint
        .clone()
        .unwrap_or_else(|| "http://localhost:9000".to_string());
    let object_store = HttpObjectStore::new(object_store_base, settings.acquisition.object_store.bucket.clone());
    let remote_search = HttpRemoteSearch::new(settings.acquisition.search_endpoint.clone());
    let normalizer = FfmpegLoudnessNormalizer::new(
        settings.acquisition.loudness.integrated_lufs,
        settings.acquisition.loudness.true_peak_dbtp,
        settings.acquisition.loudness.loudness_range_lu,
        settings.acquisition.loudness.output_bitrate_kbps,
        settings.acquisition.loudness.output_sample_rate_hz,
    );
    let catalogue = HttpCatalogueProvider::new(settings.catalogue.authorize_endpoint.clone());

    let orchestrator = Orchestrator::new(
        InMemoryJobStore::new(),
        object_store,
        remote_search,
        normalizer,
        catalogue,
        settings.acquisition.downloads_per_minute.get(),
        settings.acquisition.key_prefix.clone(),
        local_cache_dir,
        settings.orchestrator.worker_pool_size.get(),
    );

    let options = JobOptions {
        max_tracks: max_tracks.unwrap_or(settings.orchestrator.max_tracks),
        skip_analysis_if_exists: settings.orchestrator.skip_analysis_if_exists,
        auto_fetch: true,
        download_timeout_seconds: settings.acquisition.loudness.timeout_seconds,
    };

    let submitted = orchestrator.submit(&playlist_ref, options).await?;
    tracing::info!(job_id = %submitted.id, "submitted job");

    let job = loop {
        let job = orchestrator.get_job(submitted.id).await?;
        if !job.is_in_flight() {
            break job;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };

    println!("{}", serde_json::to_string_pretty(&job)?);

    if job.status == JobStatus::Failed {
        anyhow::bail!(job.error_message.unwrap_or_else(|| "job failed".to_string()));
    }

    Ok(())
}
