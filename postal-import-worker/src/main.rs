use std::path::PathBuf;
use std::time::Duration;

use anyhow::Error;
use clap::Parser;
use envconfig::Envconfig;
use postal_import_worker::{
    config::Config,
    context::AppContext,
    datasets::dataset_for_country,
    error::ImportError,
    filters::FilterSet,
    runner::{run_all, ImportPlan},
    slices::load_slice_config,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Fallback page size for countries only reachable via --dataset
const FALLBACK_BATCH_SIZE: u64 = 100;

#[derive(Parser, Debug)]
#[command(
    name = "postal-import-worker",
    about = "Imports postal-code reference data from the open-data catalog into the postal_codes table"
)]
struct Cli {
    /// ISO country code to import
    #[arg(long)]
    country: String,

    /// Override the registry's dataset id for this country
    #[arg(long)]
    dataset: Option<String>,

    /// Override the registry's default page size
    #[arg(long)]
    batch: Option<u64>,

    /// Extra catalog refinement, repeatable (e.g. --filter admin_name1=Stockholm)
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    filters: Vec<String>,

    /// Soft cap on raw records processed, checked after each full page
    #[arg(long)]
    max_records: Option<u64>,

    /// JSON slice-definition file keyed by country code
    #[arg(long)]
    slice_config: Option<PathBuf>,

    /// Delay between page fetches in milliseconds
    #[arg(long)]
    delay: Option<u64>,

    /// Run against the in-memory destination instead of postgres
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

fn parse_filters(raw: &[String]) -> Result<FilterSet, ImportError> {
    let mut filters = FilterSet::new();
    for entry in raw {
        let (key, value) = entry.split_once('=').ok_or_else(|| {
            ImportError::Configuration(format!("invalid --filter '{entry}', expected KEY=VALUE"))
        })?;
        filters
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }
    Ok(filters)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    setup_tracing();
    let cli = Cli::parse();

    let config =
        Config::init_from_env().map_err(|e| ImportError::Configuration(e.to_string()))?;

    let country_code = cli.country.to_uppercase();
    let registry_entry = dataset_for_country(&country_code);
    let dataset_id = match (&cli.dataset, registry_entry) {
        (Some(dataset), _) => dataset.clone(),
        (None, Some(entry)) => entry.dataset_id.to_string(),
        (None, None) => {
            return Err(ImportError::Configuration(format!(
                "no dataset mapping for country {country_code}; pass --dataset"
            ))
            .into())
        }
    };
    let batch_size = cli
        .batch
        .or(registry_entry.map(|entry| entry.default_batch_size))
        .unwrap_or(FALLBACK_BATCH_SIZE);

    let base_filters = parse_filters(&cli.filters)?;
    let slices = match &cli.slice_config {
        Some(path) => load_slice_config(path, &country_code)?,
        None => Vec::new(),
    };

    let context = AppContext::new(&config, cli.dry_run).await?;
    let cancel = context.spawn_shutdown_listener();

    let plan = ImportPlan {
        country_code,
        dataset_id,
        base_filters,
        batch_size,
        max_records: cli.max_records,
        default_delay: Duration::from_millis(
            cli.delay.unwrap_or(config.default_request_delay_ms),
        ),
        slices,
    };

    info!(
        country_code = %plan.country_code,
        dataset_id = %plan.dataset_id,
        batch_size = plan.batch_size,
        slices = plan.slices.len(),
        "starting import"
    );

    let result = run_all(&context.catalog, &context.writer, &plan, &cancel).await?;

    info!(
        country_code = %result.country_code,
        dataset_id = %result.dataset_id,
        total_processed = result.total_processed,
        total_inserted = result.total_inserted,
        slices = result.slices.len(),
        "import finished"
    );

    Ok(())
}
