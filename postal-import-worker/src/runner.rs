use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::CatalogClient;
use crate::error::ImportError;
use crate::filters::{merge_filters, FilterSet};
use crate::metrics_consts::{PAGES_FETCHED, RECORDS_DROPPED, RECORDS_PROCESSED, RECORDS_WRITTEN};
use crate::normalize::normalize;
use crate::sink::BatchWriter;
use crate::slices::SliceSpec;
use crate::types::{ImportStats, PostalCodeRecord, SliceAggregateResult};

/// Everything one country import needs, resolved by the entrypoint from the
/// registry, CLI flags and the slice-config file.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub country_code: String,
    pub dataset_id: String,
    pub base_filters: FilterSet,
    pub batch_size: u64,
    pub max_records: Option<u64>,
    pub default_delay: Duration,
    pub slices: Vec<SliceSpec>,
}

/// Run every configured slice strictly sequentially, summing counters.
/// Sequential on purpose: one outstanding fetch and one outstanding write at
/// a time, both for the catalog's rate limits and to avoid concurrent
/// writers on the same destination rows.
pub async fn run_all(
    catalog: &CatalogClient,
    writer: &BatchWriter,
    plan: &ImportPlan,
    cancel: &CancellationToken,
) -> Result<SliceAggregateResult, ImportError> {
    let mut result = SliceAggregateResult::new(&plan.country_code, &plan.dataset_id);

    if plan.slices.is_empty() {
        let stats = run_slice(
            catalog,
            writer,
            plan,
            "full",
            &plan.base_filters,
            plan.max_records,
            plan.default_delay,
            cancel,
        )
        .await?;
        result.absorb(stats);
        return Ok(result);
    }

    for slice in &plan.slices {
        if cancel.is_cancelled() {
            info!(label = %slice.label, "cancelled before slice start, stopping");
            break;
        }
        let effective_filters = merge_filters(&plan.base_filters, &slice.filters);
        let max_records = slice.max_records.or(plan.max_records);
        let delay = slice
            .request_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(plan.default_delay);
        let stats = run_slice(
            catalog,
            writer,
            plan,
            &slice.label,
            &effective_filters,
            max_records,
            delay,
            cancel,
        )
        .await?;
        result.absorb(stats);
    }

    Ok(result)
}

/// One slice's fetch -> normalize -> write -> pace loop, from offset 0 until
/// a stop condition. Stop conditions in priority order after each full page:
/// empty page, declared end reached (`offset + batch_size >= nhits`), then
/// the soft `max_records` cap. Cancellation finishes the in-flight page
/// before stopping, so the destination is never left mid-batch.
#[allow(clippy::too_many_arguments)]
pub async fn run_slice(
    catalog: &CatalogClient,
    writer: &BatchWriter,
    plan: &ImportPlan,
    label: &str,
    filters: &FilterSet,
    max_records: Option<u64>,
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<ImportStats, ImportError> {
    let mut stats = ImportStats::new(label, &plan.country_code, &plan.dataset_id);
    let mut offset = 0u64;

    info!(
        label,
        dataset_id = %plan.dataset_id,
        batch_size = plan.batch_size,
        ?max_records,
        "starting slice"
    );

    loop {
        if cancel.is_cancelled() {
            info!(label, offset, "cancelled, stopping slice");
            break;
        }

        let url = catalog.build_request_url(
            &plan.dataset_id,
            &plan.country_code,
            filters,
            plan.batch_size,
            offset,
        );
        let page = catalog.fetch_page(url).await?;
        metrics::counter!(PAGES_FETCHED).increment(1);

        let page_len = page.records.len() as u64;
        stats.total_processed += page_len;

        let rows: Vec<PostalCodeRecord> = page
            .records
            .iter()
            .filter_map(|record| normalize(&record.fields, &plan.country_code))
            .collect();
        let dropped = page_len - rows.len() as u64;
        metrics::counter!(RECORDS_PROCESSED).increment(page_len);
        metrics::counter!(RECORDS_DROPPED).increment(dropped);

        if !rows.is_empty() {
            writer.upsert_batch(&rows).await?;
            stats.total_inserted += rows.len() as u64;
            metrics::counter!(RECORDS_WRITTEN).increment(rows.len() as u64);
        }

        debug!(
            label,
            offset,
            page_len,
            kept = rows.len(),
            dropped,
            nhits = page.nhits,
            "page complete"
        );

        if page_len == 0 {
            info!(label, offset, "empty page, dataset exhausted");
            break;
        }
        if offset + plan.batch_size >= page.nhits {
            info!(label, offset, nhits = page.nhits, "declared end reached");
            break;
        }
        // Soft cap: only ever checked after a full page
        if let Some(cap) = max_records {
            if stats.total_processed >= cap {
                info!(label, processed = stats.total_processed, cap, "record cap reached");
                break;
            }
        }

        offset += plan.batch_size;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }

    info!(
        label,
        processed = stats.total_processed,
        inserted = stats.total_inserted,
        "slice finished"
    );
    Ok(stats)
}
