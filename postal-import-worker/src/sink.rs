use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::error::ImportError;
use crate::metrics_consts::{BATCH_CHUNKS_WRITTEN, BATCH_WRITE_FAILURES};
use crate::types::PostalCodeRecord;

// Mirrors the destination's per-statement write limit
pub const MAX_UPSERT_CHUNK: usize = 500;

/// Where canonical records end up. One implementation per destination, in
/// the same spirit as having stdout/no-op sinks next to the real one.
#[async_trait]
pub trait Destination: Send + Sync {
    async fn upsert_chunk(&self, rows: &[PostalCodeRecord]) -> Result<(), ImportError>;
}

/// Splits a page's surviving records into destination-sized chunks and
/// writes them sequentially. The first failed chunk aborts the call; chunks
/// already written stay committed, there is no compensating rollback.
pub struct BatchWriter {
    destination: Arc<dyn Destination>,
}

impl BatchWriter {
    pub fn new(destination: Arc<dyn Destination>) -> Self {
        Self { destination }
    }

    pub async fn upsert_batch(&self, rows: &[PostalCodeRecord]) -> Result<(), ImportError> {
        for chunk in rows.chunks(MAX_UPSERT_CHUNK) {
            if let Err(e) = self.destination.upsert_chunk(chunk).await {
                metrics::counter!(BATCH_WRITE_FAILURES).increment(1);
                return Err(e);
            }
            metrics::counter!(BATCH_CHUNKS_WRITTEN).increment(1);
            debug!(rows = chunk.len(), "committed upsert chunk");
        }
        Ok(())
    }
}

/// Postgres destination. The table's uniqueness constraint is postal_code
/// alone, so re-imports are idempotent and a code shared by two countries is
/// last writer wins.
pub struct PostgresDestination {
    pool: PgPool,
}

impl PostgresDestination {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    async fn upsert_chunk(&self, rows: &[PostalCodeRecord]) -> Result<(), ImportError> {
        let mut postal_codes = Vec::with_capacity(rows.len());
        let mut cities = Vec::with_capacity(rows.len());
        let mut municipalities = Vec::with_capacity(rows.len());
        let mut counties = Vec::with_capacity(rows.len());
        let mut country_codes = Vec::with_capacity(rows.len());
        let mut latitudes = Vec::with_capacity(rows.len());
        let mut longitudes = Vec::with_capacity(rows.len());
        let mut area_types = Vec::with_capacity(rows.len());
        let mut actives = Vec::with_capacity(rows.len());

        for row in rows {
            postal_codes.push(row.postal_code.clone());
            cities.push(row.city.clone());
            municipalities.push(row.municipality.clone());
            counties.push(row.county.clone());
            country_codes.push(row.country_code.clone());
            latitudes.push(row.latitude);
            longitudes.push(row.longitude);
            area_types.push(row.area_type.as_str().to_string());
            actives.push(row.is_active);
        }

        sqlx::query(
            r#"
            INSERT INTO postal_codes (postal_code, city, municipality, county, country_code, latitude, longitude, area_type, is_active)
                (SELECT * FROM UNNEST(
                    $1::text[],
                    $2::text[],
                    $3::text[],
                    $4::text[],
                    $5::text[],
                    $6::float8[],
                    $7::float8[],
                    $8::text[],
                    $9::boolean[]))
                ON CONFLICT (postal_code) DO UPDATE SET
                    city = EXCLUDED.city,
                    municipality = EXCLUDED.municipality,
                    county = EXCLUDED.county,
                    country_code = EXCLUDED.country_code,
                    latitude = EXCLUDED.latitude,
                    longitude = EXCLUDED.longitude,
                    area_type = EXCLUDED.area_type,
                    is_active = EXCLUDED.is_active"#,
        )
        .bind(&postal_codes)
        .bind(&cities)
        .bind(&municipalities)
        .bind(&counties)
        .bind(&country_codes)
        .bind(&latitudes)
        .bind(&longitudes)
        .bind(&area_types)
        .bind(&actives)
        .execute(&self.pool)
        .await
        .map_err(|e| ImportError::BatchWrite(e.to_string()))?;

        Ok(())
    }
}

/// In-memory destination keyed like the real table, used by tests and
/// `--dry-run`. Tracks per-chunk sizes so chunking behavior is observable.
#[derive(Default)]
pub struct MemoryDestination {
    rows: Mutex<HashMap<String, PostalCodeRecord>>,
    chunk_sizes: Mutex<Vec<usize>>,
}

impl MemoryDestination {
    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("destination lock poisoned").len()
    }

    pub fn get(&self, postal_code: &str) -> Option<PostalCodeRecord> {
        self.rows
            .lock()
            .expect("destination lock poisoned")
            .get(postal_code)
            .cloned()
    }

    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes
            .lock()
            .expect("destination lock poisoned")
            .clone()
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    async fn upsert_chunk(&self, rows: &[PostalCodeRecord]) -> Result<(), ImportError> {
        let mut map = self.rows.lock().expect("destination lock poisoned");
        for row in rows {
            map.insert(row.postal_code.clone(), row.clone());
        }
        self.chunk_sizes
            .lock()
            .expect("destination lock poisoned")
            .push(rows.len());
        Ok(())
    }
}
