use serde::{Deserialize, Serialize};

/// Rough urbanisation class derived from the source record, used by ranking
/// features downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaType {
    Urban,
    Suburban,
    Rural,
}

impl AreaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AreaType::Urban => "urban",
            AreaType::Suburban => "suburban",
            AreaType::Rural => "rural",
        }
    }
}

/// A normalized postal-code entry with unified field names, independent of
/// the source dataset's raw schema. Only ever constructed with a non-empty,
/// sanitized postal code and both coordinates present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalCodeRecord {
    pub postal_code: String,
    pub city: String,
    pub municipality: Option<String>,
    pub county: Option<String>,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub area_type: AreaType,
    pub is_active: bool,
}

/// Counters for a single slice run. `total_processed` counts raw records
/// seen, `total_inserted` counts canonical records written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportStats {
    pub label: String,
    pub country_code: String,
    pub dataset_id: String,
    pub total_processed: u64,
    pub total_inserted: u64,
}

impl ImportStats {
    pub fn new(label: &str, country_code: &str, dataset_id: &str) -> Self {
        Self {
            label: label.to_string(),
            country_code: country_code.to_string(),
            dataset_id: dataset_id.to_string(),
            total_processed: 0,
            total_inserted: 0,
        }
    }
}

/// Aggregate over all slices of one country import, in slice order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceAggregateResult {
    pub country_code: String,
    pub dataset_id: String,
    pub total_processed: u64,
    pub total_inserted: u64,
    pub slices: Vec<ImportStats>,
}

impl SliceAggregateResult {
    pub fn new(country_code: &str, dataset_id: &str) -> Self {
        Self {
            country_code: country_code.to_string(),
            dataset_id: dataset_id.to_string(),
            total_processed: 0,
            total_inserted: 0,
            slices: Vec::new(),
        }
    }

    pub fn absorb(&mut self, stats: ImportStats) {
        self.total_processed += stats.total_processed;
        self.total_inserted += stats.total_inserted;
        self.slices.push(stats);
    }
}
