use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ImportError;
use crate::filters::FilterSet;

/// A named sub-query partition of one country's import, used to work around
/// per-query record caps on large countries. Absence of slices means "run
/// one unsliced import".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceSpec {
    pub label: String,
    #[serde(default)]
    pub filters: FilterSet,
    #[serde(default)]
    pub max_records: Option<u64>,
    #[serde(default)]
    pub request_delay_ms: Option<u64>,
}

/// Load the slice definitions for one country from a JSON file keyed by
/// country code. A file that cannot be read or parsed is fatal; a country
/// with no entries degrades to a single unsliced import.
pub fn load_slice_config(path: &Path, country_code: &str) -> Result<Vec<SliceSpec>, ImportError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        ImportError::SliceConfig(format!("cannot read {}: {e}", path.display()))
    })?;
    let by_country: HashMap<String, Vec<SliceSpec>> = serde_json::from_str(&raw)
        .map_err(|e| ImportError::SliceConfig(format!("cannot parse {}: {e}", path.display())))?;

    let slices = by_country
        .iter()
        .find(|(country, _)| country.eq_ignore_ascii_case(country_code))
        .map(|(_, slices)| slices.clone())
        .unwrap_or_default();

    if slices.is_empty() {
        warn!(
            country_code,
            path = %path.display(),
            "no slice entries for country, running a single unsliced import"
        );
    }
    Ok(slices)
}
