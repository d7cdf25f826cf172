use std::collections::BTreeMap;

/// Catalog refinement filters: field name -> ordered values. Multiple values
/// for one field are OR'd by the catalog, separate fields are AND'd. BTreeMap
/// so request URLs come out deterministic.
pub type FilterSet = BTreeMap<String, Vec<String>>;

/// Merge per-slice override filters into the base filter set. For each field
/// present in either input, base values come first, then override values.
/// Empty and whitespace-only values are skipped; fields that end up with no
/// values are omitted.
pub fn merge_filters(base: &FilterSet, overrides: &FilterSet) -> FilterSet {
    let mut merged = FilterSet::new();
    for (field, values) in base.iter().chain(overrides.iter()) {
        let kept = values
            .iter()
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .collect::<Vec<_>>();
        if kept.is_empty() {
            continue;
        }
        merged.entry(field.clone()).or_default().extend(kept);
    }
    merged
}
