use serde_json::{Map, Value};

use crate::types::{AreaType, PostalCodeRecord};

// Ordered candidate field names per canonical attribute. The first present,
// non-empty candidate wins. Dotted/bracketed entries are nested paths into
// the raw record, resolved by the path walker below.
const POSTAL_CODE_FIELDS: &[&str] = &["postal_code", "zip", "zipcode", "zip_code", "postnr", "code"];
const LATITUDE_FIELDS: &[&str] = &[
    "latitude",
    "lat",
    "geo_point_2d[0]",
    "geo_shape.coordinates[1]",
];
const LONGITUDE_FIELDS: &[&str] = &[
    "longitude",
    "lon",
    "lng",
    "geo_point_2d[1]",
    "geo_shape.coordinates[0]",
];
const CITY_FIELDS: &[&str] = &["city", "place_name", "city_name", "postal_city", "admin_name3"];
const MUNICIPALITY_FIELDS: &[&str] = &["municipality", "admin_name2", "kommun", "commune"];
const COUNTY_FIELDS: &[&str] = &["county", "admin_name1", "region", "state"];
const POPULATION_FIELDS: &[&str] = &["population", "pop", "inhabitants"];
// Fields that only exist on records describing an actual settlement; their
// presence alone marks a record as urban when no population is reported.
const FINE_GRAINED_PLACE_FIELDS: &[&str] = &["admin_name3", "place_name", "city_name"];

const URBAN_POPULATION_THRESHOLD: f64 = 20_000.0;
const SUBURBAN_POPULATION_THRESHOLD: f64 = 5_000.0;

/// Convert one raw catalog record into a canonical postal-code record.
/// Records without a usable postal code or with either coordinate missing
/// are dropped (`None`). Never panics on malformed input.
pub fn normalize(fields: &Map<String, Value>, country_code: &str) -> Option<PostalCodeRecord> {
    let postal_code = first_non_empty_string(fields, POSTAL_CODE_FIELDS)
        .map(|raw| sanitize_postal_code(&raw))
        .filter(|code| !code.is_empty());
    let latitude = first_number(fields, LATITUDE_FIELDS);
    let longitude = first_number(fields, LONGITUDE_FIELDS);

    let (postal_code, latitude, longitude) = match (postal_code, latitude, longitude) {
        (Some(code), Some(lat), Some(lon)) => (code, lat, lon),
        _ => return None,
    };

    let city =
        first_non_empty_string(fields, CITY_FIELDS).unwrap_or_else(|| "Unknown".to_string());
    let municipality = first_non_empty_string(fields, MUNICIPALITY_FIELDS);
    let county = first_non_empty_string(fields, COUNTY_FIELDS);

    Some(PostalCodeRecord {
        postal_code,
        city,
        municipality,
        county,
        country_code: country_code.to_string(),
        latitude,
        longitude,
        area_type: classify_area(fields),
        is_active: true,
    })
}

fn sanitize_postal_code(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_uppercase()
}

// Heuristic, evaluated in this exact order: population thresholds first,
// then presence of a fine-grained place field, then rural.
fn classify_area(fields: &Map<String, Value>) -> AreaType {
    if let Some(population) = first_number(fields, POPULATION_FIELDS) {
        if population >= URBAN_POPULATION_THRESHOLD {
            return AreaType::Urban;
        }
        if population >= SUBURBAN_POPULATION_THRESHOLD {
            return AreaType::Suburban;
        }
    }
    if first_non_empty_string(fields, FINE_GRAINED_PLACE_FIELDS).is_some() {
        AreaType::Urban
    } else {
        AreaType::Rural
    }
}

fn first_non_empty_string(fields: &Map<String, Value>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|path| lookup_path(fields, path))
        .find_map(value_as_string)
}

fn first_number(fields: &Map<String, Value>, candidates: &[&str]) -> Option<f64> {
    candidates
        .iter()
        .filter_map(|path| lookup_path(fields, path))
        .find_map(value_as_number)
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Resolve a dotted/bracketed path like `geo_shape.coordinates[1]` against a
/// raw record. Plain keys, nested objects and array indices only; anything
/// unresolvable yields `None`.
fn lookup_path<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut current: Option<&Value> = None;
    for part in path.split('.') {
        let (key, indices) = split_indices(part)?;
        let mut value = match current {
            None => fields.get(key)?,
            Some(v) => v.as_object()?.get(key)?,
        };
        for index in indices {
            value = value.as_array()?.get(index)?;
        }
        current = Some(value);
    }
    current
}

fn split_indices(part: &str) -> Option<(&str, Vec<usize>)> {
    let Some(bracket) = part.find('[') else {
        return Some((part, Vec::new()));
    };
    let key = &part[..bracket];
    let mut indices = Vec::new();
    let mut rest = &part[bracket..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let end = stripped.find(']')?;
        indices.push(stripped[..end].parse().ok()?);
        rest = &stripped[end + 1..];
    }
    if rest.is_empty() {
        Some((key, indices))
    } else {
        None
    }
}
