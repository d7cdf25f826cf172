/// Static mapping of country code to the catalog dataset holding its postal
/// codes, plus the page size we default to for that country. Countries not
/// listed here need an explicit `--dataset` override.
#[derive(Debug, Clone, Copy)]
pub struct CountryDatasetConfig {
    pub country_code: &'static str,
    pub dataset_id: &'static str,
    pub default_batch_size: u64,
}

pub const COUNTRY_DATASETS: &[CountryDatasetConfig] = &[
    CountryDatasetConfig {
        country_code: "SE",
        dataset_id: "geonames-postal-code@public",
        default_batch_size: 100,
    },
    CountryDatasetConfig {
        country_code: "NO",
        dataset_id: "geonames-postal-code@public",
        default_batch_size: 100,
    },
    CountryDatasetConfig {
        country_code: "DK",
        dataset_id: "geonames-postal-code@public",
        default_batch_size: 100,
    },
    CountryDatasetConfig {
        country_code: "FI",
        dataset_id: "geonames-postal-code@public",
        default_batch_size: 100,
    },
    CountryDatasetConfig {
        country_code: "NL",
        dataset_id: "georef-netherlands-postcode-pc4@public",
        default_batch_size: 100,
    },
    // Large datasets; these are the countries that usually need slicing
    CountryDatasetConfig {
        country_code: "DE",
        dataset_id: "georef-germany-postleitzahl@public",
        default_batch_size: 500,
    },
    CountryDatasetConfig {
        country_code: "FR",
        dataset_id: "georef-france-commune@public",
        default_batch_size: 500,
    },
    CountryDatasetConfig {
        country_code: "GB",
        dataset_id: "georef-united-kingdom-postcode-sector@public",
        default_batch_size: 500,
    },
    CountryDatasetConfig {
        country_code: "US",
        dataset_id: "georef-united-states-of-america-zc-point@public",
        default_batch_size: 500,
    },
];

pub fn dataset_for_country(country_code: &str) -> Option<&'static CountryDatasetConfig> {
    COUNTRY_DATASETS
        .iter()
        .find(|c| c.country_code.eq_ignore_ascii_case(country_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let config = dataset_for_country("se").unwrap();
        assert_eq!(config.dataset_id, "geonames-postal-code@public");
        assert_eq!(config.default_batch_size, 100);
    }

    #[test]
    fn test_unmapped_country_returns_none() {
        assert!(dataset_for_country("XX").is_none());
    }
}
