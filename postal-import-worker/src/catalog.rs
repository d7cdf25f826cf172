use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

use crate::error::ImportError;
use crate::filters::FilterSet;

const BODY_EXCERPT_LEN: usize = 200;

/// One page of the catalog's search response. `nhits` is the declared total
/// for the whole query, not the page.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    pub nhits: u64,
    pub records: Vec<CatalogRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Client for the open-data catalog search API. Does exactly one GET per
/// page and no retries: a transient failure aborts the run and already
/// committed pages stay committed.
pub struct CatalogClient {
    client: Client,
    base_url: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ImportError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = Url::parse(base_url)
            .map_err(|e| ImportError::Configuration(format!("invalid catalog base url: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Deterministic construction of one page query. Multi-valued filter
    /// fields repeat the `refine.<field>` parameter once per value.
    pub fn build_request_url(
        &self,
        dataset_id: &str,
        country_code: &str,
        filters: &FilterSet,
        batch_size: u64,
        offset: u64,
    ) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("dataset", dataset_id);
            query.append_pair("rows", &batch_size.to_string());
            query.append_pair("start", &offset.to_string());
            query.append_pair("q", "");
            query.append_pair("facet", "country_code");
            query.append_pair("refine.country_code", country_code);
            for (field, values) in filters {
                for value in values {
                    query.append_pair(&format!("refine.{field}"), value);
                }
            }
        }
        url
    }

    pub async fn fetch_page(&self, url: Url) -> Result<CatalogPage, ImportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                hint = status_hint(status.as_u16()),
                "catalog request failed"
            );
            return Err(ImportError::RemoteApi {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        serde_json::from_str(&text).map_err(|_| ImportError::RemoteApi {
            status: status.as_u16(),
            body: excerpt(&text),
        })
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}

// Operator-facing hint for the most common catalog failure modes
fn status_hint(status: u16) -> &'static str {
    match status {
        400 => "bad request -- check the dataset id and filter fields",
        401 | 403 => "access denied -- check catalog credentials",
        404 => "dataset not found -- check the dataset id",
        429 => "rate limit exceeded -- raise the page delay and re-run",
        500..=599 => "remote server error",
        _ => "unexpected catalog response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;

    fn client(base: &str) -> CatalogClient {
        CatalogClient::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_build_request_url_is_deterministic() {
        let client = client("https://catalog.example.com/api/records/1.0/search/");
        let mut filters = FilterSet::new();
        filters.insert(
            "place_name".to_string(),
            vec!["Stockholm".to_string(), "Uppsala".to_string()],
        );

        let url = client.build_request_url("geonames-postal-code@public", "SE", &filters, 100, 200);

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("dataset".to_string(), "geonames-postal-code@public".to_string()),
                ("rows".to_string(), "100".to_string()),
                ("start".to_string(), "200".to_string()),
                ("q".to_string(), String::new()),
                ("facet".to_string(), "country_code".to_string()),
                ("refine.country_code".to_string(), "SE".to_string()),
                ("refine.place_name".to_string(), "Stockholm".to_string()),
                ("refine.place_name".to_string(), "Uppsala".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_page_parses_response() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/search");
            then.status(200).json_body(serde_json::json!({
                "nhits": 2,
                "records": [
                    {"fields": {"postal_code": "11455"}},
                    {"fields": {"postal_code": "11456"}}
                ]
            }));
        });

        let client = client(&server.url("/search"));
        let url = client.build_request_url("ds", "SE", &FilterSet::new(), 2, 0);
        let page = client.fetch_page(url).await.unwrap();
        assert_eq!(page.nhits, 2);
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].fields["postal_code"], "11455");
    }

    #[tokio::test]
    async fn test_fetch_page_non_2xx_carries_status_and_excerpt() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/search");
            then.status(429).body("slow down");
        });

        let client = client(&server.url("/search"));
        let url = client.build_request_url("ds", "SE", &FilterSet::new(), 2, 0);
        let err = client.fetch_page(url).await.unwrap_err();
        match err {
            ImportError::RemoteApi { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_page_unparseable_body_is_remote_api_error() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/search");
            then.status(200).body("<html>not json</html>");
        });

        let client = client(&server.url("/search"));
        let url = client.build_request_url("ds", "SE", &FilterSet::new(), 2, 0);
        let err = client.fetch_page(url).await.unwrap_err();
        match err {
            ImportError::RemoteApi { status, body } => {
                assert_eq!(status, 200);
                assert!(body.contains("not json"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
