use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use postal_import_worker::{
    catalog::CatalogClient,
    filters::FilterSet,
    runner::{run_all, ImportPlan},
    sink::{BatchWriter, MemoryDestination},
    slices::SliceSpec,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn plan(dataset_id: &str, batch_size: u64) -> ImportPlan {
    ImportPlan {
        country_code: "SE".to_string(),
        dataset_id: dataset_id.to_string(),
        base_filters: FilterSet::new(),
        batch_size,
        max_records: None,
        default_delay: Duration::from_millis(0),
        slices: Vec::new(),
    }
}

#[tokio::test]
async fn test_two_page_import_drops_record_missing_longitude() {
    let server = MockServer::start();

    // page 1: one good record, one missing its longitude
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/search")
            .query_param("refine.country_code", "SE")
            .query_param("start", "0");
        then.status(200).json_body(json!({
            "nhits": 4,
            "records": [
                {"fields": {"postal_code": "114 55", "place_name": "Stockholm", "latitude": 59.34, "longitude": 18.06}},
                {"fields": {"postal_code": "753 10", "place_name": "Uppsala", "latitude": 59.86}}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/search")
            .query_param("refine.country_code", "SE")
            .query_param("start", "2");
        then.status(200).json_body(json!({
            "nhits": 4,
            "records": [
                {"fields": {"postal_code": "211 19", "place_name": "Malmö", "latitude": 55.60, "longitude": 13.00}},
                {"fields": {"postal_code": "411 01", "place_name": "Göteborg", "latitude": 57.70, "longitude": 11.97}}
            ]
        }));
    });

    let catalog = CatalogClient::new(&server.url("/search"), Duration::from_secs(5)).unwrap();
    let destination = Arc::new(MemoryDestination::default());
    let writer = BatchWriter::new(destination.clone());
    let cancel = CancellationToken::new();

    let result = run_all(&catalog, &writer, &plan("geonames-postal-code@public", 2), &cancel)
        .await
        .unwrap();

    assert_eq!(result.total_processed, 4);
    assert_eq!(result.total_inserted, 3);
    assert_eq!(result.slices.len(), 1);
    assert_eq!(result.slices[0].label, "full");
    assert_eq!(destination.row_count(), 3);

    // sanitized key, record missing longitude never written
    let stockholm = destination.get("11455").unwrap();
    assert_eq!(stockholm.city, "Stockholm");
    assert_eq!(stockholm.country_code, "SE");
    assert!(stockholm.is_active);
    assert!(destination.get("75310").is_none());
}

#[tokio::test]
async fn test_sliced_import_aggregates_in_slice_order() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/search")
            .query_param("refine.admin_name1", "Stockholm");
        then.status(200).json_body(json!({
            "nhits": 2,
            "records": [
                {"fields": {"postal_code": "11455", "latitude": 59.34, "longitude": 18.06}},
                {"fields": {"postal_code": "11457", "latitude": 59.34, "longitude": 18.07}}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/search")
            .query_param("refine.admin_name1", "Skåne");
        then.status(200).json_body(json!({
            "nhits": 1,
            "records": [
                {"fields": {"postal_code": "21119", "latitude": 55.60, "longitude": 13.00}}
            ]
        }));
    });

    let catalog = CatalogClient::new(&server.url("/search"), Duration::from_secs(5)).unwrap();
    let destination = Arc::new(MemoryDestination::default());
    let writer = BatchWriter::new(destination.clone());
    let cancel = CancellationToken::new();

    let mut plan = plan("geonames-postal-code@public", 100);
    plan.slices = vec![
        SliceSpec {
            label: "stockholm".to_string(),
            filters: [("admin_name1".to_string(), vec!["Stockholm".to_string()])].into(),
            max_records: None,
            request_delay_ms: None,
        },
        SliceSpec {
            label: "skane".to_string(),
            filters: [("admin_name1".to_string(), vec!["Skåne".to_string()])].into(),
            max_records: None,
            request_delay_ms: None,
        },
    ];

    let result = run_all(&catalog, &writer, &plan, &cancel).await.unwrap();

    assert_eq!(result.total_processed, 3);
    assert_eq!(result.total_inserted, 3);
    assert_eq!(
        result
            .slices
            .iter()
            .map(|s| s.label.as_str())
            .collect::<Vec<_>>(),
        vec!["stockholm", "skane"]
    );
    assert_eq!(destination.row_count(), 3);
}

#[tokio::test]
async fn test_rerun_of_identical_dataset_is_idempotent() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(httpmock::Method::GET)
            .path("/search")
            .query_param("start", "0");
        then.status(200).json_body(json!({
            "nhits": 2,
            "records": [
                {"fields": {"postal_code": "11455", "latitude": 59.34, "longitude": 18.06}},
                {"fields": {"postal_code": "11457", "latitude": 59.34, "longitude": 18.07}}
            ]
        }));
    });

    let catalog = CatalogClient::new(&server.url("/search"), Duration::from_secs(5)).unwrap();
    let destination = Arc::new(MemoryDestination::default());
    let writer = BatchWriter::new(destination.clone());
    let cancel = CancellationToken::new();
    let plan = plan("geonames-postal-code@public", 100);

    for _ in 0..2 {
        run_all(&catalog, &writer, &plan, &cancel).await.unwrap();
    }

    assert_eq!(destination.row_count(), 2);
}
