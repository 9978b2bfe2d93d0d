//! End-to-end tests: the full router on an ephemeral port, called over HTTP.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};

use rfmd_gateway::api;
use rfmd_gateway::app_state::AppState;
use rfmd_gateway::domain::{DatasetCache, RawRecord};
use rfmd_gateway::loader::{DataLoader, LoadError};
use rfmd_gateway::service::HomeownerService;

#[derive(Debug)]
struct StaticLoader {
    rows: Option<Vec<Value>>,
    calls: AtomicUsize,
}

#[async_trait]
impl DataLoader for StaticLoader {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.rows {
            Some(rows) => Ok(rows.iter().filter_map(|v| v.as_object().cloned()).collect()),
            None => Err(LoadError::Query("warehouse offline".to_string())),
        }
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    loader: Arc<StaticLoader>,
}

impl TestServer {
    async fn start(rows: Option<Vec<Value>>) -> Self {
        let loader = Arc::new(StaticLoader {
            rows,
            calls: AtomicUsize::new(0),
        });
        let dyn_loader: Arc<dyn DataLoader> = Arc::clone(&loader) as Arc<dyn DataLoader>;
        let cache = Arc::new(DatasetCache::new(dyn_loader, Duration::from_secs(3600)));
        let app = api::build_app(AppState::new(HomeownerService::new(cache)));

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("local addr");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            loader,
        }
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let Ok(response) = self.client.get(format!("{}{path}", self.base)).send().await else {
            panic!("request to {path} failed");
        };
        let status = response.status();
        let Ok(body) = response.json::<Value>().await else {
            panic!("{path} did not return JSON");
        };
        (status, body)
    }
}

fn customers() -> Vec<Value> {
    vec![
        json!({
            "customer_id": "c1", "segment": "HomeOwner", "region": "North", "sub region": "A",
            "Trade": "Plumber", "monetary": 120.0, "frequency": 3, "RFMD_score": 4.5,
            "R_score": 1, "F_score": 2, "M_score": 3, "D_score": 4,
            "first transaction": "2022-01-10", "last_transaction": "not-a-date", "area": "NW",
        }),
        json!({
            "customer_id": "c2", "segment": "Corporate", "region": "North", "sub region": "B",
            "Trade": "Builder", "monetary": 80.0, "frequency": 1, "RFMD_score": 3.0,
            "R_score": 3, "F_score": 4, "M_score": 5, "D_score": 6,
        }),
        json!({
            "customer_id": "c3", "segment": "Corporate", "region": "South", "sub region": "A",
            "Trade": "Plumber", "monetary": 40.0, "frequency": 2, "RFMD_score": 2.0,
            "R_score": 3, "F_score": 4, "M_score": 5, "D_score": 6,
        }),
    ]
}

#[tokio::test]
async fn listing_normalizes_columns_and_dates() {
    let server = TestServer::start(Some(customers())).await;
    let (status, body) = server.get("/homeowners").await;

    assert_eq!(status, StatusCode::OK);
    let Some(rows) = body.as_array() else {
        panic!("expected array");
    };
    assert_eq!(rows.len(), 3);
    let Some(first) = rows.first() else {
        panic!("non-empty");
    };
    assert_eq!(first.get("sub_region"), Some(&json!("A")));
    assert_eq!(first.get("first_transaction"), Some(&json!("2022-01-10")));
    assert_eq!(first.get("last_transaction"), Some(&Value::Null));
    assert_eq!(first.get("Post_code"), Some(&Value::Null));
    assert!(first.get("area").is_none());
}

#[tokio::test]
async fn repeated_reads_hit_the_loader_once() {
    let server = TestServer::start(Some(customers())).await;
    for path in ["/homeowners", "/homeowners/kpis", "/homeowners/summary", "/homeowners/top10"] {
        let (status, _) = server.get(path).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(server.loader.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn kpis_and_summary() {
    let server = TestServer::start(Some(customers())).await;

    let (_, kpis) = server.get("/homeowners/kpis").await;
    assert_eq!(
        kpis,
        json!({
            "total_customers": 3,
            "avg_rfmd": 3.17,
            "avg_monetary": 80.0,
            "avg_frequency": 2.0,
            "top_trade": "Plumber",
            "top_region": "North",
        })
    );

    let (_, summary) = server.get("/homeowners/summary").await;
    assert_eq!(summary.get("best_segment"), Some(&json!("HomeOwner")));
    assert_eq!(summary.get("best_segment_score"), Some(&json!(4.5)));
    assert_eq!(summary.get("best_region_revenue"), Some(&json!("North")));
    assert_eq!(summary.get("best_region_revenue_value"), Some(&json!(200.0)));
    assert_eq!(summary.get("lowest_region_revenue"), Some(&json!("South")));
    assert_eq!(summary.get("total_rfmd"), Some(&json!(9.5)));
}

#[tokio::test]
async fn top10_drops_area() {
    let server = TestServer::start(Some(customers())).await;
    let (_, body) = server.get("/homeowners/top10").await;
    let Some(rows) = body.as_array() else {
        panic!("expected array");
    };
    let ids: Vec<&Value> = rows.iter().filter_map(|r| r.get("customer_id")).collect();
    assert_eq!(ids, vec![&json!("c1"), &json!("c2"), &json!("c3")]);
    assert!(rows.iter().all(|r| r.get("area").is_none()));
}

#[tokio::test]
async fn radar_by_segment_and_fallback() {
    let server = TestServer::start(Some(customers())).await;

    let (_, corporate) = server.get("/homeowners/radar?segment=Corporate").await;
    assert_eq!(
        corporate,
        json!({
            "labels": ["Recency", "Frequency", "Monetary", "Duration"],
            "scores": [3.0, 4.0, 5.0, 6.0],
        })
    );

    let (_, fallback) = server.get("/homeowners/radar?segment=NoSuchSegment").await;
    assert_eq!(fallback.get("scores"), Some(&json!([2.0, 3.0, 4.0, 5.0])));

    let (_, unfiltered) = server.get("/homeowners/radar").await;
    assert_eq!(unfiltered, fallback);
}

#[tokio::test]
async fn trade_counts_with_filters() {
    let server = TestServer::start(Some(customers())).await;

    let (_, north) = server.get("/homeowners/tradecounts?region=North").await;
    assert_eq!(
        north,
        json!([{"Trade": "Builder", "Count": 1}, {"Trade": "Plumber", "Count": 1}])
    );

    let (_, north_a) = server
        .get("/homeowners/tradecounts?region=North&sub_region=A")
        .await;
    assert_eq!(north_a, json!([{"Trade": "Plumber", "Count": 1}]));

    let (_, all) = server
        .get("/homeowners/tradecounts?region=All%20Regions&sub_region=All%20Sub-Regions")
        .await;
    assert_eq!(all.get(0), Some(&json!({"Trade": "Plumber", "Count": 2})));

    let (status, none) = server.get("/homeowners/tradecounts?region=Nowhere").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!([]));
}

#[tokio::test]
async fn dashboard_filter_options() {
    let server = TestServer::start(Some(customers())).await;

    let (_, segments) = server.get("/homeowners/segments").await;
    assert_eq!(segments, json!(["HomeOwner", "Corporate"]));

    let (_, regions) = server.get("/homeowners/regions").await;
    assert_eq!(
        regions,
        json!([
            {"region": "North", "sub_regions": ["A", "B"]},
            {"region": "South", "sub_regions": ["A"]},
        ])
    );

    let (_, revenue) = server.get("/homeowners/subregion-revenue?region=North").await;
    assert_eq!(
        revenue,
        json!({
            "highest_sub_region": "A",
            "highest_revenue": 120.0,
            "lowest_sub_region": "B",
            "lowest_revenue": 80.0,
        })
    );
}

#[tokio::test]
async fn segment_filter_scopes_dashboard_views() {
    let server = TestServer::start(Some(customers())).await;

    let (_, kpis) = server.get("/homeowners/kpis?segment=Corporate").await;
    assert_eq!(kpis.get("total_customers"), Some(&json!(2)));
    assert_eq!(kpis.get("avg_monetary"), Some(&json!(60.0)));

    let (_, top) = server.get("/homeowners/top10?segment=Corporate").await;
    let Some(rows) = top.as_array() else {
        panic!("expected array");
    };
    let ids: Vec<&Value> = rows.iter().filter_map(|r| r.get("customer_id")).collect();
    assert_eq!(ids, vec![&json!("c2"), &json!("c3")]);

    let (_, summary) = server.get("/homeowners/summary?segment=Corporate").await;
    assert_eq!(summary.get("total_rfmd"), Some(&json!(5.0)));
    assert_eq!(summary.get("best_region_revenue"), Some(&json!("North")));
    assert_eq!(summary.get("lowest_region_revenue"), Some(&json!("South")));
    assert_eq!(summary.get("lowest_region_revenue_value"), Some(&json!(40.0)));

    let (_, trades) = server
        .get("/homeowners/tradecounts?segment=Corporate&region=North")
        .await;
    assert_eq!(trades, json!([{"Trade": "Builder", "Count": 1}]));

    let (_, revenue) = server
        .get("/homeowners/subregion-revenue?segment=Corporate&region=All%20Regions")
        .await;
    assert_eq!(revenue.get("highest_sub_region"), Some(&json!("B")));
    assert_eq!(revenue.get("lowest_sub_region"), Some(&json!("A")));

    let (status, none) = server.get("/homeowners/kpis?segment=Government").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(none, json!({}));

    let (_, everyone) = server.get("/homeowners/kpis?segment=All").await;
    assert_eq!(everyone.get("total_customers"), Some(&json!(3)));
}

#[tokio::test]
async fn unavailable_warehouse_serves_empty_results() {
    let server = TestServer::start(None).await;

    for (path, expected) in [
        ("/homeowners", json!([])),
        ("/homeowners/kpis", json!({})),
        ("/homeowners/summary", json!({})),
        ("/homeowners/top10", json!([])),
        ("/homeowners/tradecounts", json!([])),
        ("/homeowners/subregion-revenue", json!({})),
    ] {
        let (status, body) = server.get(path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body, expected, "{path}");
    }

    let (_, radar) = server.get("/homeowners/radar").await;
    assert_eq!(radar.get("scores"), Some(&json!([0.0, 0.0, 0.0, 0.0])));
}

#[tokio::test]
async fn system_endpoints() {
    let server = TestServer::start(Some(customers())).await;

    let (status, root) = server.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root, json!({"message": "RFMD API is running"}));

    let (status, health) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health.get("status"), Some(&json!("healthy")));
    assert_eq!(
        health.get("cache").and_then(|c| c.get("loaded")),
        Some(&json!(false))
    );
    assert_eq!(server.loader.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let server = TestServer::start(Some(customers())).await;
    let (status, body) = server.get("/homeowner").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body.get("error").and_then(|e| e.get("code")),
        Some(&json!(2001))
    );
}
