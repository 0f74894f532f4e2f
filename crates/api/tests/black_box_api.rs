use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

use shopdesk_api::app::{build_app, AppServices};
use shopdesk_infra::{DashboardBroadcasterHandle, InMemoryStore};

struct TestServer {
    base_url: String,
    ws_url: String,
    store: Arc<InMemoryStore>,
    handle: tokio::task::JoinHandle<()>,
    _broadcaster: Option<DashboardBroadcasterHandle>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(None).await
    }

    /// Same router as prod on an ephemeral port, optionally with the periodic broadcaster.
    async fn spawn_with(broadcast_interval: Option<Duration>) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let services = Arc::new(AppServices::new(
            store.clone(),
            Duration::from_millis(500),
        ));
        let broadcaster = broadcast_interval.map(|interval| {
            services
                .start_dashboard(interval)
                .expect("broadcaster already started")
        });

        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api/v1", addr),
            ws_url: format!("ws://{}/api/v1/analytics/ws/dashboard", addr),
            store,
            handle,
            _broadcaster: broadcaster,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_json(client: &reqwest::Client, url: String, body: Value) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, name: &str, price: f64) -> i64 {
    let (status, body) = post_json(
        client,
        srv.url("/products"),
        json!({ "name": name, "category": "Gadgets", "price": price }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

/// Seeds the scenario: A (10.00) and B (20.00); A has 5 in stock against a threshold of 10;
/// today A sold 2 and B sold 1, yesterday A sold 1.
async fn seed_dashboard_scenario(client: &reqwest::Client, srv: &TestServer) -> (i64, i64) {
    let a = create_product(client, srv, "A", 10.0).await;
    let b = create_product(client, srv, "B", 20.0).await;

    let (status, _) = post_json(
        client,
        srv.url("/inventory"),
        json!({ "product_id": a, "quantity": 5, "low_stock_threshold": 10 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let yesterday = Utc::now() - ChronoDuration::days(1);
    for body in [
        json!({ "product_id": a, "quantity": 2 }),
        json!({ "product_id": b, "quantity": 1 }),
        json!({ "product_id": a, "quantity": 1, "sale_date": yesterday }),
    ] {
        let (status, _) = post_json(client, srv.url("/sales"), body).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    (a, b)
}

#[tokio::test]
async fn root_and_health_are_served_outside_the_prefix() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let origin = srv.base_url.trim_end_matches("/api/v1");

    let res = client.get(format!("{}/health", origin)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (status, body) = get_json(&client, format!("{}/", origin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "shopdesk");
    assert_eq!(body["docs"], "/api/v1");
    assert!(body["features"].as_array().unwrap().iter().any(|f| f == "Live Dashboard"));
}

#[tokio::test]
async fn product_lifecycle_create_update_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, "Lamp", 25.0).await;

    let (status, body) = get_json(&client, srv.url(&format!("/products/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Lamp");
    assert_eq!(body["category"], "Gadgets");

    let res = client
        .put(srv.url(&format!("/products/{}", id)))
        .json(&json!({ "price": 30.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["price"].as_f64().unwrap(), 30.0);
    assert_eq!(body["name"], "Lamp");

    let (status, list) = get_json(&client, srv.url("/products?skip=0&limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/products/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product deleted successfully");

    let (status, body) = get_json(&client, srv.url(&format!("/products/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn invalid_input_is_rejected_with_error_bodies() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = post_json(
        &client,
        srv.url("/products"),
        json!({ "name": "Free", "category": "Gadgets", "price": 0.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = get_json(&client, srv.url("/products/not-a-number")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");

    let (status, body) = post_json(
        &client,
        srv.url("/sales"),
        json!({ "product_id": 999, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "unknown_reference");

    let (status, body) = get_json(&client, srv.url("/products?limit=-1")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn deleting_a_referenced_product_conflicts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, "Mug", 8.0).await;
    let (status, _) = post_json(
        &client,
        srv.url("/sales"),
        json!({ "product_id": id, "quantity": 3 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let res = client
        .delete(srv.url(&format!("/products/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn sale_total_defaults_to_price_times_quantity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, "Pen", 2.5).await;
    let (status, sale) = post_json(
        &client,
        srv.url("/sales"),
        json!({ "product_id": id, "quantity": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["total_amount"].as_f64().unwrap(), 10.0);

    let sale_id = sale["id"].as_i64().unwrap();
    let (status, fetched) = get_json(&client, srv.url(&format!("/sales/{}", sale_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["product_id"].as_i64().unwrap(), id);

    let (status, summary) = get_json(&client, srv.url("/sales/analytics")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_sales"].as_i64().unwrap(), 1);
    assert_eq!(summary["total_revenue"].as_f64().unwrap(), 10.0);
    assert_eq!(summary["average_order_value"].as_f64().unwrap(), 10.0);

    let (status, by_category) = get_json(&client, srv.url("/sales/by-category")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_category[0]["category"], "Gadgets");
    assert_eq!(by_category[0]["total_sales"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn inventory_updates_are_recorded_as_changes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, "Cable", 4.0).await;
    let (status, _) = post_json(
        &client,
        srv.url("/inventory"),
        json!({ "product_id": id, "quantity": 50 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(
        &client,
        srv.url("/inventory"),
        json!({ "product_id": id, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (_, low) = get_json(&client, srv.url("/inventory/low-stock")).await;
    assert!(low.as_array().unwrap().is_empty());

    let res = client
        .put(srv.url(&format!("/inventory/{}", id)))
        .json(&json!({ "quantity": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let record: Value = res.json().await.unwrap();
    assert_eq!(record["quantity"].as_i64().unwrap(), 3);
    assert_eq!(record["low_stock_threshold"].as_i64().unwrap(), 10);

    let (_, low) = get_json(&client, srv.url("/inventory/low-stock")).await;
    assert_eq!(
        low,
        json!([{
            "product_id": id,
            "product_name": "Cable",
            "current_quantity": 3,
            "threshold": 10,
        }])
    );

    let (status, history) =
        get_json(&client, srv.url(&format!("/inventory/changes/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["product_id"].as_i64().unwrap(), id);
    let quantities: Vec<i64> = history["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["quantity"].as_i64().unwrap())
        .collect();
    assert_eq!(quantities, vec![3, 50]);

    let (status, _) = get_json(&client, srv.url("/inventory/changes/999")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn snapshot_reflects_sales_and_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_dashboard_scenario(&client, &srv).await;

    let (status, snapshot) = get_json(&client, srv.url("/analytics/snapshot")).await;
    assert_eq!(status, StatusCode::OK);

    let daily = &snapshot["daily_snapshot"];
    assert_eq!(daily["today_sales"].as_f64().unwrap(), 40.0);
    assert_eq!(daily["yesterday_sales"].as_f64().unwrap(), 10.0);
    assert_eq!(daily["growth"].as_f64().unwrap(), 300.0);
    assert_eq!(
        snapshot["inventory_alerts"],
        json!([{ "product": "A", "current_stock": 5, "min_required": 10 }])
    );

    let top = snapshot["top_performers"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["product"], "A");
    assert_eq!(top[0]["units_sold"].as_i64().unwrap(), 2);
    assert_eq!(top[1]["product"], "B");
    assert_eq!(top[1]["revenue"].as_f64().unwrap(), 20.0);

    // "YYYY-MM-DD HH:MM:SS"
    assert_eq!(snapshot["updated_at"].as_str().unwrap().len(), 19);
}

#[tokio::test]
async fn snapshot_is_unavailable_while_the_store_is_offline() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    srv.store.set_available(false);
    let (status, body) = get_json(&client, srv.url("/analytics/snapshot")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "data_unavailable");

    srv.store.set_available(true);
    let (status, _) = get_json(&client, srv.url("/analytics/snapshot")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn revenue_comparison_validates_the_period() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_dashboard_scenario(&client, &srv).await;

    let (status, body) = get_json(&client, srv.url("/sales/revenue/comparison")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "daily");
    assert_eq!(body["current_revenue"].as_f64().unwrap(), 40.0);
    assert_eq!(body["previous_revenue"].as_f64().unwrap(), 10.0);
    assert_eq!(body["change_percentage"].as_f64().unwrap(), 300.0);

    let (status, body) =
        get_json(&client, srv.url("/sales/revenue/comparison?period=Weekly")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["period"], "weekly");

    let (status, body) =
        get_json(&client, srv.url("/sales/revenue/comparison?period=hourly")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_period");
}

#[tokio::test]
async fn insights_cover_trends_categories_and_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, b) = seed_dashboard_scenario(&client, &srv).await;
    let (status, _) = post_json(
        &client,
        srv.url("/inventory"),
        json!({ "product_id": b, "quantity": 40, "low_stock_threshold": 5 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, trends) = get_json(&client, srv.url("/insights/sales-trends?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(trends["period"], "Last 7 days");
    let orders: i64 = trends["daily_breakdown"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["orders"].as_i64().unwrap())
        .sum();
    assert_eq!(orders, 3);

    let (status, body) = get_json(&client, srv.url("/insights/sales-trends?days=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, categories) =
        get_json(&client, srv.url("/insights/category-performance")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        categories,
        json!([{ "category": "Gadgets", "orders": 3, "revenue": 50.0, "avg_order_value": 16.67 }])
    );

    let (status, stock) = get_json(&client, srv.url("/insights/stock-management")).await;
    assert_eq!(status, StatusCode::OK);
    let stock = stock.as_array().unwrap();
    assert_eq!(stock.len(), 2);
    let a = stock.iter().find(|s| s["product"] == "A").unwrap();
    assert_eq!(a["status"], "Low");
    assert_eq!(a["monthly_sales"].as_i64().unwrap(), 2);
    // 5 / (2 / 30)
    assert_eq!(a["estimated_days_left"].as_f64().unwrap(), 75.0);
    let b = stock.iter().find(|s| s["product"] == "B").unwrap();
    assert_eq!(b["status"], "Good");
    assert_eq!(b["estimated_days_left"].as_f64().unwrap(), 1200.0);
}

#[tokio::test]
async fn stock_without_recent_sales_has_undetermined_depletion() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let id = create_product(&client, &srv, "Shelf", 90.0).await;
    let (status, _) = post_json(
        &client,
        srv.url("/inventory"),
        json!({ "product_id": id, "quantity": 12 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, stock) = get_json(&client, srv.url("/insights/stock-management")).await;
    assert_eq!(stock[0]["monthly_sales"].as_i64().unwrap(), 0);
    assert_eq!(stock[0]["estimated_days_left"], "undetermined");
}

async fn next_snapshot<S>(ws: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a snapshot")
            .expect("socket closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn websocket_pushes_a_snapshot_on_connect() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_dashboard_scenario(&client, &srv).await;

    let (mut ws, _) = tokio_tungstenite::connect_async(srv.ws_url.as_str())
        .await
        .expect("websocket handshake failed");

    let snapshot = next_snapshot(&mut ws).await;
    assert_eq!(snapshot["daily_snapshot"]["growth"].as_f64().unwrap(), 300.0);
    assert_eq!(snapshot["inventory_alerts"][0]["product"], "A");
}

#[tokio::test]
async fn websocket_receives_periodic_broadcasts() {
    let srv = TestServer::spawn_with(Some(Duration::from_millis(100))).await;
    let client = reqwest::Client::new();

    let (mut ws, _) = tokio_tungstenite::connect_async(srv.ws_url.as_str())
        .await
        .expect("websocket handshake failed");

    let first = next_snapshot(&mut ws).await;
    assert_eq!(first["daily_snapshot"]["today_sales"].as_f64().unwrap(), 0.0);

    let id = create_product(&client, &srv, "Desk", 120.0).await;
    let (status, _) = post_json(
        &client,
        srv.url("/sales"),
        json!({ "product_id": id, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut saw_sale = false;
    for _ in 0..20 {
        let snapshot = next_snapshot(&mut ws).await;
        if snapshot["daily_snapshot"]["today_sales"].as_f64().unwrap() == 120.0 {
            saw_sale = true;
            break;
        }
    }
    assert!(saw_sale, "periodic broadcast never reflected the new sale");
}
