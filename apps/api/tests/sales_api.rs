//! End-to-end tests for the HTTP API against an in-memory database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use std::sync::Arc;

use chrono::Utc;

use saledesk_api::{build_router, AppState};
use saledesk_core::{Money, Sale, SaleEvent};
use saledesk_db::{Database, DbConfig};
use saledesk_events::{LogPublisher, OutboxRelay, RelaySettings};

const DECIMAL_MAX: &str = "79228162514264337593543950335";

// =============================================================================
// Helpers
// =============================================================================

async fn app() -> (Router, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    (build_router(AppState::new(db.clone(), None)), db)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(value.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn money(value: &Value) -> Money {
    value.as_str().unwrap().parse().unwrap()
}

fn create_body(products: Value) -> Value {
    json!({
        "saleNumber": "S-0001",
        "saleDate": "2024-05-01T12:00:00Z",
        "customer": "Acme Ltd",
        "branch": "Downtown",
        "products": products
    })
}

async fn create(app: &Router, products: Value) -> Value {
    let (status, body) = send(app, Method::POST, "/api/sales", Some(create_body(products))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

fn update_body(sale: &Value, products: Value) -> Value {
    json!({
        "saleNumber": sale["saleNumber"],
        "saleDate": sale["saleDate"],
        "customer": sale["customer"],
        "branch": sale["branch"],
        "isCancelled": false,
        "products": products
    })
}

async fn topics(db: &Database, sale_id: &str) -> Vec<String> {
    db.outbox()
        .list_for_aggregate(sale_id)
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.topic)
        .collect()
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn create_prices_every_line() {
    let (app, db) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales",
        Some(create_body(json!([
            { "productName": "Monitor", "quantity": 10, "unitPrice": "100" },
            { "productName": "Keyboard", "quantity": 5, "unitPrice": 50 },
            { "productName": "Cable", "quantity": 2, "unitPrice": "30.00" }
        ]))),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Sale created successfully");

    let sale = &body["data"];
    let products = sale["products"].as_array().unwrap();
    assert_eq!(money(&products[0]["discount"]), Money::from_major(200));
    assert_eq!(money(&products[0]["total"]), Money::from_major(800));
    assert_eq!(money(&products[1]["discount"]), Money::from_major(25));
    assert_eq!(money(&products[1]["total"]), Money::from_major(225));
    assert_eq!(money(&products[2]["discount"]), Money::zero());
    assert_eq!(money(&sale["totalAmount"]), Money::from_major(1085));
    assert_eq!(money(&sale["activeAmount"]), Money::from_major(1085));

    let id = sale["id"].as_str().unwrap();
    assert_eq!(topics(&db, id).await, vec![SaleEvent::SALE_CREATED_TOPIC]);
}

#[tokio::test]
async fn create_reports_every_invalid_field() {
    let (app, db) = app().await;

    let mut body = create_body(json!([
        { "productName": "Monitor", "quantity": 21, "unitPrice": "10" },
        { "productName": "", "quantity": 1, "unitPrice": "0" }
    ]));
    body["customer"] = json!("");

    let (status, body) = send(&app, Method::POST, "/api/sales", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(
        fields,
        vec![
            "customer",
            "products[0].quantity",
            "products[1].productName",
            "products[1].unitPrice"
        ]
    );
    assert_eq!(db.sales().count().await.unwrap(), 0);
    assert_eq!(db.outbox().count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn create_rejects_future_sale_date() {
    let (app, _db) = app().await;
    let mut body = create_body(json!([]));
    body["saleDate"] = json!("2999-01-01T00:00:00Z");

    let (status, body) = send(&app, Method::POST, "/api/sales", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "saleDate");
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let (app, _db) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales",
        Some(json!({ "saleNumber": "S-1" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["success"], false);
}

// =============================================================================
// Read
// =============================================================================

#[tokio::test]
async fn get_and_list_sales() {
    let (app, _db) = app().await;
    let sale = create(&app, json!([{ "productName": "Mouse", "quantity": 4, "unitPrice": "25" }])).await;
    let id = sale["id"].as_str().unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/api/sales/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sale retrieved successfully");
    assert_eq!(body["data"]["id"], id);
    assert_eq!(money(&body["data"]["totalAmount"]), Money::from_major(90));

    let (status, body) = send(&app, Method::GET, "/api/sales", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sales retrieved successfully");
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn get_unknown_or_malformed_id() {
    let (app, _db) = app().await;

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, Method::GET, &format!("/api/sales/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = send(&app, Method::GET, "/api/sales/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "id");
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn update_merges_items_and_emits_transitions() {
    let (app, db) = app().await;
    let sale = create(
        &app,
        json!([
            { "productName": "Monitor", "quantity": 10, "unitPrice": "100" },
            { "productName": "Keyboard", "quantity": 5, "unitPrice": "50" }
        ]),
    )
    .await;
    let id = sale["id"].as_str().unwrap().to_string();
    let monitor_id = sale["products"][0]["id"].clone();
    let uri = format!("/api/sales/{id}");

    // Cancel the monitor line, add a new line, leave the keyboard out.
    let body = update_body(
        &sale,
        json!([
            { "id": monitor_id, "productName": "Monitor", "quantity": 10, "unitPrice": "100", "isCancelled": true },
            { "productName": "Webcam", "quantity": 1, "unitPrice": "40", "isCancelled": false }
        ]),
    );
    let (status, response) = send(&app, Method::PUT, &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK, "{response}");
    assert_eq!(response["message"], "Sale updated successfully");

    let updated = &response["data"];
    let products = updated["products"].as_array().unwrap();
    assert_eq!(products.len(), 3);
    assert_eq!(products[0]["isCancelled"], true);
    assert_eq!(products[1]["productName"], "Keyboard");
    assert_eq!(products[2]["productName"], "Webcam");
    // Cancelled lines stay in the total, not in the active amount.
    assert_eq!(money(&updated["totalAmount"]), Money::from_major(1065));
    assert_eq!(money(&updated["activeAmount"]), Money::from_major(265));

    assert_eq!(
        topics(&db, &id).await,
        vec![
            SaleEvent::SALE_CREATED_TOPIC,
            SaleEvent::SALE_MODIFIED_TOPIC,
            SaleEvent::ITEM_CANCELLED_TOPIC
        ]
    );

    // Repeating the cancellation is not a new transition.
    let mut again = body;
    again["products"] = json!([
        { "id": monitor_id, "productName": "Monitor", "quantity": 10, "unitPrice": "100", "isCancelled": true }
    ]);
    let (status, _) = send(&app, Method::PUT, &uri, Some(again)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(topics(&db, &id).await.len(), 4);
    assert_eq!(topics(&db, &id).await[3], SaleEvent::SALE_MODIFIED_TOPIC);
}

#[tokio::test]
async fn update_cancellation_is_one_way() {
    let (app, db) = app().await;
    let sale = create(&app, json!([{ "productName": "Desk", "quantity": 1, "unitPrice": "300" }])).await;
    let id = sale["id"].as_str().unwrap().to_string();
    let uri = format!("/api/sales/{id}");

    let mut cancel = update_body(&sale, json!([]));
    cancel["isCancelled"] = json!(true);
    cancel["cancellationReason"] = json!("Customer changed mind");
    let (status, body) = send(&app, Method::PUT, &uri, Some(cancel)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCancelled"], true);
    assert_eq!(body["data"]["products"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::PUT, &uri, Some(update_body(&sale, json!([])))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isCancelled"], true);

    let entries = db.outbox().list_for_aggregate(&id).await.unwrap();
    let cancelled: Vec<_> = entries
        .iter()
        .filter(|entry| entry.topic == SaleEvent::SALE_CANCELLED_TOPIC)
        .collect();
    assert_eq!(cancelled.len(), 1);
    assert!(cancelled[0].payload.contains("Customer changed mind"));
}

#[tokio::test]
async fn update_validation_and_not_found() {
    let (app, db) = app().await;
    let sale = create(&app, json!([{ "productName": "Desk", "quantity": 1, "unitPrice": "300" }])).await;
    let id = sale["id"].as_str().unwrap().to_string();

    let mut mismatched = update_body(&sale, json!([]));
    mismatched["id"] = json!(uuid::Uuid::new_v4().to_string());
    let (status, body) = send(&app, Method::PUT, &format!("/api/sales/{id}"), Some(mismatched)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "id");

    let too_many = update_body(
        &sale,
        json!([{ "productName": "Desk", "quantity": 21, "unitPrice": "300", "isCancelled": false }]),
    );
    let (status, _) = send(&app, Method::PUT, &format!("/api/sales/{id}"), Some(too_many)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sales/{missing}"),
        Some(update_body(&sale, json!([]))),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    // Only the creation event: rejected updates leave no trace.
    assert_eq!(topics(&db, &id).await.len(), 1);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn delete_removes_sale_without_events() {
    let (app, db) = app().await;
    let sale = create(&app, json!([{ "productName": "Desk", "quantity": 1, "unitPrice": "300" }])).await;
    let id = sale["id"].as_str().unwrap().to_string();
    let uri = format!("/api/sales/{id}");

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sale deleted successfully");
    assert_eq!(body["data"], Value::Null);

    let (status, _) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(topics(&db, &id).await, vec![SaleEvent::SALE_CREATED_TOPIC]);
}

// =============================================================================
// Pricing Preview & Health
// =============================================================================

#[tokio::test]
async fn pricing_preview_matches_sale_pricing() {
    let (app, db) = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pricing/preview",
        Some(json!({
            "products": [
                { "productName": "Monitor", "quantity": 10, "unitPrice": "100" },
                { "quantity": 5, "unitPrice": "50" }
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let lines = body["data"]["lines"].as_array().unwrap();
    assert_eq!(lines[0]["productName"], "Monitor");
    assert_eq!(lines[0]["tier"], "twentyPercent");
    assert_eq!(money(&lines[0]["discount"]), Money::from_major(200));
    assert_eq!(lines[1]["tier"], "tenPercent");
    assert_eq!(money(&body["data"]["totalAmount"]), Money::from_major(1025));
    assert_eq!(db.sales().count().await.unwrap(), 0);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/pricing/preview",
        Some(json!({ "products": [{ "quantity": 21, "unitPrice": "1" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn out_of_range_unit_price_is_a_validation_error() {
    let (app, db) = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sales",
        Some(create_body(json!([
            { "productName": "Cable", "quantity": 2, "unitPrice": "10" },
            { "productName": "Vault", "quantity": 2, "unitPrice": DECIMAL_MAX }
        ]))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"][0]["field"], "products[1].unitPrice");
    assert_eq!(db.sales().count().await.unwrap(), 0);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/pricing/preview",
        Some(json!({ "products": [{ "productName": "Vault", "quantity": 2, "unitPrice": DECIMAL_MAX }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["errors"][0]["field"], "products[0].unitPrice");

    let sale = create(&app, json!([{ "productName": "Cable", "quantity": 2, "unitPrice": "10" }])).await;
    let uri = format!("/api/sales/{}", sale["id"].as_str().unwrap());
    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(update_body(
            &sale,
            json!([{ "productName": "Vault", "quantity": 1, "unitPrice": DECIMAL_MAX, "isCancelled": false }]),
        )),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["errors"][0]["field"], "products[0].unitPrice");
}

/// Inserts a sale straight through the repository, skipping request
/// validation and the discount pass, like a row written by an older release.
async fn insert_unchecked(db: &Database, quantity: i64, unit_price: Money) -> Sale {
    let now = Utc::now();
    let mut sale = Sale::new("S-LEGACY", now, "Acme Ltd", "Downtown", now);
    sale.add_item("Legacy line", quantity, unit_price);
    db.sales().insert(&sale, &[]).await.unwrap();
    sale
}

fn untouched_update(sale: &Sale) -> Value {
    json!({
        "saleNumber": sale.sale_number,
        "saleDate": sale.sale_date,
        "customer": sale.customer,
        "branch": sale.branch,
        "isCancelled": false,
        "products": []
    })
}

#[tokio::test]
async fn update_of_stored_item_over_the_cap_is_domain_rule() {
    let (app, db) = app().await;
    let sale = insert_unchecked(&db, 25, Money::from_major(10)).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sales/{}", sale.id),
        Some(untouched_update(&sale)),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "DOMAIN_RULE");
    assert_eq!(body["message"], "Cannot sell more than 20 units of product 'Legacy line'");
    assert!(topics(&db, &sale.id).await.is_empty());
}

#[tokio::test]
async fn update_of_stored_out_of_range_price_is_domain_rule() {
    let (app, db) = app().await;
    let sale = insert_unchecked(&db, 2, DECIMAL_MAX.parse().unwrap()).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/sales/{}", sale.id),
        Some(untouched_update(&sale)),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    assert_eq!(body["code"], "DOMAIN_RULE");
    assert_eq!(body["message"], "Amount too large while computing line subtotal");
    assert!(topics(&db, &sale.id).await.is_empty());
}

#[tokio::test]
async fn health_reports_pending_events() {
    let (app, _db) = app().await;
    create(&app, json!([])).await;

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "up");
    assert_eq!(body["pendingEvents"], 1);
}

#[tokio::test]
async fn health_reports_exhausted_events_when_a_relay_runs() {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let (_relay, handle) = OutboxRelay::new(
        db.clone(),
        Arc::new(LogPublisher),
        RelaySettings {
            max_attempts: 2,
            ..RelaySettings::default()
        },
    );
    let app = build_router(AppState::new(db.clone(), Some(handle)));

    let sale = create(&app, json!([])).await;
    let entries = db
        .outbox()
        .list_for_aggregate(sale["id"].as_str().unwrap())
        .await
        .unwrap();
    for _ in 0..2 {
        db.outbox().mark_failed(&entries[0].id, "receiver down").await.unwrap();
    }

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pendingEvents"], 1);
    assert_eq!(body["exhaustedEvents"], 1);

    // without a relay nothing is ever given up on
    let (plain, _db) = crate::app().await;
    let (_, body) = send(&plain, Method::GET, "/health", None).await;
    assert!(body.get("exhaustedEvents").is_none());
}
