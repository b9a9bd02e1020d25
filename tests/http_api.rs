//! HTTP surface exercised through the router, without binding a socket

use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pmp_workflow_engine::api::create_router;
use pmp_workflow_engine::domain::{BatchId, DiscountType, PromoCodeBatch};
use pmp_workflow_engine::{AppConfig, Engine};
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> (Engine, Router) {
    let batch = PromoCodeBatch::new(
        BatchId::new("welcome").unwrap(),
        "Welcome",
        DiscountType::Percentage,
        15.0,
    )
    .with_prefix("HELLO");
    let engine = Engine::in_memory_with(&AppConfig::default(), Vec::new(), vec![batch]);
    let router = create_router(engine.app_state());
    (engine, router)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn cart_workflow() -> Value {
    json!({
        "id": "cart-recovery",
        "name": "Cart recovery",
        "trigger": {"eventType": "ecommerce", "eventName": "add_to_cart"},
        "nodes": [
            {"id": "trigger", "type": "trigger"},
            {"id": "promo", "type": "promo_code", "batchId": "welcome", "outputVariable": "promoCode"},
            {
                "id": "push",
                "type": "push_notification",
                "title": "Still thinking about {{event.itemCategory}}?",
                "body": "Here is {{promoCode.code}}",
                "target": {"mode": "all"}
            }
        ],
        "edges": [
            {"source": "trigger", "target": "promo"},
            {"source": "promo", "target": "push"}
        ]
    })
}

#[tokio::test]
async fn test_create_get_and_delete_workflow() {
    let (_, router) = app();

    let (status, created) = send(&router, "POST", "/v1/workflows", Some(cart_workflow())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], json!("cart-recovery"));

    let (status, _) = send(&router, "POST", "/v1/workflows", Some(cart_workflow())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, fetched) = send(&router, "GET", "/v1/workflows/cart-recovery", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["nodes"].as_array().unwrap().len(), 3);

    let (status, listed) = send(&router, "GET", "/v1/workflows", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["total"], json!(1));

    let (status, _) = send(&router, "DELETE", "/v1/workflows/cart-recovery", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, error) = send(&router, "GET", "/v1/workflows/cart-recovery", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"]["type"], json!("not_found_error"));
}

#[tokio::test]
async fn test_invalid_definition_rejected() {
    let (_, router) = app();
    let mut definition = cart_workflow();
    definition["edges"] = json!([{"source": "trigger", "target": "nowhere"}]);

    let (status, error) = send(&router, "POST", "/v1/workflows", Some(definition)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["error"]["message"].as_str().unwrap().contains("nowhere"));
}

#[tokio::test]
async fn test_event_ingestion_runs_workflow_and_exposes_steps() {
    let (_, router) = app();
    send(&router, "POST", "/v1/workflows", Some(cart_workflow())).await;

    let event = json!({
        "name": "add_to_cart",
        "category": "ecommerce",
        "value": 150,
        "itemCategory": "shoes",
        "userPhone": "+15550199"
    });
    let (status, receipt) = send(&router, "POST", "/v1/events", Some(event)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(receipt["matchedWorkflows"], json!(["cart-recovery"]));

    let mut execution = Value::Null;
    for _ in 0..50 {
        let (_, listed) =
            send(&router, "GET", "/v1/workflows/cart-recovery/executions", None).await;
        if let Some(first) = listed["executions"].get(0) {
            if first["status"] != json!("running") {
                execution = first.clone();
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(execution["status"], json!("completed"));

    let id = execution["id"].as_str().unwrap();
    let (status, detail) = send(&router, "GET", &format!("/v1/executions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let steps = detail["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0]["stepType"], json!("trigger_validation"));
    assert!(steps[1]["output"]["code"].as_str().unwrap().starts_with("HELLO"));
    assert_eq!(steps[2]["input"]["title"], json!("Still thinking about shoes?"));

    let (status, cancel) =
        send(&router, "POST", &format!("/v1/executions/{id}/cancel"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancel["accepted"], json!(false));
}

#[tokio::test]
async fn test_unmatched_event_starts_nothing() {
    let (_, router) = app();
    send(&router, "POST", "/v1/workflows", Some(cart_workflow())).await;

    let event = json!({"name": "page_view", "category": "navigation"});
    let (status, receipt) = send(&router, "POST", "/v1/events", Some(event)).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(receipt["matchedWorkflows"], json!([]));
}

#[tokio::test]
async fn test_readiness_reflects_event_hub() {
    let (engine, router) = app();

    let (status, body) = send(&router, "GET", "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("degraded"));

    engine.event_hub.start();
    let (_, body) = send(&router, "GET", "/ready", None).await;
    assert_eq!(body["status"], json!("healthy"));
}
