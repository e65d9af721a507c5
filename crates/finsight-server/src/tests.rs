//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_test_app() -> Router {
    create_router(ServerConfig::default())
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(app: Router, uri: &str, body: Value) -> axum::response::Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Ten ordinary dinners, one expensive one, and monthly rent (signed as spending)
fn sample_transactions() -> Value {
    let start = Utc::now() - Duration::days(60);
    let mut txs = Vec::new();
    for i in 0..10 {
        txs.push(json!({
            "id": format!("dinner{}", i),
            "amount": -50.0,
            "category": "dining",
            "date": (start + Duration::days(i * 5)).to_rfc3339(),
        }));
    }
    txs.push(json!({
        "id": "splurge",
        "amount": -500.0,
        "category": "dining",
        "date": (start + Duration::days(55)).to_rfc3339(),
    }));
    for i in 0..2 {
        txs.push(json!({
            "id": format!("rent{}", i),
            "amount": -1200.0,
            "category": "rent",
            "date": (start + Duration::days(i * 30)).to_rfc3339(),
            "merchant": "Oak Street Apartments",
        }));
    }
    Value::Array(txs)
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

// ========== Insights ==========

#[tokio::test]
async fn test_insights() {
    let app = setup_test_app();
    let response = post_json(
        app,
        "/api/insights",
        json!({ "transactions": sample_transactions(), "monthly_income": 5000.0, "limit": 5 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let insights = json.as_array().unwrap();
    assert!(!insights.is_empty());
    assert!(insights.len() <= 5);
    for insight in insights {
        assert!(insight.get("insight_type").is_some());
        assert!(insight.get("severity").is_some());
        assert!(insight.get("confidence").is_some());
    }
}

#[tokio::test]
async fn test_insights_default_limit_comes_from_config() {
    let app = create_router(ServerConfig {
        max_insights: 1,
        ..ServerConfig::default()
    });
    let response = post_json(
        app,
        "/api/insights",
        json!({ "transactions": sample_transactions(), "monthly_income": 5000.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_insights_rejects_bad_input() {
    let response = post_json(
        setup_test_app(),
        "/api/insights",
        json!({ "transactions": [], "monthly_income": -10.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        setup_test_app(),
        "/api/insights",
        json!({ "transactions": [], "monthly_income": 5000.0, "limit": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("limit"));
}

// ========== Single engines ==========

#[tokio::test]
async fn test_patterns() {
    let response = post_json(
        setup_test_app(),
        "/api/patterns",
        json!({ "transactions": sample_transactions() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["categories"][0]["category"], "rent");
    assert!(json["temporal"]["monthly"]["buckets"].is_array());
}

#[tokio::test]
async fn test_anomalies_flags_expensive_dinner() {
    let response = post_json(
        setup_test_app(),
        "/api/anomalies",
        json!({ "transactions": sample_transactions() }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let amounts = json["amount_anomalies"].as_array().unwrap();
    assert_eq!(amounts.len(), 1);
    assert_eq!(amounts[0]["transaction_id"], "splurge");
    assert_eq!(amounts[0]["severity"], "medium");
}

#[tokio::test]
async fn test_forecast() {
    let response = post_json(
        setup_test_app(),
        "/api/forecast",
        json!({ "transactions": sample_transactions(), "days": 14 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let daily = json["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 14);
    for day in daily {
        let lower = day["lower_bound"].as_f64().unwrap();
        let expected = day["expected_amount"].as_f64().unwrap();
        let upper = day["upper_bound"].as_f64().unwrap();
        assert!(lower <= expected && expected <= upper);
    }
}

#[tokio::test]
async fn test_forecast_without_history_is_unprocessable() {
    let response = post_json(
        setup_test_app(),
        "/api/forecast",
        json!({ "transactions": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = post_json(
        setup_test_app(),
        "/api/forecast",
        json!({ "transactions": [], "days": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_budget_without_transactions() {
    let response = post_json(
        setup_test_app(),
        "/api/budget",
        json!({ "transactions": [], "monthly_income": 5000.0 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["savings"]["current"], 0.0);
    assert_eq!(json["savings"]["potential"], 1500.0);

    let total: f64 = json["allocations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["amount"].as_f64().unwrap())
        .sum();
    assert!((total - 5000.0).abs() < 1e-6);
}

// ========== Limits and errors ==========

#[tokio::test]
async fn test_malformed_body_rejected() {
    let response = setup_test_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patterns")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_body_limit() {
    let app = create_router(ServerConfig {
        max_body_bytes: 64,
        ..Default::default()
    });
    let body = json!({ "transactions": sample_transactions() }).to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/patterns")
                .header("content-type", "application/json")
                .header("content-length", body.len())
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn test_core_error_mapping() {
    let err = AppError::from_core(finsight_core::Error::NotEnoughData("empty".into()));
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let err = AppError::from_core(finsight_core::Error::InvalidData("bad".into()));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = AppError::from_core(finsight_core::Error::Task("panicked".into()));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
