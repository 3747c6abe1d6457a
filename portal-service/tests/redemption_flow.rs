mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{empty_request, json_request, TestApp};

#[tokio::test]
async fn public_and_operator_intake_merge_into_one_record() {
    let app = TestApp::new();
    app.seed_user("logger@example.com", "eventLogger").await;
    let (logger_access, _) = app
        .sign_in("/api/authen/event-logger-signin", "logger@example.com")
        .await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/redeemed",
            None,
            json!({
                "tx_hash": "0xabc",
                "name": "Ada",
                "email": "ada@example.com",
                "company": "Engines Ltd",
                "amount": 999,
                "wallet_address": "0xspoofed"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["amount"], 0);
    assert_eq!(body["wallet_address"], "");
    assert_eq!(body["approved_status"], "requested");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/redeemed/redeem-event",
            Some(&logger_access),
            json!({
                "tx_hash": "0xabc",
                "name": "Mallory",
                "amount": 5,
                "price": "1500000000000000000",
                "redeem_id": 42,
                "redeem_date": 1_700_000_000,
                "wallet_address": "0xwallet"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["amount"], 5);
    assert_eq!(body["redeem_id"], 42);
    assert_eq!(body["wallet_address"], "0xwallet");

    let (status, body) = app
        .send(empty_request("GET", "/api/redeemed/0xabc", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company"], "Engines Ltd");
    assert_eq!(body["price"], "1500000000000000000");

    let (_, body) = app.send(empty_request("GET", "/metrics", None)).await;
    let text = body.as_str().expect("metrics text");
    assert!(text.contains(
        "portal_redemption_upserts_total{channel=\"public\",outcome=\"created\"} 1"
    ));
    assert!(text.contains(
        "portal_redemption_upserts_total{channel=\"operator\",outcome=\"merged\"} 1"
    ));
}

#[tokio::test]
async fn repeating_an_upsert_reports_not_modified() {
    let app = TestApp::new();
    let patch = json!({ "tx_hash": "0xdup", "name": "Same" });

    let (status, _) = app
        .send(json_request("POST", "/api/redeemed", None, patch.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(json_request("POST", "/api/redeemed", None, patch))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_MODIFIED");
}

#[tokio::test]
async fn operator_intake_requires_event_logger_role() {
    let app = TestApp::new();
    app.seed_user("admin@example.com", "admin").await;
    let (admin_access, _) = app.sign_in("/api/authen/signin", "admin@example.com").await;

    let (status, _) = app
        .send(json_request(
            "POST",
            "/api/redeemed/redeem-event",
            None,
            json!({ "tx_hash": "0x1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(json_request(
            "POST",
            "/api/redeemed/redeem-event",
            Some(&admin_access),
            json!({ "tx_hash": "0x1" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn admin_updates_status_by_redeem_id() {
    let app = TestApp::new();
    app.seed_user("admin@example.com", "admin").await;
    app.seed_user("logger@example.com", "eventLogger").await;
    let (admin_access, _) = app.sign_in("/api/authen/admin-signin", "admin@example.com").await;
    let (logger_access, _) = app
        .sign_in("/api/authen/event-logger-signin", "logger@example.com")
        .await;

    app.send(json_request(
        "POST",
        "/api/redeemed/redeem-event",
        Some(&logger_access),
        json!({ "tx_hash": "0xstatus", "redeem_id": 7 }),
    ))
    .await;

    let update = json!({ "redeemed_id": 7, "approve_status": "approved" });

    let (status, _) = app
        .send(json_request(
            "PATCH",
            "/api/redeemed/update-status",
            Some(&logger_access),
            update.clone(),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/redeemed/update-status",
            Some(&admin_access),
            update.clone(),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["approved_status"], "approved");
    assert_eq!(body["tx_hash"], "0xstatus");

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/redeemed/update-status",
            Some(&admin_access),
            update,
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NOT_MODIFIED");

    let (status, body) = app
        .send(json_request(
            "PATCH",
            "/api/redeemed/update-status",
            Some(&admin_access),
            json!({ "redeemed_id": 404, "approve_status": "approved" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn listing_applies_query_filters() {
    let app = TestApp::new();
    app.seed_user("logger@example.com", "eventLogger").await;
    let (logger_access, _) = app
        .sign_in("/api/authen/event-logger-signin", "logger@example.com")
        .await;

    for (tx_hash, redeem_id, redeem_date, status) in [
        ("0x01", 1, 100, "requested"),
        ("0x02", 2, 150, "approved"),
        ("0x03", 3, 200, "approved"),
    ] {
        let (code, _) = app
            .send(json_request(
                "POST",
                "/api/redeemed/redeem-event",
                Some(&logger_access),
                json!({
                    "tx_hash": tx_hash,
                    "redeem_id": redeem_id,
                    "redeem_date": redeem_date,
                    "approved_status": status
                }),
            ))
            .await;
        assert_eq!(code, StatusCode::OK);
    }

    let (status, body) = app
        .send(empty_request(
            "GET",
            "/api/redeemed?approveStatus=approved&redeemStartDate=100&redeemEndDate=200",
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    let hashes: Vec<&str> = body
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|record| record["tx_hash"].as_str())
        .collect();
    assert_eq!(hashes, vec!["0x02"]);

    let (status, body) = app
        .send(empty_request("GET", "/api/redeemed?redeemIds=1,3", None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, body) = app
        .send(empty_request("GET", "/api/redeemed?redeemEndDate=soon", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn unknown_tx_hash_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .send(empty_request("GET", "/api/redeemed/0xmissing", None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}
