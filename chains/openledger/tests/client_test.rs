mod common;

use mockito::Matcher;
use openledger_bot::api::TierClaim;
use openledger_bot::{AuthError, BotError};
use serde_json::json;

#[tokio::test]
async fn test_401_renews_once_and_retries_call() {
    let mut server = mockito::Server::new_async().await;
    let stale = server
        .mock("GET", "/api/v1/reward")
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let fresh = server
        .mock("GET", "/api/v1/reward")
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_body(r#"{"data":{"totalPoint":"99.5"}}"#)
        .expect(1)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/api/v1/auth/generate_token")
        .match_body(Matcher::Json(json!({ "address": common::ACCOUNT })))
        .with_body(r#"{"data":{"token":"fresh"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "stale");
    let total = client.user_reward().await.expect("reward after renewal");

    assert_eq!(total, 99.5);
    assert_eq!(client.token_cell().get().await, "fresh");
    stale.assert_async().await;
    fresh.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_persistent_401_is_bounded() {
    let mut server = mockito::Server::new_async().await;
    let reward = server
        .mock("GET", "/api/v1/claim_details")
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let token = server
        .mock("POST", "/api/v1/auth/generate_token")
        .with_body(r#"{"data":{"token":"still-bad"}}"#)
        .expect(1)
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "stale");
    let err = client.checkin_details().await.expect_err("token never accepted");

    assert!(matches!(
        err,
        BotError::Auth(AuthError::TokenInvalid { .. })
    ));
    reward.assert_async().await;
    token.assert_async().await;
}

#[tokio::test]
async fn test_realtime_reward_tolerates_non_json() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/reward_realtime")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html>502 Bad Gateway</html>")
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "tok");
    assert_eq!(client.realtime_reward().await.expect("tolerated"), 0.0);
}

#[tokio::test]
async fn test_realtime_reward_missing_data_is_zero() {
    let shapes: [(usize, &str); 5] = [
        (200, r#"{"data":null}"#),
        (200, r#"{"message":"ok"}"#),
        (500, r#"{"error":"internal"}"#),
        (200, r#"{"data":[{"total_heartbeats":null}]}"#),
        (200, r#"{"data":[]}"#),
    ];

    for (status, body) in shapes {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/reward_realtime")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let client = common::client_for(&server.url(), "tok");
        let today = client
            .realtime_reward()
            .await
            .unwrap_or_else(|e| panic!("{} {} should read as zero: {}", status, body, e));
        assert_eq!(today, 0.0, "{} {}", status, body);
    }
}

#[tokio::test]
async fn test_realtime_reward_reads_first_entry() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/reward_realtime")
        .with_body(r#"{"data":[{"total_heartbeats":"7.5"}]}"#)
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "tok");
    assert_eq!(client.realtime_reward().await.expect("value"), 7.5);
}

#[tokio::test]
async fn test_worker_reward_empty_list_is_zero() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/worker_reward")
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "tok");
    assert_eq!(client.worker_reward().await.expect("value"), 0.0);
}

#[tokio::test]
async fn test_claim_tier_420_is_not_eligible() {
    let mut server = mockito::Server::new_async().await;
    let claim = server
        .mock("PUT", "/api/v1/claim_tier")
        .match_header("authorization", "Bearer tok")
        .match_body(Matcher::Json(json!({ "tierId": 3 })))
        .with_status(420)
        .expect(1)
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "tok");
    assert_eq!(
        client.claim_tier(3).await.expect("420 is not an error"),
        TierClaim::NotEligible
    );
    claim.assert_async().await;
}

#[tokio::test]
async fn test_server_error_is_transport_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/v1/tier_details")
        .with_status(503)
        .with_body("busy")
        .create_async()
        .await;

    let client = common::client_for(&server.url(), "tok");
    let err = client.tier_details().await.expect_err("503");
    assert!(matches!(err, BotError::Transport(_)));
}
