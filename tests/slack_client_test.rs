use httpmock::prelude::*;
use reqwest::Url;
use serde_json::json;

use slack_bulk_maintainer::model::{ProfileField, ProfileFields};
use slack_bulk_maintainer::slack::{ProfileSetParam, SlackApi, SlackApiError, SlackClient};

fn client_for(server: &MockServer) -> SlackClient {
    let base = Url::parse(&server.url("/api/")).unwrap();
    SlackClient::with_base_url("xoxp-test".into(), base).unwrap()
}

#[tokio::test]
async fn profile_set_posts_json_with_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/users.profile.set")
                .header("authorization", "Bearer xoxp-test")
                .json_body(json!({ "user": "USERID2", "profile": { "status_emoji": ":sleepy:" } }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "ok": true, "profile": { "status_emoji": ":sleepy:" } }));
        })
        .await;

    let client = client_for(&server);
    let mut profile = ProfileFields::new();
    profile.insert(ProfileField::StatusEmoji, ":sleepy:");
    let response = client
        .users_profile_set(&ProfileSetParam {
            user: "USERID2".into(),
            profile,
        })
        .await
        .unwrap();

    assert!(response.ok);
    assert_eq!(response.rest["profile"]["status_emoji"], ":sleepy:");
    mock.assert_async().await;
}

#[tokio::test]
async fn ok_false_becomes_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/auth.test");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "ok": false, "error": "invalid_auth" }));
        })
        .await;

    let err = client_for(&server).auth_test().await.unwrap_err();
    match err.downcast_ref::<SlackApiError>() {
        Some(SlackApiError::Api { method, error }) => {
            assert_eq!(method, "auth.test");
            assert_eq!(error, "invalid_auth");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_is_reported_without_retry() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/users.list");
            then.status(429).header("Retry-After", "30");
        })
        .await;

    let err = client_for(&server).users_list(None).await.unwrap_err();
    match err.downcast_ref::<SlackApiError>() {
        Some(SlackApiError::RateLimited { retry_after, .. }) => {
            assert_eq!(*retry_after, Some(30));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn users_list_sends_cursor_and_parses_members() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/users.list")
                .query_param("limit", "200")
                .query_param("cursor", "next-page");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "ok": true,
                    "members": [{
                        "id": "USERID2",
                        "name": "jiro",
                        "profile": { "email": "jiro@example.com" }
                    }],
                    "response_metadata": { "next_cursor": "" }
                }));
        })
        .await;

    let page = client_for(&server)
        .users_list(Some("next-page"))
        .await
        .unwrap();

    assert_eq!(page.members.len(), 1);
    assert_eq!(page.members[0].profile.email.as_deref(), Some("jiro@example.com"));
    assert_eq!(page.next_cursor(), None);
    mock.assert_async().await;
}
