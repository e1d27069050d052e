use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, TimeZone, Utc};
use reqwest::Url;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use notification_cell::{CalendarEvent, CalendarProvider, Delivery, NotificationError, OutlookCalendarClient};
use shared_database::SupabaseClient;
use shared_utils::test_utils::TestConfig;

fn client_for(server: &MockServer) -> OutlookCalendarClient {
    let config = TestConfig::with_mock_server(&server.uri()).to_app_config_with_providers();
    let supabase = Arc::new(SupabaseClient::new(&config));
    OutlookCalendarClient::new(&config, supabase)
}

fn event() -> CalendarEvent {
    let start = Utc.with_ymd_and_hms(2030, 3, 4, 15, 0, 0).unwrap();
    CalendarEvent {
        subject: "Jane Patient – Eye exam".to_string(),
        start,
        end: start + Duration::minutes(30),
        body: Some("Added by: Front Desk".to_string()),
    }
}

async fn mount_stored_tokens(server: &MockServer, user_id: Uuid, tokens: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([tokens])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn authorize_url_carries_the_code_flow_parameters() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let url = Url::parse(&client.authorize_url("state-123").unwrap()).unwrap();
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

    assert!(url.path().ends_with("/oauth2/v2.0/authorize"));
    assert_eq!(params["client_id"], "ms-client-id");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], "http://localhost:3000/auth/microsoft/callback");
    assert_eq!(params["scope"], "Calendars.ReadWrite User.Read offline_access");
    assert_eq!(params["state"], "state-123");
    assert_eq!(params["response_mode"], "query");
}

#[tokio::test]
async fn code_exchange_requires_both_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("code=good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 1200
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("code=partial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "at-2" })))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let grant = client.exchange_code("good").await.unwrap();
    assert_eq!(grant.access_token, "at-1");
    assert_eq!(grant.refresh_token, "rt-1");
    assert!(grant.expires_at > Utc::now() + Duration::minutes(19));

    assert_matches!(
        client.exchange_code("partial").await,
        Err(NotificationError::MissingTokens)
    );
}

#[tokio::test]
async fn out_of_range_expiry_is_an_error_not_a_panic() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "at",
            "refresh_token": "rt",
            "expires_in": i64::MAX
        })))
        .mount(&server)
        .await;

    let result = client_for(&server).exchange_code("x").await;

    assert_matches!(result, Err(NotificationError::InvalidExpiry(i64::MAX)));
}

#[tokio::test]
async fn refresh_with_out_of_range_expiry_skips_the_event() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_stored_tokens(
        &server,
        user_id,
        json!({
            "microsoft_access_token": "stale-token",
            "microsoft_refresh_token": "rt",
            "microsoft_token_expires_at": Utc::now() - Duration::minutes(1)
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-token",
            "expires_in": i64::MIN
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graph/v1.0/me/calendar/events"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let result = client_for(&server).create_event(user_id, &event()).await;

    assert_matches!(result, Err(NotificationError::InvalidExpiry(_)));
}

#[tokio::test]
async fn fresh_tokens_are_used_directly() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_stored_tokens(
        &server,
        user_id,
        json!({
            "microsoft_access_token": "fresh-token",
            "microsoft_refresh_token": "rt",
            "microsoft_token_expires_at": Utc::now() + Duration::hours(1)
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graph/v1.0/me/calendar/events"))
        .and(header("authorization", "Bearer fresh-token"))
        .and(body_partial_json(json!({
            "subject": "Jane Patient – Eye exam",
            "start": { "dateTime": "2030-03-04T15:00:00.000Z", "timeZone": "UTC" },
            "end": { "dateTime": "2030-03-04T15:30:00.000Z", "timeZone": "UTC" },
            "body": { "contentType": "text", "content": "Added by: Front Desk" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "evt-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let delivery = client_for(&server).create_event(user_id, &event()).await.unwrap();
    assert_eq!(delivery, Delivery::Sent);
}

#[tokio::test]
async fn tokens_near_expiry_are_refreshed_and_persisted() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_stored_tokens(
        &server,
        user_id,
        json!({
            "microsoft_access_token": "stale-token",
            "microsoft_refresh_token": "rt",
            "microsoft_token_expires_at": Utc::now() + Duration::minutes(2)
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "new-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user_id)))
        .and(body_partial_json(json!({ "microsoft_access_token": "new-token" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graph/v1.0/me/calendar/events"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "evt-2" })))
        .expect(1)
        .mount(&server)
        .await;

    let delivery = client_for(&server).create_event(user_id, &event()).await.unwrap();
    assert_eq!(delivery, Delivery::Sent);
}

#[tokio::test]
async fn users_without_a_refresh_token_are_not_connected() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_stored_tokens(
        &server,
        user_id,
        json!({
            "microsoft_access_token": null,
            "microsoft_refresh_token": null,
            "microsoft_token_expires_at": null
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graph/v1.0/me/calendar/events"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(client.create_event(user_id, &event()).await.unwrap(), Delivery::NotConnected);
    assert!(!client.is_connected(user_id).await.unwrap());
}

#[tokio::test]
async fn graph_errors_surface_to_the_caller() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    mount_stored_tokens(
        &server,
        user_id,
        json!({
            "microsoft_access_token": "fresh-token",
            "microsoft_refresh_token": "rt",
            "microsoft_token_expires_at": Utc::now() + Duration::hours(1)
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/graph/v1.0/me/calendar/events"))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&server)
        .await;

    let result = client_for(&server).create_event(user_id, &event()).await;
    assert_matches!(result, Err(NotificationError::Provider { status: 403, .. }));
}
