#![allow(clippy::unwrap_used)]
// Integration tests for `PalworldClient` using wiremock.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use palctl_api::{Error, PalworldClient, Reachability, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

// base64("admin:s3cret")
const AUTH_HEADER: &str = "Basic YWRtaW46czNjcmV0";

async fn setup() -> (MockServer, PalworldClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PalworldClient::with_client(
        reqwest::Client::new(),
        base_url,
        "admin".into(),
        SecretString::from("s3cret".to_string()),
    );
    (server, client)
}

// ── Reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_info_sends_basic_auth() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/info"))
        .and(header("authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "v0.3.11.0",
            "servername": "Pal Island",
            "description": "friends only",
            "worldguid": "B7C1E4A90F"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let info = client.info().await.unwrap();

    assert_eq!(info.version, "v0.3.11.0");
    assert_eq!(info.server_name, "Pal Island");
    assert_eq!(info.world_guid, "B7C1E4A90F");
}

#[tokio::test]
async fn test_players_wrapped_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/players"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "players": [
                {
                    "name": "Zoe",
                    "accountName": "zoe_acc",
                    "playerId": "7A3B09CD",
                    "userId": "steam_76561198000000001",
                    "ip": "198.51.100.20",
                    "ping": 42.5,
                    "location_x": -1200.5,
                    "location_y": 3300.0,
                    "level": 31
                },
                {
                    "name": "Kai",
                    "playerId": "11112222"
                }
            ]
        })))
        .mount(&server)
        .await;

    let players = client.players().await.unwrap();

    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "Zoe");
    assert_eq!(players[0].uid(), "steam_76561198000000001");
    assert_eq!(players[0].level, Some(31));
    assert_eq!(players[0].location(), Some((-1200.5, 3300.0)));
    assert_eq!(players[1].uid(), "11112222");
}

#[tokio::test]
async fn test_players_bare_list() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/players"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Solo", "userId": "steam_1" }
        ])))
        .mount(&server)
        .await;

    let players = client.players().await.unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].name, "Solo");
}

// ── Writes ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_kick_posts_player_uid() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/kick"))
        .and(header("authorization", AUTH_HEADER))
        .and(body_json(json!({ "playeruid": "steam_42", "message": "afk" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.kick("steam_42", Some("afk")).await.unwrap();
}

#[tokio::test]
async fn test_announce_and_shutdown_bodies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/announce"))
        .and(body_json(json!({ "message": "restart in 5" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/api/shutdown"))
        .and(body_json(json!({ "waittime": 30, "message": "bye" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client.announce("restart in 5").await.unwrap();
    client.shutdown(30, "bye").await.unwrap();
}

#[tokio::test]
async fn test_save_has_no_body_requirements() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/save"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(1)
        .mount(&server)
        .await;

    client.save().await.unwrap();
}

// ── Error classification ────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/info"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = client.info().await.unwrap_err();

    assert!(
        matches!(err, Error::Authentication { .. }),
        "expected Authentication error, got: {err:?}"
    );
    assert!(err.is_auth_failure());
    assert!(!err.is_network_failure());
}

#[tokio::test]
async fn test_server_error_carries_status() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/v1/api/ban"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid uid"))
        .mount(&server)
        .await;

    let err = client.ban("nobody", None).await.unwrap_err();

    match err {
        Error::Status {
            endpoint,
            status,
            body,
        } => {
            assert_eq!(endpoint, "ban");
            assert_eq!(status, 400);
            assert_eq!(body, "invalid uid");
        }
        other => panic!("expected Status error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_parse_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"version\": "))
        .mount(&server)
        .await;

    let err = client.info().await.unwrap_err();

    assert!(err.is_parse_failure(), "expected parse failure, got: {err:?}");
    assert!(!err.is_network_failure());
    if let Error::Deserialization { body, .. } = err {
        assert_eq!(body, "{\"version\": ");
    }
}

#[tokio::test]
async fn test_unreachable_is_network_failure() {
    // Bind then drop a server so the port is known to be closed.
    let uri = {
        let server = MockServer::start().await;
        server.uri()
    };
    let client = PalworldClient::new(
        Url::parse(&uri).unwrap(),
        "admin".into(),
        SecretString::from("x".to_string()),
        &TransportConfig::with_timeout(Duration::from_secs(2)),
    )
    .unwrap();

    let err = client.players().await.unwrap_err();

    assert!(err.is_network_failure(), "expected network failure, got: {err:?}");
    assert!(!err.is_parse_failure());
    assert!(!err.is_auth_failure());
}

// ── Probe ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_reports_auth_required() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/info"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert_eq!(client.probe().await.unwrap(), Reachability::AuthRequired);
}

#[tokio::test]
async fn test_probe_reports_unexpected_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/v1/api/info"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    assert_eq!(client.probe().await.unwrap(), Reachability::Unexpected(503));
}
