// REST API HTTP client
//
// Wraps `reqwest::Client` with Palworld-specific URL construction, basic
// auth, and status/payload classification. Every endpoint is a single
// request: no pagination, no retry, no caching.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{
    Announce, Player, PlayerAction, PlayersEnvelope, ServerInfo, Shutdown, Teleport,
};
use crate::transport::TransportConfig;

const API_PREFIX: &str = "v1/api";

/// Outcome of an unauthenticated reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// Server answered 401: the API is up and enforcing credentials.
    AuthRequired,
    /// Server answered 2xx without credentials.
    Open,
    /// Server answered with some other status.
    Unexpected(u16),
}

/// HTTP client for the game server's REST management API.
///
/// All requests go to `{base_url}/v1/api/{endpoint}` with HTTP basic auth.
pub struct PalworldClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    timeout_secs: u64,
}

impl PalworldClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, e.g. `http://203.0.113.7:8212`.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            username,
            password,
            timeout_secs: transport.timeout.as_secs(),
        })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
            timeout_secs: 0,
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The basic-auth username.
    pub fn username(&self) -> &str {
        &self.username
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /v1/api/info`
    pub async fn info(&self) -> Result<ServerInfo, Error> {
        self.get("info").await
    }

    /// `GET /v1/api/players`
    pub async fn players(&self) -> Result<Vec<Player>, Error> {
        let envelope: PlayersEnvelope = self.get("players").await?;
        Ok(envelope.into_players())
    }

    /// `POST /v1/api/kick`
    pub async fn kick(&self, uid: &str, message: Option<&str>) -> Result<(), Error> {
        self.post("kick", &PlayerAction { uid, message }).await
    }

    /// `POST /v1/api/ban`
    pub async fn ban(&self, uid: &str, message: Option<&str>) -> Result<(), Error> {
        self.post("ban", &PlayerAction { uid, message }).await
    }

    /// `POST /v1/api/unban`
    pub async fn unban(&self, uid: &str) -> Result<(), Error> {
        self.post("unban", &PlayerAction { uid, message: None }).await
    }

    /// `POST /v1/api/announce`
    pub async fn announce(&self, message: &str) -> Result<(), Error> {
        self.post("announce", &Announce { message }).await
    }

    /// `POST /v1/api/save`
    pub async fn save(&self) -> Result<(), Error> {
        self.post_empty("save").await
    }

    /// `POST /v1/api/shutdown`
    ///
    /// The server broadcasts `message` and exits after `wait_secs`.
    pub async fn shutdown(&self, wait_secs: u32, message: &str) -> Result<(), Error> {
        self.post(
            "shutdown",
            &Shutdown {
                waittime: wait_secs,
                message,
            },
        )
        .await
    }

    /// `POST /v1/api/teleport`
    pub async fn teleport(&self, uid: &str, x: f64, y: f64, z: f64) -> Result<(), Error> {
        self.post("teleport", &Teleport { uid, x, y, z }).await
    }

    /// Unauthenticated `GET /v1/api/info` to check the API is listening.
    pub async fn probe(&self) -> Result<Reachability, Error> {
        let url = self.endpoint_url("info")?;
        debug!("PROBE {}", url);

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        Ok(if status == reqwest::StatusCode::UNAUTHORIZED {
            Reachability::AuthRequired
        } else if status.is_success() {
            Reachability::Open
        } else {
            Reachability::Unexpected(status.as_u16())
        })
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/v1/api/{endpoint}`, tolerating a trailing slash on the base.
    pub(crate) fn endpoint_url(&self, endpoint: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/{API_PREFIX}/{endpoint}",
            self.base_url.as_str().trim_end_matches('/')
        );
        Ok(Url::parse(&full)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!("GET {}", url);

        let req = self.authorized(self.http.get(url));
        let body = self.send(req, endpoint).await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn post(&self, endpoint: &str, body: &impl Serialize) -> Result<(), Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!("POST {}", url);

        let req = self.authorized(self.http.post(url)).json(body);
        self.send(req, endpoint).await?;
        Ok(())
    }

    async fn post_empty(&self, endpoint: &str) -> Result<(), Error> {
        let url = self.endpoint_url(endpoint)?;
        debug!("POST {}", url);

        let req = self.authorized(self.http.post(url));
        self.send(req, endpoint).await?;
        Ok(())
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send a request and return the body text of a 2xx response.
    async fn send(&self, req: reqwest::RequestBuilder, endpoint: &str) -> Result<String, Error> {
        let resp = req.send().await.map_err(|e| self.transport_error(e))?;
        let status = resp.status();
        debug!(endpoint, status = status.as_u16(), "response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: format!("server rejected credentials for user '{}'", self.username),
            });
        }

        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(Error::Status {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() && self.timeout_secs > 0 {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }
}
