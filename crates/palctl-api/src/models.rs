// REST API request and response types
//
// Field sets vary between game builds, so every response field is
// `#[serde(default)]` and unknown keys land in `extra`.

use serde::{Deserialize, Serialize};

// ── Responses ────────────────────────────────────────────────────────

/// `GET /v1/api/info`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "servername")]
    pub server_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "worldguid")]
    pub world_guid: String,
    /// Catch-all for fields added by newer game builds.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One entry of `GET /v1/api/players`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Player {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "accountName")]
    pub account_name: String,
    #[serde(default, rename = "playerId", alias = "playeruid")]
    pub player_id: String,
    #[serde(default, rename = "userId", alias = "steamid")]
    pub user_id: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub ping: Option<f64>,
    #[serde(default)]
    pub location_x: Option<f64>,
    #[serde(default)]
    pub location_y: Option<f64>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub building_count: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Player {
    /// Identifier accepted by the kick/ban/teleport endpoints.
    ///
    /// Prefers the platform user id, falling back to the in-game player id
    /// for builds that only report the latter.
    pub fn uid(&self) -> &str {
        if self.user_id.is_empty() {
            &self.player_id
        } else {
            &self.user_id
        }
    }

    /// `(x, y)` world location when the server reports it.
    pub fn location(&self) -> Option<(f64, f64)> {
        self.location_x.zip(self.location_y)
    }
}

/// The player list comes back bare or wrapped, depending on build.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PlayersEnvelope {
    Bare(Vec<Player>),
    Players { players: Vec<Player> },
    Data { data: Vec<Player> },
}

impl PlayersEnvelope {
    pub(crate) fn into_players(self) -> Vec<Player> {
        match self {
            Self::Bare(players) | Self::Players { players } | Self::Data { data: players } => {
                players
            }
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────

/// Body for kick / ban / unban.
#[derive(Debug, Serialize)]
pub(crate) struct PlayerAction<'a> {
    #[serde(rename = "playeruid")]
    pub uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Announce<'a> {
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Shutdown<'a> {
    pub waittime: u32,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct Teleport<'a> {
    #[serde(rename = "playeruid")]
    pub uid: &'a str,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn player_uid_falls_back_to_player_id() {
        let p: Player = serde_json::from_value(json!({
            "name": "Zoe",
            "playerId": "0A1B2C3D"
        }))
        .unwrap();
        assert_eq!(p.uid(), "0A1B2C3D");
        assert_eq!(p.location(), None);
    }

    #[test]
    fn players_envelope_accepts_wrapped_and_bare() {
        let wrapped: PlayersEnvelope =
            serde_json::from_value(json!({ "players": [{ "name": "a" }] })).unwrap();
        assert_eq!(wrapped.into_players().len(), 1);

        let data: PlayersEnvelope =
            serde_json::from_value(json!({ "data": [{ "name": "a" }, { "name": "b" }] }))
                .unwrap();
        assert_eq!(data.into_players().len(), 2);

        let bare: PlayersEnvelope = serde_json::from_value(json!([])).unwrap();
        assert!(bare.into_players().is_empty());
    }

    #[test]
    fn kick_body_omits_missing_message() {
        let body = serde_json::to_value(PlayerAction {
            uid: "steam_1",
            message: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "playeruid": "steam_1" }));
    }
}
