//! HTTP client for the rental backend.
//!
//! Every operation is a single request/response round trip; responses
//! arrive in a `{ status, data, message }` envelope and anything but
//! `"success"` is surfaced as a persistence (or auth) failure without
//! touching local state.

use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::RentalError;
use crate::models::{ConfigItem, GameRecord, GameStatus, RentalLogEntry, UserRecord};
use crate::rental::{CatalogStore, GameEdit};

/// Candidate record from the external product lookup, used to prefill
/// a new game form. Opaque to the rental logic.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductHit {
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "productId", default)]
    pub product_id: String,
}

/// Fields for a brand-new record created from the add-game flow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewGame {
    pub name: String,
    pub category: String,
    pub players: String,
    pub tags: String,
    pub image: String,
    #[serde(rename = "bggId")]
    pub bgg_id: String,
    #[serde(rename = "naverId")]
    pub product_id: String,
}

/// Login or signup result from the identity collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default)]
    pub user: Option<UserRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, RentalError> {
        if self.status == "success" {
            self.data
                .ok_or_else(|| RentalError::persistence("server returned no payload"))
        } else {
            Err(RentalError::persistence(
                self.message.unwrap_or_else(|| "server error".to_string()),
            ))
        }
    }

    fn into_ack(self) -> Result<(), RentalError> {
        if self.status == "success" {
            Ok(())
        } else {
            Err(RentalError::persistence(
                self.message.unwrap_or_else(|| "server error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountPayload {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    items: Vec<ProductHit>,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    game_id: i64,
    status: &'a str,
    renter: Option<&'a str>,
}

#[derive(Serialize)]
struct RenterBody<'a> {
    renter: &'a str,
}

/// Client for the persistence collaborator.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, RentalError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| RentalError::persistence(format!("http client init: {err}")))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, RentalError> {
        debug!(path, "GET");
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .map_err(|err| RentalError::persistence(err.to_string()))?;
        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|err| RentalError::persistence(format!("invalid response: {err}")))?;
        envelope.into_data()
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, RentalError> {
        debug!(path, "POST");
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|err| RentalError::persistence(err.to_string()))?;
        response
            .json()
            .await
            .map_err(|err| RentalError::persistence(format!("invalid response: {err}")))
    }

    /// Rental history for one game, newest first.
    pub async fn fetch_game_logs(&self, id: i64) -> Result<Vec<RentalLogEntry>, RentalError> {
        self.get_json(&format!("games/{id}/logs")).await
    }

    pub async fn fetch_config(&self) -> Result<Vec<ConfigItem>, RentalError> {
        self.get_json("config").await
    }

    pub async fn save_config(&self, items: &[ConfigItem]) -> Result<(), RentalError> {
        self.post_json::<_, serde_json::Value>("config", &items)
            .await?
            .into_ack()
    }

    /// Check the admin password; wrong passwords are an auth failure.
    pub async fn verify_admin_password(&self, candidate: &str) -> Result<(), RentalError> {
        #[derive(Serialize)]
        struct Body<'a> {
            password: &'a str,
        }
        let envelope: Envelope<serde_json::Value> = self
            .post_json("admin/verify", &Body { password: candidate })
            .await?;
        envelope
            .into_ack()
            .map_err(|_| RentalError::auth("암호가 틀렸습니다."))
    }

    pub async fn signup_user(&self, user: &UserRecord) -> Result<AuthResponse, RentalError> {
        let envelope: Envelope<AuthResponse> = self.post_json("users/signup", user).await?;
        envelope.into_data().map_err(auth_kind)
    }

    pub async fn login_user(
        &self,
        student_id: &str,
        password: &str,
    ) -> Result<AuthResponse, RentalError> {
        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(rename = "studentId")]
            student_id: &'a str,
            password: &'a str,
        }
        let envelope: Envelope<AuthResponse> = self
            .post_json("users/login", &Body { student_id, password })
            .await?;
        envelope.into_data().map_err(auth_kind)
    }

    /// Opaque external catalog lookup for prefilling new records.
    pub async fn search_products(&self, keyword: &str) -> Result<Vec<ProductHit>, RentalError> {
        let payload: SearchPayload = self
            .get_json(&format!("search?query={}", urlencode(keyword)))
            .await?;
        Ok(payload
            .items
            .into_iter()
            .map(|mut hit| {
                hit.title = strip_html_tags(&hit.title);
                hit
            })
            .collect())
    }

    pub async fn add_game(&self, game: &NewGame) -> Result<(), RentalError> {
        if game.name.trim().is_empty() {
            return Err(RentalError::validation("이름은 필수입니다."));
        }
        self.post_json::<_, serde_json::Value>("games/add", game)
            .await?
            .into_ack()
    }
}

impl CatalogStore for ApiClient {
    async fn fetch_games(&self) -> Result<Vec<GameRecord>, RentalError> {
        self.get_json("games").await
    }

    async fn update_game_status(
        &self,
        id: i64,
        status: GameStatus,
        renter: Option<&str>,
    ) -> Result<(), RentalError> {
        let body = StatusBody {
            game_id: id,
            status: status.label(),
            renter,
        };
        self.post_json::<_, serde_json::Value>("games/update", &body)
            .await?
            .into_ack()
    }

    async fn edit_game(&self, id: i64, fields: &GameEdit) -> Result<(), RentalError> {
        #[derive(Serialize)]
        struct Body<'a> {
            game_id: i64,
            #[serde(flatten)]
            fields: &'a GameEdit,
        }
        self.post_json::<_, serde_json::Value>("games/edit", &Body { game_id: id, fields })
            .await?
            .into_ack()
    }

    async fn delete_game(&self, id: i64) -> Result<(), RentalError> {
        #[derive(Serialize)]
        struct Body {
            game_id: i64,
        }
        self.post_json::<_, serde_json::Value>("games/delete", &Body { game_id: id })
            .await?
            .into_ack()
    }

    async fn return_all_by_renter(&self, renter: &str) -> Result<usize, RentalError> {
        let envelope: Envelope<CountPayload> = self
            .post_json("rentals/return-all", &RenterBody { renter })
            .await?;
        Ok(envelope.into_data()?.count)
    }

    async fn approve_all_dibs_by_renter(&self, renter: &str) -> Result<usize, RentalError> {
        let envelope: Envelope<CountPayload> = self
            .post_json("rentals/approve-all", &RenterBody { renter })
            .await?;
        Ok(envelope.into_data()?.count)
    }
}

fn auth_kind(err: RentalError) -> RentalError {
    match err {
        RentalError::Persistence(message) => RentalError::Auth(message),
        other => other,
    }
}

/// Product titles arrive with markup like `<b>스플렌더</b>`.
fn strip_html_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn urlencode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_from_titles() {
        assert_eq!(strip_html_tags("<b>스플렌더</b> 보드게임"), "스플렌더 보드게임");
        assert_eq!(strip_html_tags("no markup"), "no markup");
    }

    #[test]
    fn urlencode_keeps_unreserved_bytes() {
        assert_eq!(urlencode("abc-123"), "abc-123");
        assert_eq!(urlencode("스"), "%EC%8A%A4");
        assert_eq!(urlencode("a b"), "a%20b");
    }

    #[test]
    fn envelope_success_yields_data() {
        let raw = r#"{"status":"success","data":{"count":3}}"#;
        let envelope: Envelope<CountPayload> = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.into_data().unwrap().count, 3);
    }

    #[test]
    fn envelope_error_carries_the_message() {
        let raw = r#"{"status":"error","message":"동시 수정 충돌"}"#;
        let envelope: Envelope<CountPayload> = serde_json::from_str(raw).unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(matches!(err, RentalError::Persistence(message) if message == "동시 수정 충돌"));
    }

    #[test]
    fn game_list_payload_parses_wire_labels() {
        let raw = r##"{
            "status": "success",
            "data": [
                {"id": 1, "name": "스플렌더", "status": "찜", "renter": "김보드",
                 "tags": "#전략", "difficulty": "2.5", "players": "2~4인"},
                {"id": 2, "name": "아줄", "status": "대여가능"}
            ]
        }"##;
        let envelope: Envelope<Vec<GameRecord>> = serde_json::from_str(raw).unwrap();
        let games = envelope.into_data().unwrap();
        assert_eq!(games[0].status, GameStatus::Dibs);
        assert_eq!(games[0].difficulty, Some(2.5));
        assert_eq!(games[1].status, GameStatus::Available);
        assert_eq!(games[1].renter(), None);
    }
}
