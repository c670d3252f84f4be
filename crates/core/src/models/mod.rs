//! Shared domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Category assigned when a record arrives without one.
pub const DEFAULT_CATEGORY: &str = "보드게임";

/// Rental state of a single physical item.
///
/// The server speaks Korean status labels on the wire; the enum keeps the
/// transition logic free of label comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameStatus {
    Available,
    Dibs,
    Rented,
    Lost,
}

impl GameStatus {
    /// Presentation/wire label for this status.
    pub fn label(self) -> &'static str {
        match self {
            GameStatus::Available => "대여가능",
            GameStatus::Dibs => "찜",
            GameStatus::Rented => "대여중",
            GameStatus::Lost => "분실",
        }
    }

    /// Parse a wire label. Unknown labels fall back to `Available`,
    /// matching how the original client treated unrecognised statuses.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "찜" => GameStatus::Dibs,
            "대여중" => GameStatus::Rented,
            "분실" => GameStatus::Lost,
            _ => GameStatus::Available,
        }
    }

    /// Ordering key surfacing active holds and rentals above idle stock.
    pub fn sort_priority(self) -> u8 {
        match self {
            GameStatus::Dibs => 1,
            GameStatus::Rented => 2,
            GameStatus::Lost => 3,
            GameStatus::Available => 4,
        }
    }
}

impl Default for GameStatus {
    fn default() -> Self {
        GameStatus::Available
    }
}

impl From<String> for GameStatus {
    fn from(value: String) -> Self {
        GameStatus::from_label(&value)
    }
}

impl From<GameStatus> for String {
    fn from(value: GameStatus) -> Self {
        value.label().to_string()
    }
}

/// One rentable item in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique identifier, immutable after creation.
    pub id: i64,
    /// Display name. Required, non-empty.
    pub name: String,
    /// Open string category; empty means [`DEFAULT_CATEGORY`].
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub status: GameStatus,
    /// Person currently holding or renting the item. Present only for
    /// `Dibs`/`Rented`; the server may send an empty string for "none".
    #[serde(default)]
    pub renter: Option<String>,
    /// `#`-delimited tag string used by the tag search.
    #[serde(default)]
    pub tags: String,
    /// Difficulty score in `[0.0, 5.0]`. The server stores this as a
    /// string, a number or nothing at all.
    #[serde(default, deserialize_with = "de_difficulty")]
    pub difficulty: Option<f32>,
    /// Player count range in `min~max` form, e.g. `"2~4인"`.
    #[serde(default)]
    pub players: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub bgg_id: String,
    #[serde(default)]
    pub location: String,
}

impl GameRecord {
    /// Effective category, substituting the default when unset.
    pub fn category(&self) -> &str {
        if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }

    /// Renter name, treating an empty or blank string as absent. The
    /// stored string is returned as-is; cascade matching deliberately
    /// performs no case or whitespace normalization.
    pub fn renter(&self) -> Option<&str> {
        self.renter
            .as_deref()
            .filter(|name| !name.trim().is_empty())
    }

    /// Parsed player count range, `None` when missing or malformed.
    pub fn player_range(&self) -> Option<PlayerRange> {
        self.players.as_deref().and_then(PlayerRange::parse)
    }
}

/// Inclusive player count range parsed from the `players` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerRange {
    pub min: u32,
    pub max: u32,
}

impl PlayerRange {
    /// Parse strings such as `"2~4인"`, `"4인"` or `"2~4"`. A single
    /// number means min == max. Returns `None` for anything malformed.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let mut parts = trimmed.splitn(2, '~');
        let min = leading_number(parts.next()?)?;
        let max = match parts.next() {
            Some(part) => leading_number(part)?,
            None => min,
        };
        if min > max {
            return None;
        }
        Some(Self { min, max })
    }

    /// Whether a table of `count` players fits this range.
    pub fn fits(&self, count: u32) -> bool {
        self.min <= count && count <= self.max
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Stable in-place sort by status priority; ties keep server order.
pub fn sort_by_priority(games: &mut [GameRecord]) {
    games.sort_by_key(|game| game.status.sort_priority());
}

/// Kind of a status-affecting action recorded in the rental log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    #[serde(rename = "RENT")]
    Rent,
    #[serde(rename = "RETURN")]
    Return,
    #[serde(other)]
    Other,
}

/// Append-only log entry for one game, read-only from the client side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalLogEntry {
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    #[serde(default)]
    pub value: String,
}

/// Homepage recommendation button; independent of rental logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub label: String,
    pub value: String,
    pub color: String,
}

/// Registered member; `student_id` is the effective login key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
}

fn de_difficulty<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(num)) => num.as_f64().map(|v| v as f32),
        Some(Value::String(text)) => text.trim().parse::<f32>().ok(),
        Some(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: GameStatus) -> GameRecord {
        GameRecord {
            id: 1,
            name: "스플렌더".to_string(),
            category: String::new(),
            status,
            renter: None,
            tags: String::new(),
            difficulty: None,
            players: None,
            genre: String::new(),
            image: String::new(),
            bgg_id: String::new(),
            location: String::new(),
        }
    }

    #[test]
    fn status_labels_round_trip() {
        for status in [
            GameStatus::Available,
            GameStatus::Dibs,
            GameStatus::Rented,
            GameStatus::Lost,
        ] {
            assert_eq!(GameStatus::from_label(status.label()), status);
        }
    }

    #[test]
    fn unknown_label_falls_back_to_available() {
        assert_eq!(GameStatus::from_label("수리중"), GameStatus::Available);
        assert_eq!(GameStatus::from_label(""), GameStatus::Available);
    }

    #[test]
    fn status_serializes_as_wire_label() {
        let json = serde_json::to_string(&GameStatus::Dibs).unwrap();
        assert_eq!(json, "\"찜\"");
        let parsed: GameStatus = serde_json::from_str("\"대여중\"").unwrap();
        assert_eq!(parsed, GameStatus::Rented);
    }

    #[test]
    fn priority_sort_is_stable() {
        let mut games = vec![
            GameRecord { id: 1, ..record(GameStatus::Available) },
            GameRecord { id: 2, ..record(GameStatus::Rented) },
            GameRecord { id: 3, ..record(GameStatus::Dibs) },
            GameRecord { id: 4, ..record(GameStatus::Rented) },
            GameRecord { id: 5, ..record(GameStatus::Lost) },
        ];
        sort_by_priority(&mut games);
        let order: Vec<i64> = games.iter().map(|game| game.id).collect();
        assert_eq!(order, vec![3, 2, 4, 5, 1]);
        let priorities: Vec<u8> = games
            .iter()
            .map(|game| game.status.sort_priority())
            .collect();
        assert!(priorities.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn player_range_parsing() {
        assert_eq!(
            PlayerRange::parse("2~4인"),
            Some(PlayerRange { min: 2, max: 4 })
        );
        assert_eq!(
            PlayerRange::parse("4인"),
            Some(PlayerRange { min: 4, max: 4 })
        );
        assert_eq!(
            PlayerRange::parse(" 3 ~ 6 "),
            Some(PlayerRange { min: 3, max: 6 })
        );
        assert_eq!(PlayerRange::parse(""), None);
        assert_eq!(PlayerRange::parse("많이"), None);
        assert_eq!(PlayerRange::parse("5~2인"), None);
    }

    #[test]
    fn difficulty_accepts_strings_and_numbers() {
        let json = r#"{"id":1,"name":"A","difficulty":"3.2"}"#;
        let game: GameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(game.difficulty, Some(3.2));

        let json = r#"{"id":1,"name":"A","difficulty":1.5}"#;
        let game: GameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(game.difficulty, Some(1.5));

        let json = r#"{"id":1,"name":"A","difficulty":""}"#;
        let game: GameRecord = serde_json::from_str(json).unwrap();
        assert_eq!(game.difficulty, None);
    }

    #[test]
    fn blank_renter_reads_as_absent() {
        let mut game = record(GameStatus::Rented);
        game.renter = Some("  ".to_string());
        assert_eq!(game.renter(), None);
        game.renter = Some("김보드".to_string());
        assert_eq!(game.renter(), Some("김보드"));
    }
}
