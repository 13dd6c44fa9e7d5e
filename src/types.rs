use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// Board-layout field of a FEN (piece placement only).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(String);

impl Position {
    pub fn new(board: impl Into<String>) -> Self {
        Self(board.into())
    }

    /// Keeps only the first whitespace-delimited token, so a full FEN is accepted too.
    pub fn from_fen_field(raw: &str) -> Option<Self> {
        raw.split_whitespace().next().map(|s| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Viewpoint {
    White,
    Black,
}

impl Viewpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    /// Legacy rule: a folder name containing "black" (any case) is a black game.
    pub fn from_folder_name(name: &str) -> Self {
        if name.to_lowercase().contains("black") {
            Self::Black
        } else {
            Self::White
        }
    }
}

impl fmt::Display for Viewpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Viewpoint {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim();
        if normalized.eq_ignore_ascii_case("white") {
            Ok(Self::White)
        } else if normalized.eq_ignore_ascii_case("black") {
            Ok(Self::Black)
        } else {
            Err(DatasetError::InvalidViewpoint(normalized.to_string()))
        }
    }
}

/// Number of camera angles kept per rendered position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ViewCount(u8);

impl ViewCount {
    pub const TWO: Self = Self(2);
    pub const THREE: Self = Self(3);

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for ViewCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 | 3 => Ok(Self(value)),
            other => Err(format!("views per position must be 2 or 3, got {other}")),
        }
    }
}

impl From<ViewCount> for u8 {
    fn from(value: ViewCount) -> Self {
        value.0
    }
}

/// One `game.csv` row. `from_frame` always equals `to_frame`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub from_frame: u32,
    pub to_frame: u32,
    pub fen: String,
}

impl FrameRecord {
    pub fn single(frame: u32, position: &Position) -> Self {
        Self {
            from_frame: frame,
            to_frame: frame,
            fen: position.as_str().to_string(),
        }
    }
}

/// One `gt.csv` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundTruthRow {
    pub image_name: String,
    pub fen: String,
    pub viewpoint: Viewpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Simulated,
    FenList,
    Pgn,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::FenList => "fen-list",
            Self::Pgn => "pgn",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of `game.json`, the generator's own record of a finished game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub game_index: u32,
    pub viewpoint: Viewpoint,
    pub positions: usize,
    pub views_per_position: ViewCount,
    pub frames: u32,
    pub resolution: u32,
    pub samples: u32,
    pub source: SourceKind,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_keeps_board_field_only() {
        let pos = Position::from_fen_field(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(pos.as_str(), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR");
        assert!(Position::from_fen_field("   ").is_none());
    }

    #[test]
    fn test_viewpoint_parse_is_case_insensitive() {
        assert_eq!("White".parse::<Viewpoint>().unwrap(), Viewpoint::White);
        assert_eq!(" BLACK ".parse::<Viewpoint>().unwrap(), Viewpoint::Black);
        assert!("red".parse::<Viewpoint>().is_err());
    }

    #[test]
    fn test_viewpoint_from_folder_name() {
        assert_eq!(Viewpoint::from_folder_name("game_0001"), Viewpoint::White);
        assert_eq!(
            Viewpoint::from_folder_name("game_0001_Black"),
            Viewpoint::Black
        );
    }

    #[test]
    fn test_view_count_accepts_only_two_or_three() {
        assert_eq!(ViewCount::try_from(2).unwrap(), ViewCount::TWO);
        assert_eq!(ViewCount::try_from(3).unwrap().get(), 3);
        assert!(ViewCount::try_from(1).is_err());
        assert!(ViewCount::try_from(4).is_err());
    }

    #[test]
    fn test_metadata_json_uses_lowercase_names() {
        let meta = GameMetadata {
            game_index: 7,
            viewpoint: Viewpoint::Black,
            positions: 2,
            views_per_position: ViewCount::THREE,
            frames: 6,
            resolution: 1024,
            samples: 16,
            source: SourceKind::FenList,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains(r#""viewpoint":"black""#));
        assert!(json.contains(r#""source":"fen-list""#));
        assert!(json.contains(r#""views_per_position":3"#));

        let back: GameMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, meta);
    }
}
