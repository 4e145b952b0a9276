use chess::{Color, Piece, Square};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board side. Mirrors `chess::Color` but carries the wire spelling.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Active,
    Finished,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    #[serde(rename = "1-0")]
    WhiteWins,
    #[serde(rename = "0-1")]
    BlackWins,
    #[serde(rename = "1/2-1/2")]
    Draw,
}

/// Why a game ended.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Termination {
    Checkmate,
    Resign,
    Timeout,
    Draw,
    Stalemate,
    #[serde(other)]
    Other,
}

/// Pieces a pawn may promote to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionPiece {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl PromotionPiece {
    pub fn uci_char(self) -> char {
        match self {
            PromotionPiece::Queen => 'q',
            PromotionPiece::Rook => 'r',
            PromotionPiece::Bishop => 'b',
            PromotionPiece::Knight => 'n',
        }
    }

    pub fn from_uci_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(PromotionPiece::Queen),
            'r' => Some(PromotionPiece::Rook),
            'b' => Some(PromotionPiece::Bishop),
            'n' => Some(PromotionPiece::Knight),
            _ => None,
        }
    }
}

impl From<PromotionPiece> for Piece {
    fn from(piece: PromotionPiece) -> Self {
        match piece {
            PromotionPiece::Queen => Piece::Queen,
            PromotionPiece::Rook => Piece::Rook,
            PromotionPiece::Bishop => Piece::Bishop,
            PromotionPiece::Knight => Piece::Knight,
        }
    }
}

/// A fully disambiguated move ready to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCommand {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PromotionPiece>,
}

impl MoveCommand {
    pub fn uci(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for MoveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(piece) = self.promotion {
            write!(f, "{}", piece.uci_char())?;
        }
        Ok(())
    }
}

/// Server clock accounting as of one sync.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClockSnapshot {
    pub white_remaining_ms: u64,
    pub black_remaining_ms: u64,
    pub to_move: Side,
    pub last_move_at: Option<DateTime<Utc>>,
    pub server_now: Option<DateTime<Utc>>,
}

impl ClockSnapshot {
    pub fn remaining_for(&self, side: Side) -> u64 {
        match side {
            Side::White => self.white_remaining_ms,
            Side::Black => self.black_remaining_ms,
        }
    }
}

/// One recorded half-move. Immutable once received.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveRecord {
    pub ply: u32,
    pub by_user_id: u64,
    pub uci: String,
    #[serde(default)]
    pub san: Option<String>,
    #[serde(rename = "from_sq")]
    pub from: String,
    #[serde(rename = "to_sq")]
    pub to: String,
    #[serde(default)]
    pub promotion: Option<String>,
    pub fen_after: String,
    pub white_time_ms_after: u64,
    pub black_time_ms_after: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// The client's cached view of one game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameSnapshot {
    pub id: u64,
    pub white_id: u64,
    pub black_id: u64,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
    /// Position the move log starts from; `"startpos"` for the initial position.
    pub fen: String,
    pub lock_version: u64,
    pub clock: ClockSnapshot,
    pub to_move_user_id: Option<u64>,
    pub position_cursor: Option<u32>,
}

impl GameSnapshot {
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }

    pub fn side_of(&self, player_id: u64) -> Option<Side> {
        if player_id == self.white_id {
            Some(Side::White)
        } else if player_id == self.black_id {
            Some(Side::Black)
        } else {
            None
        }
    }

    pub fn is_players_turn(&self, player_id: u64) -> bool {
        self.is_active() && self.side_of(player_id) == Some(self.clock.to_move)
    }

    /// The `since` parameter for the next sync. `-1` asks for the whole log.
    pub fn since_param(&self) -> i64 {
        self.position_cursor.map_or(-1, i64::from)
    }

    /// The ply the next appended move must carry.
    pub fn next_ply(&self) -> u32 {
        self.position_cursor.map_or(0, |ply| ply + 1)
    }
}
