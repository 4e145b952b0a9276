use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::game_state::{
    ClockSnapshot, GameResult, GameSnapshot, GameStatus, MoveRecord, Side, Termination,
};

/// Game row as returned by the initial load.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameRecord {
    pub id: u64,
    pub white_id: u64,
    pub black_id: u64,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
    pub fen: String,
    pub move_index: u32,
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub last_move_at: Option<DateTime<Utc>>,
    pub lock_version: u64,
    #[serde(default)]
    pub to_move: Option<Side>,
    #[serde(default)]
    pub to_move_user_id: Option<u64>,
    #[serde(default)]
    pub server_now: Option<DateTime<Utc>>,
}

/// `GET /games/{id}`: the game plus its full move history.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GameEnvelope {
    pub game: GameRecord,
    #[serde(default)]
    pub moves: Vec<MoveRecord>,
}

impl GameEnvelope {
    pub fn into_parts(self) -> (GameSnapshot, Vec<MoveRecord>) {
        let GameEnvelope { game, mut moves } = self;
        moves.sort_by_key(|record| record.ply);
        moves.dedup_by_key(|record| record.ply);

        // Older servers omit to_move; the move counter's parity decides it.
        let to_move = game.to_move.unwrap_or(if game.move_index % 2 == 0 {
            Side::White
        } else {
            Side::Black
        });
        let snapshot = GameSnapshot {
            id: game.id,
            white_id: game.white_id,
            black_id: game.black_id,
            status: game.status,
            result: game.result,
            reason: game.reason,
            fen: game.fen,
            lock_version: game.lock_version,
            clock: ClockSnapshot {
                white_remaining_ms: game.white_time_ms,
                black_remaining_ms: game.black_time_ms,
                to_move,
                last_move_at: game.last_move_at,
                server_now: game.server_now,
            },
            to_move_user_id: game.to_move_user_id,
            position_cursor: moves.last().map(|record| record.ply),
        };
        (snapshot, moves)
    }
}

/// `GET /games/{id}/sync?since={ply}`: everything recorded after `since`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SyncResponse {
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
    pub lock_version: u64,
    pub white_time_ms: u64,
    pub black_time_ms: u64,
    pub last_move_at: Option<DateTime<Utc>>,
    pub to_move: Side,
    #[serde(default)]
    pub to_move_user_id: Option<u64>,
    #[serde(default)]
    pub server_now: Option<DateTime<Utc>>,
    #[serde(default)]
    pub since: Option<i64>,
    #[serde(default)]
    pub moves: Vec<MoveRecord>,
}

impl SyncResponse {
    pub fn clock_snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            white_remaining_ms: self.white_time_ms,
            black_remaining_ms: self.black_time_ms,
            to_move: self.to_move,
            last_move_at: self.last_move_at,
            server_now: self.server_now,
        }
    }
}

/// Body of `POST /games/{id}/move`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MoveRequest {
    pub uci: String,
    pub lock_version: u64,
}

/// Reply to a move submission. Conflicts arrive as HTTP 409 instead.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum MoveResponse {
    Accepted {
        ok: bool,
        lock_version: u64,
    },
    Finished {
        finished: bool,
        result: Option<GameResult>,
        reason: Option<Termination>,
    },
}

/// Reply to resign / accept-draw.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameOverNotice {
    #[serde(default)]
    pub finished: bool,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
}

/// Reply to a draw offer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DrawOfferAck {
    pub status: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Queued,
    Matched,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widening {
    pub delta: u32,
}

/// Reply to queue join (and to each poll, which is a re-join).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueueStatus {
    pub status: QueueState,
    #[serde(default)]
    pub widening: Option<Widening>,
    #[serde(default)]
    pub game_id: Option<u64>,
}

/// A selectable game mode; `slug` is the queue mode key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TimeControl {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub time_class: String,
    pub initial_sec: u64,
    pub increment_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActiveGame {
    pub game_id: Option<u64>,
}

/// Public part of a user account as embedded in other payloads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: u64,
    pub name: String,
}

/// One finished or running game in a player's history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GameSummary {
    pub id: u64,
    pub white_id: u64,
    pub black_id: u64,
    #[serde(default)]
    pub time_control_id: Option<u64>,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
    #[serde(default)]
    pub move_index: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "timeControl")]
    pub time_control: Option<TimeControl>,
    #[serde(default)]
    pub white: Option<User>,
    #[serde(default)]
    pub black: Option<User>,
}

impl GameSummary {
    /// The other player's name, when the server embedded it.
    pub fn opponent_name(&self, player_id: u64) -> Option<&str> {
        let opponent = if player_id == self.white_id {
            self.black.as_ref()
        } else if player_id == self.black_id {
            self.white.as_ref()
        } else {
            None
        };
        opponent.map(|user| user.name.as_str())
    }
}

/// A player's rating in one time class. Also the leaderboard row.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlayerRating {
    pub id: u64,
    pub user_id: u64,
    pub time_class: String,
    pub rating: i32,
    pub games: u32,
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_response_decodes_server_payload() {
        let body = r#"{
            "status": "finished",
            "result": "0-1",
            "reason": "timeout",
            "lock_version": 12,
            "white_time_ms": 0,
            "black_time_ms": 41250,
            "last_move_at": "2024-03-01T10:00:05.000000Z",
            "to_move": "white",
            "to_move_user_id": 3,
            "moves": [{
                "id": 90, "game_id": 5, "ply": 4, "by_user_id": 4,
                "uci": "g8f6", "san": "Nf6", "from_sq": "g8", "to_sq": "f6",
                "promotion": null,
                "fen_after": "rnbqkb1r/pppppppp/5n2/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 1 2",
                "white_time_ms_after": 1000, "black_time_ms_after": 41250,
                "created_at": "2024-03-01T10:00:05.000000Z"
            }]
        }"#;
        let sync: SyncResponse = serde_json::from_str(body).unwrap();
        assert_eq!(sync.status, GameStatus::Finished);
        assert_eq!(sync.result, Some(GameResult::BlackWins));
        assert_eq!(sync.reason, Some(Termination::Timeout));
        assert_eq!(sync.moves[0].from, "g8");
        assert!(sync.server_now.is_none());
        assert_eq!(sync.clock_snapshot().black_remaining_ms, 41250);
    }

    #[test]
    fn move_response_variants() {
        let accepted: MoveResponse =
            serde_json::from_str(r#"{"ok": true, "lock_version": 8}"#).unwrap();
        assert_eq!(accepted, MoveResponse::Accepted { ok: true, lock_version: 8 });

        let finished: MoveResponse = serde_json::from_str(
            r#"{"finished": true, "result": "1-0", "reason": "checkmate"}"#,
        )
        .unwrap();
        assert_eq!(
            finished,
            MoveResponse::Finished {
                finished: true,
                result: Some(GameResult::WhiteWins),
                reason: Some(Termination::Checkmate),
            }
        );
    }

    #[test]
    fn envelope_derives_turn_from_move_index() {
        let body = r#"{
            "game": {
                "id": 7, "white_id": 1, "black_id": 2, "status": "active",
                "result": null, "reason": null, "fen": "startpos", "move_index": 1,
                "white_time_ms": 60000, "black_time_ms": 60000,
                "last_move_at": null, "lock_version": 2
            },
            "moves": []
        }"#;
        let envelope: GameEnvelope = serde_json::from_str(body).unwrap();
        let (snapshot, moves) = envelope.into_parts();
        assert!(moves.is_empty());
        assert_eq!(snapshot.clock.to_move, Side::Black);
        assert_eq!(snapshot.position_cursor, None);
        assert_eq!(snapshot.since_param(), -1);
    }

    #[test]
    fn recent_game_with_embedded_players() {
        let body = r#"{
            "id": 31, "white_id": 4, "black_id": 9, "time_control_id": 2,
            "status": "finished", "result": "1/2-1/2", "reason": "draw",
            "fen": "8/8/8/8/8/8/8/8 w - - 0 1", "move_index": 57,
            "white_time_ms": 0, "black_time_ms": 0, "last_move_at": null,
            "lock_version": 60,
            "created_at": "2024-03-01T10:00:00.000000Z",
            "updated_at": "2024-03-01T10:20:00.000000Z",
            "timeControl": {
                "id": 2, "name": "Blitz 5+0", "slug": "blitz-5-0",
                "time_class": "blitz", "initial_sec": 300, "increment_ms": 0
            },
            "white": { "id": 4, "name": "ana", "email": "ana@example.com" },
            "black": { "id": 9, "name": "bo" }
        }"#;
        let game: GameSummary = serde_json::from_str(body).unwrap();
        assert_eq!(game.result, Some(GameResult::Draw));
        assert_eq!(game.time_control.as_ref().map(|tc| tc.initial_sec), Some(300));
        assert_eq!(game.opponent_name(4), Some("bo"));
        assert_eq!(game.opponent_name(9), Some("ana"));
        assert_eq!(game.opponent_name(1), None);
    }

    #[test]
    fn leaderboard_rows() {
        let body = r#"[
            { "id": 1, "user_id": 4, "time_class": "blitz", "rating": 1712, "games": 40,
              "user": { "id": 4, "name": "ana" } },
            { "id": 2, "user_id": 9, "time_class": "blitz", "rating": 1500, "games": 0 }
        ]"#;
        let rows: Vec<PlayerRating> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].user.as_ref().map(|u| u.name.as_str()), Some("ana"));
        assert_eq!(rows[1].user, None);
        assert_eq!(rows[1].rating, 1500);
    }

    #[test]
    fn queue_status_with_widening() {
        let status: QueueStatus =
            serde_json::from_str(r#"{"status": "queued", "widening": {"delta": 50}}"#).unwrap();
        assert_eq!(status.status, QueueState::Queued);
        assert_eq!(status.widening, Some(Widening { delta: 50 }));
        assert_eq!(status.game_id, None);
    }
}
