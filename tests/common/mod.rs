//! In-memory stand-in for the game server, adjudicating with `chess`.

#![allow(dead_code)]

use async_trait::async_trait;
use chess::{Board, BoardStatus, ChessMove, Color};
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::str::FromStr;
use std::time::Duration;

use chess_sync_client::models::{
    DrawOfferAck, GameEnvelope, GameOverNotice, GameRecord, MoveRequest, MoveResponse,
    QueueState, QueueStatus, SyncResponse, TimeControl, Widening,
};
use chess_sync_client::game::utils::parse_square;
use chess_sync_client::{
    ClientError, GameApi, GameResult, GameStatus, MoveRecord, PromotionPiece, QueueApi, Result,
    Side, Termination,
};

pub const WHITE: u64 = 1;
pub const BLACK: u64 = 2;
pub const GAME_ID: u64 = 42;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

pub fn init_logging() {
    chess_sync_client::init_logging("debug");
}

pub struct ServerGame {
    pub board: Board,
    pub base_fen: String,
    pub moves: Vec<MoveRecord>,
    pub lock_version: u64,
    pub status: GameStatus,
    pub result: Option<GameResult>,
    pub reason: Option<Termination>,
    pub white_ms: u64,
    pub black_ms: u64,
}

impl ServerGame {
    fn to_move(&self) -> Side {
        self.board.side_to_move().into()
    }

    fn last_move_at(&self) -> Option<DateTime<Utc>> {
        self.moves
            .last()
            .map(|record| epoch() + ChronoDuration::seconds(i64::from(record.ply) + 1))
    }
}

#[derive(Default)]
pub struct Counters {
    pub get_game: Cell<usize>,
    pub sync: Cell<usize>,
    pub moves: Cell<usize>,
    pub joins: Cell<usize>,
    pub leaves: Cell<usize>,
}

pub struct FakeServer {
    pub game: RefCell<ServerGame>,
    pub calls: Counters,
    pub move_latency: Cell<Duration>,
    pub sync_latency: Cell<Duration>,
    pub join_latency: Cell<Duration>,
    pub fail_sync: Cell<bool>,
    pub fail_load: Cell<bool>,
    pub fail_leave: Cell<bool>,
    pub queue_script: RefCell<VecDeque<QueueStatus>>,
    pub sent_moves: RefCell<Vec<MoveRequest>>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::with_position("startpos", 1)
    }

    pub fn with_position(fen: &str, lock_version: u64) -> Self {
        let board = if fen == "startpos" {
            Board::default()
        } else {
            Board::from_str(fen).expect("valid test position")
        };
        Self {
            game: RefCell::new(ServerGame {
                board,
                base_fen: fen.to_string(),
                moves: Vec::new(),
                lock_version,
                status: GameStatus::Active,
                result: None,
                reason: None,
                white_ms: 60_000,
                black_ms: 60_000,
            }),
            calls: Counters::default(),
            move_latency: Cell::new(Duration::ZERO),
            sync_latency: Cell::new(Duration::ZERO),
            join_latency: Cell::new(Duration::ZERO),
            fail_sync: Cell::new(false),
            fail_load: Cell::new(false),
            fail_leave: Cell::new(false),
            queue_script: RefCell::new(VecDeque::new()),
            sent_moves: RefCell::new(Vec::new()),
        }
    }

    /// Apply a move directly, as if the other client had submitted it.
    pub fn play(&self, uci: &str) -> bool {
        let mut game = self.game.borrow_mut();
        let Some(chess_move) = parse_uci(uci) else {
            return false;
        };
        if game.status != GameStatus::Active || !game.board.legal(chess_move) {
            return false;
        }
        let mover = game.board.side_to_move();
        game.board = game.board.make_move_new(chess_move);
        match mover {
            Color::White => game.white_ms -= 1000,
            Color::Black => game.black_ms -= 1000,
        }
        let ply = game.moves.len() as u32;
        let record = MoveRecord {
            ply,
            by_user_id: if mover == Color::White { WHITE } else { BLACK },
            uci: uci.to_string(),
            san: None,
            from: uci[0..2].to_string(),
            to: uci[2..4].to_string(),
            promotion: uci.get(4..5).map(str::to_string),
            fen_after: game.board.to_string(),
            white_time_ms_after: game.white_ms,
            black_time_ms_after: game.black_ms,
            created_at: None,
        };
        game.moves.push(record);
        game.lock_version += 1;
        if game.board.status() == BoardStatus::Checkmate {
            game.status = GameStatus::Finished;
            game.result = Some(if mover == Color::White {
                GameResult::WhiteWins
            } else {
                GameResult::BlackWins
            });
            game.reason = Some(Termination::Checkmate);
        }
        true
    }

    pub fn finish(&self, result: GameResult, reason: Termination) {
        let mut game = self.game.borrow_mut();
        game.status = GameStatus::Finished;
        game.result = Some(result);
        game.reason = Some(reason);
        game.lock_version += 1;
    }

    pub fn lock_version(&self) -> u64 {
        self.game.borrow().lock_version
    }

    pub fn script_queue(&self, statuses: Vec<QueueStatus>) {
        self.queue_script.borrow_mut().extend(statuses);
    }
}

async fn delay(latency: Duration) {
    if !latency.is_zero() {
        actix_rt::time::sleep(latency).await;
    }
}

fn user_for(side: Side) -> u64 {
    match side {
        Side::White => WHITE,
        Side::Black => BLACK,
    }
}

fn parse_uci(uci: &str) -> Option<ChessMove> {
    let from = parse_square(uci.get(0..2)?)?;
    let to = parse_square(uci.get(2..4)?)?;
    let promotion = match uci.get(4..5) {
        Some(c) => Some(PromotionPiece::from_uci_char(c.chars().next()?)?.into()),
        None => None,
    };
    Some(ChessMove::new(from, to, promotion))
}

pub fn queued(delta: u32) -> QueueStatus {
    QueueStatus {
        status: QueueState::Queued,
        widening: Some(Widening { delta }),
        game_id: None,
    }
}

pub fn matched(game_id: u64) -> QueueStatus {
    QueueStatus {
        status: QueueState::Matched,
        widening: None,
        game_id: Some(game_id),
    }
}

#[async_trait(?Send)]
impl GameApi for FakeServer {
    async fn get_game(&self, game_id: u64) -> Result<GameEnvelope> {
        self.calls.get_game.set(self.calls.get_game.get() + 1);
        if self.fail_load.get() || game_id != GAME_ID {
            return Err(ClientError::NotFound(format!("game {}", game_id)));
        }
        let game = self.game.borrow();
        let to_move = game.to_move();
        Ok(GameEnvelope {
            game: GameRecord {
                id: GAME_ID,
                white_id: WHITE,
                black_id: BLACK,
                status: game.status,
                result: game.result,
                reason: game.reason,
                fen: game.base_fen.clone(),
                move_index: game.moves.len() as u32,
                white_time_ms: game.white_ms,
                black_time_ms: game.black_ms,
                last_move_at: game.last_move_at(),
                lock_version: game.lock_version,
                to_move: Some(to_move),
                to_move_user_id: Some(user_for(to_move)),
                server_now: Some(epoch()),
            },
            moves: game.moves.clone(),
        })
    }

    async fn sync_game(&self, _game_id: u64, since: i64) -> Result<SyncResponse> {
        self.calls.sync.set(self.calls.sync.get() + 1);
        delay(self.sync_latency.get()).await;
        if self.fail_sync.get() {
            return Err(ClientError::Status { status: 503, body: "unavailable".into() });
        }
        let game = self.game.borrow();
        let to_move = game.to_move();
        Ok(SyncResponse {
            status: game.status,
            result: game.result,
            reason: game.reason,
            lock_version: game.lock_version,
            white_time_ms: game.white_ms,
            black_time_ms: game.black_ms,
            last_move_at: game.last_move_at(),
            to_move,
            to_move_user_id: Some(user_for(to_move)),
            server_now: Some(epoch()),
            since: Some(since),
            moves: game
                .moves
                .iter()
                .filter(|record| i64::from(record.ply) > since)
                .cloned()
                .collect(),
        })
    }

    async fn make_move(&self, _game_id: u64, request: MoveRequest) -> Result<MoveResponse> {
        self.calls.moves.set(self.calls.moves.get() + 1);
        self.sent_moves.borrow_mut().push(request.clone());
        delay(self.move_latency.get()).await;
        {
            let game = self.game.borrow();
            if game.status != GameStatus::Active || game.lock_version != request.lock_version {
                return Err(ClientError::Conflict("Version conflict or game not active".into()));
            }
        }
        if !self.play(&request.uci) {
            return Err(ClientError::Status { status: 422, body: "Illegal move".into() });
        }
        let game = self.game.borrow();
        if game.status == GameStatus::Finished {
            return Ok(MoveResponse::Finished {
                finished: true,
                result: game.result,
                reason: game.reason,
            });
        }
        Ok(MoveResponse::Accepted { ok: true, lock_version: game.lock_version })
    }

    async fn resign(&self, _game_id: u64) -> Result<GameOverNotice> {
        self.finish(GameResult::BlackWins, Termination::Resign);
        Ok(GameOverNotice {
            finished: true,
            result: Some(GameResult::BlackWins),
            reason: Some(Termination::Resign),
        })
    }

    async fn offer_draw(&self, _game_id: u64) -> Result<DrawOfferAck> {
        Ok(DrawOfferAck { status: "offered".into() })
    }

    async fn accept_draw(&self, _game_id: u64) -> Result<GameOverNotice> {
        self.finish(GameResult::Draw, Termination::Draw);
        Ok(GameOverNotice {
            finished: true,
            result: Some(GameResult::Draw),
            reason: Some(Termination::Draw),
        })
    }

    async fn active_game(&self) -> Result<Option<u64>> {
        let active = self.game.borrow().status == GameStatus::Active;
        Ok(active.then_some(GAME_ID))
    }
}

#[async_trait(?Send)]
impl QueueApi for FakeServer {
    async fn join_queue(&self, _mode: &str) -> Result<QueueStatus> {
        self.calls.joins.set(self.calls.joins.get() + 1);
        delay(self.join_latency.get()).await;
        let mut script = self.queue_script.borrow_mut();
        match script.len() {
            0 => Err(ClientError::Status { status: 500, body: "no script".into() }),
            // The last scripted answer repeats.
            1 => Ok(script[0].clone()),
            _ => Ok(script.pop_front().expect("non-empty script")),
        }
    }

    async fn leave_queue(&self, _mode: &str) -> Result<()> {
        self.calls.leaves.set(self.calls.leaves.get() + 1);
        if self.fail_leave.get() {
            return Err(ClientError::Status { status: 500, body: "leave failed".into() });
        }
        Ok(())
    }

    async fn time_controls(&self) -> Result<Vec<TimeControl>> {
        Ok(vec![TimeControl {
            id: 1,
            name: "Blitz 3+2".into(),
            slug: "blitz".into(),
            time_class: "blitz".into(),
            initial_sec: 180,
            increment_ms: 2000,
        }])
    }
}
