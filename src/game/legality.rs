//! Advisory legality queries over the latest known position.
//!
//! An adapter is built fresh from the snapshot and move log for every query,
//! so highlighted moves can never drift from the position the server knows.

use chess::{Board, ChessMove, MoveGen, Piece, Rank, Square};
use log::warn;
use std::str::FromStr;

use crate::models::{GameSnapshot, MoveRecord, PromotionPiece, Side};

pub const START_POSITION: &str = "startpos";

#[derive(Debug, Clone)]
pub struct LegalityAdapter {
    board: Option<Board>,
    active: bool,
}

impl LegalityAdapter {
    /// Build from the base position plus the move log. The last move's
    /// `fen_after` is the current position; an empty log falls back to the base.
    pub fn for_game(snapshot: &GameSnapshot, moves: &[MoveRecord]) -> Self {
        let fen = moves
            .last()
            .map(|record| record.fen_after.as_str())
            .unwrap_or(snapshot.fen.as_str());
        Self::from_fen(fen, snapshot.is_active())
    }

    pub fn from_fen(fen: &str, active: bool) -> Self {
        let board = if fen == START_POSITION {
            Some(Board::default())
        } else {
            match Board::from_str(fen) {
                Ok(board) => Some(board),
                Err(e) => {
                    warn!("Unparseable position {:?}: {}", fen, e);
                    None
                }
            }
        };
        Self { board, active }
    }

    /// The board legal moves are generated from, when the game is active and
    /// the position parsed.
    fn playable(&self) -> Option<&Board> {
        if self.active {
            self.board.as_ref()
        } else {
            None
        }
    }

    pub fn side_to_move(&self) -> Option<Side> {
        self.board.as_ref().map(|board| board.side_to_move().into())
    }

    /// Destinations reachable from `origin`. Promotions to different pieces
    /// share a destination, so each square appears once.
    pub fn legal_destinations(&self, origin: Square) -> Vec<Square> {
        let Some(board) = self.playable() else {
            return Vec::new();
        };
        let mut destinations = Vec::new();
        for chess_move in MoveGen::new_legal(board) {
            if chess_move.get_source() == origin && !destinations.contains(&chess_move.get_dest()) {
                destinations.push(chess_move.get_dest());
            }
        }
        destinations
    }

    pub fn is_legal(&self, origin: Square, destination: Square) -> bool {
        self.playable().map_or(false, |board| {
            MoveGen::new_legal(board)
                .any(|m| m.get_source() == origin && m.get_dest() == destination)
        })
    }

    /// True iff a pawn on `origin` would land on its farthest rank.
    pub fn requires_promotion_choice(&self, origin: Square, destination: Square) -> bool {
        let Some(board) = self.board.as_ref() else {
            return false;
        };
        if board.piece_on(origin) != Some(Piece::Pawn) {
            return false;
        }
        match board.color_on(origin).map(Side::from) {
            Some(Side::White) => destination.get_rank() == Rank::Eighth,
            Some(Side::Black) => destination.get_rank() == Rank::First,
            None => false,
        }
    }

    /// Apply the move to a scratch copy of the position. Returns the
    /// resulting board, or `None` if the move is not legal here.
    pub fn trial_move(
        &self,
        origin: Square,
        destination: Square,
        promotion: Option<PromotionPiece>,
    ) -> Option<Board> {
        let board = self.playable()?;
        let candidate = ChessMove::new(origin, destination, promotion.map(Piece::from));
        if board.legal(candidate) {
            Some(board.make_move_new(candidate))
        } else {
            None
        }
    }
}
