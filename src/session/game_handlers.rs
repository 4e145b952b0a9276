use chess::Square;
use log::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::game::Transition;
use crate::models::{
    GameResult, MoveCommand, MoveRequest, MoveResponse, PromotionPiece, SessionState, Termination,
};
use crate::session::handler::GameSession;

/// How the server answered a submitted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { lock_version: u64 },
    /// The move was accepted and ended the game.
    GameOver {
        result: Option<GameResult>,
        reason: Option<Termination>,
    },
    /// Lost an optimistic-lock race or the game was no longer active. The
    /// draft was discarded and local state resynced.
    Superseded,
    /// Any other failure. Logged; the user may simply try again.
    Failed,
}

/// Result of one gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Handled locally; nothing was sent.
    Local(Transition),
    Submitted {
        command: MoveCommand,
        outcome: SubmitOutcome,
    },
}

impl GameSession {
    /// Click on a square.
    pub async fn select_square(&self, square: Square) -> GestureOutcome {
        let transition = self.with_pipeline(|state| {
            // Legality comes from the freshest merged position
            let adapter = state.legality();
            state.pipeline.select_square(&adapter, square)
        });
        self.drive(transition).await
    }

    /// Drag `origin` onto `destination`.
    pub async fn attempt_move(&self, origin: Square, destination: Square) -> GestureOutcome {
        let transition = self.with_pipeline(|state| {
            let adapter = state.legality();
            state.pipeline.attempt_move(&adapter, origin, destination)
        });
        if let Transition::Rejected { .. } = transition {
            debug!("Game {}: illegal drop {}{} rejected", self.game_id, origin, destination);
        }
        self.drive(transition).await
    }

    pub async fn choose_promotion(&self, piece: PromotionPiece) -> GestureOutcome {
        let transition = self.with_pipeline(|state| state.pipeline.choose_promotion(piece));
        self.drive(transition).await
    }

    pub fn cancel_promotion(&self) -> Transition {
        self.state.borrow_mut().pipeline.cancel_promotion()
    }

    /// Resign, then resync.
    pub async fn resign(&self) -> Result<()> {
        self.ensure_active()?;
        let notice = self.api.resign(self.game_id).await?;
        info!("Game {}: resigned ({:?})", self.game_id, notice.result);

        // The result itself arrives through the merge
        self.pull().await;
        Ok(())
    }

    /// Offer a draw, then resync. `draw_offer_pending` turns on once the
    /// server has taken the offer.
    pub async fn offer_draw(&self) -> Result<()> {
        self.ensure_active()?;
        let ack = self.api.offer_draw(self.game_id).await?;
        info!("Game {}: draw offered ({})", self.game_id, ack.status);
        self.state.borrow_mut().draw_offered = true;
        self.pull().await;
        Ok(())
    }

    /// Accept the open draw offer, then resync.
    pub async fn accept_draw(&self) -> Result<()> {
        self.ensure_active()?;
        let notice = self.api.accept_draw(self.game_id).await?;
        info!("Game {}: draw accepted ({:?})", self.game_id, notice.result);
        self.state.borrow_mut().draw_offered = false;
        self.pull().await;
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_finished() {
            return Err(ClientError::GameFinished(self.game_id));
        }
        Ok(())
    }

    /// Run a pipeline step unless gestures are currently meaningless: the
    /// game is over, we are only watching, or it is the opponent's move.
    fn with_pipeline<F>(&self, step: F) -> Transition
    where
        F: FnOnce(&mut SessionState) -> Transition,
    {
        let mut state = self.state.borrow_mut();

        // One move in flight per game
        if state.pipeline.is_submitting() {
            return Transition::Ignored;
        }

        // Only the player to move, and only while the game is live
        if !state.snapshot.is_players_turn(self.player_id) {
            return Transition::Ignored;
        }
        step(&mut state)
    }

    async fn drive(&self, transition: Transition) -> GestureOutcome {
        match transition {
            Transition::Submit(command) => {
                let outcome = self.submit(command).await;
                GestureOutcome::Submitted { command, outcome }
            }
            other => GestureOutcome::Local(other),
        }
    }

    /// Send the one mutating request for `command`. The pipeline stays in
    /// `Submitting` until the follow-up pull has landed, so no second move
    /// can be drafted against the pre-move position.
    async fn submit(&self, command: MoveCommand) -> SubmitOutcome {
        // The lock version we last observed; the server rejects anything older
        let lock_version = self.state.borrow().snapshot.lock_version;
        info!(
            "Game {}: submitting {} at lock {}",
            self.game_id, command, lock_version
        );
        let request = MoveRequest {
            uci: command.uci(),
            lock_version,
        };
        // Classify the answer. Conflicts are expected and never surfaced
        let outcome = match self.api.make_move(self.game_id, request).await {
            Ok(MoveResponse::Accepted { ok: true, lock_version }) => {
                SubmitOutcome::Accepted { lock_version }
            }
            Ok(MoveResponse::Accepted { ok: false, .. }) => {
                warn!("Game {}: move {} not acknowledged", self.game_id, command);
                SubmitOutcome::Failed
            }
            Ok(MoveResponse::Finished { result, reason, .. }) => {
                info!("Game {}: {} ended the game", self.game_id, command);
                SubmitOutcome::GameOver { result, reason }
            }
            Err(e) if e.is_conflict() => {
                debug!("Game {}: {} superseded ({}); resyncing", self.game_id, command, e);
                SubmitOutcome::Superseded
            }
            Err(e) => {
                warn!("Game {}: move {} failed: {}", self.game_id, command, e);
                SubmitOutcome::Failed
            }
        };

        // Reconcile before unlocking the pipeline
        if outcome != SubmitOutcome::Failed {
            self.pull().await;
        }
        self.state.borrow_mut().pipeline.finish();
        outcome
    }
}
