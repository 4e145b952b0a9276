use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::game::{ClockModel, LegalityAdapter, MovePipeline};
use crate::models::{GameEnvelope, GameSnapshot, GameStatus, MoveRecord, SyncResponse};

/// Local state for one game, shared between the sync engine, the pipeline
/// and readers. Only `merge` writes the snapshot and the move log.
#[derive(Debug)]
pub struct SessionState {
    pub snapshot: GameSnapshot,
    pub moves: Vec<MoveRecord>,
    pub clock: ClockModel,
    pub pipeline: MovePipeline,
    /// We offered a draw that is still open as far as we know.
    pub draw_offered: bool,
}

/// What one merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub appended: usize,
    /// The response predates what we already hold; scalar fields were ignored.
    pub stale: bool,
    /// This merge is the one that observed the game finishing.
    pub finished: bool,
}

impl SessionState {
    pub fn from_envelope(envelope: GameEnvelope, local_now: DateTime<Utc>) -> Self {
        let (snapshot, moves) = envelope.into_parts();
        let clock = ClockModel::seeded(snapshot.clock.clone(), snapshot.is_active(), local_now);
        Self {
            snapshot,
            moves,
            clock,
            pipeline: MovePipeline::new(),
            draw_offered: false,
        }
    }

    pub fn legality(&self) -> LegalityAdapter {
        LegalityAdapter::for_game(&self.snapshot, &self.moves)
    }

    /// Fold a sync response into local state.
    ///
    /// Moves are appended only if they continue the log contiguously. Scalar
    /// fields are replaced wholesale unless the response carries an older lock
    /// version than the one already held. `finished` is never reverted.
    pub fn merge(&mut self, sync: SyncResponse, local_now: DateTime<Utc>) -> MergeReport {
        let mut report = MergeReport::default();
        let game_id = self.snapshot.id;

        let clock = sync.clock_snapshot();
        for record in sync.moves {
            let expected = self.snapshot.next_ply();
            if record.ply < expected {
                continue;
            }
            if record.ply > expected {
                warn!(
                    "Game {}: ply gap, expected {} got {}; refetching next pull",
                    game_id, expected, record.ply
                );
                break;
            }
            self.snapshot.position_cursor = Some(record.ply);
            self.moves.push(record);
            report.appended += 1;
        }

        if sync.lock_version < self.snapshot.lock_version {
            debug!(
                "Game {}: ignoring stale sync (lock {} < {})",
                game_id, sync.lock_version, self.snapshot.lock_version
            );
            report.stale = true;
        } else if self.snapshot.is_finished() && sync.status == GameStatus::Active {
            warn!("Game {}: server reported active after finish; keeping finished", game_id);
            report.stale = true;
        } else {
            let was_active = self.snapshot.is_active();
            self.snapshot.status = sync.status;
            self.snapshot.result = sync.result;
            self.snapshot.reason = sync.reason;
            self.snapshot.lock_version = sync.lock_version;
            self.snapshot.to_move_user_id = sync.to_move_user_id;
            self.snapshot.clock = clock.clone();
            self.clock.seed(clock, self.snapshot.is_active(), local_now);
            if was_active && self.snapshot.is_finished() {
                info!(
                    "Game {} finished: {:?} by {:?}",
                    game_id, self.snapshot.result, self.snapshot.reason
                );
                report.finished = true;
                self.draw_offered = false;
            }
        }

        if report.appended > 0 || report.finished {
            // The drafted move was planned against a position that no longer exists.
            self.pipeline.discard_draft();
        }
        report
    }
}
