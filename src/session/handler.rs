use chrono::Utc;
use log::{debug, error, info, warn};
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::error::Result;
use crate::game::{ClockReading, PipelineState};
use crate::models::{GameSnapshot, MergeReport, MoveRecord, SessionState};
use crate::scheduler::{Scheduler, TaskControl};
use crate::transport::GameApi;

/// Result of one sync pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    Applied(MergeReport),
    /// A scheduled tick found another pull still outstanding.
    Skipped,
    /// Logged and left for the next tick.
    Failed,
}

/// One player's live view of one game.
///
/// Clones share the same state; all of them must live on one runtime thread.
#[derive(Clone)]
pub struct GameSession {
    pub(crate) game_id: u64,
    pub(crate) player_id: u64,
    pub(crate) api: Rc<dyn GameApi>,
    pub(crate) state: Rc<RefCell<SessionState>>,
    /// Outstanding sync requests. Kept outside `state` so the count can be
    /// released while `state` is borrowed.
    pub(crate) pulls_in_flight: Rc<Cell<usize>>,
}

/// Marks a pull outstanding for as long as it is alive, including when the
/// pulling task is cancelled mid-request.
struct PullGuard {
    count: Rc<Cell<usize>>,
}

impl PullGuard {
    fn enter(count: &Rc<Cell<usize>>) -> Self {
        count.set(count.get() + 1);
        Self { count: count.clone() }
    }
}

impl Drop for PullGuard {
    fn drop(&mut self) {
        self.count.set(self.count.get().saturating_sub(1));
    }
}

impl GameSession {
    /// Fetch the game and its full history. The only failure the shell is
    /// expected to render.
    pub async fn load(api: Rc<dyn GameApi>, game_id: u64, player_id: u64) -> Result<Self> {
        let envelope = api.get_game(game_id).await.map_err(|e| {
            error!("Failed to load game {}: {}", game_id, e);
            e
        })?;
        let state = SessionState::from_envelope(envelope, Utc::now());
        info!(
            "Loaded game {} at ply {:?} (lock {}), player {} as {:?}",
            game_id,
            state.snapshot.position_cursor,
            state.snapshot.lock_version,
            player_id,
            state.snapshot.side_of(player_id)
        );
        Ok(Self {
            game_id,
            player_id,
            api,
            state: Rc::new(RefCell::new(state)),
            pulls_in_flight: Rc::new(Cell::new(0)),
        })
    }

    pub fn game_id(&self) -> u64 {
        self.game_id
    }

    pub fn player_id(&self) -> u64 {
        self.player_id
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn moves(&self) -> Ref<'_, [MoveRecord]> {
        Ref::map(self.state.borrow(), |state| state.moves.as_slice())
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.state.borrow().pipeline.state().clone()
    }

    pub fn pulls_in_flight(&self) -> usize {
        self.pulls_in_flight.get()
    }

    /// True after our draw offer went through, until it is accepted or the
    /// game ends.
    pub fn draw_offer_pending(&self) -> bool {
        self.state.borrow().draw_offered
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().snapshot.is_finished()
    }

    pub fn clock(&self) -> ClockReading {
        self.state.borrow().clock.reading()
    }

    pub fn clock_at(&self, local_now: chrono::DateTime<Utc>) -> ClockReading {
        self.state.borrow().clock.reading_at(local_now)
    }

    /// Measured skew of the local clock against the server, `local - server`.
    pub fn clock_offset_ms(&self) -> i64 {
        self.state.borrow().clock.offset_ms()
    }

    /// Pull everything after the local cursor and merge it. Always runs, even
    /// if another pull is outstanding; the merge tolerates reordering.
    pub async fn pull(&self) -> PullOutcome {
        let since = self.state.borrow().snapshot.since_param();
        let guard = PullGuard::enter(&self.pulls_in_flight);
        let response = self.api.sync_game(self.game_id, since).await;
        drop(guard);

        match response {
            Ok(sync) => {
                let report = self.state.borrow_mut().merge(sync, Utc::now());
                if report.appended > 0 {
                    debug!("Game {}: merged {} new move(s)", self.game_id, report.appended);
                }
                PullOutcome::Applied(report)
            }
            Err(e) => {
                warn!("Sync for game {} failed: {}", self.game_id, e);
                PullOutcome::Failed
            }
        }
    }

    /// A pull that yields to any pull already outstanding.
    pub async fn tick(&self) -> PullOutcome {
        if self.pulls_in_flight.get() > 0 {
            debug!("Game {}: previous pull outstanding, skipping tick", self.game_id);
            return PullOutcome::Skipped;
        }
        self.pull().await
    }

    /// One tick of the periodic sync. Stops for good once the game is finished.
    pub async fn scheduled_pull(&self) -> TaskControl {
        if self.is_finished() {
            return TaskControl::Stop;
        }
        self.tick().await;
        if self.is_finished() {
            info!("Game {} finished; polling stopped", self.game_id);
            TaskControl::Stop
        } else {
            TaskControl::Continue
        }
    }

    pub fn poll_key(&self) -> String {
        format!("game:{}", self.game_id)
    }

    /// Start the periodic sync. No-op for a finished game or if already polling.
    pub fn start_polling(&self, scheduler: &Scheduler, period: Duration) {
        if self.is_finished() {
            debug!("Game {} already finished; not polling", self.game_id);
            return;
        }
        let key = self.poll_key();
        if scheduler.is_registered(&key) {
            return;
        }
        let session = self.clone();
        scheduler.register(key, period, move || {
            let session = session.clone();
            async move { session.scheduled_pull().await }
        });
    }

    /// Cancel everything this session scheduled. Call when the view goes away.
    pub fn teardown(&self, scheduler: &Scheduler) {
        scheduler.cancel(&self.poll_key());
    }
}
