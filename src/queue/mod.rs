//! Matchmaking queue membership.
//!
//! Joining either matches immediately or leaves us queued; while queued the
//! client re-joins on a fixed period, which the server treats as a status
//! check. Transitions are reported on an event channel.

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::models::{QueueState, QueueStatus, TimeControl};
use crate::scheduler::{Scheduler, TaskControl};
use crate::transport::QueueApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    NotQueued,
    Queued {
        since: Instant,
        widening: Option<u32>,
    },
    Matched {
        game_id: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// Entered the queue, or the search range changed.
    Queued { mode: String, widening: Option<u32> },
    Matched { mode: String, game_id: u64 },
    Left { mode: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Matched { game_id: u64 },
    Queued { widening: Option<u32> },
    /// A leave or teardown landed while the join was in flight; the reply
    /// was dropped.
    Cancelled,
}

#[derive(Clone)]
pub struct QueueClient {
    api: Rc<dyn QueueApi>,
    scheduler: Scheduler,
    poll_interval: Duration,
    memberships: Rc<RefCell<HashMap<String, Membership>>>,
    /// Bumped by every leave/teardown of a mode. A reply that started under an
    /// older generation is stale.
    generations: Rc<RefCell<HashMap<String, u64>>>,
    events: UnboundedSender<QueueEvent>,
}

impl QueueClient {
    pub fn new(
        api: Rc<dyn QueueApi>,
        scheduler: Scheduler,
        poll_interval: Duration,
    ) -> (Self, UnboundedReceiver<QueueEvent>) {
        let (events, receiver) = unbounded();
        let client = Self {
            api,
            scheduler,
            poll_interval,
            memberships: Rc::new(RefCell::new(HashMap::new())),
            generations: Rc::new(RefCell::new(HashMap::new())),
            events,
        };
        (client, receiver)
    }

    /// Available modes; each `slug` is a valid mode key.
    pub async fn time_controls(&self) -> Result<Vec<TimeControl>> {
        self.api.time_controls().await
    }

    /// Join the queue for `mode`. Failure of this first request is returned;
    /// later poll failures are only logged.
    pub async fn join(&self, mode: &str) -> Result<JoinOutcome> {
        // Registering the mode lets a teardown see this join.
        let generation = *self
            .generations
            .borrow_mut()
            .entry(mode.to_string())
            .or_insert(0);
        let status = self.api.join_queue(mode).await?;

        // The user may have left while the request was out.
        if self.generation(mode) != generation {
            match status.game_id {
                Some(game_id) => warn!(
                    "Join for {} answered with game {} after leaving; dropped",
                    mode, game_id
                ),
                None => debug!("Join for {} answered after leaving; dropped", mode),
            }
            return Ok(JoinOutcome::Cancelled);
        }

        let outcome = self.apply(mode, status);
        // Only a queued answer needs the status poll.
        if let JoinOutcome::Queued { .. } = outcome {
            self.start_polling(mode);
        }
        Ok(outcome)
    }

    /// Leave the queue. Local state resets whether or not the server heard us.
    pub async fn leave(&self, mode: &str) {
        // Local state first, so nothing in flight can re-queue us.
        self.bump_generation(mode);
        self.scheduler.cancel(&poll_key(mode));
        self.memberships
            .borrow_mut()
            .insert(mode.to_string(), Membership::NotQueued);
        // Best effort; a failure only gets logged.
        if let Err(e) = self.api.leave_queue(mode).await {
            warn!("Leaving queue {} failed: {}", mode, e);
        }
        info!("Left queue {}", mode);
        self.emit(QueueEvent::Left { mode: mode.to_string() });
    }

    /// Stop all polling and forget queued memberships without telling the
    /// server. For when the owning view goes away.
    pub fn teardown(&self) {
        // Every mode ever touched, including joins that have not answered yet.
        let mut generations = self.generations.borrow_mut();
        for generation in generations.values_mut() {
            *generation += 1;
        }
        let mut memberships = self.memberships.borrow_mut();
        for (mode, membership) in memberships.iter_mut() {
            if let Membership::Queued { .. } = membership {
                self.scheduler.cancel(&poll_key(mode));
                *membership = Membership::NotQueued;
            }
        }
    }

    pub fn membership(&self, mode: &str) -> Membership {
        self.memberships
            .borrow()
            .get(mode)
            .copied()
            .unwrap_or(Membership::NotQueued)
    }

    /// Time spent in the queue so far; zero unless currently queued.
    pub fn elapsed(&self, mode: &str) -> Duration {
        match self.membership(mode) {
            Membership::Queued { since, .. } => since.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// One poll: re-join and fold in the answer.
    pub async fn poll(&self, mode: &str) -> TaskControl {
        if !matches!(self.membership(mode), Membership::Queued { .. }) {
            return TaskControl::Stop;
        }
        let generation = self.generation(mode);
        let status = match self.api.join_queue(mode).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Queue poll for {} failed: {}", mode, e);
                return TaskControl::Continue;
            }
        };
        // A leave may have landed while the poll was in flight.
        if self.generation(mode) != generation
            || !matches!(self.membership(mode), Membership::Queued { .. })
        {
            return TaskControl::Stop;
        }
        match self.apply(mode, status) {
            JoinOutcome::Queued { .. } => TaskControl::Continue,
            _ => TaskControl::Stop,
        }
    }

    fn start_polling(&self, mode: &str) {
        let key = poll_key(mode);
        if self.scheduler.is_registered(&key) {
            return;
        }
        let client = self.clone();
        let mode = mode.to_string();
        self.scheduler.register(key, self.poll_interval, move || {
            let client = client.clone();
            let mode = mode.clone();
            async move { client.poll(&mode).await }
        });
    }

    fn generation(&self, mode: &str) -> u64 {
        self.generations.borrow().get(mode).copied().unwrap_or(0)
    }

    fn bump_generation(&self, mode: &str) {
        *self.generations.borrow_mut().entry(mode.to_string()).or_insert(0) += 1;
    }

    /// Fold one server answer into the membership for `mode`.
    fn apply(&self, mode: &str, status: QueueStatus) -> JoinOutcome {
        let widening = status.widening.map(|w| w.delta);
        match (status.status, status.game_id) {
            (QueueState::Matched, Some(game_id)) => {
                info!("Matched in {} queue: game {}", mode, game_id);
                // Matched is terminal for this membership; stop polling.
                self.scheduler.cancel(&poll_key(mode));
                self.memberships
                    .borrow_mut()
                    .insert(mode.to_string(), Membership::Matched { game_id });
                self.emit(QueueEvent::Matched { mode: mode.to_string(), game_id });
                JoinOutcome::Matched { game_id }
            }
            (state, game_id) => {
                if state == QueueState::Matched {
                    warn!("Matched in {} without a game id; still polling", mode);
                }
                // Keep the original entry time across polls.
                let previous = self.membership(mode);
                let since = match previous {
                    Membership::Queued { since, .. } => since,
                    _ => Instant::now(),
                };
                let changed = !matches!(previous, Membership::Queued { widening: w, .. } if w == widening);
                debug!("Queued in {} (widening {:?}, game {:?})", mode, widening, game_id);
                self.memberships
                    .borrow_mut()
                    .insert(mode.to_string(), Membership::Queued { since, widening });
                // Only report entry and widening changes, not every poll.
                if changed {
                    self.emit(QueueEvent::Queued { mode: mode.to_string(), widening });
                }
                JoinOutcome::Queued { widening }
            }
        }
    }

    fn emit(&self, event: QueueEvent) {
        // Nobody listening is fine.
        let _ = self.events.unbounded_send(event);
    }
}

fn poll_key(mode: &str) -> String {
    format!("queue:{}", mode)
}
