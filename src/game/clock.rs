//! Live countdown derived from the last server clock snapshot.
//!
//! The server owns time accounting. Between syncs the client only subtracts
//! the wall-clock time elapsed since the last move from the side to move,
//! after cancelling the skew between its own clock and the server's.

use chrono::{DateTime, Utc};

use crate::models::{ClockSnapshot, Side};

/// Remaining time for both sides at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub white_ms: u64,
    pub black_ms: u64,
    /// The side whose clock is running, if any.
    pub running: Option<Side>,
}

impl ClockReading {
    pub fn for_side(&self, side: Side) -> u64 {
        match side {
            Side::White => self.white_ms,
            Side::Black => self.black_ms,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClockModel {
    snapshot: Option<ClockSnapshot>,
    active: bool,
    offset_ms: i64,
}

impl ClockModel {
    pub fn seeded(snapshot: ClockSnapshot, active: bool, local_now: DateTime<Utc>) -> Self {
        let mut model = Self::default();
        model.seed(snapshot, active, local_now);
        model
    }

    /// Replace the snapshot. `local_now` is the local wall clock when the
    /// snapshot was received; it fixes the skew for this snapshot.
    pub fn seed(&mut self, snapshot: ClockSnapshot, active: bool, local_now: DateTime<Utc>) {
        self.offset_ms = snapshot
            .server_now
            .map_or(0, |server_now| (local_now - server_now).num_milliseconds());
        self.snapshot = Some(snapshot);
        self.active = active;
    }

    /// `local - server`, in milliseconds.
    pub fn offset_ms(&self) -> i64 {
        self.offset_ms
    }

    pub fn snapshot(&self) -> Option<&ClockSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn reading_at(&self, local_now: DateTime<Utc>) -> ClockReading {
        let Some(snapshot) = &self.snapshot else {
            return ClockReading { white_ms: 0, black_ms: 0, running: None };
        };
        let mut reading = ClockReading {
            white_ms: snapshot.white_remaining_ms,
            black_ms: snapshot.black_remaining_ms,
            running: None,
        };
        let last_move_at = match snapshot.last_move_at {
            Some(at) if self.active => at,
            _ => return reading,
        };

        let corrected_now = local_now - chrono::Duration::milliseconds(self.offset_ms);
        let elapsed = (corrected_now - last_move_at).num_milliseconds().max(0) as u64;
        match snapshot.to_move {
            Side::White => reading.white_ms = reading.white_ms.saturating_sub(elapsed),
            Side::Black => reading.black_ms = reading.black_ms.saturating_sub(elapsed),
        }
        reading.running = Some(snapshot.to_move);
        reading
    }

    pub fn reading(&self) -> ClockReading {
        self.reading_at(Utc::now())
    }
}
