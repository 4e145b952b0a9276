//! Gesture state machine for drafting one move.
//!
//! Clicks and drags both feed this machine; it never touches the network.
//! A `Transition::Submit` hands the command to the session, which keeps the
//! machine in `Submitting` until the server has answered.

use chess::Square;

use crate::game::legality::LegalityAdapter;
use crate::models::{MoveCommand, PromotionPiece};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Idle: nothing selected, waiting for an origin square.
    #[default]
    AwaitingOrigin,
    AwaitingDestination {
        origin: Square,
        destinations: Vec<Square>,
    },
    AwaitingPromotionChoice {
        origin: Square,
        destination: Square,
    },
    Submitting {
        command: MoveCommand,
    },
}

/// What a gesture did to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Gesture dropped: a move is in flight, or it is not our move to make.
    Ignored,
    /// The square has no legal moves; still awaiting an origin.
    NoMoves,
    Selected {
        origin: Square,
        destinations: Vec<Square>,
    },
    /// Selection cleared.
    Deselected,
    PromotionRequired {
        origin: Square,
        destination: Square,
    },
    /// Illegal drop, rejected locally.
    Rejected {
        origin: Square,
        destination: Square,
    },
    Submit(MoveCommand),
}

#[derive(Debug, Clone, Default)]
pub struct MovePipeline {
    state: PipelineState,
}

impl MovePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, PipelineState::Submitting { .. })
    }

    /// The move currently drafted or in flight.
    pub fn pending(&self) -> Option<MoveCommand> {
        match &self.state {
            PipelineState::AwaitingPromotionChoice { origin, destination } => Some(MoveCommand {
                from: *origin,
                to: *destination,
                promotion: None,
            }),
            PipelineState::Submitting { command } => Some(*command),
            _ => None,
        }
    }

    /// Squares to highlight as legal targets.
    pub fn highlights(&self) -> &[Square] {
        match &self.state {
            PipelineState::AwaitingDestination { destinations, .. } => destinations,
            _ => &[],
        }
    }

    /// Click on a square.
    pub fn select_square(&mut self, adapter: &LegalityAdapter, square: Square) -> Transition {
        match &self.state {
            PipelineState::Submitting { .. } | PipelineState::AwaitingPromotionChoice { .. } => {
                Transition::Ignored
            }
            PipelineState::AwaitingOrigin => self.select_origin(adapter, square),
            PipelineState::AwaitingDestination { origin, .. } => {
                let origin = *origin;
                if adapter.is_legal(origin, square) {
                    self.complete(adapter, origin, square)
                } else {
                    // Not a target: maybe the start of a different move.
                    match self.select_origin(adapter, square) {
                        Transition::NoMoves => {
                            self.state = PipelineState::AwaitingOrigin;
                            Transition::Deselected
                        }
                        selected => selected,
                    }
                }
            }
        }
    }

    /// Drag-and-drop: origin and destination in one gesture.
    pub fn attempt_move(
        &mut self,
        adapter: &LegalityAdapter,
        origin: Square,
        destination: Square,
    ) -> Transition {
        if matches!(
            self.state,
            PipelineState::Submitting { .. } | PipelineState::AwaitingPromotionChoice { .. }
        ) {
            return Transition::Ignored;
        }
        if adapter.is_legal(origin, destination)
            && adapter.requires_promotion_choice(origin, destination)
        {
            return self.complete(adapter, origin, destination);
        }
        if adapter.trial_move(origin, destination, None).is_none() {
            self.state = PipelineState::AwaitingOrigin;
            return Transition::Rejected { origin, destination };
        }
        self.complete(adapter, origin, destination)
    }

    pub fn choose_promotion(&mut self, piece: PromotionPiece) -> Transition {
        match self.state {
            PipelineState::AwaitingPromotionChoice { origin, destination } => {
                self.begin_submit(MoveCommand {
                    from: origin,
                    to: destination,
                    promotion: Some(piece),
                })
            }
            _ => Transition::Ignored,
        }
    }

    /// Dismiss the promotion dialog without moving.
    pub fn cancel_promotion(&mut self) -> Transition {
        match self.state {
            PipelineState::AwaitingPromotionChoice { .. } => {
                self.state = PipelineState::AwaitingOrigin;
                Transition::Deselected
            }
            _ => Transition::Ignored,
        }
    }

    /// The server answered; back to idle.
    pub fn finish(&mut self) {
        self.state = PipelineState::AwaitingOrigin;
    }

    /// Drop any draft. A move in flight is kept; only its answer may clear it.
    pub fn discard_draft(&mut self) {
        if !self.is_submitting() {
            self.state = PipelineState::AwaitingOrigin;
        }
    }

    fn select_origin(&mut self, adapter: &LegalityAdapter, square: Square) -> Transition {
        let destinations = adapter.legal_destinations(square);
        if destinations.is_empty() {
            return Transition::NoMoves;
        }
        self.state = PipelineState::AwaitingDestination {
            origin: square,
            destinations: destinations.clone(),
        };
        Transition::Selected { origin: square, destinations }
    }

    fn complete(&mut self, adapter: &LegalityAdapter, origin: Square, destination: Square) -> Transition {
        if adapter.requires_promotion_choice(origin, destination) {
            self.state = PipelineState::AwaitingPromotionChoice { origin, destination };
            return Transition::PromotionRequired { origin, destination };
        }
        self.begin_submit(MoveCommand {
            from: origin,
            to: destination,
            promotion: None,
        })
    }

    fn begin_submit(&mut self, command: MoveCommand) -> Transition {
        self.state = PipelineState::Submitting { command };
        Transition::Submit(command)
    }
}
