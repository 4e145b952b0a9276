pub mod game_handlers;
pub mod handler;

pub use game_handlers::{GestureOutcome, SubmitOutcome};
pub use handler::{GameSession, PullOutcome};
