//! Client-side session core for server-authoritative online chess.
//!
//! The server decides legality, results and time. This crate keeps one
//! player's view consistent with it: moves are drafted locally against the
//! last known position, submitted with the server's lock version, and
//! reconciled by polling for deltas. A live clock is rebuilt between polls
//! from the last snapshot, and matchmaking is a polled queue.
//!
//! Everything runs on a single-threaded actix runtime. A typical shell:
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env();
//! init_logging(&config.log_filter);
//! let transport = Rc::new(HttpTransport::new(&config, Rc::new(StaticCredentials::bearer(token)))?);
//! let scheduler = Scheduler::new();
//!
//! let session = GameSession::load(transport.clone(), game_id, my_user_id).await?;
//! session.start_polling(&scheduler, config.sync_interval());
//! session.select_square(Square::E2).await;
//! session.select_square(Square::E4).await;
//! // ...
//! session.teardown(&scheduler);
//! ```

pub mod config;
pub mod error;
pub mod game;
pub mod models;
pub mod queue;
pub mod scheduler;
pub mod session;
pub mod transport;

pub use config::{init_logging, ClientConfig};
pub use error::{ClientError, Result};
pub use game::utils::{format_clock, format_queue_time};
pub use game::{ClockReading, LegalityAdapter, PipelineState, Transition};
pub use models::{
    GameResult, GameSnapshot, GameStatus, MoveCommand, MoveRecord, PromotionPiece, Side,
    Termination,
};
pub use queue::{JoinOutcome, Membership, QueueClient, QueueEvent};
pub use scheduler::{Scheduler, TaskControl};
pub use session::{GameSession, GestureOutcome, PullOutcome, SubmitOutcome};
pub use transport::{
    CredentialProvider, GameApi, HttpTransport, PlayerApi, QueueApi, StaticCredentials,
};
