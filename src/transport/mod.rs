//! The server wire contract as traits, so the core can run against fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    DrawOfferAck, GameEnvelope, GameOverNotice, GameSummary, MoveRequest, MoveResponse,
    PlayerRating, QueueStatus, SyncResponse, TimeControl,
};

pub mod http;

pub use http::HttpTransport;

/// Supplies the bearer token for each request. Token storage belongs to the shell.
pub trait CredentialProvider {
    fn bearer_token(&self) -> Option<String>;
}

/// A fixed token, or none for anonymous access.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Option<String>);

impl StaticCredentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }
}

impl CredentialProvider for StaticCredentials {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

#[async_trait(?Send)]
pub trait GameApi {
    /// Full game and history; used once when a game is opened.
    async fn get_game(&self, game_id: u64) -> Result<GameEnvelope>;
    /// Everything recorded strictly after ply `since` (`-1` for all).
    async fn sync_game(&self, game_id: u64, since: i64) -> Result<SyncResponse>;
    async fn make_move(&self, game_id: u64, request: MoveRequest) -> Result<MoveResponse>;
    async fn resign(&self, game_id: u64) -> Result<GameOverNotice>;
    async fn offer_draw(&self, game_id: u64) -> Result<DrawOfferAck>;
    async fn accept_draw(&self, game_id: u64) -> Result<GameOverNotice>;
    /// The caller's unfinished game, if any.
    async fn active_game(&self) -> Result<Option<u64>>;
}

#[async_trait(?Send)]
pub trait QueueApi {
    /// Join, or re-join to poll; both answer with the current queue status.
    async fn join_queue(&self, mode: &str) -> Result<QueueStatus>;
    async fn leave_queue(&self, mode: &str) -> Result<()>;
    async fn time_controls(&self) -> Result<Vec<TimeControl>>;
}

/// Player history and standings, for the shell's profile and home views.
#[async_trait(?Send)]
pub trait PlayerApi {
    /// The caller's recent games, optionally limited to one time class.
    async fn recent_games(&self, time_class: Option<&str>) -> Result<Vec<GameSummary>>;
    /// The caller's rating in every time class played.
    async fn ratings(&self) -> Result<Vec<PlayerRating>>;
    async fn leaderboard(&self, time_class: &str, limit: u32) -> Result<Vec<PlayerRating>>;
}
