use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::rc::Rc;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{
    ActiveGame, DrawOfferAck, GameEnvelope, GameOverNotice, GameSummary, MoveRequest,
    MoveResponse, PlayerRating, QueueStatus, SyncResponse, TimeControl,
};
use crate::transport::{CredentialProvider, GameApi, PlayerApi, QueueApi};

/// JSON-over-HTTP implementation of the wire contract.
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    credentials: Rc<dyn CredentialProvider>,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig, credentials: Rc<dyn CredentialProvider>) -> Result<Self> {
        let base_url = Url::parse(&config.api_base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.api_base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.api_base_url.clone()));
        }
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Append `segments` to the base URL. Each segment is percent-encoded, so
    /// a mode slug containing `/` stays one segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        let request_id = Uuid::new_v4();
        debug!("{} {} [{}]", method, url.path(), request_id);
        let builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header("X-Request-Id", request_id.to_string());
        Ok(match self.credentials.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send_raw(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        // 409 is routine under optimistic locking
        if status.as_u16() != 409 {
            warn!("Request failed with {}: {}", status, body);
        }
        Err(ClientError::from_status(status.as_u16(), body))
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.send_raw(builder).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait(?Send)]
impl GameApi for HttpTransport {
    async fn get_game(&self, game_id: u64) -> Result<GameEnvelope> {
        let id = game_id.to_string();
        self.send(self.request(Method::GET, &["games", &id])?).await
    }

    async fn sync_game(&self, game_id: u64, since: i64) -> Result<SyncResponse> {
        let id = game_id.to_string();
        let request = self.request(Method::GET, &["games", &id, "sync"])?;
        self.send(request.query(&[("since", since)])).await
    }

    async fn make_move(&self, game_id: u64, request: MoveRequest) -> Result<MoveResponse> {
        let id = game_id.to_string();
        let builder = self.request(Method::POST, &["games", &id, "move"])?;
        self.send(builder.json(&request)).await
    }

    async fn resign(&self, game_id: u64) -> Result<GameOverNotice> {
        let id = game_id.to_string();
        self.send(self.request(Method::POST, &["games", &id, "resign"])?)
            .await
    }

    async fn offer_draw(&self, game_id: u64) -> Result<DrawOfferAck> {
        let id = game_id.to_string();
        self.send(self.request(Method::POST, &["games", &id, "draw"])?)
            .await
    }

    async fn accept_draw(&self, game_id: u64) -> Result<GameOverNotice> {
        let id = game_id.to_string();
        self.send(self.request(Method::POST, &["games", &id, "acceptDraw"])?)
            .await
    }

    async fn active_game(&self) -> Result<Option<u64>> {
        let active: ActiveGame = self
            .send(self.request(Method::GET, &["me", "active-game"])?)
            .await?;
        Ok(active.game_id)
    }
}

#[async_trait(?Send)]
impl QueueApi for HttpTransport {
    async fn join_queue(&self, mode: &str) -> Result<QueueStatus> {
        self.send(self.request(Method::POST, &["queue", "join", mode])?)
            .await
    }

    async fn leave_queue(&self, mode: &str) -> Result<()> {
        // The reply body is empty
        self.send_raw(self.request(Method::DELETE, &["queue", "leave", mode])?)
            .await?;
        Ok(())
    }

    async fn time_controls(&self) -> Result<Vec<TimeControl>> {
        self.send(self.request(Method::GET, &["modes"])?).await
    }
}

#[async_trait(?Send)]
impl PlayerApi for HttpTransport {
    async fn recent_games(&self, time_class: Option<&str>) -> Result<Vec<GameSummary>> {
        let mut request = self.request(Method::GET, &["me", "recent-games"])?;
        if let Some(time_class) = time_class {
            request = request.query(&[("time_class", time_class)]);
        }
        self.send(request).await
    }

    async fn ratings(&self) -> Result<Vec<PlayerRating>> {
        self.send(self.request(Method::GET, &["me", "ratings"])?).await
    }

    async fn leaderboard(&self, time_class: &str, limit: u32) -> Result<Vec<PlayerRating>> {
        let request = self
            .request(Method::GET, &["leaderboard"])?
            .query(&[("time_class", time_class)])
            .query(&[("limit", limit)]);
        self.send(request).await
    }
}
