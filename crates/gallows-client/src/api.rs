//! Typed API over a [`Transport`].
//!
//! Turns the text bodies the server answers with into protocol types, composes
//! the snapshot out of its four field queries, and owns the single push
//! subscription of a session.

use gallows_proto::{
    GameId, GameSnapshot, GuessOutcome, ProtocolError, RegisterResponse, RegistrationReply,
    SessionStatus, SessionToken, TurnPosition, parse_letters,
};
use serde_json::json;

use crate::{
    error::ApiError,
    transport::{ChannelItem, Endpoint, Subscription, Transport},
};

/// Result alias for API calls over transport `T`.
pub type ApiResult<R, T> = Result<R, ApiError<<T as Transport>::Error>>;

/// Typed game API.
pub struct GameApi<T: Transport> {
    transport: T,
    subscription: Option<Subscription>,
}

impl<T: Transport> GameApi<T> {
    /// Wrap a transport.
    pub fn new(transport: T) -> Self {
        Self { transport, subscription: None }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register a display name.
    pub async fn register(&self, username: &str) -> ApiResult<RegistrationReply, T> {
        let body = json!({ "username": username });
        let text = self
            .transport
            .submit(Endpoint::Register, None, body)
            .await
            .map_err(ApiError::Transport)?;
        let response: RegisterResponse = serde_json::from_str(&text).map_err(|e| {
            ProtocolError::Malformed { field: "registration response", value: e.to_string() }
        })?;
        Ok(RegistrationReply::try_from(response)?)
    }

    /// Server-side status of `token`.
    pub async fn status(&self, token: &SessionToken) -> ApiResult<SessionStatus, T> {
        let text = self.query(Endpoint::Status, token).await?;
        Ok(text.parse()?)
    }

    /// Authoritative snapshot, read through four concurrent queries.
    ///
    /// Turn ownership is answered relative to the token, so the caller's own
    /// position is needed to turn it into an absolute owner.
    pub async fn snapshot(
        &self,
        token: &SessionToken,
        own: TurnPosition,
    ) -> ApiResult<GameSnapshot, T> {
        let (mask, lives, letters, turn) = futures::try_join!(
            self.query(Endpoint::WordMask, token),
            self.query(Endpoint::Lives, token),
            self.query(Endpoint::GuessedLetters, token),
            self.query(Endpoint::IsPlayersTurn, token),
        )?;

        Ok(GameSnapshot {
            word_mask: mask.parse()?,
            lives_remaining: GameSnapshot::parse_lives(&lives)?,
            guessed_letters: parse_letters(&letters)?,
            turn_owner: Some(GameSnapshot::parse_turn(&turn, own)?),
        })
    }

    /// The secret word.
    pub async fn revealed_word(&self, token: &SessionToken) -> ApiResult<String, T> {
        let text = self.query(Endpoint::Word, token).await?;
        Ok(unquote(&text).to_string())
    }

    /// The opponent's display name.
    pub async fn teammate(&self, token: &SessionToken) -> ApiResult<String, T> {
        let text = self.query(Endpoint::Teammate, token).await?;
        Ok(unquote(&text).to_string())
    }

    /// Submit a guess. Never retried.
    pub async fn guess(&self, token: &SessionToken, letter: char) -> ApiResult<GuessOutcome, T> {
        let text = self
            .transport
            .submit(Endpoint::Guess, Some(token), json!({ "character": letter }))
            .await
            .map_err(ApiError::Transport)?;
        let value = serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::Value::String(text.clone()));
        Ok(GuessOutcome::from_json(&value)?)
    }

    /// Delete the game for both players.
    pub async fn delete_game(&self, token: &SessionToken) -> ApiResult<(), T> {
        self.transport
            .submit(Endpoint::DeleteGame, Some(token), json!({}))
            .await
            .map_err(ApiError::Transport)?;
        Ok(())
    }

    /// Open the push channel, closing any previous one first.
    pub async fn subscribe(&mut self, game_id: GameId) -> ApiResult<(), T> {
        self.close_channel();
        let subscription = self.transport.subscribe(game_id).await.map_err(ApiError::Transport)?;
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Close the push channel, if open.
    pub fn close_channel(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    /// A push channel is open.
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Next item from the push channel.
    ///
    /// Pends forever without a channel, so it can sit in a `select!` next to
    /// user input. Cancel-safe. After a [`ChannelItem::Lost`] the channel is
    /// gone.
    pub async fn next_push(&mut self) -> ChannelItem {
        let Some(subscription) = self.subscription.as_mut() else {
            return std::future::pending().await;
        };

        match subscription.events.recv().await {
            Some(ChannelItem::Event(event)) => ChannelItem::Event(event),
            Some(ChannelItem::Lost(reason)) => {
                self.subscription = None;
                ChannelItem::Lost(reason)
            },
            None => {
                self.subscription = None;
                ChannelItem::Lost("push channel closed".to_string())
            },
        }
    }

    async fn query(&self, endpoint: Endpoint, token: &SessionToken) -> ApiResult<String, T> {
        self.transport.query(endpoint, Some(token)).await.map_err(ApiError::Transport)
    }
}

fn unquote(text: &str) -> &str {
    text.trim().trim_matches('"')
}
