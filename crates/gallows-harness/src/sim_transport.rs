//! Simulated transport over a shared [`SimServer`].
//!
//! `SimTransport` implements the client's [`Transport`] seam by calling the
//! in-process server directly. Failures can be injected per endpoint, either
//! before the server sees the request or after it applied it (a lost
//! response), which is the case that makes blind guess retries unsafe.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gallows_client::{Endpoint, Subscription, Transport};
use gallows_proto::{GameId, SessionToken};
use thiserror::Error;

use crate::sim_server::{SharedSimServer, SimError, SimServer, lock};

/// Transport failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimTransportError {
    /// Server answered with an error.
    #[error(transparent)]
    Server(#[from] SimError),

    /// Request never reached the server.
    #[error("{0:?}: connection refused")]
    Refused(Endpoint),

    /// Server applied the request but the response was lost.
    #[error("{0:?}: response lost")]
    ResponseLost(Endpoint),

    /// Push channel could not be opened.
    #[error("push channel for game {0} refused")]
    SubscribeRefused(GameId),
}

/// Injected failure for the next call to an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail before the server sees the request.
    Refuse,
    /// Let the server apply the request, then fail.
    LoseResponse,
}

/// One request seen by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Endpoint called.
    pub endpoint: Endpoint,
    /// Token sent, if any.
    pub token: Option<String>,
}

#[derive(Debug, Default)]
struct TransportState {
    faults: Vec<(Endpoint, Fault)>,
    refuse_subscribe: bool,
    calls: Vec<Call>,
    subscriptions: Vec<GameId>,
}

/// Transport backed by an in-process server.
///
/// Clones share the server and the fault/recording state.
#[derive(Clone)]
pub struct SimTransport {
    server: SharedSimServer,
    state: Arc<Mutex<TransportState>>,
}

impl SimTransport {
    /// Transport over `server`.
    pub fn new(server: SharedSimServer) -> Self {
        Self { server, state: Arc::default() }
    }

    /// The shared server.
    pub fn server(&self) -> &SharedSimServer {
        &self.server
    }

    /// Lock the server for inspection or direct driving.
    pub fn lock_server(&self) -> MutexGuard<'_, SimServer> {
        lock(&self.server)
    }

    /// Fail the next call to `endpoint` with `fault`.
    pub fn fail_next(&self, endpoint: Endpoint, fault: Fault) {
        self.state().faults.push((endpoint, fault));
    }

    /// Refuse push subscriptions until turned off again.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.state().refuse_subscribe = refuse;
    }

    /// Every request seen so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Number of requests seen for `endpoint`.
    pub fn count(&self, endpoint: Endpoint) -> usize {
        self.state().calls.iter().filter(|c| c.endpoint == endpoint).count()
    }

    /// Games subscribed to, in order.
    pub fn subscriptions(&self) -> Vec<GameId> {
        self.state().subscriptions.clone()
    }

    fn state(&self) -> MutexGuard<'_, TransportState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and run `apply` against the server, honoring faults.
    fn call(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
        apply: impl FnOnce(&mut SimServer) -> Result<String, SimError>,
    ) -> Result<String, SimTransportError> {
        let fault = {
            let mut state = self.state();
            state.calls.push(Call { endpoint, token: token.map(|t| t.as_str().to_string()) });
            let index = state.faults.iter().position(|(e, _)| *e == endpoint);
            index.map(|i| state.faults.remove(i).1)
        };

        if fault == Some(Fault::Refuse) {
            tracing::debug!(?endpoint, "injected refusal");
            return Err(SimTransportError::Refused(endpoint));
        }

        let body = apply(&mut lock(&self.server))?;

        if fault == Some(Fault::LoseResponse) {
            tracing::debug!(?endpoint, "injected lost response");
            return Err(SimTransportError::ResponseLost(endpoint));
        }
        Ok(body)
    }
}

impl Transport for SimTransport {
    type Error = SimTransportError;

    async fn query(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
    ) -> Result<String, SimTransportError> {
        self.call(endpoint, token, |server| server.query(endpoint, token))
    }

    async fn submit(
        &self,
        endpoint: Endpoint,
        token: Option<&SessionToken>,
        body: serde_json::Value,
    ) -> Result<String, SimTransportError> {
        self.call(endpoint, token, |server| server.submit(endpoint, token, &body))
    }

    async fn subscribe(&self, game_id: GameId) -> Result<Subscription, SimTransportError> {
        {
            let mut state = self.state();
            if state.refuse_subscribe {
                return Err(SimTransportError::SubscribeRefused(game_id));
            }
            state.subscriptions.push(game_id);
        }
        Ok(lock(&self.server).subscribe(game_id))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use gallows_client::GameApi;
    use gallows_proto::{GuessOutcome, RegistrationReply, SessionStatus};

    use super::*;
    use crate::sim_server::{SimConfig, create_shared_server};

    fn transport() -> SimTransport {
        SimTransport::new(create_shared_server(SimConfig::default().word("RUST")))
    }

    async fn register(api: &GameApi<SimTransport>, name: &str) -> SessionToken {
        match api.register(name).await.unwrap() {
            RegistrationReply::Accepted(registration) => registration.token,
            RegistrationReply::Rejected(rejection) => panic!("rejected: {rejection:?}"),
        }
    }

    #[tokio::test]
    async fn typed_api_reads_server_bodies() {
        let api = GameApi::new(transport());
        let first = register(&api, "ada").await;
        let _ = register(&api, "bob").await;

        assert_eq!(api.status(&first).await.unwrap(), SessionStatus::InProgress);
        assert_eq!(api.guess(&first, 'u').await.unwrap(), GuessOutcome::Correct);
        assert_eq!(api.teammate(&first).await.unwrap(), "bob");

        let snapshot = api.snapshot(&first, gallows_proto::TurnPosition::First).await.unwrap();
        assert_eq!(snapshot.word_mask.to_string(), "_ U _ _");
        assert_eq!(snapshot.turn_owner, Some(gallows_proto::TurnPosition::Second));
    }

    #[tokio::test]
    async fn lost_response_still_applies_the_guess() {
        let transport = transport();
        let api = GameApi::new(transport.clone());
        let first = register(&api, "ada").await;
        let _ = register(&api, "bob").await;

        transport.fail_next(Endpoint::Guess, Fault::LoseResponse);
        assert!(api.guess(&first, 'r').await.is_err());

        let letters = transport.lock_server().snapshot(1).unwrap().guessed_letters;
        assert!(letters.contains(&'R'));
        assert_eq!(transport.count(Endpoint::Guess), 1);
    }

    #[tokio::test]
    async fn refusal_never_reaches_the_server() {
        let transport = transport();
        let api = GameApi::new(transport.clone());

        transport.fail_next(Endpoint::Register, Fault::Refuse);
        assert!(api.register("ada").await.is_err());
        assert_eq!(transport.lock_server().game_count(), 0);

        let _ = register(&api, "ada").await;
        assert_eq!(transport.lock_server().game_count(), 1);
    }

    #[tokio::test]
    async fn refused_subscription_is_an_error() {
        let transport = transport();
        transport.refuse_subscriptions(true);
        let mut api = GameApi::new(transport.clone());

        assert!(api.subscribe(1).await.is_err());
        assert!(!api.is_subscribed());
        assert!(transport.subscriptions().is_empty());
    }
}
