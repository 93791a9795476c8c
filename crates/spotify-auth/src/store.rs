//! Process-wide access token store
//!
//! Owns the single mutable piece of state in the service: the current access
//! token. A tokio Mutex makes the store the only writer, so refreshes are
//! serialized and every request observes a consistent token.
//!
//! Refresh coalescing works through a generation counter. Callers record the
//! generation alongside the token they read; when a refresh is requested they
//! pass that generation back. Requests that queued on the mutex behind an
//! in-flight refresh find the generation already advanced and reuse the fresh
//! token instead of issuing a duplicate exchange.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::secret::SecretString;
use crate::token::refresh_access_token;

/// A snapshot of the live access token.
///
/// `generation` identifies which refresh produced the token. It is the
/// caller's ticket for coalescing: hand it back to [`TokenStore::refresh`]
/// to prove which token was observed failing.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub generation: u64,
}

struct AccessState {
    access_token: String,
    generation: u64,
}

/// Single-writer store for the access token plus the immutable credentials
/// needed to mint a new one.
pub struct TokenStore {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
    state: Mutex<AccessState>,
}

impl TokenStore {
    /// Build a store from startup credentials.
    ///
    /// `initial_access_token` may be empty; the first probe will then 401
    /// and the guard performs the initial refresh.
    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
        initial_access_token: String,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            refresh_token,
            state: Mutex::new(AccessState {
                access_token: initial_access_token,
                generation: 0,
            }),
        }
    }

    /// Snapshot the live access token and its generation.
    pub async fn current(&self) -> AccessToken {
        let state = self.state.lock().await;
        AccessToken {
            token: state.access_token.clone(),
            generation: state.generation,
        }
    }

    /// Refresh the access token, coalescing concurrent attempts.
    ///
    /// `observed_generation` is the generation of the token the caller saw
    /// fail. If the store's generation has already moved past it, another
    /// request refreshed while this one waited for the lock; the newer token
    /// is returned without touching the token endpoint.
    ///
    /// On exchange failure the previous token and generation are left in
    /// place and the error is returned; callers decide whether to surface it
    /// (the access guard logs and proceeds with the stale token).
    pub async fn refresh(&self, observed_generation: u64) -> Result<AccessToken> {
        let mut state = self.state.lock().await;

        if state.generation != observed_generation {
            debug!(
                generation = state.generation,
                observed = observed_generation,
                "refresh already performed by a concurrent request, reusing token"
            );
            return Ok(AccessToken {
                token: state.access_token.clone(),
                generation: state.generation,
            });
        }

        let response = refresh_access_token(
            &self.client,
            &self.token_url,
            self.refresh_token.expose(),
            &self.client_id,
            self.client_secret.expose(),
        )
        .await?;

        state.access_token = response.access_token;
        state.generation += 1;
        info!(generation = state.generation, "access token refreshed");

        Ok(AccessToken {
            token: state.access_token.clone(),
            generation: state.generation,
        })
    }
}
