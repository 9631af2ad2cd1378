//! Last-request-wins coordination for async loads and syncs.
//!
//! Each target key has at most one live request. Starting a new request for
//! a key cancels the previous one; a request that finishes after being
//! replaced reports [`CoreError::Superseded`] instead of its result, so a
//! stale lazy load can never overwrite newer state.

use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CoreError, Result};

#[derive(Debug)]
struct Inflight {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug)]
pub struct RequestGate<K> {
    inflight: Mutex<HashMap<K, Inflight>>,
    next_generation: AtomicU64,
}

impl<K> Default for RequestGate<K> {
    fn default() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(1),
        }
    }
}

/// Handle for one admitted request.
#[derive(Debug, Clone)]
pub struct RequestTicket<K> {
    key: K,
    generation: u64,
    token: CancellationToken,
}

impl<K> RequestTicket<K> {
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl<K> RequestGate<K>
where
    K: Eq + Hash + Clone + Display + Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request for `key`, cancelling whatever was in flight for it.
    /// `parent` lets a caller-owned token cancel the request as well.
    pub async fn begin(
        &self,
        key: K,
        parent: Option<&CancellationToken>,
    ) -> RequestTicket<K> {
        let generation = self
            .next_generation
            .fetch_add(1, Ordering::Relaxed);
        let token = match parent {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };

        let mut inflight = self.inflight.lock().await;
        if let Some(previous) = inflight.insert(
            key.clone(),
            Inflight {
                generation,
                token: token.clone(),
            },
        ) {
            debug!(target_key = %key, "superseding in-flight request");
            previous.token.cancel();
        }

        RequestTicket {
            key,
            generation,
            token,
        }
    }

    /// Release the ticket. Returns `true` when it was still the latest
    /// request for its key.
    pub async fn finish(&self, ticket: &RequestTicket<K>) -> bool {
        let mut inflight = self.inflight.lock().await;
        match inflight.get(&ticket.key) {
            Some(current) if current.generation == ticket.generation => {
                inflight.remove(&ticket.key);
                true
            }
            _ => false,
        }
    }

    /// Run `work` as the latest request for `key`.
    pub async fn run<T, F>(
        &self,
        key: K,
        parent: Option<&CancellationToken>,
        work: F,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let ticket = self.begin(key, parent).await;
        let outcome = tokio::select! {
            biased;
            _ = ticket.token.cancelled() => {
                Err(self.cancellation_error(&ticket, parent))
            }
            result = work => result,
        };
        let latest = self.finish(&ticket).await;

        match outcome {
            Ok(_) if !latest => Err(CoreError::Superseded {
                target: ticket.key.to_string(),
            }),
            other => other,
        }
    }

    /// Whether a request for `key` is currently in flight.
    pub async fn is_busy(&self, key: &K) -> bool {
        self.inflight.lock().await.contains_key(key)
    }

    fn cancellation_error(
        &self,
        ticket: &RequestTicket<K>,
        parent: Option<&CancellationToken>,
    ) -> CoreError {
        let target = ticket.key.to_string();
        if parent.is_some_and(CancellationToken::is_cancelled) {
            CoreError::Cancelled { target }
        } else {
            CoreError::Superseded { target }
        }
    }
}
