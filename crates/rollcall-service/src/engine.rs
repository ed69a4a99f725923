use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use rollcall_core::{LinearMatcher, MatchError, MatchOutcome, Matcher, Profile, Query};
use rollcall_store::{NewRecord, RosterStore, StoreError};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("match error: {0}")]
    Match(#[from] MatchError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// Messages sent from async callers to the engine thread.
enum EngineRequest {
    Register {
        new: NewRecord,
        reply: oneshot::Sender<Result<Profile, EngineError>>,
    },
    Identify {
        query: Query,
        reply: oneshot::Sender<Result<MatchOutcome, EngineError>>,
    },
    List {
        reply: oneshot::Sender<Result<Vec<Profile>, EngineError>>,
    },
    Profile {
        id: String,
        reply: oneshot::Sender<Result<Option<Profile>, EngineError>>,
    },
    Remove {
        id: String,
        reply: oneshot::Sender<Result<bool, EngineError>>,
    },
    Count {
        reply: oneshot::Sender<Result<u64, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, EngineError>>) -> EngineRequest,
    ) -> Result<T, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Register a new identity; returns the redacted profile with the
    /// minted id.
    pub async fn register(&self, new: NewRecord) -> Result<Profile, EngineError> {
        self.request(|reply| EngineRequest::Register { new, reply })
            .await
    }

    /// Identify a query signature against the current roster.
    pub async fn identify(&self, query: Query) -> Result<MatchOutcome, EngineError> {
        self.request(|reply| EngineRequest::Identify { query, reply })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Profile>, EngineError> {
        self.request(|reply| EngineRequest::List { reply }).await
    }

    pub async fn profile(&self, id: String) -> Result<Option<Profile>, EngineError> {
        self.request(|reply| EngineRequest::Profile { id, reply })
            .await
    }

    pub async fn remove(&self, id: String) -> Result<bool, EngineError> {
        self.request(|reply| EngineRequest::Remove { id, reply })
            .await
    }

    pub async fn count(&self) -> Result<u64, EngineError> {
        self.request(|reply| EngineRequest::Count { reply }).await
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The thread takes ownership of the store and matcher and serves requests
/// until every handle is dropped. Store access never happens anywhere
/// else, which is what gives each identification a stable snapshot.
pub fn spawn_engine(store: RosterStore, match_threshold: f32) -> EngineHandle {
    let matcher = LinearMatcher::with_threshold(match_threshold);
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(8);

    std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            tracing::info!(match_threshold, "engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Register { new, reply } => {
                        let result = run_register(&store, new);
                        let _ = reply.send(result);
                    }
                    EngineRequest::Identify { query, reply } => {
                        let result = run_identify(&store, &matcher, &query);
                        let _ = reply.send(result);
                    }
                    EngineRequest::List { reply } => {
                        let _ = reply.send(store.list().map_err(EngineError::from));
                    }
                    EngineRequest::Profile { id, reply } => {
                        let _ = reply.send(store.profile(&id).map_err(EngineError::from));
                    }
                    EngineRequest::Remove { id, reply } => {
                        let _ = reply.send(store.remove(&id).map_err(EngineError::from));
                    }
                    EngineRequest::Count { reply } => {
                        let _ = reply.send(store.count().map_err(EngineError::from));
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}

fn run_register(store: &RosterStore, new: NewRecord) -> Result<Profile, EngineError> {
    let record = store.append(new)?;
    Ok(record.profile())
}

fn run_identify(
    store: &RosterStore,
    matcher: &LinearMatcher,
    query: &Query,
) -> Result<MatchOutcome, EngineError> {
    let snapshot = store.snapshot()?;
    let outcome = matcher.identify(query, &snapshot)?;
    match &outcome {
        MatchOutcome::Match { profile, score } => {
            tracing::info!(id = %profile.id, score, "identified");
        }
        MatchOutcome::NoMatch { reason } => {
            tracing::info!(?reason, candidates = snapshot.len(), "no match");
        }
    }
    Ok(outcome)
}
