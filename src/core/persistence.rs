//! Persistence port for CMI snapshots.
//!
//! `LMSCommit` and `LMSFinish` hand the current document to the surrounding
//! application through a [`PersistencePort`]. Calls are spawned on a tokio
//! executor and never awaited by the API call that triggered them; failures
//! are logged and reported to an optional [`PersistenceObserver`].

use crate::core::cmi::CmiDocument;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn on_commit(&self, snapshot: CmiDocument) -> anyhow::Result<()>;
    async fn on_finish(&self, snapshot: CmiDocument) -> anyhow::Result<()>;
}

pub type PersistFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;
type PersistCallback = Box<dyn Fn(CmiDocument) -> PersistFuture + Send + Sync>;

/// Adapts a pair of async closures (`onCommit`, `onFinish`) into a port.
pub struct CallbackPersistence {
    on_commit: PersistCallback,
    on_finish: PersistCallback,
}

impl CallbackPersistence {
    pub fn new<C, CFut, F, FFut>(on_commit: C, on_finish: F) -> Self
    where
        C: Fn(CmiDocument) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = anyhow::Result<()>> + Send + 'static,
        F: Fn(CmiDocument) -> FFut + Send + Sync + 'static,
        FFut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            on_commit: Box::new(move |doc| -> PersistFuture { Box::pin(on_commit(doc)) }),
            on_finish: Box::new(move |doc| -> PersistFuture { Box::pin(on_finish(doc)) }),
        }
    }
}

#[async_trait]
impl PersistencePort for CallbackPersistence {
    async fn on_commit(&self, snapshot: CmiDocument) -> anyhow::Result<()> {
        (self.on_commit)(snapshot).await
    }

    async fn on_finish(&self, snapshot: CmiDocument) -> anyhow::Result<()> {
        (self.on_finish)(snapshot).await
    }
}

/// Port that drops every snapshot. For hosts that only inspect the runtime
/// in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPersistence;

#[async_trait]
impl PersistencePort for DiscardPersistence {
    async fn on_commit(&self, _snapshot: CmiDocument) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_finish(&self, _snapshot: CmiDocument) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistKind {
    Commit,
    Finish,
}

impl fmt::Display for PersistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistKind::Commit => f.write_str("commit"),
            PersistKind::Finish => f.write_str("finish"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The call could not be handed to an executor.
    Dispatch,
    /// The port ran and returned an error.
    Port,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    pub kind: PersistKind,
    pub stage: FailureStage,
    pub message: String,
}

/// Error hook for the host application. It only observes; return values of
/// `LMSCommit`/`LMSFinish` never depend on it.
pub type PersistenceObserver = Arc<dyn Fn(&PersistenceFailure) + Send + Sync>;

/// Spawns port calls and keeps handles of the ones still in flight.
pub struct PersistenceDispatcher {
    port: Arc<dyn PersistencePort>,
    executor: Option<Handle>,
    observer: Option<PersistenceObserver>,
    inflight: Vec<JoinHandle<()>>,
}

impl PersistenceDispatcher {
    pub fn new(port: Arc<dyn PersistencePort>) -> Self {
        Self {
            port,
            executor: None,
            observer: None,
            inflight: Vec::new(),
        }
    }

    pub fn set_executor(&mut self, handle: Handle) {
        self.executor = Some(handle);
    }

    pub fn set_observer(&mut self, observer: PersistenceObserver) {
        self.observer = Some(observer);
    }

    /// Hands `snapshot` to the port without waiting for it. Only a failure to
    /// spawn is returned; port errors surface through logs and the observer.
    pub fn dispatch(
        &mut self,
        kind: PersistKind,
        snapshot: CmiDocument,
    ) -> Result<(), PersistenceFailure> {
        self.inflight.retain(|task| !task.is_finished());

        let Some(handle) = self.executor.clone().or_else(|| Handle::try_current().ok()) else {
            let failure = PersistenceFailure {
                kind,
                stage: FailureStage::Dispatch,
                message: "no tokio executor available".to_string(),
            };
            warn!(op = %kind, "persistence dispatch failed: {}", failure.message);
            notify(self.observer.as_ref(), &failure);
            return Err(failure);
        };

        let port = Arc::clone(&self.port);
        let observer = self.observer.clone();
        let task = handle.spawn(async move {
            let result = match kind {
                PersistKind::Commit => port.on_commit(snapshot).await,
                PersistKind::Finish => port.on_finish(snapshot).await,
            };
            match result {
                Ok(()) => debug!(op = %kind, "snapshot persisted"),
                Err(e) => {
                    let failure = PersistenceFailure {
                        kind,
                        stage: FailureStage::Port,
                        message: format!("{:#}", e),
                    };
                    warn!(op = %kind, "snapshot persistence failed: {}", failure.message);
                    notify(observer.as_ref(), &failure);
                }
            }
        });
        self.inflight.push(task);
        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.inflight.iter().filter(|task| !task.is_finished()).count()
    }

    /// Waits for every dispatched call. Meant for host shutdown, never for
    /// the API path.
    pub async fn drain(&mut self) {
        for task in std::mem::take(&mut self.inflight) {
            if let Err(e) = task.await {
                warn!("persistence task aborted: {}", e);
            }
        }
    }
}

fn notify(observer: Option<&PersistenceObserver>, failure: &PersistenceFailure) {
    if let Some(observer) = observer {
        observer(failure);
    }
}
