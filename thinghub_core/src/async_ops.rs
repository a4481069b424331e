//! AsyncOpTracker: indexes pending plugin operations by a correlation
//! id and resolves them either from a plugin callback or a timeout,
//! whichever comes first (§4.4).

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;
use uuid::Uuid;

use crate::arena::UuidArena;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Discovery,
    Setup,
    Pairing,
    Action,
    Browse,
}

impl OpKind {
    /// Default timeout per §4.4: 30s for discovery/action/browse, 10
    /// minutes for pairing/setup.
    pub fn default_timeout(self) -> Duration {
        match self {
            OpKind::Discovery | OpKind::Action | OpKind::Browse => Duration::from_secs(30),
            OpKind::Pairing | OpKind::Setup => Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpOutcome<T> {
    Completed(T),
    Timeout,
}

struct PendingOp<T> {
    kind: OpKind,
    completion: oneshot::Sender<T>,
}

/// Tracks in-flight operations keyed by a correlation id. `complete`
/// is a no-op (returns `false`) if the id already timed out or was
/// already completed, matching the "later callbacks with the same id
/// are ignored" rule.
pub struct AsyncOpTracker<T> {
    pending: UuidArena<PendingOp<T>>,
}

impl<T: Send + 'static> AsyncOpTracker<T> {
    pub fn new() -> Self {
        Self {
            pending: UuidArena::new(),
        }
    }

    /// Registers a new pending op and returns a future that resolves to
    /// `OpOutcome::Completed` if `complete` is called before the
    /// kind's default timeout elapses, or `OpOutcome::Timeout`
    /// otherwise. After a timeout fires, the id is dropped from the
    /// tracker so a late callback is a harmless no-op.
    pub async fn begin(&self, id: Uuid, kind: OpKind) -> OpOutcome<T> {
        self.begin_with_timeout(id, kind, kind.default_timeout()).await
    }

    pub async fn begin_with_timeout(&self, id: Uuid, kind: OpKind, duration: Duration) -> OpOutcome<T> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, PendingOp { kind, completion: tx });

        match timeout(duration, rx).await {
            Ok(Ok(value)) => OpOutcome::Completed(value),
            Ok(Err(_)) | Err(_) => {
                self.pending.remove(&id);
                OpOutcome::Timeout
            }
        }
    }

    /// Resolves a pending op. Returns `true` if an op with this id was
    /// still pending, `false` if it had already timed out or doesn't
    /// exist (a late or unknown callback, ignored per §4.4).
    pub fn complete(&self, id: Uuid, value: T) -> bool {
        if let Some(op) = self.pending.remove(&id) {
            op.completion.send(value).is_ok()
        } else {
            false
        }
    }

    pub fn kind_of(&self, id: Uuid) -> Option<OpKind> {
        self.pending.with(&id, |op| op.kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl<T: Send + 'static> Default for AsyncOpTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}
