//! Repository handle that keeps the durable mirror in step.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::ChatResult;
use crate::persistence::PersistentStore;
use crate::repository::SessionRepository;

/// Shared session repository whose successful mutations are mirrored to the
/// persistent store.
///
/// The lock is only held for the mutation and the mirror write, never across
/// an await point. The mirror write is synchronous: it finishes (or fails)
/// before the mutating call returns, blocking the calling thread for the
/// duration of the file write. A failed write is logged and the in-memory
/// mutation stands.
#[derive(Clone)]
pub struct SyncedSessions {
    repo: Arc<Mutex<SessionRepository>>,
    store: PersistentStore,
}

impl SyncedSessions {
    pub fn new(repo: SessionRepository, store: PersistentStore) -> Self {
        Self {
            repo: Arc::new(Mutex::new(repo)),
            store,
        }
    }

    /// Rebuild the repository from whatever the store holds
    pub fn load(store: PersistentStore) -> Self {
        let repo = SessionRepository::from_sessions(store.load());
        Self::new(repo, store)
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// Run a read-only query against the repository
    pub fn read<R>(&self, f: impl FnOnce(&SessionRepository) -> R) -> R {
        let repo = self.repo.lock();
        f(&*repo)
    }

    /// Run a mutation; on success the whole collection is written back.
    /// Errors (e.g. a stale id) leave both the repository and the mirror
    /// untouched.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut SessionRepository) -> ChatResult<R>) -> ChatResult<R> {
        let mut repo = self.repo.lock();
        let result = f(&mut *repo)?;
        self.persist(&repo);
        Ok(result)
    }

    /// Run a mutation that cannot fail and write the collection back
    pub fn apply<R>(&self, f: impl FnOnce(&mut SessionRepository) -> R) -> R {
        let mut repo = self.repo.lock();
        let result = f(&mut *repo);
        self.persist(&repo);
        result
    }

    fn persist(&self, repo: &SessionRepository) {
        if let Err(e) = self.store.save(repo.sessions()) {
            warn!("Failed to persist sessions: {}", e);
        }
    }

    /// Change only the selection, which is not part of the mirror
    pub fn select(&self, session_id: &str) -> ChatResult<()> {
        self.repo.lock().select_session(session_id)
    }
}
