//! Registry of live sessions with per-session locking.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::config::SessionConfig;
use crate::state::SessionState;

/// Handle to one session's state.
pub type SessionHandle = Arc<Mutex<SessionState>>;

/// Registry of live sessions.
///
/// The outer map is guarded by an `RwLock` held only long enough to look
/// an entry up; each session carries its own `Mutex`, so chunks for one
/// meeting serialize on that session alone and unrelated meetings never
/// wait on each other.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    config: SessionConfig,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The session configuration new sessions are created with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get a session's handle, creating fresh state on first sight of
    /// the id.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        project_id: &str,
        organization_id: &str,
    ) -> SessionHandle {
        {
            let sessions = self.sessions.read().await;
            if let Some(handle) = sessions.get(session_id) {
                return Arc::clone(handle);
            }
        }

        let mut sessions = self.sessions.write().await;
        // Another task may have created it between the two lock scopes.
        if let Some(handle) = sessions.get(session_id) {
            return Arc::clone(handle);
        }

        debug!(session_id = %session_id, "Creating session state");
        let state = SessionState::new(session_id, project_id, organization_id, &self.config);
        let handle = Arc::new(Mutex::new(state));
        sessions.insert(session_id.to_string(), Arc::clone(&handle));
        handle
    }

    /// Get a session's handle without creating it.
    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).map(Arc::clone)
    }

    /// Remove a session, returning its final state.
    ///
    /// The entry is taken out of the map first, then its lock is acquired
    /// before the state is extracted. An in-flight chunk holding the lock
    /// finishes before removal completes, and a later `get_or_create`
    /// with the same id starts from scratch.
    pub async fn remove(&self, session_id: &str) -> Option<SessionState> {
        let handle = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id)?
        };

        let state = handle.lock().await.clone();
        debug!(
            session_id = %session_id,
            insights = state.insights.len(),
            "Session removed from registry"
        );
        Some(state)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the registry has no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Whether a session is live.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }
}
