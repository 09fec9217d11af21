//! Login sessions with an inactivity timeout.
//!
//! Every login opens a session keyed by the `sid` claim. Each authenticated
//! request touches it; a session left untouched for longer than the timeout
//! is gone and its tokens stop working even before they expire.

use std::time::Duration;

use moka::future::Cache;

/// Upper bound on concurrently open sessions.
const MAX_SESSIONS: u64 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub user_id: u64,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<String, SessionInfo>,
}

impl SessionStore {
    /// `idle_timeout` of `None` keeps sessions until logout.
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        let builder = Cache::builder().max_capacity(MAX_SESSIONS);
        let sessions = match idle_timeout {
            Some(idle) => builder.time_to_idle(idle).build(),
            None => builder.build(),
        };
        Self { sessions }
    }

    /// Seconds of allowed inactivity, 0 meaning no limit.
    pub fn with_timeout_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    pub async fn open(&self, sid: &str, info: SessionInfo) {
        self.sessions.insert(sid.to_string(), info).await;
    }

    /// Records activity. Returns the session, or `None` when it has expired
    /// or was closed.
    pub async fn touch(&self, sid: &str) -> Option<SessionInfo> {
        self.sessions.get(sid).await
    }

    pub async fn close(&self, sid: &str) {
        self.sessions.invalidate(sid).await;
    }
}
