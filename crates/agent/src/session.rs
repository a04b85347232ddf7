//! Live dialogue sessions
//!
//! Each kiosk conversation is a [`SessionHandle`] holding its
//! [`DialogueSession`] behind an async mutex. A turn holds that lock from
//! classification to commit, including the fallback call, so turns of one
//! session are strictly serialized while different sessions only meet at
//! the map lookup.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, MutexGuard};

use kiosk_agent_config::SessionConfig;
use kiosk_agent_core::{DialogueSession, Error, Result};

/// One live conversation
pub struct SessionHandle {
    pub id: String,
    pub created_at: Instant,
    last_activity: RwLock<Instant>,
    session: Mutex<DialogueSession>,
}

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            session: Mutex::new(DialogueSession::new(id.clone())),
            id,
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Exclusive access to the dialogue record for one turn
    pub async fn lock(&self) -> MutexGuard<'_, DialogueSession> {
        self.session.lock().await
    }

    /// Mark the session as active now
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn idle_time(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    /// Idle for longer than `timeout`
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.idle_time() > timeout
    }
}

/// Registry of live sessions keyed by id
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a new session manager with default timeout and sweep interval
    pub fn new(max_sessions: usize) -> Self {
        let defaults = SessionConfig::default();
        Self::with_config(
            max_sessions,
            Duration::from_secs(defaults.timeout_secs),
            Duration::from_secs(defaults.sweep_interval_secs),
        )
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    pub fn from_settings(config: &SessionConfig) -> Self {
        Self::with_config(
            config.max_sessions,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.sweep_interval_secs),
        )
    }

    /// Start a background task that periodically removes expired sessions.
    ///
    /// Sending `true` on the returned channel stops the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            metrics::counter!("kiosk_agent_sessions_expired_total")
                                .increment(removed as u64);
                            tracing::info!(
                                removed,
                                remaining = manager.count(),
                                "Swept idle sessions"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session sweep stopped");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a session with a fresh id
    pub fn create(&self) -> Result<Arc<SessionHandle>> {
        self.insert_new(uuid::Uuid::new_v4().to_string())
    }

    /// Existing session for `id`, or a new one under that id (or a fresh id)
    pub fn get_or_create(&self, id: Option<&str>) -> Result<Arc<SessionHandle>> {
        match id {
            Some(id) => match self.get(id) {
                Some(session) => Ok(session),
                None => self.insert_new(id.to_string()),
            },
            None => self.create(),
        }
    }

    fn insert_new(&self, id: String) -> Result<Arc<SessionHandle>> {
        let mut sessions = self.sessions.write();
        if let Some(existing) = sessions.get(&id) {
            return Ok(Arc::clone(existing));
        }

        if sessions.len() >= self.max_sessions {
            self.sweep_locked(&mut sessions);

            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Session limit reached");
                return Err(Error::SessionLimit(self.max_sessions));
            }
        }

        let session = Arc::new(SessionHandle::new(&id));
        sessions.insert(id.clone(), Arc::clone(&session));
        tracing::info!(session_id = %id, active = sessions.len(), "Created session");

        Ok(session)
    }

    /// Live session for `id`, if any
    pub fn get(&self, id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(id).cloned()
    }

    /// Like [`get`](Self::get) but a missing session is an error
    pub fn require(&self, id: &str) -> Result<Arc<SessionHandle>> {
        self.get(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop every session idle past the timeout and return how many went
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        self.sweep_locked(&mut sessions)
    }

    fn sweep_locked(&self, sessions: &mut HashMap<String, Arc<SessionHandle>>) -> usize {
        let before = sessions.len();
        sessions.retain(|id, handle| {
            let keep = !handle.is_expired(self.session_timeout);
            if !keep {
                tracing::info!(
                    session_id = %id,
                    idle_secs = handle.idle_time().as_secs(),
                    "Expired session"
                );
            }
            keep
        });
        before - sessions.len()
    }

    /// Ids of every live session, in no particular order
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_live() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();

        assert!(!session.is_expired(Duration::from_secs(60)));
        assert_eq!(manager.count(), 1);
    }

    #[test]
    fn test_lookup_by_id() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();
        let id = session.id.clone();

        let found = manager.get(&id).unwrap();
        assert!(Arc::ptr_eq(&found, &session));
        assert!(manager.get("unknown").is_none());
    }

    #[test]
    fn test_removed_session_is_gone() {
        let manager = SessionManager::new(10);
        let session = manager.create().unwrap();
        let id = session.id.clone();

        assert!(manager.remove(&id));
        assert!(manager.get(&id).is_none());
        assert_eq!(
            manager.require(&id).err(),
            Some(Error::SessionNotFound(id.clone()))
        );
    }

    #[test]
    fn test_get_or_create_reuses_caller_id() {
        let manager = SessionManager::new(10);
        let first = manager.get_or_create(Some("kiosk-1")).unwrap();
        let second = manager.get_or_create(Some("kiosk-1")).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.list(), vec!["kiosk-1".to_string()]);
    }

    #[test]
    fn test_session_limit() {
        let manager = SessionManager::new(2);
        manager.create().unwrap();
        manager.create().unwrap();

        assert_eq!(manager.create().err(), Some(Error::SessionLimit(2)));
    }

    #[test]
    fn test_expired_sessions_make_room() {
        let manager = SessionManager::with_config(1, Duration::ZERO, Duration::from_secs(60));
        manager.create().unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(manager.create().is_ok());
        assert_eq!(manager.count(), 1);
    }

    #[tokio::test]
    async fn test_lock_gives_dialogue_record() {
        let manager = SessionManager::new(10);
        let handle = manager.get_or_create(Some("s1")).unwrap();
        let session = handle.lock().await;
        assert_eq!(session.id, "s1");
        assert_eq!(session.turn_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_and_stops() {
        let manager = Arc::new(SessionManager::with_config(
            10,
            Duration::from_millis(10),
            Duration::from_millis(50),
        ));
        manager.create().unwrap();

        let shutdown = manager.start_cleanup_task();
        std::thread::sleep(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(manager.count(), 0);

        shutdown.send(true).unwrap();
    }
}
