use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::AppConfig;
use crate::services::api::BookingApi;
use crate::services::platform::PlatformDetector;
use crate::services::session::WizardSession;

pub struct AppState {
    pub config: AppConfig,
    pub api: Arc<dyn BookingApi>,
    pub platform: Box<dyn PlatformDetector>,
    pub sessions: Mutex<HashMap<String, SessionEntry>>,
}

pub struct SessionEntry {
    pub session: Arc<WizardSession>,
    pub expires_at: Instant,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        api: Arc<dyn BookingApi>,
        platform: Box<dyn PlatformDetector>,
    ) -> Self {
        Self {
            config,
            api,
            platform,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a session and drops any that have been idle past the TTL.
    pub fn insert_session(&self, id: String, session: Arc<WizardSession>) {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "pruned idle wizard sessions");
        }
        sessions.insert(
            id,
            SessionEntry {
                session,
                expires_at: now + self.config.session_ttl,
            },
        );
    }

    /// Looks up a live session and extends its expiry.
    pub fn get_session(&self, id: &str) -> Option<Arc<WizardSession>> {
        let now = Instant::now();
        let mut sessions = self.sessions();
        match sessions.get_mut(id) {
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = now + self.config.session_ttl;
                Some(Arc::clone(&entry.session))
            }
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn remove_session(&self, id: &str) -> bool {
        self.sessions().remove(id).is_some()
    }
}
