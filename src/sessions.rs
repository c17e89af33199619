use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use uuid::Uuid;

/// How long a login lasts unless the user logs out first.
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct Session {
    user_name: String,
    expires: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires > now
    }
}

/// Logged-in users, keyed by the token handed out in the session cookie.
///
/// Sessions expire after the store's lifetime. Expired sessions are dropped
/// whenever a new one starts, so the store only holds live logins.
#[derive(Debug)]
pub struct SessionStore {
    lifetime: Duration,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        SessionStore::with_lifetime(DEFAULT_LIFETIME)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_lifetime(lifetime: Duration) -> Self {
        SessionStore {
            lifetime,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Starts a session for `user_name` and returns its token.
    pub fn create(&self, user_name: impl Into<String>) -> Uuid {
        let token = Uuid::new_v4();
        let now = Instant::now();

        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);

        sessions.retain(|_, session| session.is_live(now));
        sessions.insert(
            token,
            Session {
                user_name: user_name.into(),
                expires: now + self.lifetime,
            },
        );

        token
    }

    /// The user logged in under `token`, unless the session has expired.
    pub fn user_name(&self, token: &Uuid) -> Option<String> {
        let now = Instant::now();

        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .filter(|session| session.is_live(now))
            .map(|session| session.user_name.clone())
    }

    /// Ends a session. Unknown tokens are ignored.
    pub fn remove(&self, token: &Uuid) {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
    }

    #[cfg(test)]
    fn stored(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
