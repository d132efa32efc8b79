use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use shared::domain::UserId;
use tokio::sync::watch;
use tracing::info;

/// Lifetime given to a session when the caller supplies no expiry.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 60 * 60;

pub fn default_session_ttl() -> Duration {
    Duration::seconds(DEFAULT_SESSION_TTL_SECS)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Login state handed explicitly to whatever needs the current user or token.
/// Clones share the same session.
#[derive(Debug, Clone)]
pub struct AuthSession {
    current: Arc<watch::Sender<Option<SessionData>>>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthSession {
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }

    pub fn login(
        &self,
        user_id: UserId,
        token: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
    ) {
        let expires_at = expires_at.unwrap_or_else(|| Utc::now() + default_session_ttl());
        info!(user_id = %user_id, %expires_at, "session: logged in");
        self.current.send_replace(Some(SessionData {
            user_id,
            token: token.into(),
            expires_at,
        }));
    }

    pub fn logout(&self) {
        if self.current.send_replace(None).is_some() {
            info!("session: logged out");
        }
    }

    /// Live session data; an expired session counts as logged out.
    pub fn data(&self) -> Option<SessionData> {
        self.data_at(Utc::now())
    }

    pub fn data_at(&self, now: DateTime<Utc>) -> Option<SessionData> {
        self.current
            .borrow()
            .as_ref()
            .filter(|session| session.expires_at > now)
            .cloned()
    }

    pub fn is_logged_in(&self) -> bool {
        self.data().is_some()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.data().map(|session| session.user_id)
    }

    pub fn token(&self) -> Option<String> {
        self.data().map(|session| session.token)
    }

    pub fn authorization_header(&self) -> Option<(String, String)> {
        self.token()
            .map(|token| ("Authorization".to_string(), format!("Bearer {token}")))
    }

    /// Time left before the session lapses, `None` when logged out.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.data_at(now).map(|session| session.expires_at - now)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionData>> {
        self.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_then_logout() {
        let session = AuthSession::new();
        assert!(!session.is_logged_in());
        assert_eq!(session.authorization_header(), None);

        session.login(UserId::new("u1"), "tok", None);
        assert_eq!(session.user_id(), Some(UserId::new("u1")));
        assert_eq!(
            session.authorization_header(),
            Some(("Authorization".to_string(), "Bearer tok".to_string()))
        );

        session.logout();
        session.logout();
        assert!(!session.is_logged_in());
    }

    #[test]
    fn default_expiry_is_one_hour() {
        let session = AuthSession::new();
        let before = Utc::now();
        session.login(UserId::new("u1"), "tok", None);

        let remaining = session.remaining(before).expect("logged in");
        assert!(remaining >= default_session_ttl());
        assert!(remaining < default_session_ttl() + Duration::seconds(5));
    }

    #[test]
    fn expired_session_reads_as_logged_out() {
        let session = AuthSession::new();
        let expires_at = Utc::now() + Duration::minutes(5);
        session.login(UserId::new("u1"), "tok", Some(expires_at));

        assert!(session.data_at(expires_at - Duration::seconds(1)).is_some());
        assert!(session.data_at(expires_at).is_none());
        assert_eq!(session.remaining(expires_at + Duration::minutes(1)), None);
    }

    #[test]
    fn clones_share_state() {
        let session = AuthSession::new();
        let handle = session.clone();
        handle.login(UserId::new("u2"), "other", None);
        assert_eq!(session.token().as_deref(), Some("other"));
    }
}
