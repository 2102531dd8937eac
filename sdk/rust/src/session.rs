//! Session state carried explicitly through client calls.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long a fetched permission list stays usable.
pub const PERMISSIONS_TTL: Duration = Duration::from_secs(5 * 60);

/// A value that expires a fixed time after it was stored.
#[derive(Debug, Clone)]
pub struct TtlCell<T> {
    value: Option<T>,
    expires_at: Option<Instant>,
    ttl: Duration,
}

impl<T> TtlCell<T> {
    /// An empty cell whose values live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            value: None,
            expires_at: None,
            ttl,
        }
    }

    /// Store `value`, restarting the expiry clock.
    pub fn set(&mut self, value: T) {
        self.set_at(value, Instant::now());
    }

    /// Like `set`, with an explicit clock.
    pub fn set_at(&mut self, value: T, now: Instant) {
        self.value = Some(value);
        self.expires_at = Some(now + self.ttl);
    }

    /// The stored value, if it has not expired.
    pub fn get(&self) -> Option<&T> {
        self.get_at(Instant::now())
    }

    /// Like `get`, with an explicit clock.
    pub fn get_at(&self, now: Instant) -> Option<&T> {
        match self.expires_at {
            Some(expires_at) if now < expires_at => self.value.as_ref(),
            _ => None,
        }
    }

    /// True while a stored value has not expired.
    pub fn is_fresh(&self) -> bool {
        self.get().is_some()
    }

    pub fn clear(&mut self) {
        self.value = None;
        self.expires_at = None;
    }
}

/// The signed-in user as returned by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub usuario: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Token, user and per-session caches.
#[derive(Debug, Default)]
pub struct SessionContext {
    token: Option<String>,
    user: Option<UserProfile>,
    permissions: HashMap<String, TtlCell<Value>>,
}

impl SessionContext {
    /// A signed-in session.
    pub fn new(token: impl Into<String>, user: Option<UserProfile>) -> Self {
        Self {
            token: Some(token.into()),
            user,
            permissions: HashMap::new(),
        }
    }

    /// A session with no credentials; calls go out without `Authorization`.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Permission list cached under `key`, if still fresh.
    pub fn cached_permissions(&self, key: &str) -> Option<&Value> {
        self.permissions.get(key).and_then(TtlCell::get)
    }

    /// Cache a permission list for `PERMISSIONS_TTL`.
    pub fn cache_permissions(&mut self, key: impl Into<String>, value: Value) {
        self.permissions
            .entry(key.into())
            .or_insert_with(|| TtlCell::new(PERMISSIONS_TTL))
            .set(value);
    }

    /// Drop the credentials and everything cached under them.
    pub fn logout(&mut self) {
        self.token = None;
        self.user = None;
        self.permissions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cell_expires_after_ttl() {
        let start = Instant::now();
        let mut cell = TtlCell::new(Duration::from_secs(60));
        cell.set_at(7, start);

        assert_eq!(cell.get_at(start + Duration::from_secs(59)), Some(&7));
        assert_eq!(cell.get_at(start + Duration::from_secs(60)), None);
    }

    #[test]
    fn empty_cell_is_not_fresh() {
        let cell: TtlCell<u8> = TtlCell::new(PERMISSIONS_TTL);
        assert!(!cell.is_fresh());
    }

    #[test]
    fn clear_drops_value() {
        let mut cell = TtlCell::new(PERMISSIONS_TTL);
        cell.set("x");
        assert!(cell.is_fresh());
        cell.clear();
        assert_eq!(cell.get(), None);
    }

    #[test]
    fn logout_clears_token_and_caches() {
        let mut session = SessionContext::new("abc", Some(UserProfile::default()));
        session.cache_permissions("permisos-area", json!(["VER"]));
        assert_eq!(session.cached_permissions("permisos-area"), Some(&json!(["VER"])));

        session.logout();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
        assert!(session.cached_permissions("permisos-area").is_none());
    }

    #[test]
    fn profile_keeps_unknown_fields() {
        let user: UserProfile =
            serde_json::from_value(json!({"usuario": "ana", "area": "RRHH", "rol": 3})).unwrap();
        assert_eq!(user.usuario.as_deref(), Some("ana"));
        assert_eq!(user.extra.get("rol"), Some(&json!(3)));
    }
}
