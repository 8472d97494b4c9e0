//! Local sign-in record. There is no credential check; the record only
//! personalizes the front end.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::store::{LocalStore, StoreError, USER_KEY};

pub const DEFAULT_USER_AVATAR: &str = "https://picsum.photos/seed/user/200/200";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

impl User {
    /// Display name falls back to the email's local part, then `User`.
    pub fn sign_in(name: Option<&str>, email: &str) -> Self {
        let email = email.trim();
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .or_else(|| email.split('@').next().filter(|local| !local.is_empty()))
            .unwrap_or("User");

        Self {
            id: format!("user_{}", chrono::Utc::now().timestamp_millis()),
            name: name.to_string(),
            email: email.to_string(),
            avatar: DEFAULT_USER_AVATAR.to_string(),
        }
    }
}

/// The signed-in user, persisted under the `user` key.
pub struct UserSession<'a> {
    store: &'a LocalStore,
}

impl<'a> UserSession<'a> {
    pub fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<User>, StoreError> {
        self.store.get(USER_KEY)
    }

    pub fn login(&self, name: Option<&str>, email: &str) -> Result<User, StoreError> {
        let user = User::sign_in(name, email);
        self.store.put(USER_KEY, &user)?;
        debug!(user = %user.id, "signed in");
        Ok(user)
    }

    /// Returns whether someone was signed in.
    pub fn logout(&self) -> Result<bool, StoreError> {
        self.store.remove(USER_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_prefers_given_name() {
        let user = User::sign_in(Some(" 小林 "), "lin@example.com");
        assert_eq!(user.name, "小林");
        assert_eq!(user.email, "lin@example.com");
        assert!(user.id.starts_with("user_"));
        assert_eq!(user.avatar, DEFAULT_USER_AVATAR);
    }

    #[test]
    fn sign_in_falls_back_to_email_then_placeholder() {
        assert_eq!(User::sign_in(None, "mei@example.com").name, "mei");
        assert_eq!(User::sign_in(Some("  "), "mei@example.com").name, "mei");
        assert_eq!(User::sign_in(None, "").name, "User");
        assert_eq!(User::sign_in(None, "@example.com").name, "User");
    }

    #[test]
    fn login_persists_until_logout() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let session = UserSession::new(&store);
        assert_eq!(session.load().unwrap(), None);

        let user = session.login(Some("Ada"), "ada@example.com").unwrap();
        assert_eq!(session.load().unwrap(), Some(user));

        assert!(session.logout().unwrap());
        assert_eq!(session.load().unwrap(), None);
        assert!(!session.logout().unwrap());
    }
}
