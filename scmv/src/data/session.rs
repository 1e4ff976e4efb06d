use std::sync::Arc;

use crate::data::prefs::{keys, PreferenceStore, Preferences, StoreError};

/// Credentials of a logged in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub password: String,
    pub uid: i64,
    pub remember_me: bool,
}

/// Keeps the user session in the preference store
pub struct SessionManager {
    store: Arc<PreferenceStore>,
}

impl SessionManager {
    pub fn new(store: Arc<PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn save_session(
        &self,
        username: &str,
        password: &str,
        uid: i64,
        remember_me: bool,
    ) -> Result<(), StoreError> {
        self.store.edit(|prefs| {
            prefs.set(keys::USERNAME, username);
            prefs.set(keys::PASSWORD, password);
            prefs.set(keys::USER_ID, uid);
            prefs.set(keys::REMEMBER_ME, remember_me);
        })?;
        tracing::info!("Saved session for {username}");
        Ok(())
    }

    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.store.edit(|prefs| {
            for key in [keys::USERNAME, keys::PASSWORD, keys::USER_ID, keys::REMEMBER_ME] {
                prefs.remove(key);
            }
        })
    }

    /// The stored session - only complete if username, password and uid are all present
    pub fn session(&self) -> Option<Session> {
        session_from(&self.store.snapshot())
    }

    pub fn is_logged_in(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_remember_me_enabled(&self) -> bool {
        self.session().is_some_and(|session| session.remember_me)
    }

    /// Only touches the remember me flag, the rest of the session stays as is
    pub fn update_remember_me(&self, remember_me: bool) -> Result<(), StoreError> {
        self.store
            .edit(|prefs| prefs.set(keys::REMEMBER_ME, remember_me))
    }
}

fn session_from(prefs: &Preferences) -> Option<Session> {
    Some(Session {
        username: prefs.get_string(keys::USERNAME)?.to_string(),
        password: prefs.get_string(keys::PASSWORD)?.to_string(),
        uid: prefs.get_i64(keys::USER_ID)?,
        remember_me: prefs.get_bool(keys::REMEMBER_ME).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(dir: &tempfile::TempDir) -> SessionManager {
        SessionManager::new(Arc::new(PreferenceStore::open(dir.path().join("prefs.json"))))
    }

    #[test]
    fn it_saves_and_clears_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir);

        sessions.save_session("operator", "secret", 7, true).unwrap();
        assert_eq!(
            sessions.session(),
            Some(Session {
                username: "operator".into(),
                password: "secret".into(),
                uid: 7,
                remember_me: true,
            })
        );
        assert!(sessions.is_remember_me_enabled());

        sessions.clear_session().unwrap();
        assert!(!sessions.is_logged_in());
        assert!(!sessions.is_remember_me_enabled());
    }

    #[test]
    fn incomplete_sessions_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(PreferenceStore::open(dir.path().join("prefs.json")));
        store
            .edit(|prefs| {
                prefs.set(keys::USERNAME, "operator");
                prefs.set(keys::PASSWORD, "secret");
            })
            .unwrap();

        let sessions = SessionManager::new(store);

        assert_eq!(sessions.session(), None);
    }

    #[test]
    fn remember_me_defaults_to_false() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = manager(&dir);
        sessions.save_session("operator", "secret", 7, true).unwrap();
        sessions.store.edit(|prefs| {
            prefs.remove(keys::REMEMBER_ME);
        }).unwrap();

        assert!(sessions.is_logged_in());
        assert!(!sessions.is_remember_me_enabled());

        sessions.update_remember_me(true).unwrap();
        assert!(sessions.is_remember_me_enabled());
        assert_eq!(sessions.session().unwrap().username, "operator");
    }
}
