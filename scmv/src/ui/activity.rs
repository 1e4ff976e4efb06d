use std::sync::Arc;

use crate::{
    data::{session::SessionManager, settings::AppSettings},
    ui::viewmodels::{KeyedViewModel, LoginViewModel, MapViewModel, ViewModelKey},
};

/// The platform activity a [crate::graph::ActivityScope] is opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityHandle {
    pub name: String,
}

impl ActivityHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDestination {
    Login,
    Map,
}

impl StartDestination {
    pub fn route(&self) -> &'static str {
        match self {
            StartDestination::Login => "login",
            StartDestination::Map => "map",
        }
    }

    /// View model backing the destination's screen
    pub fn view_model_key(&self) -> ViewModelKey {
        match self {
            StartDestination::Login => LoginViewModel::KEY,
            StartDestination::Map => MapViewModel::KEY,
        }
    }
}

/// Entry activity, receives its members from the activity scope
pub struct MainActivity {
    handle: Arc<ActivityHandle>,
    sessions: Arc<SessionManager>,
    settings: Arc<AppSettings>,
}

impl MainActivity {
    pub fn new(
        handle: Arc<ActivityHandle>,
        sessions: Arc<SessionManager>,
        settings: Arc<AppSettings>,
    ) -> Self {
        Self {
            handle,
            sessions,
            settings,
        }
    }

    pub fn handle(&self) -> &ActivityHandle {
        &self.handle
    }

    /// Map for a remembered session, login otherwise
    pub fn start_destination(&self) -> StartDestination {
        match self.sessions.session() {
            Some(session) if session.remember_me => StartDestination::Map,
            _ => StartDestination::Login,
        }
    }

    /// Locale to apply before showing any content
    pub fn app_language(&self) -> String {
        self.settings.settings().app_language
    }
}
