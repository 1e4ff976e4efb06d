use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use scmv_di::{errors::RequireError, DiContainer};
use thiserror::Error;

use crate::data::{
    prefs::StoreError,
    remote::{ConnectionState, WsClient},
    repository::{AuthRepository, Device, DeviceRepository, TrackRepository},
    session::SessionManager,
    settings::{AppSettings, AppSettingsData},
};

fn locked<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key/value state handed to a view model by its host, survives recreation of the host
#[derive(Debug, Default)]
pub struct SavedStateHandle {
    values: Mutex<HashMap<String, String>>,
}

impl SavedStateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<String> {
        locked(&self.values).get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<String>) {
        locked(&self.values).insert(key.to_string(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        locked(&self.values).remove(key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewModelKey(pub &'static str);

impl std::fmt::Display for ViewModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

pub trait ViewModel: Send + Sync + 'static {
    fn key(&self) -> ViewModelKey;
}

/// A view model the [ViewModelRegistry] can create by key
pub trait KeyedViewModel: ViewModel + Sized {
    const KEY: ViewModelKey;
}

#[derive(Error, Debug)]
pub enum ViewModelError {
    #[error("No view model is registered for key '{0}'")]
    UnknownKey(String),
    #[error(transparent)]
    Require(#[from] RequireError),
}

type ViewModelConstructor = fn(&DiContainer) -> Result<Arc<dyn ViewModel>, RequireError>;

/// Creates view models by key from a view model scope
#[derive(Default)]
pub struct ViewModelRegistry {
    constructors: HashMap<&'static str, ViewModelConstructor>,
}

impl ViewModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<VM: KeyedViewModel>(mut self) -> Self {
        fn construct<VM: KeyedViewModel>(
            scope: &DiContainer,
        ) -> Result<Arc<dyn ViewModel>, RequireError> {
            let view_model: Arc<dyn ViewModel> = scope.require::<VM>()?;
            Ok(view_model)
        }

        self.constructors.insert(VM::KEY.0, construct::<VM>);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = ViewModelKey> + '_ {
        self.constructors.keys().copied().map(ViewModelKey)
    }

    pub fn create(&self, scope: &DiContainer, key: &str) -> Result<Arc<dyn ViewModel>, ViewModelError> {
        let constructor = self
            .constructors
            .get(key)
            .ok_or_else(|| ViewModelError::UnknownKey(key.to_string()))?;

        Ok(constructor(scope)?)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DevicesUiState {
    pub devices: Vec<Device>,
    pub visible: Vec<Device>,
    pub query: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct DevicesViewModel {
    repository: Arc<dyn DeviceRepository>,
    state: Mutex<DevicesUiState>,
}

impl DevicesViewModel {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self {
            repository,
            state: Mutex::default(),
        }
    }

    pub fn state(&self) -> DevicesUiState {
        locked(&self.state).clone()
    }

    pub fn load_devices(&self) {
        let mut state = locked(&self.state);
        match self.repository.request_devices() {
            Ok(()) => {
                state.is_loading = true;
                state.error = None;
            }
            Err(e) => {
                tracing::warn!("Could not load devices: {e}");
                state.is_loading = false;
                state.error = Some(e.to_string());
            }
        }
    }

    pub fn on_devices_loaded(&self, devices: Vec<Device>) {
        let mut state = locked(&self.state);
        state.visible = self.repository.search_devices(&state.query, &devices);
        state.devices = devices;
        state.is_loading = false;
    }

    pub fn on_search_query_change(&self, query: &str) {
        let mut state = locked(&self.state);
        state.visible = self.repository.search_devices(query, &state.devices);
        state.query = query.to_string();
    }
}

impl ViewModel for DevicesViewModel {
    fn key(&self) -> ViewModelKey {
        Self::KEY
    }
}
impl KeyedViewModel for DevicesViewModel {
    const KEY: ViewModelKey = ViewModelKey("DevicesViewModel");
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginUiState {
    pub username: String,
    pub password: String,
    pub remember_me: bool,
    pub is_loading: bool,
    pub is_logged_in: bool,
    pub error: Option<String>,
}

pub struct LoginViewModel {
    auth: Arc<dyn AuthRepository>,
    ws: Arc<WsClient>,
    state: Mutex<LoginUiState>,
}

impl LoginViewModel {
    /// Prefills the form from a remembered session
    pub fn new(auth: Arc<dyn AuthRepository>, sessions: Arc<SessionManager>, ws: Arc<WsClient>) -> Self {
        let mut state = LoginUiState::default();
        if let Some(session) = sessions.session().filter(|session| session.remember_me) {
            state.username = session.username;
            state.remember_me = true;
        }

        Self {
            auth,
            ws,
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> LoginUiState {
        locked(&self.state).clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ws.connection_state()
    }

    pub fn on_username_change(&self, username: &str) {
        let mut state = locked(&self.state);
        state.username = username.to_string();
        state.error = None;
    }

    pub fn on_password_change(&self, password: &str) {
        let mut state = locked(&self.state);
        state.password = password.to_string();
        state.error = None;
    }

    pub fn on_remember_me_change(&self, remember_me: bool) {
        locked(&self.state).remember_me = remember_me;
    }

    pub fn login(&self) {
        let mut state = locked(&self.state);
        if state.username.trim().is_empty() || state.password.is_empty() {
            state.error = Some("Enter username and password".to_string());
            return;
        }

        match self.auth.login(state.username.trim(), &state.password) {
            Ok(()) => {
                state.is_loading = true;
                state.error = None;
            }
            Err(e) => {
                state.is_loading = false;
                state.error = Some(e.to_string());
            }
        }
    }

    pub fn on_login_response(&self, response: &str) {
        let mut state = locked(&self.state);
        let username = state.username.trim().to_string();

        let result = self
            .auth
            .complete_login(response, &username, &state.password, state.remember_me);
        state.is_loading = false;
        match result {
            Ok(user) => {
                tracing::info!("Logged in as {} ({})", user.username, user.uid);
                state.is_logged_in = true;
                state.password.clear();
            }
            Err(e) => state.error = Some(e.to_string()),
        }
    }
}

impl ViewModel for LoginViewModel {
    fn key(&self) -> ViewModelKey {
        Self::KEY
    }
}
impl KeyedViewModel for LoginViewModel {
    const KEY: ViewModelKey = ViewModelKey("LoginViewModel");
}

/// Saved state key of the selected device
pub const DEVICE_ID_KEY: &str = "deviceId";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapUiState {
    pub selected_device_id: Option<i64>,
    pub settings: AppSettingsData,
    pub is_loading: bool,
    pub error: Option<String>,
}

pub struct MapViewModel {
    tracks: Arc<dyn TrackRepository>,
    devices: Arc<dyn DeviceRepository>,
    settings: Arc<AppSettings>,
    saved_state: Arc<SavedStateHandle>,
    state: Mutex<MapUiState>,
}

impl MapViewModel {
    pub fn new(
        tracks: Arc<dyn TrackRepository>,
        devices: Arc<dyn DeviceRepository>,
        settings: Arc<AppSettings>,
        saved_state: Arc<SavedStateHandle>,
    ) -> Self {
        let state = MapUiState {
            selected_device_id: saved_state
                .get(DEVICE_ID_KEY)
                .and_then(|id| id.parse().ok()),
            settings: settings.settings(),
            ..Default::default()
        };

        Self {
            tracks,
            devices,
            settings,
            saved_state,
            state: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MapUiState {
        locked(&self.state).clone()
    }

    pub fn select_device_by_id(&self, device_id: i64) {
        self.saved_state.set(DEVICE_ID_KEY, device_id.to_string());
        locked(&self.state).selected_device_id = Some(device_id);
    }

    pub fn load_devices(&self) {
        if let Err(e) = self.devices.request_devices() {
            locked(&self.state).error = Some(e.to_string());
        }
    }

    pub fn load_raw_track(&self, from: &str, to: &str) {
        let mut state = locked(&self.state);
        let Some(device_id) = state.selected_device_id else {
            state.error = Some("Select a device".to_string());
            return;
        };

        match self.tracks.request_raw_track(device_id, from, to) {
            Ok(()) => state.is_loading = true,
            Err(e) => state.error = Some(e.to_string()),
        }
    }

    /// Picks up settings changed on the settings screen
    pub fn refresh_settings(&self) {
        locked(&self.state).settings = self.settings.settings();
    }
}

impl ViewModel for MapViewModel {
    fn key(&self) -> ViewModelKey {
        Self::KEY
    }
}
impl KeyedViewModel for MapViewModel {
    const KEY: ViewModelKey = ViewModelKey("MapViewModel");
}

pub struct SettingsViewModel {
    ws: Arc<WsClient>,
    sessions: Arc<SessionManager>,
    settings: Arc<AppSettings>,
}

impl SettingsViewModel {
    pub fn new(ws: Arc<WsClient>, sessions: Arc<SessionManager>, settings: Arc<AppSettings>) -> Self {
        Self {
            ws,
            sessions,
            settings,
        }
    }

    pub fn settings(&self) -> AppSettingsData {
        self.settings.settings()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ws.connection_state()
    }

    pub fn set_track_line_width(&self, width: f32) -> Result<(), StoreError> {
        self.settings.set_track_line_width(width)
    }

    pub fn set_stop_marker_size(&self, size: i32) -> Result<(), StoreError> {
        self.settings.set_stop_marker_size(size)
    }

    pub fn set_arrow_size(&self, size: i32) -> Result<(), StoreError> {
        self.settings.set_arrow_size(size)
    }

    pub fn set_app_language(&self, language: &str) -> Result<(), StoreError> {
        self.settings.set_app_language(language)
    }

    pub fn reset_to_defaults(&self) -> Result<(), StoreError> {
        self.settings.reset_to_defaults()
    }

    /// Switches between `ws://` and `wss://` and drops the current connection
    pub fn toggle_ssl(&self) {
        let url = self.ws.url();
        let toggled = match url.strip_prefix("wss://") {
            Some(rest) => format!("ws://{rest}"),
            None => format!("wss://{}", url.strip_prefix("ws://").unwrap_or(&url)),
        };
        self.ws.disconnect();
        self.ws.set_url(&toggled);
    }

    /// Drops the current connection and starts a new attempt
    pub fn reconnect(&self) {
        self.ws.disconnect();
        self.ws.connect();
    }

    pub fn logout(&self) -> Result<(), StoreError> {
        self.sessions.clear_session()?;
        self.ws.disconnect();
        Ok(())
    }
}

impl ViewModel for SettingsViewModel {
    fn key(&self) -> ViewModelKey {
        Self::KEY
    }
}
impl KeyedViewModel for SettingsViewModel {
    const KEY: ViewModelKey = ViewModelKey("SettingsViewModel");
}
