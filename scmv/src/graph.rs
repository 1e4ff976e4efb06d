//! The scmv object graph
//!
//! ```text
//! Singleton
//! ├── ActivityRetainedScope  (SavedStateHandleHolder)
//! │   ├── ActivityScope      (ActivityHandle)
//! │   └── ViewModelScope     (SavedStateHandle)
//! └── ServiceScope           (ServiceHandle)
//! ```

use std::sync::Arc;

use scmv_config::ConfigProvider;
use scmv_di::{errors::BuildError, DiBuilder, DiContainer, ScopeDefinition, ScopeMarker, Singleton};

use crate::{
    context::AppContext,
    data::{
        json::JsonCodec,
        prefs::PreferenceStore,
        remote::{HttpClient, WsClient},
        repository::{
            AuthRepository, AuthRepositoryImpl, DeviceRepository, DeviceRepositoryImpl,
            TrackRepository, TrackRepositoryImpl,
        },
        session::SessionManager,
        settings::AppSettings,
    },
    ui::{
        activity::{ActivityHandle, MainActivity},
        viewmodels::{
            DevicesViewModel, LoginViewModel, MapViewModel, SavedStateHandle, SettingsViewModel,
            ViewModelRegistry,
        },
    },
};

/// Outlives configuration changes of an activity
pub struct ActivityRetainedScope;
impl ScopeMarker for ActivityRetainedScope {}

pub struct ActivityScope;
impl ScopeMarker for ActivityScope {}

pub struct ViewModelScope;
impl ScopeMarker for ViewModelScope {}

pub struct ServiceScope;
impl ScopeMarker for ServiceScope {}

/// Handed to the activity retained scope by its host
pub struct SavedStateHandleHolder {
    saved_state: Arc<SavedStateHandle>,
}

impl SavedStateHandleHolder {
    pub fn new(saved_state: Arc<SavedStateHandle>) -> Self {
        Self { saved_state }
    }

    pub fn saved_state(&self) -> Arc<SavedStateHandle> {
        self.saved_state.clone()
    }
}

/// A background service a [ServiceScope] is opened for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceHandle {
    pub name: String,
}

pub fn view_model_registry() -> ViewModelRegistry {
    ViewModelRegistry::new()
        .register::<DevicesViewModel>()
        .register::<LoginViewModel>()
        .register::<MapViewModel>()
        .register::<SettingsViewModel>()
}

/// Builds the object graph from the application context and the config sections
///
/// Nothing is constructed here, I/O clients are created on first use and never connected.
pub fn build_graph(context: AppContext, configs: ConfigProvider) -> Result<DiContainer, BuildError> {
    DiBuilder::new()
        .add_instance(context)
        .add_instance(configs)
        .add_instance(view_model_registry())
        .add_provider(|context: Arc<AppContext>| PreferenceStore::open(context.preferences_path()))
        .add_provider(SessionManager::new)
        .add_provider(AppSettings::new)
        .add_provider(HttpClient::provide)
        .add_provider(WsClient::provide)
        .add_provider(JsonCodec::provide)
        .add_provider(AuthRepositoryImpl::new)
        .add_provider(DeviceRepositoryImpl::new)
        .add_provider(TrackRepositoryImpl::new)
        .bind::<dyn AuthRepository, AuthRepositoryImpl>(|repository| repository)
        .bind::<dyn DeviceRepository, DeviceRepositoryImpl>(|repository| repository)
        .bind::<dyn TrackRepository, TrackRepositoryImpl>(|repository| repository)
        .add_scope(
            ScopeDefinition::new::<ActivityRetainedScope, Singleton>()
                .requires::<SavedStateHandleHolder>(),
        )
        .add_scope(
            ScopeDefinition::new::<ActivityScope, ActivityRetainedScope>()
                .requires::<ActivityHandle>()
                .add_provider(MainActivity::new),
        )
        .add_scope(
            ScopeDefinition::new::<ViewModelScope, ActivityRetainedScope>()
                .requires::<SavedStateHandle>()
                .add_provider(DevicesViewModel::new)
                .add_provider(LoginViewModel::new)
                .add_provider(MapViewModel::new)
                .add_provider(SettingsViewModel::new),
        )
        .add_scope(ScopeDefinition::new::<ServiceScope, Singleton>().requires::<ServiceHandle>())
        .build()
}
