use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use scmv::{
    config::ConfigLoader,
    context::AppContext,
    graph::{self, ActivityRetainedScope, ActivityScope, SavedStateHandleHolder, ViewModelScope},
    logging,
    ui::{
        activity::{ActivityHandle, MainActivity},
        viewmodels::{SavedStateHandle, ViewModelRegistry},
    },
};
use scmv_di::Singleton;

fn main() -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = std::env::args().nth(1) {
        loader = loader.with_config_path(PathBuf::from(path));
    }
    let config = loader.load().context("Failed to load configuration")?;

    logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    let configs = config
        .config_provider()
        .context("Failed to register config sections")?;
    let root = graph::build_graph(AppContext::new(config.context.clone()), configs)
        .context("Invalid object graph")?;
    tracing::debug!("Object graph:\n{}", root.graph());

    root.initialize_all()
        .context("Failed to construct singletons")?;
    tracing::info!(
        "Constructed singletons in order: {:?}",
        root.graph()
            .topological_order::<Singleton>()
            .iter()
            .map(|info| info.type_name)
            .collect::<Vec<_>>()
    );

    // Host lifecycle: the retained scope outlives both the activity and its view models
    let saved_state = Arc::new(SavedStateHandle::new());
    let retained = root
        .scope::<ActivityRetainedScope>()
        .with(SavedStateHandleHolder::new(saved_state.clone()))
        .build()?;

    let activity = retained
        .scope::<ActivityScope>()
        .with(ActivityHandle::new("MainActivity"))
        .build()?;
    let main_activity = activity.require::<MainActivity>()?;
    let destination = main_activity.start_destination();
    tracing::info!(
        "{} starts at '{}' with language '{}'",
        main_activity.handle().name,
        destination.route(),
        main_activity.app_language()
    );

    let view_models = retained
        .scope::<ViewModelScope>()
        .with_arc(saved_state)
        .build()?;
    let registry = root.require::<ViewModelRegistry>()?;
    let view_model = registry.create(&view_models, destination.view_model_key().0)?;
    tracing::info!("Created {}", view_model.key());

    Ok(())
}
