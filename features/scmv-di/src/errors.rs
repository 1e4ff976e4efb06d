use std::sync::Arc;

use thiserror::Error;

use crate::{
    dependency_graph::DependencyGraphErrors,
    types::{DynError, TypeInfo},
};

#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// Could not require the type
    #[error(transparent)]
    RequireError(#[from] RequireError),
    /// The scope a lazy dependency was resolved from has been dropped
    #[error("The scope was dropped before the dependency was accessed")]
    ScopeClosed,
    /// Generic error during Injection
    #[error("Error during injection: {0}")]
    Other(Arc<DynError>),
}
impl InjectError {
    pub fn other(error: impl Into<DynError>) -> Self {
        Self::Other(Arc::new(error.into()))
    }
}

/// Errors when trying to require a certain type
#[derive(thiserror::Error, Debug, Clone)]
pub enum RequireError {
    /// The required type is not known to the scope or any of its parents
    #[error("The required type '{0}' is not known.")]
    TypeMissing(&'static str),
    /// The required type is disabled
    #[error("The required type '{0}' is disabled.")]
    TypeDisabled(&'static str),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// The type was required again from inside its own construction
    #[error("The required type '{0}' was required while it is being constructed.")]
    CircularConstruction(&'static str),

    /// A Factory failed to build
    #[error("Factory for '{product}' failed - error: {error}")]
    FactoryFailed {
        product: &'static str,
        error: Arc<DynError>,
    },
}

/// Errors while building the root container
#[derive(thiserror::Error, Debug, Clone)]
pub enum BuildError {
    /// There are issues with the dependency graph
    #[error(transparent)]
    DependencyGraphError(#[from] DependencyGraphErrors),

    #[error("Scope '{scope}' declares '{parent}' as parent, but it is not registered")]
    UnknownParentScope { scope: TypeInfo, parent: TypeInfo },

    #[error("Scope '{0}' has been registered twice")]
    DuplicateScope(TypeInfo),

    #[error("Scope '{0}' never reaches the root scope through its parents")]
    CircularScope(TypeInfo),
}

/// Errors while opening a child scope
///
/// Raised before anything inside the scope is constructed.
#[derive(thiserror::Error, Debug, Clone)]
pub enum ScopeError {
    #[error("Scope '{scope}' requires '{parameter}' but it was not supplied")]
    MissingParameter {
        scope: TypeInfo,
        parameter: TypeInfo,
    },

    #[error("Scope '{scope}' does not declare a parameter '{parameter}'")]
    UnexpectedParameter {
        scope: TypeInfo,
        parameter: TypeInfo,
    },

    #[error("'{scope}' is not registered as a child of '{parent}'")]
    UnknownScope { scope: TypeInfo, parent: TypeInfo },
}
