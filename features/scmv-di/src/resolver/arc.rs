use std::sync::Arc;

use crate::{
    container::DiHandle,
    errors::{InjectError, RequireError},
    resolver::Resolver,
    types::{DependencyInfo, Injectable, TypeInfo},
};

impl<T: ?Sized + Injectable> Resolver for Arc<T> {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError> {
        Ok(handle.container().require::<T>()?)
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: false,
            lazy: false,
        }
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        match Resolvable::resolve(handle) {
            Ok(resolved) => Ok(Some(resolved)),
            Err(e) => match e {
                // If the required type is disabled, or not registered Option does not fail
                InjectError::RequireError(RequireError::TypeDisabled(_))
                | InjectError::RequireError(RequireError::TypeMissing(_)) => Ok(None),
                _ => Err(e),
            },
        }
    }

    fn dependency_info() -> DependencyInfo {
        let original = Resolvable::dependency_info();
        DependencyInfo {
            optional: true,
            ..original
        }
    }
}
