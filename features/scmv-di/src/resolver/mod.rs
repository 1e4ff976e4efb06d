use crate::{container::DiHandle, errors::InjectError, types::DependencyInfo};

pub mod arc;
pub mod lazy;

/// Allows custom behaviour on injection
pub trait Resolver {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized;

    fn dependency_info() -> DependencyInfo;
}
