use std::{
    fmt::Debug,
    ops::Deref,
    sync::{Arc, OnceLock, Weak},
};

use crate::{
    container::{DiContainer, DiContainerInner, DiHandle},
    errors::{InjectError, RequireError},
    resolver::Resolver,
    types::{DependencyInfo, Injectable, TypeInfo},
};

/// Lazily resolved dependency
///
/// Resolved from the scope that constructed its owner, on first access.
/// Holds the scope weakly, so a lazy dependency never keeps its scope alive.
///
/// ### Panics
///
/// [Lazy::get] and [Deref] panic if the dependency can not be resolved:
/// - It is accessed after its scope was dropped
/// - Its factory failed
///
/// Must not be accessed from inside the factory of the type it points to.
/// Doing so fails with [RequireError::CircularConstruction] wrapped in the factory's error.
///
/// Once accessed, it holds its value strongly. A lazy dependency that closes a cycle
/// therefore keeps every member of that cycle alive, even after the scope is dropped.
pub struct Lazy<T: ?Sized + Injectable>(Arc<LazyInner<T>>);

struct LazyInner<T: ?Sized + Injectable> {
    once: OnceLock<Result<Arc<T>, InjectError>>,
    scope: Weak<DiContainerInner>,
}

impl<T: ?Sized + Injectable> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}
impl<T: ?Sized + Injectable + Debug> Debug for Lazy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.once.get() {
            Some(Ok(instance)) => f.debug_tuple("Lazy").field(instance).finish(),
            Some(Err(err)) => f.debug_tuple("Lazy").field(err).finish(),
            None => f.write_str("Lazy(<unresolved>)"),
        }
    }
}
impl<T: ?Sized + Injectable> Deref for Lazy<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}
impl<T: ?Sized + Injectable> Resolver for Lazy<T> {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        Ok(Lazy(Arc::new(LazyInner {
            once: OnceLock::new(),
            scope: Arc::downgrade(&handle.container().0),
        })))
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: false,
            lazy: true,
        }
    }
}
impl<T: ?Sized + Injectable> Lazy<T> {
    /// Accesses the Lazy Dependency
    ///
    /// # Panics
    /// - When the dependency can not be resolved, see [Lazy::try_get]
    pub fn get(&self) -> &Arc<T> {
        match self.try_get() {
            Ok(instance) => instance,
            Err(err) => panic!("Lazy dependency could not be resolved: {err}"),
        }
    }

    /// Try to access the lazy dependency
    ///
    /// The first access resolves it, later ones return the same result.
    pub fn try_get(&self) -> Result<&Arc<T>, &InjectError> {
        self.0
            .once
            .get_or_init(|| match self.0.scope.upgrade() {
                Some(scope) => DiContainer(scope).require::<T>().map_err(InjectError::from),
                None => Err(InjectError::ScopeClosed),
            })
            .as_ref()
    }
}

/// Lazily resolved dependency, which may be missing or disabled
pub struct LazyOption<T: ?Sized + Injectable> {
    lazy: Lazy<T>,
}
impl<T: ?Sized + Injectable + Debug> Debug for LazyOption<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LazyOption").field(&self.lazy).finish()
    }
}
impl<T: ?Sized + Injectable> Resolver for LazyOption<T> {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        Ok(LazyOption {
            lazy: Lazy::<T>::resolve(handle)?,
        })
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo {
            type_info: TypeInfo::of::<T>(),
            optional: true,
            lazy: true,
        }
    }
}
impl<T: ?Sized + Injectable> LazyOption<T> {
    /// Accesses the Lazy Dependency - returning an error on access
    pub fn try_get(&self) -> Result<Option<&Arc<T>>, &InjectError> {
        match self.lazy.try_get() {
            Ok(instance) => Ok(Some(instance)),
            Err(InjectError::RequireError(
                RequireError::TypeDisabled(_) | RequireError::TypeMissing(_),
            )) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Accesses the Lazy Dependency
    ///
    /// # Panics
    /// - If the dependency exists but could not be resolved
    pub fn get(&self) -> Option<&Arc<T>> {
        match self.try_get() {
            Ok(instance) => instance,
            Err(err) => panic!("Accessed LazyOption after DI failure: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        builder::DiBuilder,
        scope::{ScopeDefinition, ScopeMarker, Singleton},
    };

    struct Parent {
        child: Lazy<Child>,
    }
    struct Child {
        parent: Arc<Parent>,
    }

    struct Screen;
    impl ScopeMarker for Screen {}

    struct Title(&'static str);
    struct Header {
        title: Lazy<Title>,
    }

    #[test]
    fn lazy_breaks_circular_dependencies() {
        let container = DiBuilder::new()
            .add_provider(|child: Lazy<Child>| Parent { child })
            .add_provider(|parent: Arc<Parent>| Child { parent })
            .build()
            .unwrap();

        let parent = container.require::<Parent>().unwrap();
        let child = container.require::<Child>().unwrap();

        assert!(Arc::ptr_eq(parent.child.get(), &child));
        assert!(Arc::ptr_eq(&child.parent, &parent));
    }

    #[test]
    fn accessed_lazy_cycles_outlive_their_scope() {
        let container = DiBuilder::new()
            .add_provider(|child: Lazy<Child>| Parent { child })
            .add_provider(|parent: Arc<Parent>| Child { parent })
            .build()
            .unwrap();

        let parent = container.require::<Parent>().unwrap();
        parent.child.get();
        let weak = Arc::downgrade(&parent);
        drop(parent);
        drop(container);

        assert!(weak.upgrade().is_some());
    }

    #[test]
    fn lazy_reports_closed_scope() {
        let container = DiBuilder::new()
            .add_scope(
                ScopeDefinition::new::<Screen, Singleton>()
                    .requires::<Title>()
                    .add_provider(|title: Lazy<Title>| Header { title }),
            )
            .build()
            .unwrap();

        let screen = container.scope::<Screen>().with(Title("map")).build().unwrap();
        let header = screen.require::<Header>().unwrap();
        drop(screen);

        // Only the header outlives the scope
        assert!(matches!(header.title.try_get(), Err(InjectError::ScopeClosed)));
    }

    #[test]
    fn lazy_resolves_within_open_scope() {
        let container = DiBuilder::new()
            .add_scope(
                ScopeDefinition::new::<Screen, Singleton>()
                    .requires::<Title>()
                    .add_provider(|title: Lazy<Title>| Header { title }),
            )
            .build()
            .unwrap();

        let screen = container.scope::<Screen>().with(Title("map")).build().unwrap();
        let header = screen.require::<Header>().unwrap();

        assert_eq!(header.title.get().0, "map");
    }

    #[test]
    fn lazy_option_is_none_for_unknown_types() {
        struct Footer {
            title: LazyOption<Title>,
        }

        let container = DiBuilder::new()
            .add_provider(|title: LazyOption<Title>| Footer { title })
            .build()
            .unwrap();

        let footer = container.require::<Footer>().unwrap();

        assert!(footer.title.get().is_none());
    }
}
