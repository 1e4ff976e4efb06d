use std::{collections::HashMap, sync::Arc};

use crate::{
    container::{DiContainer, ServiceEntry},
    errors::ScopeError,
    factories::{Binding, DynFactory, FnFactory, InstanceFactory, ProviderFn, ResolveArgs},
    types::{Injectable, Instance, TypeInfo},
};

/// Names a lifetime boundary of the object graph
///
/// Implement it on a unit struct and register a [ScopeDefinition] for it.
pub trait ScopeMarker: Send + Sync + 'static {}

/// The root scope - lives as long as the process, every container tree starts here
pub struct Singleton;
impl ScopeMarker for Singleton {}

/// How often a registered factory is invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Once per scope instance, memoized
    Scoped,
    /// On every resolution
    Transient,
}

#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) factory: Arc<dyn DynFactory>,
    pub(crate) lifetime: Lifetime,
}

/// Declares a child scope: its parent, the parameters its host must supply and the
/// services it owns.
///
/// # Example
/// ```rust
/// use scmv_di::{DiBuilder, ScopeDefinition, ScopeMarker, Singleton};
/// use std::sync::Arc;
///
/// struct RequestScope;
/// impl ScopeMarker for RequestScope {}
///
/// struct RequestId(u64);
/// struct Greeting(String);
///
/// let container = DiBuilder::new()
///     .add_scope(
///         ScopeDefinition::new::<RequestScope, Singleton>()
///             .requires::<RequestId>()
///             .add_provider(|id: Arc<RequestId>| Greeting(format!("request {}", id.0))),
///     )
///     .build()
///     .unwrap();
///
/// let request = container.scope::<RequestScope>().with(RequestId(7)).build().unwrap();
/// assert_eq!(request.require::<Greeting>().unwrap().0, "request 7");
/// ```
pub struct ScopeDefinition {
    pub(crate) info: TypeInfo,
    pub(crate) parent: Option<TypeInfo>,
    /// Parameters the host must hand over when opening the scope
    pub(crate) required: Vec<TypeInfo>,
    /// Pre built instances - only the root scope has them
    pub(crate) instances: Vec<Instance>,
    pub(crate) registrations: Vec<Registration>,
}

impl ScopeDefinition {
    pub fn new<S: ScopeMarker, Parent: ScopeMarker>() -> Self {
        Self {
            info: TypeInfo::of::<S>(),
            parent: Some(TypeInfo::of::<Parent>()),
            required: Vec::new(),
            instances: Vec::new(),
            registrations: Vec::new(),
        }
    }

    pub(crate) fn root() -> Self {
        Self {
            info: TypeInfo::of::<Singleton>(),
            parent: None,
            required: Vec::new(),
            instances: Vec::new(),
            registrations: Vec::new(),
        }
    }

    /// The scope can only be opened once a `P` is supplied
    pub fn requires<P: ?Sized + Injectable>(mut self) -> Self {
        self.required.push(TypeInfo::of::<P>());
        self
    }

    /// Registers a factory whose product is memoized per scope instance
    pub fn add_factory<Factory: InstanceFactory + 'static>(self, factory: Factory) -> Self {
        self.register(Arc::new(factory), Lifetime::Scoped)
    }

    /// Registers a factory invoked on every resolution
    pub fn add_transient<Factory: InstanceFactory + 'static>(self, factory: Factory) -> Self {
        self.register(Arc::new(factory), Lifetime::Transient)
    }

    /// Registers a function whose arguments are resolved from the container
    pub fn add_provider<Args, F>(self, provider: F) -> Self
    where
        Args: ResolveArgs + 'static,
        F: ProviderFn<Args>,
    {
        self.register(Arc::new(FnFactory::new(provider)), Lifetime::Scoped)
    }

    /// Same as [ScopeDefinition::add_provider], but invoked on every resolution
    pub fn add_transient_provider<Args, F>(self, provider: F) -> Self
    where
        Args: ResolveArgs + 'static,
        F: ProviderFn<Args>,
    {
        self.register(Arc::new(FnFactory::new(provider)), Lifetime::Transient)
    }

    /// Exposes `Impl` as `Interface`, sharing the instance of `Impl`
    pub fn bind<Interface, Impl>(self, convert: fn(Arc<Impl>) -> Arc<Interface>) -> Self
    where
        Interface: ?Sized + Injectable,
        Impl: Injectable,
    {
        self.register(Arc::new(Binding::new(convert)), Lifetime::Scoped)
    }

    fn register(mut self, factory: Arc<dyn DynFactory>, lifetime: Lifetime) -> Self {
        self.registrations.push(Registration { factory, lifetime });
        self
    }
}

/// Opens a child scope below a container
///
/// All required parameters are checked in [ScopeBuilder::build], before anything is constructed.
pub struct ScopeBuilder {
    parent: DiContainer,
    scope: TypeInfo,
    parameters: Vec<Instance>,
}

impl ScopeBuilder {
    pub(crate) fn new(parent: DiContainer, scope: TypeInfo) -> Self {
        Self {
            parent,
            scope,
            parameters: Vec::new(),
        }
    }

    /// Supplies a scope parameter
    pub fn with<P: Injectable>(self, parameter: P) -> Self {
        self.with_arc(Arc::new(parameter))
    }

    /// Supplies an already shared scope parameter
    pub fn with_arc<P: ?Sized + Injectable>(mut self, parameter: Arc<P>) -> Self {
        let instance = Instance::from_arc(parameter);
        self.parameters
            .retain(|existing| existing.info != instance.info);
        self.parameters.push(instance);
        self
    }

    pub fn build(self) -> Result<DiContainer, ScopeError> {
        let parent_scope = self.parent.scope_info();
        let blueprint = self.parent.blueprint().clone();

        let definition = match blueprint.scopes.get(&self.scope.type_id) {
            Some(definition) if definition.parent == Some(parent_scope) => definition,
            _ => {
                return Err(ScopeError::UnknownScope {
                    scope: self.scope,
                    parent: parent_scope,
                })
            }
        };

        let mut services = HashMap::with_capacity(
            definition.required.len() + definition.registrations.len(),
        );

        for parameter in self.parameters {
            if !definition.required.contains(&parameter.info) {
                return Err(ScopeError::UnexpectedParameter {
                    scope: self.scope,
                    parameter: parameter.info,
                });
            }
            services.insert(parameter.info.type_id, ServiceEntry::Instance(parameter));
        }

        if let Some(missing) = definition
            .required
            .iter()
            .find(|required| !services.contains_key(&required.type_id))
        {
            tracing::debug!("Scope {} is missing parameter {}", self.scope, missing);
            return Err(ScopeError::MissingParameter {
                scope: self.scope,
                parameter: *missing,
            });
        }

        for registration in &definition.registrations {
            services.insert(
                registration.factory.supplies().type_id,
                ServiceEntry::from_registration(registration),
            );
        }

        tracing::debug!(
            "Opened scope {} below {} with {} services",
            self.scope,
            parent_scope,
            services.len()
        );

        Ok(DiContainer::new(
            self.scope,
            Some(self.parent),
            blueprint,
            services,
        ))
    }
}
