use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use crate::{
    container::{Blueprint, DiContainer, ServiceEntry},
    dependency_graph::DependencyGraph,
    errors::BuildError,
    factories::{InstanceFactory, ProviderFn, ResolveArgs},
    scope::{ScopeDefinition, Singleton},
    types::{Injectable, Instance, TypeInfo},
};

/// Collects everything the object graph consists of
///
/// 1. Register instances, factories and bindings of the [Singleton] scope directly on the builder
/// 2. Register child scopes with [DiBuilder::add_scope]
/// 3. [DiBuilder::build] validates the whole graph and returns the root container
///
/// Nothing is constructed while building, every service is created on first request.
pub struct DiBuilder {
    /// The singleton scope
    pub(crate) root: ScopeDefinition,
    /// Child scopes, in registration order
    pub(crate) scopes: Vec<ScopeDefinition>,
}
impl Default for DiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiBuilder {
    pub fn new() -> Self {
        DiBuilder {
            root: ScopeDefinition::root(),
            scopes: Vec::new(),
        }
    }
}
impl DiBuilder {
    /// Registers an already created instance
    pub fn add_instance<T: Injectable>(mut self, instance: T) -> Self {
        self.root.instances.push(Instance::new(instance));
        self
    }

    /// Registers an already created, shared instance - `T` may be a trait object
    pub fn add_shared<T: ?Sized + Injectable>(mut self, instance: Arc<T>) -> Self {
        self.root.instances.push(Instance::from_arc(instance));
        self
    }

    pub fn add_factory<Factory: InstanceFactory + 'static>(mut self, factory: Factory) -> Self {
        self.root = self.root.add_factory(factory);
        self
    }

    pub fn add_transient<Factory: InstanceFactory + 'static>(mut self, factory: Factory) -> Self {
        self.root = self.root.add_transient(factory);
        self
    }

    pub fn add_provider<Args, F>(mut self, provider: F) -> Self
    where
        Args: ResolveArgs + 'static,
        F: ProviderFn<Args>,
    {
        self.root = self.root.add_provider(provider);
        self
    }

    pub fn add_transient_provider<Args, F>(mut self, provider: F) -> Self
    where
        Args: ResolveArgs + 'static,
        F: ProviderFn<Args>,
    {
        self.root = self.root.add_transient_provider(provider);
        self
    }

    pub fn bind<Interface, Impl>(mut self, convert: fn(Arc<Impl>) -> Arc<Interface>) -> Self
    where
        Interface: ?Sized + Injectable,
        Impl: Injectable,
    {
        self.root = self.root.bind(convert);
        self
    }

    pub fn add_scope(mut self, scope: ScopeDefinition) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Validates the graph and creates the root container
    ///
    /// Fails if a scope hierarchy is broken, or any type is duplicated, missing or part of a cycle.
    pub fn build(self) -> Result<DiContainer, BuildError> {
        self.check_scopes()?;

        let graph = DependencyGraph::new(&self)?;
        graph.check()?;

        let DiBuilder { root, scopes } = self;

        let mut services = HashMap::with_capacity(root.instances.len() + root.registrations.len());
        for instance in root.instances {
            services.insert(instance.info.type_id, ServiceEntry::Instance(instance));
        }
        for registration in &root.registrations {
            services.insert(
                registration.factory.supplies().type_id,
                ServiceEntry::from_registration(registration),
            );
        }

        tracing::debug!(
            "Built object graph with {} singletons and {} child scopes",
            services.len(),
            scopes.len()
        );

        let blueprint = Blueprint {
            scopes: scopes
                .into_iter()
                .map(|definition| (definition.info.type_id, definition))
                .collect(),
            graph,
        };

        Ok(DiContainer::new(
            root.info,
            None,
            Arc::new(blueprint),
            services,
        ))
    }

    fn check_scopes(&self) -> Result<(), BuildError> {
        let root = TypeInfo::of::<Singleton>();
        let mut parents = HashMap::with_capacity(self.scopes.len());

        for scope in &self.scopes {
            let parent = scope.parent.unwrap_or(root);
            if scope.info == root || parents.insert(scope.info, parent).is_some() {
                return Err(BuildError::DuplicateScope(scope.info));
            }
        }

        for scope in &self.scopes {
            let mut visited = HashSet::new();
            let mut current = scope.info;
            while current != root {
                if !visited.insert(current) {
                    return Err(BuildError::CircularScope(scope.info));
                }
                match parents.get(&current) {
                    Some(parent) => current = *parent,
                    None => {
                        return Err(BuildError::UnknownParentScope {
                            scope: scope.info,
                            parent: current,
                        })
                    }
                }
            }
        }

        Ok(())
    }
}
