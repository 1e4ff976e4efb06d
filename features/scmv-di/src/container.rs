use std::{
    any::{type_name, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, OnceLock, PoisonError},
    thread::{self, ThreadId},
};

use crate::{
    dependency_graph::DependencyGraph,
    errors::{InjectError, RequireError},
    factories::DynFactory,
    resolver::Resolver,
    scope::{Lifetime, Registration, ScopeBuilder, ScopeDefinition, ScopeMarker},
    types::{Injectable, Instance, TypeInfo},
};

/// Everything the builder validated, shared by every container of the tree
pub(crate) struct Blueprint {
    pub(crate) scopes: HashMap<TypeId, ScopeDefinition>,
    pub(crate) graph: DependencyGraph,
}

pub(crate) enum ServiceEntry {
    /// Pre built instance or scope parameter
    Instance(Instance),
    Scoped(MemoizedSlot),
    Transient(Arc<dyn DynFactory>),
}

/// Memoized product of a factory - None once constructed means the factory is disabled
pub(crate) struct MemoizedSlot {
    factory: Arc<dyn DynFactory>,
    once: OnceLock<Option<Instance>>,
    construction: Mutex<()>,
    /// Thread currently running the factory
    builder: Mutex<Option<ThreadId>>,
}

/// Marks a slot as being built by the current thread until dropped
struct Building<'a>(&'a Mutex<Option<ThreadId>>);
impl<'a> Building<'a> {
    fn start(builder: &'a Mutex<Option<ThreadId>>) -> Self {
        *builder.lock().unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
        Self(builder)
    }
}
impl Drop for Building<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl ServiceEntry {
    pub(crate) fn from_registration(registration: &Registration) -> Self {
        match registration.lifetime {
            Lifetime::Scoped => ServiceEntry::Scoped(MemoizedSlot {
                factory: registration.factory.clone(),
                once: OnceLock::new(),
                construction: Mutex::new(()),
                builder: Mutex::new(None),
            }),
            Lifetime::Transient => ServiceEntry::Transient(registration.factory.clone()),
        }
    }
}

/// Container of one scope
///
/// Cloning is cheap, all clones share the same instances.
/// A child container keeps its parent alive.
#[derive(Clone)]
pub struct DiContainer(pub(crate) Arc<DiContainerInner>);
pub(crate) struct DiContainerInner {
    scope: TypeInfo,
    parent: Option<DiContainer>,
    blueprint: Arc<Blueprint>,
    services: HashMap<TypeId, ServiceEntry>,
}
impl Debug for DiContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct(self.0.scope.type_name);
        for entry in self.0.services.values() {
            let (info, state) = match entry {
                ServiceEntry::Instance(instance) => (instance.info, "instance"),
                ServiceEntry::Scoped(slot) => (
                    slot.factory.supplies(),
                    match slot.once.get() {
                        Some(Some(_)) => "constructed",
                        Some(None) => "disabled",
                        None => "pending",
                    },
                ),
                ServiceEntry::Transient(factory) => (factory.supplies(), "transient"),
            };
            map.field(info.type_name, &state);
        }
        map.finish()
    }
}

impl DiContainer {
    pub(crate) fn new(
        scope: TypeInfo,
        parent: Option<DiContainer>,
        blueprint: Arc<Blueprint>,
        services: HashMap<TypeId, ServiceEntry>,
    ) -> Self {
        Self(Arc::new(DiContainerInner {
            scope,
            parent,
            blueprint,
            services,
        }))
    }

    /// Attempts to get the requested type
    ///
    /// Looks in this scope first, then in its parents.
    /// Memoized types are constructed on first request, in the scope that owns them.
    pub fn require<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, RequireError> {
        self.require_instance(TypeInfo::of::<T>())?
            .downcast()
            .map_err(|actual_type| RequireError::DowncastFailed {
                required_type: type_name::<T>(),
                actual_type,
            })
    }

    /// Resolves anything implementing [Resolver] - e.g. `Option<Arc<T>>` or [crate::Lazy]
    pub fn resolve<T: Resolver>(&self) -> Result<T, InjectError> {
        T::resolve(&DiHandle::new(self.clone()))
    }

    /// Starts opening a child scope of type `S`
    pub fn scope<S: ScopeMarker>(&self) -> ScopeBuilder {
        ScopeBuilder::new(self.clone(), TypeInfo::of::<S>())
    }

    /// Constructs every memoized type of this scope, dependencies first
    pub fn initialize_all(&self) -> Result<(), RequireError> {
        for info in self.graph().topological_order_of(self.0.scope.type_id) {
            if let Some(ServiceEntry::Scoped(_)) = self.0.services.get(&info.type_id) {
                match self.require_instance(info) {
                    Ok(_) | Err(RequireError::TypeDisabled(_)) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.0.blueprint.graph
    }

    pub fn scope_info(&self) -> TypeInfo {
        self.0.scope
    }

    pub fn parent(&self) -> Option<&DiContainer> {
        self.0.parent.as_ref()
    }

    pub(crate) fn blueprint(&self) -> &Arc<Blueprint> {
        &self.0.blueprint
    }

    pub(crate) fn require_instance(&self, info: TypeInfo) -> Result<Instance, RequireError> {
        let mut current = self;
        loop {
            if let Some(entry) = current.0.services.get(&info.type_id) {
                return current.resolve_entry(info, entry);
            }
            match &current.0.parent {
                Some(parent) => current = parent,
                None => return Err(RequireError::TypeMissing(info.type_name)),
            }
        }
    }

    fn resolve_entry(&self, info: TypeInfo, entry: &ServiceEntry) -> Result<Instance, RequireError> {
        let produced = match entry {
            ServiceEntry::Instance(instance) => return Ok(instance.clone()),
            ServiceEntry::Transient(factory) => self.construct(factory.as_ref())?,
            ServiceEntry::Scoped(slot) => self.resolve_memoized(slot)?,
        };

        produced.ok_or(RequireError::TypeDisabled(info.type_name))
    }

    fn resolve_memoized(&self, slot: &MemoizedSlot) -> Result<Option<Instance>, RequireError> {
        if let Some(produced) = slot.once.get() {
            return Ok(produced.clone());
        }

        // Requested again from its own factory, e.g. through a lazy dependency
        let builder = *slot.builder.lock().unwrap_or_else(PoisonError::into_inner);
        if builder == Some(thread::current().id()) {
            let product = slot.factory.supplies().type_name;
            tracing::debug!("{product} was required while it is being constructed");
            return Err(RequireError::CircularConstruction(product));
        }

        // Lock construction, so only one thread runs the factory
        let _guard = slot
            .construction
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Double check once - it might have been set while we waited for the lock
        if let Some(produced) = slot.once.get() {
            return Ok(produced.clone());
        }

        // Failures are not memoized, the next request runs the factory again
        let building = Building::start(&slot.builder);
        let produced = self.construct(slot.factory.as_ref());
        drop(building);
        let produced = produced?;
        if slot.once.set(produced.clone()).is_err() {
            unreachable!("holding the construction lock - this can't be set twice");
        }

        Ok(produced)
    }

    fn construct(&self, factory: &dyn DynFactory) -> Result<Option<Instance>, RequireError> {
        let info = factory.supplies();
        let handle = DiHandle::new(self.clone());
        let failed = |error| RequireError::FactoryFailed {
            product: info.type_name,
            error: Arc::new(error),
        };

        if !factory.is_enabled(&handle).map_err(failed)? {
            tracing::debug!("Factory for {} is disabled", info.type_name);
            return Ok(None);
        }

        match factory.construct(&handle) {
            Ok(instance) => {
                tracing::debug!(
                    "Constructed instance of {} in {}",
                    instance.info.type_name,
                    self.0.scope
                );
                Ok(Some(instance))
            }
            Err(error) => {
                tracing::error!("Factory for {} failed: {}", info.type_name, error);
                Err(failed(error))
            }
        }
    }
}

/// DI Handle for resolving dependencies while a factory constructs its product.
///
/// Resolves from the scope owning the factory, so a product never sees types of narrower scopes.
#[derive(Clone)]
pub struct DiHandle {
    container: DiContainer,
}
impl DiHandle {
    pub(crate) fn new(container: DiContainer) -> Self {
        Self { container }
    }

    pub fn resolve<T: Resolver>(&self) -> Result<T, InjectError> {
        T::resolve(self)
    }

    pub fn require<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, InjectError> {
        Ok(self.container.require::<T>()?)
    }

    pub fn container(&self) -> &DiContainer {
        &self.container
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier,
        },
        thread,
    };

    use super::*;
    use crate::{
        builder::DiBuilder,
        errors::ScopeError,
        scope::{ScopeDefinition, Singleton},
    };

    struct Screen;
    impl ScopeMarker for Screen {}

    struct Worker;
    impl ScopeMarker for Worker {}

    struct Connection;
    struct ScreenName(&'static str);
    struct Presenter {
        name: Arc<ScreenName>,
        connection: Arc<Connection>,
    }

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }
    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    fn screen_graph(presenters: Arc<AtomicUsize>) -> DiContainer {
        DiBuilder::new()
            .add_provider(|| Connection)
            .add_scope(
                ScopeDefinition::new::<Screen, Singleton>()
                    .requires::<ScreenName>()
                    .add_provider(move |name: Arc<ScreenName>, connection: Arc<Connection>| {
                        presenters.fetch_add(1, Ordering::SeqCst);
                        Presenter { name, connection }
                    }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn singletons_are_identical() {
        let container = screen_graph(Arc::default());

        let first = container.require::<Connection>().unwrap();
        let second = container.clone().require::<Connection>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn sibling_scopes_share_singletons_only() {
        let container = screen_graph(Arc::default());

        let map = container.scope::<Screen>().with(ScreenName("map")).build().unwrap();
        let login = container.scope::<Screen>().with(ScreenName("login")).build().unwrap();

        let map_presenter = map.require::<Presenter>().unwrap();
        let login_presenter = login.require::<Presenter>().unwrap();

        assert!(!Arc::ptr_eq(&map_presenter, &login_presenter));
        assert!(Arc::ptr_eq(&map_presenter.connection, &login_presenter.connection));
        assert_eq!(map_presenter.name.0, "map");
        assert_eq!(login_presenter.name.0, "login");
        assert!(Arc::ptr_eq(&map_presenter, &map.require::<Presenter>().unwrap()));
    }

    #[test]
    fn missing_parameter_fails_before_construction() {
        let presenters = Arc::new(AtomicUsize::new(0));
        let container = screen_graph(presenters.clone());

        let result = container.scope::<Screen>().build();

        assert!(matches!(
            result,
            Err(ScopeError::MissingParameter { parameter, .. }) if parameter == TypeInfo::of::<ScreenName>()
        ));
        assert_eq!(presenters.load(Ordering::SeqCst), 0);
        // Singletons are untouched as well
        assert!(matches!(container.0.services[&TypeId::of::<Connection>()], ServiceEntry::Scoped(ref slot) if slot.once.get().is_none()));
    }

    #[test]
    fn it_rejects_unknown_scopes_and_parameters() {
        let container = screen_graph(Arc::default());

        assert!(matches!(
            container.scope::<Worker>().build(),
            Err(ScopeError::UnknownScope { .. })
        ));
        assert!(matches!(
            container
                .scope::<Screen>()
                .with(ScreenName("map"))
                .with(Connection)
                .build(),
            Err(ScopeError::UnexpectedParameter { .. })
        ));

        // Screen is a child of the root, not of another screen
        let screen = container.scope::<Screen>().with(ScreenName("map")).build().unwrap();
        assert!(matches!(
            screen.scope::<Screen>().with(ScreenName("nested")).build(),
            Err(ScopeError::UnknownScope { .. })
        ));
    }

    #[test]
    fn parent_never_sees_child_types() {
        let container = screen_graph(Arc::default());
        let screen = container.scope::<Screen>().with(ScreenName("map")).build().unwrap();

        assert!(screen.require::<Presenter>().is_ok());
        assert!(matches!(
            container.require::<Presenter>(),
            Err(RequireError::TypeMissing(_))
        ));
        assert!(matches!(
            container.require::<ScreenName>(),
            Err(RequireError::TypeMissing(_))
        ));
    }

    #[test]
    fn concurrent_first_access_constructs_once() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = constructed.clone();
        let container = DiBuilder::new()
            .add_provider(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(20));
                Connection
            })
            .build()
            .unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles = (0..8)
            .map(|_| {
                let container = container.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    container.require::<Connection>().unwrap()
                })
            })
            .collect::<Vec<_>>();

        let instances = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn transients_are_constructed_on_every_request() {
        let container = DiBuilder::new()
            .add_provider(|| Connection)
            .add_transient_provider(|connection: Arc<Connection>| Presenter {
                name: Arc::new(ScreenName("transient")),
                connection,
            })
            .build()
            .unwrap();

        let first = container.require::<Presenter>().unwrap();
        let second = container.require::<Presenter>().unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.connection, &second.connection));
    }

    #[test]
    fn bindings_share_the_implementation() {
        let container = DiBuilder::new()
            .add_provider(|| English)
            .bind::<dyn Greeter, English>(|english| english)
            .build()
            .unwrap();

        let greeter = container.require::<dyn Greeter>().unwrap();
        let english = container.require::<English>().unwrap();

        assert_eq!(greeter.greet(), "hello");
        assert!(std::ptr::addr_eq(Arc::as_ptr(&greeter), Arc::as_ptr(&english)));
    }

    #[test]
    fn failed_construction_is_retried() {
        struct Flaky;
        let attempts = Arc::new(AtomicUsize::new(0));

        struct FlakyFactory(Arc<AtomicUsize>);
        impl crate::factories::InstanceFactory for FlakyFactory {
            type Provides = Flaky;

            fn get_dependencies() -> Vec<crate::types::DependencyInfo> {
                vec![]
            }

            fn construct(&self, _: &DiHandle) -> Result<Flaky, InjectError> {
                match self.0.fetch_add(1, Ordering::SeqCst) {
                    0 => Err(InjectError::other("not yet")),
                    _ => Ok(Flaky),
                }
            }
        }

        let container = DiBuilder::new()
            .add_factory(FlakyFactory(attempts.clone()))
            .build()
            .unwrap();

        assert!(matches!(
            container.require::<Flaky>(),
            Err(RequireError::FactoryFailed { .. })
        ));
        let first = container.require::<Flaky>().unwrap();
        let second = container.require::<Flaky>().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn initialize_all_constructs_dependencies_first() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());

        let container = DiBuilder::new()
            .add_provider(move |connection: Arc<Connection>| {
                a.lock().unwrap().push("name");
                let _ = connection;
                ScreenName("root")
            })
            .add_provider(move || {
                b.lock().unwrap().push("connection");
                Connection
            })
            .build()
            .unwrap();

        container.initialize_all().unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["connection", "name"]);
    }

    #[test]
    fn reentrant_construction_fails_instead_of_blocking() {
        struct Source;
        struct Sink(#[allow(dead_code)] Arc<Source>);

        // Reads its lazy dependency while being constructed
        struct SourceFactory;
        impl crate::factories::InstanceFactory for SourceFactory {
            type Provides = Source;

            fn get_dependencies() -> Vec<crate::types::DependencyInfo> {
                vec![crate::Lazy::<Sink>::dependency_info()]
            }

            fn construct(&self, di: &DiHandle) -> Result<Source, InjectError> {
                let sink: crate::Lazy<Sink> = di.resolve()?;
                sink.try_get().map_err(InjectError::clone)?;
                Ok(Source)
            }
        }

        let container = DiBuilder::new()
            .add_factory(SourceFactory)
            .add_provider(|source: Arc<Source>| Sink(source))
            .build()
            .unwrap();

        let (sender, receiver) = std::sync::mpsc::channel();
        let worker = container.clone();
        thread::spawn(move || {
            let _ = sender.send(worker.require::<Source>().map(|_| ()));
        });
        let result = receiver
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("construction should not block");

        match result {
            Err(RequireError::FactoryFailed { product, error }) => {
                assert_eq!(product, type_name::<Source>());
                assert!(error.to_string().contains("while it is being constructed"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // The slot is released again
        assert!(matches!(
            container.require::<Source>(),
            Err(RequireError::FactoryFailed { .. })
        ));
    }
}
