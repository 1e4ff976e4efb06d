pub mod builder;
pub mod container;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
pub mod resolver;
pub mod scope;
pub mod types;

pub use builder::DiBuilder;
pub use container::{DiContainer, DiHandle};
pub use factories::{DynFactory, InstanceFactory, ProviderFn, ResolveArgs};
pub use resolver::{
    lazy::{Lazy, LazyOption},
    Resolver,
};
pub use scope::{Lifetime, ScopeBuilder, ScopeDefinition, ScopeMarker, Singleton};
