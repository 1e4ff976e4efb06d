use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// All errors must be Send + Sync
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Instances are shared between scopes and threads
/// So anything injectable needs to be Send + Sync + 'static
///
/// Unsized types (`dyn Trait`) are injectable as well, they are handed out as `Arc<dyn Trait>`.
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Instance of a Provider
///
/// Stores an `Arc<T>` behind `dyn Any`, so `T` may be unsized.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub(crate) fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub(crate) fn from_arc<T: ?Sized + Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(instance),
        }
    }

    pub fn downcast<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match self.instance.downcast_ref::<Arc<T>>() {
            Some(downcasted) => Ok(downcasted.clone()),
            None => Err(self.info.type_name),
        }
    }
}

/// Information about a Factory dependency
#[derive(Debug, Clone, Copy)]
pub struct DependencyInfo {
    /// The required Type
    pub type_info: TypeInfo,
    /// If it is optional or required
    pub optional: bool,
    /// If the Dependency is injected lazily
    pub lazy: bool,
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn it_downcasts_sized_instances() {
        let instance = Instance::new(42_u32);

        assert_eq!(*instance.downcast::<u32>().unwrap(), 42);
        assert_eq!(instance.downcast::<i64>().unwrap_err(), "u32");
    }

    #[test]
    fn it_downcasts_trait_objects() {
        let greeter: Arc<dyn Greeter> = Arc::new(English);
        let instance = Instance::from_arc(greeter.clone());

        let resolved = instance.downcast::<dyn Greeter>().unwrap();

        assert_eq!(resolved.greet(), "hello");
        assert!(Arc::ptr_eq(&resolved, &greeter));
        assert_eq!(instance.info, TypeInfo::of::<dyn Greeter>());
    }
}
