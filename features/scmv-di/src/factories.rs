use std::{convert::Infallible, marker::PhantomData, sync::Arc};

use crate::{
    container::DiHandle,
    errors::InjectError,
    resolver::Resolver,
    types::{DependencyInfo, DynError, Injectable, Instance, TypeInfo},
};

/// A Factory providing instances of a given type
pub trait InstanceFactory: Send + Sync {
    type Provides: Injectable;

    /// Returns the typeinfo about the factory's provided type
    fn supplies() -> TypeInfo {
        TypeInfo::of::<Self::Provides>()
    }

    /// Returns a list of dependencies the factory requires to supply it's type
    fn get_dependencies() -> Vec<DependencyInfo>;

    /// Constructs a new instance of the factory's provided type
    ///
    /// Returns the constructed instance, or an error if either Dependencies are not satisfied or the Instantiation failed
    fn construct(&self, di: &DiHandle) -> Result<Self::Provides, impl Into<DynError>>;

    /// Returns a boolean indicating whether the factory is enabled or not
    fn is_enabled(&self, di: &DiHandle) -> Result<bool, impl Into<DynError>> {
        let _ = di;
        Ok::<_, Infallible>(true)
    }
}

/// Wrapper Trait for factories, providing instances of Any
pub trait DynFactory: Send + Sync {
    fn supplies(&self) -> TypeInfo;

    /// Returns a list of dependencies for the factory
    fn dependencies(&self) -> Vec<DependencyInfo>;

    /// Constructs a new instance of the factory's provided type, fulfilling all its dependencies
    fn construct(&self, di: &DiHandle) -> Result<Instance, DynError>;

    /// Returns a boolean indicating whether the factory is enabled or not
    fn is_enabled(&self, di: &DiHandle) -> Result<bool, DynError>;
}
// Impl DynFactory for any InstanceFactory
impl<T: Injectable, SpecificFactory: InstanceFactory<Provides = T>> DynFactory for SpecificFactory {
    fn supplies(&self) -> TypeInfo {
        SpecificFactory::supplies()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        SpecificFactory::get_dependencies()
    }

    fn construct(&self, di: &DiHandle) -> Result<Instance, DynError> {
        // Forward the call to the specific implementation
        SpecificFactory::construct(self, di)
            .map(Instance::new)
            .map_err(|e| e.into())
    }

    fn is_enabled(&self, di: &DiHandle) -> Result<bool, DynError> {
        SpecificFactory::is_enabled(self, di).map_err(|e| e.into())
    }
}

/// A tuple of [Resolver]s, resolved in order
pub trait ResolveArgs: Sized {
    fn dependencies() -> Vec<DependencyInfo>;

    fn resolve(di: &DiHandle) -> Result<Self, InjectError>;
}

impl ResolveArgs for () {
    fn dependencies() -> Vec<DependencyInfo> {
        Vec::new()
    }

    fn resolve(_: &DiHandle) -> Result<Self, InjectError> {
        Ok(())
    }
}

macro_rules! define_resolve_args ({ $($param:ident)* } => {
    impl<$($param: Resolver,)*> ResolveArgs for ($($param,)*) {
        fn dependencies() -> Vec<DependencyInfo> {
            vec![$($param::dependency_info(),)*]
        }

        fn resolve(di: &DiHandle) -> Result<Self, InjectError> {
            Ok(($($param::resolve(di)?,)*))
        }
    }
});

define_resolve_args! { T1 }
define_resolve_args! { T1 T2 }
define_resolve_args! { T1 T2 T3 }
define_resolve_args! { T1 T2 T3 T4 }
define_resolve_args! { T1 T2 T3 T4 T5 }

/// A plain function building a product from resolved arguments
pub trait ProviderFn<Args>: Send + Sync + 'static {
    type Output: Injectable;

    fn call(&self, args: Args) -> Self::Output;
}

impl<F, R> ProviderFn<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: Injectable,
{
    type Output = R;

    fn call(&self, _: ()) -> Self::Output {
        self()
    }
}

macro_rules! define_provider_fn ({ $($param:ident)* } => {
    impl<F, R, $($param,)*> ProviderFn<($($param,)*)> for F
    where
        F: Fn($($param),*) -> R + Send + Sync + 'static,
        R: Injectable,
    {
        type Output = R;

        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Self::Output {
            (self)($($param,)*)
        }
    }
});

define_provider_fn! { T1 }
define_provider_fn! { T1 T2 }
define_provider_fn! { T1 T2 T3 }
define_provider_fn! { T1 T2 T3 T4 }
define_provider_fn! { T1 T2 T3 T4 T5 }

/// Adapts a [ProviderFn] to an [InstanceFactory]
pub(crate) struct FnFactory<F, Args> {
    provider: F,
    _args: PhantomData<fn() -> Args>,
}
impl<F, Args> FnFactory<F, Args> {
    pub(crate) fn new(provider: F) -> Self {
        Self {
            provider,
            _args: PhantomData,
        }
    }
}
impl<F, Args> InstanceFactory for FnFactory<F, Args>
where
    Args: ResolveArgs + 'static,
    F: ProviderFn<Args>,
{
    type Provides = F::Output;

    fn get_dependencies() -> Vec<DependencyInfo> {
        Args::dependencies()
    }

    fn construct(&self, di: &DiHandle) -> Result<Self::Provides, InjectError> {
        let args = Args::resolve(di)?;
        Ok(self.provider.call(args))
    }
}

/// Supplies `Interface` by converting the instance of `Impl`
pub(crate) struct Binding<Interface: ?Sized, Impl> {
    convert: fn(Arc<Impl>) -> Arc<Interface>,
}
impl<Interface: ?Sized, Impl> Binding<Interface, Impl> {
    pub(crate) fn new(convert: fn(Arc<Impl>) -> Arc<Interface>) -> Self {
        Self { convert }
    }
}
impl<Interface, Impl> DynFactory for Binding<Interface, Impl>
where
    Interface: ?Sized + Injectable,
    Impl: Injectable,
{
    fn supplies(&self) -> TypeInfo {
        TypeInfo::of::<Interface>()
    }

    fn dependencies(&self) -> Vec<DependencyInfo> {
        vec![Arc::<Impl>::dependency_info()]
    }

    fn construct(&self, di: &DiHandle) -> Result<Instance, DynError> {
        let implementation = di.require::<Impl>()?;
        Ok(Instance::from_arc((self.convert)(implementation)))
    }

    fn is_enabled(&self, _: &DiHandle) -> Result<bool, DynError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builder::DiBuilder, errors::RequireError};

    struct Engine {
        cylinders: u8,
    }

    struct Car {
        engine: Arc<Engine>,
    }

    struct EngineFactory {
        cylinders: u8,
    }
    impl InstanceFactory for EngineFactory {
        type Provides = Engine;

        fn get_dependencies() -> Vec<DependencyInfo> {
            vec![]
        }

        fn construct(&self, _: &DiHandle) -> Result<Engine, Infallible> {
            Ok(Engine {
                cylinders: self.cylinders,
            })
        }
    }

    struct DisabledFactory;
    impl InstanceFactory for DisabledFactory {
        type Provides = Car;

        fn get_dependencies() -> Vec<DependencyInfo> {
            vec![Arc::<Engine>::dependency_info()]
        }

        fn construct(&self, di: &DiHandle) -> Result<Car, InjectError> {
            Ok(Car {
                engine: di.resolve()?,
            })
        }

        fn is_enabled(&self, _: &DiHandle) -> Result<bool, Infallible> {
            Ok(false)
        }
    }

    #[test]
    fn it_derives_dependencies_from_provider_arguments() {
        let dependencies = <(Arc<Engine>, Option<Arc<Car>>)>::dependencies();

        assert_eq!(dependencies.len(), 2);
        assert_eq!(dependencies[0].type_info, TypeInfo::of::<Engine>());
        assert!(!dependencies[0].optional);
        assert_eq!(dependencies[1].type_info, TypeInfo::of::<Car>());
        assert!(dependencies[1].optional);
    }

    #[test]
    fn it_constructs_through_providers() {
        let container = DiBuilder::new()
            .add_factory(EngineFactory { cylinders: 6 })
            .add_provider(|engine: Arc<Engine>| Car { engine })
            .build()
            .unwrap();

        let car = container.require::<Car>().unwrap();

        assert_eq!(car.engine.cylinders, 6);
        assert!(Arc::ptr_eq(&car.engine, &container.require::<Engine>().unwrap()));
    }

    #[test]
    fn disabled_factories_resolve_as_disabled() {
        let container = DiBuilder::new()
            .add_factory(EngineFactory { cylinders: 4 })
            .add_factory(DisabledFactory)
            .build()
            .unwrap();

        assert!(matches!(
            container.require::<Car>(),
            Err(RequireError::TypeDisabled(_))
        ));
        assert!(container.resolve::<Option<Arc<Car>>>().unwrap().is_none());
    }
}
