use std::{any::type_name, ops::Deref, sync::Arc};

use scmv_di::{
    container::DiHandle,
    errors::{InjectError, RequireError},
    resolver::Resolver,
    types::{DependencyInfo, TypeInfo},
};

use crate::provider::ConfigProvider;

/// A wrapper type to allow for config injections
///
/// Reads the config section `T` from the [ConfigProvider] registered in the container.
/// A missing section resolves like a missing type, so `Option<Config<T>>` is `None` for it.
///
/// # Example
/// ```rust
/// use scmv_config::{config::Config, provider::ConfigProvider};
/// use scmv_di::DiBuilder;
///
/// struct ClientConfig {
///     url: String,
/// }
/// struct Client {
///     url: String,
/// }
///
/// let mut configs = ConfigProvider::new();
/// configs
///     .add_config(ClientConfig { url: "wss://localhost".into() })
///     .unwrap();
///
/// let container = DiBuilder::new()
///     .add_instance(configs)
///     .add_provider(|config: Config<ClientConfig>| Client { url: config.url.clone() })
///     .build()
///     .unwrap();
///
/// assert_eq!(container.require::<Client>().unwrap().url, "wss://localhost");
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Send + Sync + 'static> Resolver for Config<T> {
    fn resolve(handle: &DiHandle) -> Result<Self, InjectError>
    where
        Self: Sized,
    {
        let config_provider = handle.require::<ConfigProvider>()?;

        let config: Arc<T> = config_provider
            .get_config()
            .map_err(InjectError::other)?
            .ok_or(RequireError::TypeMissing(type_name::<T>()))?;

        Ok(Config { inner: config })
    }

    fn dependency_info() -> DependencyInfo {
        DependencyInfo {
            type_info: TypeInfo::of::<ConfigProvider>(),
            optional: false,
            lazy: false,
        }
    }
}
