use scmv_di::types::TypeInfo;

/// Errors of the config registry
#[derive(thiserror::Error, Debug, Clone)]
pub enum ConfigError {
    /// A config of this type has been registered before
    #[error("Config '{0}' is already registered")]
    ConfigAlreadyRegistered(TypeInfo),
    /// The stored config does not have the type it is registered under
    #[error("Config '{0}' is stored with a different type")]
    ConfigMismatch(TypeInfo),
}
