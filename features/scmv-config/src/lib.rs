//! Scmv Config provides a registry of config sections that can be injected in the rest of the
//! object graph.
//!
//! Scmv Config is split into two major parts:
//! 1. ConfigProvider: Used to create the registry of all configs
//! 2. Config<T>: A wrapper type to be able to resolve and retrieve configs
//!
//! # Examples
//!
//! ```rust
//! use scmv_config::provider::ConfigProvider;
//!
//! #[derive(Clone)]
//! struct SocketConfig {
//!     url: String,
//!     reconnect_delay_ms: u64,
//! }
//!
//! let socket_config = SocketConfig {
//!     url: "wss://localhost:4445".to_string(),
//!     reconnect_delay_ms: 5000,
//! };
//!
//! let mut config_provider = ConfigProvider::default();
//! config_provider.add_config(socket_config.clone()).unwrap();
//!
//! let retrieved = config_provider.get_config::<SocketConfig>().unwrap().unwrap();
//!
//! assert_eq!(socket_config.url, retrieved.url);
//! assert_eq!(socket_config.reconnect_delay_ms, retrieved.reconnect_delay_ms);
//! ```

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use provider::ConfigProvider;
