//! Configuration module

pub mod settings;

pub use settings::{
    DatasetConfig, DispatcherConfig, HealthCheckConfig, LoggingConfig, NodeConfig, ServerConfig,
    Settings,
};
