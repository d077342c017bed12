//! # VitalTwin管理模块
//!
//! 提供系统配置的加载、验证、保存，以及日志初始化。

pub mod config;
pub mod logging;

pub use config::{ConfigManager, ConfigValidator, LoggingConfig, StoreConfig, VitalTwinConfig};
pub use logging::{init_tracing, scoped_tracing};
