//! 日志初始化

use crate::config::LoggingConfig;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局 tracing 订阅者
///
/// `RUST_LOG` 优先于配置中的级别。重复调用时返回 `false`，不会 panic。
pub fn init_tracing(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .try_init()
        .is_ok()
}

/// 在当前线程安装临时订阅者，覆盖全局订阅者安装之前的阶段（如加载配置）
///
/// 返回的 guard 被丢弃后恢复原订阅者。
pub fn scoped_tracing(config: &LoggingConfig) -> DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let config = LoggingConfig::default();
        init_tracing(&config);
        assert!(!init_tracing(&config));
    }

    #[test]
    fn test_scoped_subscriber_is_released() {
        let config = LoggingConfig {
            level: "debug".to_string(),
        };
        {
            let _guard = scoped_tracing(&config);
            tracing::debug!("scoped subscriber active");
        }
        // guard 释放后仍可安装全局订阅者
        init_tracing(&LoggingConfig::default());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let config = LoggingConfig {
            level: "not a [valid filter".to_string(),
        };
        // 无效指令不会导致 panic
        init_tracing(&config);
    }
}
