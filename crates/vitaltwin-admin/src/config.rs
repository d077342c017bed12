//! 配置管理
//!
//! 提供统一的配置加载、验证和保存功能

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use vitaltwin_pipeline::PipelineConfig;
use vitaltwin_scoring::{
    unenclosed_threshold, EvaluationBoundary, FeatureBounds, ModelConfig, ScoringConfig,
};

/// 系统完整配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalTwinConfig {
    /// 评分配置
    pub scoring: ScoringConfig,
    /// 统计模型配置
    pub model: ModelConfig,
    /// 存储配置
    pub store: StoreConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 内存存储快照路径
    pub snapshot_path: Option<PathBuf>,
    /// 流水线重试与超时
    pub pipeline: PipelineConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_path: Some(PathBuf::from("./data/vitaltwin-store.json")),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别或 EnvFilter 指令
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// 配置管理器
#[derive(Debug)]
pub struct ConfigManager {
    /// 配置数据
    config: VitalTwinConfig,
    /// 配置文件路径
    config_path: Option<PathBuf>,
    /// 配置验证器
    validator: ConfigValidator,
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&VitalTwinConfig) -> Result<()>,
}

impl ConfigManager {
    /// 加载配置：文件（可选）+ 环境变量 `VITALTWIN__*`
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let config = Self::load_config(config_path)?;
        let validator = ConfigValidator::new();
        validator.validate(&config)?;

        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
            validator,
        })
    }

    /// 使用默认配置
    pub fn with_defaults() -> Self {
        Self {
            config: VitalTwinConfig::default(),
            config_path: None,
            validator: ConfigValidator::new(),
        }
    }

    fn load_config(config_path: Option<&Path>) -> Result<VitalTwinConfig> {
        let defaults = Config::try_from(&VitalTwinConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(Environment::with_prefix("VITALTWIN").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: VitalTwinConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        match config_path {
            Some(path) => info!("Configuration loaded from: {}", path.display()),
            None => info!("Configuration loaded from defaults and environment"),
        }
        Ok(config)
    }

    /// 获取配置
    pub fn config(&self) -> &VitalTwinConfig {
        &self.config
    }

    /// 更新配置，验证失败时保持原配置
    pub fn update_config(&mut self, new_config: VitalTwinConfig) -> Result<()> {
        self.validator.validate(&new_config)?;
        self.config = new_config;
        info!("Configuration updated successfully");
        Ok(())
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str =
            toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
        }
        std::fs::write(path, config_str).context("Failed to write configuration file")?;

        info!("Configuration saved to: {}", path.display());
        Ok(())
    }

    /// 重新加载配置
    pub fn reload(&mut self) -> Result<()> {
        let new_config = Self::load_config(self.config_path.as_deref())?;
        self.update_config(new_config)
    }
}

fn check_bounds(bounds: &FeatureBounds) -> Result<()> {
    for (name, bound) in vitaltwin_scoring::FEATURE_NAMES.iter().zip(bounds.as_array()) {
        if !(bound.min.is_finite() && bound.max.is_finite() && bound.min < bound.max) {
            return Err(anyhow::anyhow!(
                "Bound for {} must satisfy min < max, got [{}, {}]",
                name,
                bound.min,
                bound.max
            ));
        }
    }

    if let Some((rule, threshold)) = unenclosed_threshold(bounds) {
        return Err(anyhow::anyhow!(
            "Bounds must strictly enclose the {:?} threshold {}",
            rule,
            threshold
        ));
    }
    Ok(())
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "scoring.thresholds",
                validator: |config| {
                    if config.scoring.thresholds.is_ordered() {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!(
                            "Thresholds must satisfy 0 < medium < high <= 1"
                        ))
                    }
                },
            },
            ValidationRule {
                field_path: "scoring.bounds",
                validator: |config| check_bounds(&config.scoring.bounds),
            },
            ValidationRule {
                field_path: "scoring.evaluation_boundary",
                validator: |config| match config.scoring.evaluation_boundary {
                    EvaluationBoundary::Fixed(value) if !(0.0..1.0).contains(&value) => {
                        Err(anyhow::anyhow!("Fixed boundary must lie in [0, 1)"))
                    }
                    _ => Ok(()),
                },
            },
            ValidationRule {
                field_path: "model",
                validator: |config| {
                    let model = &config.model;
                    if model.samples == 0 || model.epochs == 0 {
                        Err(anyhow::anyhow!("Model samples and epochs cannot be 0"))
                    } else if !(model.learning_rate > 0.0 && model.learning_rate.is_finite()) {
                        Err(anyhow::anyhow!("Learning rate must be positive"))
                    } else {
                        Ok(())
                    }
                },
            },
            ValidationRule {
                field_path: "store.pipeline",
                validator: |config| {
                    let pipeline = &config.store.pipeline;
                    if pipeline.retry.max_attempts == 0
                        || pipeline.retry.operation_timeout_ms == 0
                        || pipeline.scoring_timeout_ms == 0
                    {
                        Err(anyhow::anyhow!("Attempts and timeouts cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &VitalTwinConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("Invalid {}: {}", rule.field_path, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitaltwin_scoring::{FeatureBound, RiskThresholds, ScorerStrategy};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vitaltwin-{}-{}.toml", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(ConfigValidator::new().validate(&VitalTwinConfig::default()).is_ok());
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let mut config = VitalTwinConfig::default();
        config.scoring.thresholds = RiskThresholds { medium: 0.8, high: 0.4 };
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut config = VitalTwinConfig::default();
        config.scoring.bounds.oxygen_saturation = FeatureBound::new(100.0, 85.0);
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("scoring.bounds"));
    }

    #[test]
    fn test_bounds_clipping_a_rule_threshold_rejected() {
        let mut config = VitalTwinConfig::default();
        config.scoring.bounds.oxygen_saturation = FeatureBound::new(96.0, 100.0);
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("OxygenSaturation"), "{}", err);

        let mut config = VitalTwinConfig::default();
        config.scoring.bounds.temperature = FeatureBound::new(95.0, 100.4);
        assert!(ConfigValidator::new().validate(&config).is_err());

        // 舒张压不参与规则，只要求 min < max
        let mut config = VitalTwinConfig::default();
        config.scoring.bounds.diastolic = FeatureBound::new(60.0, 90.0);
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_update_keeps_previous_on_failure() {
        let mut manager = ConfigManager::with_defaults();
        let mut bad = VitalTwinConfig::default();
        bad.model.samples = 0;

        assert!(manager.update_config(bad).is_err());
        assert_eq!(manager.config().model.samples, 1000);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = temp_path("config");
        let mut manager = ConfigManager::with_defaults();
        let mut config = VitalTwinConfig::default();
        config.scoring.strategy = ScorerStrategy::Rule;
        config.scoring.evaluation_boundary = EvaluationBoundary::Fixed(0.5);
        config.model.seed = 7;
        manager.update_config(config).unwrap();
        manager.save(&path).unwrap();

        let loaded = ConfigManager::load(Some(&path)).unwrap();
        assert_eq!(loaded.config().scoring.strategy, ScorerStrategy::Rule);
        assert_eq!(loaded.config().scoring.evaluation_boundary, EvaluationBoundary::Fixed(0.5));
        assert_eq!(loaded.config().model.seed, 7);
        assert_eq!(loaded.config().scoring.bounds, FeatureBounds::default());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_path("partial");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let loaded = ConfigManager::load(Some(&path)).unwrap();
        assert_eq!(loaded.config().logging.level, "debug");
        assert_eq!(loaded.config().scoring.thresholds, RiskThresholds::default());

        std::fs::remove_file(&path).ok();
    }
}
