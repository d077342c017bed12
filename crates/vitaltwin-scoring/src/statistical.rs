//! 统计风险评分器
//!
//! 在合成人群上离线训练的逻辑回归分类器。标签由加权规则生成，因此该模型只与规则保持
//! 近似一致，并未经过临床验证。
//!
//! 模型输入不是原始特征，而是每条规则超出阈值的距离（按斜坡宽度归一化并在 1 处饱和）。
//! 双侧规则（收缩压过高或过低）因此在两个方向上都提高风险；舒张压不参与评分。

use crate::normalizer::{FeatureBounds, FeatureVector, FEATURE_COUNT};
use crate::rules::{training_label, VitalRule};
use crate::scorer::RiskScorer;
use crate::settings::ModelConfig;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use vitaltwin_core::{Result, VitalError};

/// 模型文件格式版本
pub const ARTIFACT_VERSION: u32 = 2;

/// 模型输入维度，每条规则一个
pub const RULE_FEATURE_COUNT: usize = VitalRule::ALL.len();

/// 合成人群各特征的 (均值, 标准差)，按特征顺序
const POPULATION: [(f64, f64); FEATURE_COUNT] = [
    (80.0, 20.0),  // heart rate
    (120.0, 20.0), // systolic
    (80.0, 10.0),  // diastolic
    (98.6, 2.0),   // temperature °F
    (97.0, 5.0),   // oxygen saturation
    (5.0, 3.0),    // activity
];

/// 超出阈值多少后规则特征饱和
fn ramp_width(rule: VitalRule) -> f64 {
    match rule {
        VitalRule::HeartRate => 5.0,
        VitalRule::BloodPressure => 5.0,
        VitalRule::Temperature => 0.5,
        VitalRule::OxygenSaturation => 2.0,
        VitalRule::Activity => 0.5,
    }
}

/// 截断后的特征映射为规则形状的模型输入，取值 [0, 1]，阈值处恰为 0
pub fn rule_features(values: &[f64; FEATURE_COUNT]) -> [f64; RULE_FEATURE_COUNT] {
    VitalRule::ALL.map(|rule| (rule.excess(values) / ramp_width(rule)).min(1.0))
}

/// 标准化参数（零均值、单位方差），只从训练分布计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: [f64; RULE_FEATURE_COUNT],
    pub std: [f64; RULE_FEATURE_COUNT],
}

impl StandardScaler {
    pub fn fit(samples: &[[f64; RULE_FEATURE_COUNT]]) -> Result<Self> {
        if samples.is_empty() {
            return Err(VitalError::ModelUnavailable("训练样本为空".to_string()));
        }

        let n = samples.len() as f64;
        let mut mean = [0.0; RULE_FEATURE_COUNT];
        for sample in samples {
            for (m, value) in mean.iter_mut().zip(sample.iter()) {
                *m += value / n;
            }
        }

        let mut std = [0.0; RULE_FEATURE_COUNT];
        for sample in samples {
            for j in 0..RULE_FEATURE_COUNT {
                std[j] += (sample[j] - mean[j]).powi(2) / n;
            }
        }
        for s in std.iter_mut() {
            *s = s.sqrt();
            // 常量特征不参与缩放
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        Ok(Self { mean, std })
    }

    pub fn transform(&self, values: &[f64; RULE_FEATURE_COUNT]) -> [f64; RULE_FEATURE_COUNT] {
        let mut scaled = [0.0; RULE_FEATURE_COUNT];
        for j in 0..RULE_FEATURE_COUNT {
            scaled[j] = (values[j] - self.mean[j]) / self.std[j];
        }
        scaled
    }
}

/// 逻辑回归决策函数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub weights: [f64; RULE_FEATURE_COUNT],
    pub bias: f64,
}

impl LogisticModel {
    pub fn probability(&self, scaled: &[f64; RULE_FEATURE_COUNT]) -> f64 {
        let z = self.bias
            + self
                .weights
                .iter()
                .zip(scaled.iter())
                .fold(0.0, |total, (w, x)| total + w * x);
        sigmoid(z)
    }

    /// 全批量梯度下降拟合，结果完全由输入决定
    fn fit(samples: &[[f64; RULE_FEATURE_COUNT]], labels: &[f64], config: &ModelConfig) -> Self {
        let n = samples.len() as f64;
        let mut model = Self {
            weights: [0.0; RULE_FEATURE_COUNT],
            bias: 0.0,
        };

        for epoch in 0..config.epochs {
            let mut grad_w = [0.0; RULE_FEATURE_COUNT];
            let mut grad_b = 0.0;

            for (x, y) in samples.iter().zip(labels.iter()) {
                let error = model.probability(x) - y;
                for j in 0..RULE_FEATURE_COUNT {
                    grad_w[j] += error * x[j];
                }
                grad_b += error;
            }

            for j in 0..RULE_FEATURE_COUNT {
                let gradient = grad_w[j] / n + config.l2 * model.weights[j];
                model.weights[j] -= config.learning_rate * gradient;
            }
            model.bias -= config.learning_rate * grad_b / n;

            if epoch % 500 == 0 {
                debug!("Training epoch {}: bias={:.4}", epoch, model.bias);
            }
        }

        model
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// 训练结果摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub samples: usize,
    pub epochs: usize,
    pub seed: u64,
    pub positive_rate: f64,
    pub training_accuracy: f64,
    /// 阳性标签中被判为阳性的比例
    pub sensitivity: f64,
}

impl TrainingSummary {
    /// 模型文件是否由当前训练配置产生
    pub fn matches(&self, config: &ModelConfig) -> bool {
        self.samples == config.samples && self.epochs == config.epochs && self.seed == config.seed
    }
}

/// 持久化的模型文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub bounds: FeatureBounds,
    pub scaler: StandardScaler,
    pub model: LogisticModel,
    pub summary: TrainingSummary,
    pub trained_at: DateTime<Utc>,
}

/// 统计风险评分器
#[derive(Debug, Clone)]
pub struct StatisticalScorer {
    bounds: FeatureBounds,
    scaler: StandardScaler,
    model: LogisticModel,
    summary: TrainingSummary,
}

impl StatisticalScorer {
    /// 在固定种子生成的合成人群上训练
    pub fn train(bounds: &FeatureBounds, config: &ModelConfig) -> Result<Self> {
        if config.samples == 0 {
            return Err(VitalError::ModelUnavailable("合成样本数量必须大于0".to_string()));
        }

        info!(
            "Training statistical scorer on {} synthetic samples (seed {})",
            config.samples, config.seed
        );

        let population = synthetic_population(bounds, config)?;
        let labels: Vec<f64> = population
            .iter()
            .map(|values| if training_label(values) { 1.0 } else { 0.0 })
            .collect();
        let samples: Vec<[f64; RULE_FEATURE_COUNT]> = population.iter().map(rule_features).collect();

        let scaler = StandardScaler::fit(&samples)?;
        let scaled: Vec<[f64; RULE_FEATURE_COUNT]> =
            samples.iter().map(|values| scaler.transform(values)).collect();

        let model = LogisticModel::fit(&scaled, &labels, config);
        if model.weights.iter().any(|w| !w.is_finite()) || !model.bias.is_finite() {
            return Err(VitalError::ModelUnavailable("训练发散，参数非有限值".to_string()));
        }

        let mut correct = 0usize;
        let mut positives = 0usize;
        let mut true_positives = 0usize;
        for (x, y) in scaled.iter().zip(labels.iter()) {
            let predicted = model.probability(x) > 0.5;
            let actual = *y > 0.5;
            if predicted == actual {
                correct += 1;
            }
            if actual {
                positives += 1;
                if predicted {
                    true_positives += 1;
                }
            }
        }

        let summary = TrainingSummary {
            samples: samples.len(),
            epochs: config.epochs,
            seed: config.seed,
            positive_rate: positives as f64 / samples.len() as f64,
            training_accuracy: correct as f64 / samples.len() as f64,
            sensitivity: if positives == 0 {
                0.0
            } else {
                true_positives as f64 / positives as f64
            },
        };

        info!(
            "Statistical scorer trained: positive rate {:.3}, training accuracy {:.3}, sensitivity {:.3}",
            summary.positive_rate, summary.training_accuracy, summary.sensitivity
        );

        Ok(Self {
            bounds: bounds.clone(),
            scaler,
            model,
            summary,
        })
    }

    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    pub fn bounds(&self) -> &FeatureBounds {
        &self.bounds
    }

    pub fn to_artifact(&self) -> ModelArtifact {
        ModelArtifact {
            version: ARTIFACT_VERSION,
            bounds: self.bounds.clone(),
            scaler: self.scaler.clone(),
            model: self.model.clone(),
            summary: self.summary.clone(),
            trained_at: Utc::now(),
        }
    }

    /// 从模型文件恢复，截断边界和训练配置必须与当前配置一致
    pub fn from_artifact(
        artifact: ModelArtifact,
        bounds: &FeatureBounds,
        config: &ModelConfig,
    ) -> Result<Self> {
        if artifact.version != ARTIFACT_VERSION {
            return Err(VitalError::ModelUnavailable(format!(
                "模型文件版本 {} 不受支持",
                artifact.version
            )));
        }
        if &artifact.bounds != bounds {
            return Err(VitalError::ModelUnavailable(
                "模型文件的截断边界与当前配置不一致".to_string(),
            ));
        }
        if !artifact.summary.matches(config) {
            return Err(VitalError::ModelUnavailable(format!(
                "模型文件的训练配置 (seed {}, samples {}, epochs {}) 与当前配置不一致",
                artifact.summary.seed, artifact.summary.samples, artifact.summary.epochs
            )));
        }

        Ok(Self {
            bounds: artifact.bounds,
            scaler: artifact.scaler,
            model: artifact.model,
            summary: artifact.summary,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.to_artifact())?;
        std::fs::write(path, json)?;
        info!("Statistical scorer saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path, bounds: &FeatureBounds, config: &ModelConfig) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json)?;
        Self::from_artifact(artifact, bounds, config)
    }
}

impl RiskScorer for StatisticalScorer {
    fn name(&self) -> &'static str {
        "statistical"
    }

    fn score(&self, features: &FeatureVector) -> f64 {
        let scaled = self.scaler.transform(&rule_features(features.values()));
        self.model.probability(&scaled).clamp(0.0, 1.0)
    }
}

/// 生成截断后的合成人群
fn synthetic_population(
    bounds: &FeatureBounds,
    config: &ModelConfig,
) -> Result<Vec<[f64; FEATURE_COUNT]>> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let distributions = POPULATION
        .iter()
        .map(|(mean, std)| {
            Normal::new(*mean, *std)
                .map_err(|e| VitalError::ModelUnavailable(format!("无效的人群分布: {}", e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut samples = Vec::with_capacity(config.samples);
    for _ in 0..config.samples {
        let mut raw = [0.0; FEATURE_COUNT];
        for (value, distribution) in raw.iter_mut().zip(distributions.iter()) {
            *value = distribution.sample(&mut rng);
        }
        samples.push(bounds.clamp_values(raw));
    }

    Ok(samples)
}
