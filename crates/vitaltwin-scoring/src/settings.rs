//! 评分配置

use crate::classifier::{EvaluationBoundary, RiskThresholds};
use crate::normalizer::FeatureBounds;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 评分策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorerStrategy {
    /// 统计分类器，首次使用时训练，失败时回退到规则评分
    Statistical,
    /// 确定性加权规则
    Rule,
}

/// 评分配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// 特征截断边界，训练与推理共用
    pub bounds: FeatureBounds,
    /// 风险分级阈值
    pub thresholds: RiskThresholds,
    /// 准确率评估使用的阳性判定边界
    pub evaluation_boundary: EvaluationBoundary,
    /// 评分策略
    pub strategy: ScorerStrategy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bounds: FeatureBounds::default(),
            thresholds: RiskThresholds::default(),
            evaluation_boundary: EvaluationBoundary::HighTier,
            strategy: ScorerStrategy::Statistical,
        }
    }
}

/// 统计模型训练配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// 模型持久化路径，为空时不落盘
    pub artifact_path: Option<PathBuf>,
    /// 随机种子
    pub seed: u64,
    /// 合成样本数量
    pub samples: usize,
    /// 梯度下降轮数
    pub epochs: usize,
    /// 学习率
    pub learning_rate: f64,
    /// L2 正则系数
    pub l2: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            artifact_path: None,
            seed: 42,
            samples: 1000,
            epochs: 1500,
            learning_rate: 0.5,
            l2: 0.001,
        }
    }
}
