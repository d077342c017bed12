//! # VitalTwin评分模块
//!
//! 提供从生命体征读数到风险评估的完整评分链路，包括：
//! - 特征归一化：按固定顺序生成特征向量并截断到生理合理区间
//! - 风险评分器：统计分类器与加权规则评分器两种可互换策略
//! - 风险分级：分数到 Low/Medium/High 的阈值映射
//! - 解释生成：基于原始读数给出可审计的异常因素

pub mod classifier;
pub mod engine;
pub mod explanation;
pub mod normalizer;
pub mod provider;
pub mod rules;
pub mod scorer;
pub mod settings;
pub mod statistical;

// 重新导出主要类型
pub use classifier::{EvaluationBoundary, RiskThresholds};
pub use engine::{RiskAssessment, RiskEngine};
pub use explanation::ExplanationGenerator;
pub use normalizer::{FeatureBound, FeatureBounds, FeatureNormalizer, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use provider::{ActiveScorer, ModelProvider, ScorerStatus};
pub use rules::{unenclosed_threshold, VitalRule};
pub use scorer::{RiskScorer, RuleScorer};
pub use settings::{ModelConfig, ScorerStrategy, ScoringConfig};
pub use statistical::{StatisticalScorer, TrainingSummary};
