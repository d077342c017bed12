//! 风险评估引擎
//!
//! 协调归一化、评分、分级和解释生成的统一入口

use crate::classifier::{EvaluationBoundary, RiskThresholds};
use crate::explanation::ExplanationGenerator;
use crate::normalizer::FeatureNormalizer;
use crate::provider::{ActiveScorer, ModelProvider, ScorerStatus};
use crate::scorer::{RiskScorer, RuleScorer};
use crate::settings::{ModelConfig, ScorerStrategy, ScoringConfig};
use serde::{Deserialize, Serialize};
use vitaltwin_core::{Result, RiskTier, VitalsReading};

/// 单条读数的风险评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub contributing_factors: Vec<String>,
    pub scorer: String,
}

/// 风险评估引擎
#[derive(Debug)]
pub struct RiskEngine {
    config: ScoringConfig,
    normalizer: FeatureNormalizer,
    explainer: ExplanationGenerator,
    rule_scorer: RuleScorer,
    provider: ModelProvider,
}

impl RiskEngine {
    pub fn new(config: ScoringConfig, model: ModelConfig) -> Self {
        let provider = ModelProvider::new(config.bounds.clone(), model);
        Self {
            normalizer: FeatureNormalizer::new(config.bounds.clone()),
            explainer: ExplanationGenerator::new(),
            rule_scorer: RuleScorer::new(),
            provider,
            config,
        }
    }

    /// 仅使用规则评分器的引擎
    pub fn rule_based() -> Self {
        let config = ScoringConfig {
            strategy: ScorerStrategy::Rule,
            ..ScoringConfig::default()
        };
        Self::new(config, ModelConfig::default())
    }

    /// 评估单条读数
    pub async fn assess(&self, reading: &VitalsReading) -> Result<RiskAssessment> {
        reading.validate()?;

        let features = self.normalizer.normalize(reading);
        let (risk_score, scorer) = match self.config.strategy {
            ScorerStrategy::Rule => (self.rule_scorer.score(&features), self.rule_scorer.name()),
            ScorerStrategy::Statistical => {
                let active = self.provider.scorer().await;
                (active.score(&features), active.name())
            }
        };

        tracing::debug!(
            "Assessed reading for patient {}: score {:.3} via {}",
            reading.patient_id,
            risk_score,
            scorer
        );

        Ok(RiskAssessment {
            risk_score,
            risk_tier: self.config.thresholds.classify(risk_score),
            contributing_factors: self.explainer.explain(reading),
            scorer: scorer.to_string(),
        })
    }

    /// 提前初始化统计评分器
    pub async fn warm_up(&self) -> Option<&ActiveScorer> {
        match self.config.strategy {
            ScorerStrategy::Rule => None,
            ScorerStrategy::Statistical => Some(self.provider.scorer().await),
        }
    }

    /// 当前评分器状态
    pub fn status(&self) -> ScorerStatus {
        match self.config.strategy {
            ScorerStrategy::Rule => ScorerStatus::RuleFallback,
            ScorerStrategy::Statistical => self.provider.status(),
        }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.config.thresholds
    }

    pub fn evaluation_boundary(&self) -> EvaluationBoundary {
        self.config.evaluation_boundary
    }

    pub fn provider(&self) -> &ModelProvider {
        &self.provider
    }
}
