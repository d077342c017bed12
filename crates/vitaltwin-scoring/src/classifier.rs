//! 风险分级
//!
//! 分级阈值是唯一的事实来源，评分器和准确率评估都从这里读取。

use serde::{Deserialize, Serialize};
use vitaltwin_core::RiskTier;

/// 风险分级阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// 分数不低于该值为 Medium
    pub medium: f64,
    /// 分数不低于该值为 High
    pub high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self { medium: 0.3, high: 0.7 }
    }
}

impl RiskThresholds {
    /// 分数映射为风险等级
    pub fn classify(&self, score: f64) -> RiskTier {
        if score < self.medium {
            RiskTier::Low
        } else if score < self.high {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn is_ordered(&self) -> bool {
        0.0 < self.medium && self.medium < self.high && self.high <= 1.0
    }
}

/// 混淆矩阵中"预测阳性"的判定边界
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationBoundary {
    /// 预测阳性等价于风险等级为 High (score >= thresholds.high)
    HighTier,
    /// 固定边界，score 严格大于该值为阳性
    Fixed(f64),
}

impl EvaluationBoundary {
    pub fn is_positive(&self, score: f64, thresholds: &RiskThresholds) -> bool {
        match self {
            EvaluationBoundary::HighTier => score >= thresholds.high,
            EvaluationBoundary::Fixed(boundary) => score > *boundary,
        }
    }

    /// 实际生效的边界值
    pub fn value(&self, thresholds: &RiskThresholds) -> f64 {
        match self {
            EvaluationBoundary::HighTier => thresholds.high,
            EvaluationBoundary::Fixed(boundary) => *boundary,
        }
    }
}
