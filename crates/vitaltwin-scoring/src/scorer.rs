//! 风险评分器
//!
//! 评分器在相同输入和相同内部状态下必须给出相同结果。

use crate::normalizer::FeatureVector;
use crate::rules::VitalRule;

/// 风险评分器特征
pub trait RiskScorer: Send + Sync {
    /// 评分器名称，写入预测记录便于审计
    fn name(&self) -> &'static str;

    /// 计算 [0, 1] 区间内的风险分数
    fn score(&self, features: &FeatureVector) -> f64;
}

/// 加权规则评分器
///
/// 无状态、无需训练，作为统计模型不可用时的回退实现。
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleScorer;

impl RuleScorer {
    pub fn new() -> Self {
        Self
    }
}

impl RiskScorer for RuleScorer {
    fn name(&self) -> &'static str {
        "rule"
    }

    fn score(&self, features: &FeatureVector) -> f64 {
        let total = VitalRule::ALL
            .iter()
            .filter(|rule| rule.is_violated(features.values()))
            .fold(0.0, |total, rule| total + rule.weight());
        total.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NORMAL: [f64; 6] = [85.0, 120.0, 80.0, 98.6, 98.0, 5.0];

    fn score(values: [f64; 6]) -> f64 {
        RuleScorer::new().score(&FeatureVector(values))
    }

    #[test]
    fn test_normal_scores_zero() {
        assert_eq!(score(NORMAL), 0.0);
        assert!(score(NORMAL).is_sign_positive());
        assert_eq!(score([100.0, 90.0, 80.0, 100.4, 95.0, 2.0]), 0.0);
        assert_eq!(score([40.0, 140.0, 40.0, 95.0, 100.0, 10.0]), 0.0);
    }

    #[test]
    fn test_single_rule_weights() {
        let mut values = NORMAL;
        values[0] = 120.0;
        assert!((score(values) - 0.2).abs() < 1e-9);

        let mut values = NORMAL;
        values[4] = 90.0;
        assert!((score(values) - 0.3).abs() < 1e-9);

        let mut values = NORMAL;
        values[1] = 85.0;
        assert!((score(values) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_capped() {
        assert_eq!(score([145.0, 170.0, 95.0, 101.5, 89.0, 1.0]), 1.0);
    }

    #[test]
    fn test_score_within_unit_interval() {
        for hr in [40.0, 100.0, 101.0, 180.0] {
            for sbp in [80.0, 89.0, 120.0, 141.0, 200.0] {
                for spo2 in [85.0, 94.9, 100.0] {
                    for activity in [0.0, 1.9, 10.0] {
                        let s = score([hr, sbp, 80.0, 102.0, spo2, activity]);
                        assert!((0.0..=1.0).contains(&s));
                    }
                }
            }
        }
    }

    #[test]
    fn test_monotonic_in_each_abnormality() {
        // 心率升高
        let mut previous = 0.0;
        for hr in [60.0, 90.0, 100.0, 101.0, 140.0, 180.0] {
            let mut values = NORMAL;
            values[0] = hr;
            let current = score(values);
            assert!(current >= previous);
            previous = current;
        }

        // 血氧下降
        let mut previous = 0.0;
        for spo2 in [100.0, 97.0, 95.0, 94.0, 90.0, 85.0] {
            let mut values = NORMAL;
            values[4] = spo2;
            let current = score(values);
            assert!(current >= previous);
            previous = current;
        }

        // 体温升高
        let mut previous = 0.0;
        for temperature in [95.0, 98.6, 100.4, 100.5, 102.0, 105.0] {
            let mut values = NORMAL;
            values[3] = temperature;
            let current = score(values);
            assert!(current >= previous);
            previous = current;
        }

        // 活动量下降
        let mut previous = 0.0;
        for activity in [10.0, 5.0, 2.0, 1.9, 1.0, 0.0] {
            let mut values = NORMAL;
            values[5] = activity;
            let current = score(values);
            assert!(current >= previous);
            previous = current;
        }

        // 收缩压偏离正常区间（两个方向）
        for direction in [[120.0, 140.0, 150.0, 200.0], [120.0, 90.0, 85.0, 80.0]] {
            let mut previous = 0.0;
            for sbp in direction {
                let mut values = NORMAL;
                values[1] = sbp;
                let current = score(values);
                assert!(current >= previous);
                previous = current;
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let values = FeatureVector([130.0, 150.0, 90.0, 101.0, 93.0, 1.0]);
        let scorer = RuleScorer::new();
        assert_eq!(scorer.score(&values), scorer.score(&values));
    }
}
