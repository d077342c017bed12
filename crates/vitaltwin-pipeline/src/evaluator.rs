//! 准确率评估
//!
//! 对已标注结局的预测做纯聚合，每次按需重新计算，不缓存。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vitaltwin_core::{PredictionId, RiskPrediction, RiskTier};
use vitaltwin_scoring::{EvaluationBoundary, RiskThresholds};

/// 混淆矩阵
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionMatrix {
    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    /// 准确率，无样本时为 0
    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// 召回率，无阳性样本时为 0
    pub fn sensitivity(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// 特异度，无阴性样本时为 0
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negative, self.true_negative + self.false_positive)
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// 单条预测的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Correct,
    Incorrect,
}

/// 预测与实际结局的对照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparedPrediction {
    pub id: PredictionId,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub predicted_positive: bool,
    pub actual_outcome: bool,
    pub verdict: Verdict,
}

/// 准确率报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub total: usize,
    pub correct: usize,
    /// correct / total，取值 [0, 1]
    pub accuracy: f64,
    /// 实际生效的阳性判定边界
    pub boundary: f64,
    pub confusion_matrix: ConfusionMatrix,
    /// 按时间降序
    pub predictions: Vec<ComparedPrediction>,
}

/// 准确率评估器
#[derive(Debug, Clone)]
pub struct AccuracyEvaluator {
    thresholds: RiskThresholds,
    boundary: EvaluationBoundary,
}

impl AccuracyEvaluator {
    pub fn new(thresholds: RiskThresholds, boundary: EvaluationBoundary) -> Self {
        Self { thresholds, boundary }
    }

    pub fn is_predicted_positive(&self, score: f64) -> bool {
        self.boundary.is_positive(score, &self.thresholds)
    }

    /// 评估一组预测，未标注结局的记录被忽略
    pub fn evaluate(&self, predictions: &[RiskPrediction]) -> AccuracyReport {
        let mut matrix = ConfusionMatrix::default();
        let mut compared = Vec::new();

        for prediction in predictions {
            let Some(actual) = prediction.actual_outcome else {
                continue;
            };

            let predicted = self.is_predicted_positive(prediction.risk_score);
            match (predicted, actual) {
                (true, true) => matrix.true_positive += 1,
                (true, false) => matrix.false_positive += 1,
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_negative += 1,
            }

            compared.push(ComparedPrediction {
                id: prediction.id,
                patient_id: prediction.patient_id.clone(),
                timestamp: prediction.timestamp,
                risk_score: prediction.risk_score,
                risk_tier: prediction.risk_tier,
                predicted_positive: predicted,
                actual_outcome: actual,
                verdict: if predicted == actual { Verdict::Correct } else { Verdict::Incorrect },
            });
        }

        compared.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        AccuracyReport {
            total: matrix.total(),
            correct: matrix.correct(),
            accuracy: matrix.accuracy(),
            boundary: self.boundary.value(&self.thresholds),
            confusion_matrix: matrix,
            predictions: compared,
        }
    }
}

impl Default for AccuracyEvaluator {
    fn default() -> Self {
        Self::new(RiskThresholds::default(), EvaluationBoundary::HighTier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vitaltwin_core::ReadingId;

    fn prediction(score: f64, outcome: Option<bool>, minutes: i64) -> RiskPrediction {
        let thresholds = RiskThresholds::default();
        RiskPrediction {
            id: PredictionId::new(),
            reading_id: ReadingId::new(),
            patient_id: "P001".to_string(),
            timestamp: Utc::now() + Duration::minutes(minutes),
            risk_score: score,
            risk_tier: thresholds.classify(score),
            contributing_factors: Vec::new(),
            scorer: "rule".to_string(),
            created_at: Utc::now(),
            actual_outcome: outcome,
        }
    }

    #[test]
    fn test_empty_input() {
        let report = AccuracyEvaluator::default().evaluate(&[]);
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.confusion_matrix, ConfusionMatrix::default());
        assert!(report.predictions.is_empty());
    }

    #[test]
    fn test_unannotated_predictions_are_ignored() {
        let report = AccuracyEvaluator::default()
            .evaluate(&[prediction(0.9, None, 0), prediction(0.1, None, 1)]);
        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
    }

    #[test]
    fn test_confusion_matrix_with_high_tier_boundary() {
        let predictions = vec![
            prediction(0.9, Some(true), 0),  // TP
            prediction(0.75, Some(false), 1), // FP
            prediction(0.2, Some(false), 2), // TN
            prediction(0.6, Some(true), 3),  // FN: Medium 不算阳性
            prediction(0.95, None, 4),
        ];

        let report = AccuracyEvaluator::default().evaluate(&predictions);
        assert_eq!(
            report.confusion_matrix,
            ConfusionMatrix {
                true_positive: 1,
                false_positive: 1,
                true_negative: 1,
                false_negative: 1,
            }
        );
        assert_eq!(report.total, 4);
        assert_eq!(report.correct, 2);
        assert!((report.accuracy - 0.5).abs() < 1e-9);
        assert_eq!(report.boundary, 0.7);
    }

    #[test]
    fn test_fixed_boundary_changes_classification() {
        let predictions = vec![prediction(0.6, Some(true), 0), prediction(0.5, Some(false), 1)];
        let evaluator =
            AccuracyEvaluator::new(RiskThresholds::default(), EvaluationBoundary::Fixed(0.5));

        let report = evaluator.evaluate(&predictions);
        assert_eq!(report.confusion_matrix.true_positive, 1);
        assert_eq!(report.confusion_matrix.true_negative, 1);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn test_compared_predictions_newest_first() {
        let predictions = vec![
            prediction(0.9, Some(true), 0),
            prediction(0.1, Some(true), 10),
            prediction(0.2, Some(false), 5),
        ];

        let report = AccuracyEvaluator::default().evaluate(&predictions);
        let verdicts: Vec<Verdict> = report.predictions.iter().map(|p| p.verdict).collect();
        assert_eq!(verdicts, vec![Verdict::Incorrect, Verdict::Correct, Verdict::Correct]);
    }

    #[test]
    fn test_sensitivity_and_specificity() {
        let matrix = ConfusionMatrix {
            true_positive: 3,
            false_positive: 1,
            true_negative: 4,
            false_negative: 1,
        };
        assert!((matrix.sensitivity() - 0.75).abs() < 1e-9);
        assert!((matrix.specificity() - 0.8).abs() < 1e-9);
        assert_eq!(ConfusionMatrix::default().sensitivity(), 0.0);
    }
}
