//! 看板聚合
//!
//! 对预测存储的只读聚合：风险等级分布和准确率报告。

use crate::evaluator::{AccuracyEvaluator, AccuracyReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use vitaltwin_core::{Result, RiskPrediction, RiskTier};
use vitaltwin_scoring::RiskEngine;
use vitaltwin_store::{PredictionStore, ReadingStore};

/// 风险等级分布
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierDistribution {
    pub fn from_predictions(predictions: &[RiskPrediction]) -> Self {
        let mut distribution = Self::default();
        for prediction in predictions {
            match prediction.risk_tier {
                RiskTier::Low => distribution.low += 1,
                RiskTier::Medium => distribution.medium += 1,
                RiskTier::High => distribution.high += 1,
            }
        }
        distribution
    }

    pub fn count(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Low => self.low,
            RiskTier::Medium => self.medium,
            RiskTier::High => self.high,
        }
    }
}

/// 看板概览
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardOverview {
    pub total_patients: usize,
    pub total_readings: usize,
    pub total_predictions: usize,
    pub tier_distribution: TierDistribution,
    pub accuracy: AccuracyReport,
    pub scorer: String,
    pub generated_at: DateTime<Utc>,
}

/// 看板服务
#[derive(Clone)]
pub struct DashboardService {
    engine: Arc<RiskEngine>,
    readings: Arc<dyn ReadingStore>,
    predictions: Arc<dyn PredictionStore>,
}

impl DashboardService {
    pub fn new(
        engine: Arc<RiskEngine>,
        readings: Arc<dyn ReadingStore>,
        predictions: Arc<dyn PredictionStore>,
    ) -> Self {
        Self {
            engine,
            readings,
            predictions,
        }
    }

    fn evaluator(&self) -> AccuracyEvaluator {
        AccuracyEvaluator::new(*self.engine.thresholds(), self.engine.evaluation_boundary())
    }

    /// 预测与实际结局对照，每次调用重新计算
    pub async fn accuracy(&self) -> Result<AccuracyReport> {
        let annotated = self.predictions.list_annotated().await?;
        Ok(self.evaluator().evaluate(&annotated))
    }

    pub async fn overview(&self) -> Result<DashboardOverview> {
        let predictions = self.predictions.list_all().await?;
        let total_readings = self.readings.count_readings().await?;
        let patients: HashSet<&str> = predictions.iter().map(|p| p.patient_id.as_str()).collect();

        Ok(DashboardOverview {
            total_patients: patients.len(),
            total_readings,
            total_predictions: predictions.len(),
            tier_distribution: TierDistribution::from_predictions(&predictions),
            accuracy: self.evaluator().evaluate(&predictions),
            scorer: self.engine.status().as_str().to_string(),
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{IngestService, PipelineConfig};
    use vitaltwin_core::VitalsReading;
    use vitaltwin_store::InMemoryStore;

    fn reading(patient_id: &str, heart_rate: f64, oxygen_saturation: f64, activity: f64) -> VitalsReading {
        VitalsReading {
            patient_id: patient_id.to_string(),
            device_id: None,
            timestamp: Utc::now(),
            heart_rate,
            systolic: 120.0,
            diastolic: 80.0,
            temperature: 98.6,
            oxygen_saturation,
            activity_level: activity,
            respiratory_rate: None,
        }
    }

    fn services() -> (IngestService, DashboardService) {
        let store = Arc::new(InMemoryStore::new());
        let engine = Arc::new(RiskEngine::rule_based());
        (
            IngestService::new(engine.clone(), store.clone(), store.clone(), PipelineConfig::default()),
            DashboardService::new(engine, store.clone(), store),
        )
    }

    #[tokio::test]
    async fn test_empty_dashboard() {
        let (_, dashboard) = services();
        let overview = dashboard.overview().await.unwrap();
        assert_eq!(overview.total_predictions, 0);
        assert_eq!(overview.tier_distribution, TierDistribution::default());
        assert_eq!(overview.accuracy.accuracy, 0.0);
        assert_eq!(overview.accuracy.total, 0);
    }

    #[tokio::test]
    async fn test_overview_reflects_outcome_updates() {
        let (ingest, dashboard) = services();

        // 心率 + 血氧 + 活动量 = 0.65，属于 Medium
        let medium = ingest.ingest(reading("P001", 120.0, 90.0, 1.0)).await.unwrap().wait().await.unwrap();
        let low = ingest.ingest(reading("P002", 80.0, 98.0, 5.0)).await.unwrap().wait().await.unwrap();
        let mut severe = reading("P001", 150.0, 88.0, 1.0);
        severe.temperature = 102.0;
        let high = ingest.ingest(severe).await.unwrap().wait().await.unwrap();

        let overview = dashboard.overview().await.unwrap();
        assert_eq!(overview.total_patients, 2);
        assert_eq!(overview.total_readings, 3);
        assert_eq!(
            overview.tier_distribution,
            TierDistribution { low: 1, medium: 1, high: 1 }
        );
        assert_eq!(overview.accuracy.total, 0);

        ingest.annotate_outcome(high.id, true).await.unwrap();
        ingest.annotate_outcome(low.id, false).await.unwrap();
        ingest.annotate_outcome(medium.id, true).await.unwrap();

        // 标注后立即可见，不使用缓存
        let report = dashboard.accuracy().await.unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.confusion_matrix.true_positive, 1);
        assert_eq!(report.confusion_matrix.true_negative, 1);
        assert_eq!(report.confusion_matrix.false_negative, 1);
        assert!((report.accuracy - 2.0 / 3.0).abs() < 1e-9);
    }
}
