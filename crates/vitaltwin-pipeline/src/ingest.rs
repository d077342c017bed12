//! 读数接收服务
//!
//! 读数先持久化，再在独立任务中评分并写入预测，因此不会出现没有来源读数的预测。
//! 评分失败只记录日志并丢弃，预测投递语义为至多一次。

use crate::retry::{with_retry, RetryPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use vitaltwin_core::{
    PredictionId, ReadingId, ReadingPayload, Result, RiskPrediction, StoredReading, VitalError,
    VitalsReading,
};
use vitaltwin_scoring::RiskEngine;
use vitaltwin_store::{PredictionStore, ReadingStore, SortOrder};

/// 流水线配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 存储调用的重试策略
    pub retry: RetryPolicy,
    /// 单条读数评分超时 (毫秒)，包含首次训练
    pub scoring_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            scoring_timeout_ms: 30_000,
        }
    }
}

/// 接收回执
///
/// 预测ID在接收时即分配，评分完成后对应记录才可查询。
#[derive(Debug)]
pub struct IngestReceipt {
    pub reading_id: ReadingId,
    pub prediction_id: PredictionId,
    pub patient_id: String,
    pub accepted_at: DateTime<Utc>,
    completion: JoinHandle<Option<RiskPrediction>>,
}

impl IngestReceipt {
    /// 等待评分任务结束，评分失败时返回 None
    pub async fn wait(self) -> Option<RiskPrediction> {
        match self.completion.await {
            Ok(prediction) => prediction,
            Err(e) => {
                error!("Scoring worker for prediction {} panicked: {}", self.prediction_id, e);
                None
            }
        }
    }
}

/// 健康状态摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSummary {
    pub status: String,
    pub scorer: String,
    pub checked_at: DateTime<Utc>,
}

/// 读数接收服务
#[derive(Clone)]
pub struct IngestService {
    engine: Arc<RiskEngine>,
    readings: Arc<dyn ReadingStore>,
    predictions: Arc<dyn PredictionStore>,
    config: PipelineConfig,
}

impl IngestService {
    pub fn new(
        engine: Arc<RiskEngine>,
        readings: Arc<dyn ReadingStore>,
        predictions: Arc<dyn PredictionStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            engine,
            readings,
            predictions,
            config,
        }
    }

    /// 接收原始负载，缺失字段在任何评分之前被拒绝
    pub async fn ingest_payload(&self, payload: ReadingPayload) -> Result<IngestReceipt> {
        let reading = VitalsReading::try_from(payload)?;
        self.ingest(reading).await
    }

    /// 校验并持久化读数，然后在后台评分
    pub async fn ingest(&self, reading: VitalsReading) -> Result<IngestReceipt> {
        reading.validate()?;

        let store = self.readings.clone();
        let stored = with_retry(&self.config.retry, "append_reading", || {
            let store = store.clone();
            let reading = reading.clone();
            async move { store.append_reading(reading).await }
        })
        .await?;

        let prediction_id = PredictionId::new();
        info!(
            "Accepted reading {} for patient {} (prediction {})",
            stored.id, stored.reading.patient_id, prediction_id
        );

        let receipt_reading_id = stored.id;
        let patient_id = stored.reading.patient_id.clone();
        let worker = ScoringWorker {
            engine: self.engine.clone(),
            predictions: self.predictions.clone(),
            retry: self.config.retry.clone(),
            scoring_timeout: Duration::from_millis(self.config.scoring_timeout_ms),
        };
        let completion = tokio::spawn(async move { worker.run(stored, prediction_id).await });

        Ok(IngestReceipt {
            reading_id: receipt_reading_id,
            prediction_id,
            patient_id,
            accepted_at: Utc::now(),
            completion,
        })
    }

    /// 回写实际结局
    pub async fn annotate_outcome(&self, id: PredictionId, outcome: bool) -> Result<()> {
        let store = self.predictions.clone();
        with_retry(&self.config.retry, "annotate_outcome", || {
            let store = store.clone();
            async move { store.annotate_outcome(id, outcome).await }
        })
        .await
    }

    /// 患者预测历史，按时间戳降序
    pub async fn history(&self, patient_id: &str, limit: usize) -> Result<Vec<RiskPrediction>> {
        let store = self.predictions.clone();
        let predictions = with_retry(&self.config.retry, "list_by_patient", || {
            let store = store.clone();
            let patient_id = patient_id.to_string();
            async move { store.list_by_patient(&patient_id, limit, SortOrder::NewestFirst).await }
        })
        .await?;

        if predictions.is_empty() {
            let readings = self.readings.clone();
            let known = with_retry(&self.config.retry, "list_readings", || {
                let readings = readings.clone();
                let patient_id = patient_id.to_string();
                async move { readings.list_readings(&patient_id, 1).await }
            })
            .await?;
            if known.is_empty() {
                return Err(VitalError::NotFound(format!("患者 {} 没有任何读数", patient_id)));
            }
        }

        Ok(predictions)
    }

    /// 患者读数历史，按时间戳降序
    pub async fn readings(&self, patient_id: &str, limit: usize) -> Result<Vec<StoredReading>> {
        let store = self.readings.clone();
        with_retry(&self.config.retry, "list_readings", || {
            let store = store.clone();
            let patient_id = patient_id.to_string();
            async move { store.list_readings(&patient_id, limit).await }
        })
        .await
    }

    pub fn health(&self) -> HealthSummary {
        HealthSummary {
            status: "healthy".to_string(),
            scorer: self.engine.status().as_str().to_string(),
            checked_at: Utc::now(),
        }
    }

    pub fn engine(&self) -> &Arc<RiskEngine> {
        &self.engine
    }
}

/// 后台评分任务，持有读数的独立副本
struct ScoringWorker {
    engine: Arc<RiskEngine>,
    predictions: Arc<dyn PredictionStore>,
    retry: RetryPolicy,
    scoring_timeout: Duration,
}

impl ScoringWorker {
    async fn run(self, stored: StoredReading, prediction_id: PredictionId) -> Option<RiskPrediction> {
        match self.score_and_store(&stored, prediction_id).await {
            Ok(prediction) => {
                info!(
                    "Prediction {} stored for patient {}: {} ({:.3})",
                    prediction.id, prediction.patient_id, prediction.risk_tier, prediction.risk_score
                );
                Some(prediction)
            }
            Err(e) => {
                error!(
                    "Dropping prediction {} for reading {}: {}",
                    prediction_id, stored.id, e
                );
                None
            }
        }
    }

    async fn score_and_store(
        &self,
        stored: &StoredReading,
        prediction_id: PredictionId,
    ) -> Result<RiskPrediction> {
        let assessment = tokio::time::timeout(self.scoring_timeout, self.engine.assess(&stored.reading))
            .await
            .map_err(|_| {
                warn!("Scoring reading {} timed out", stored.id);
                VitalError::Timeout(format!("读数 {} 评分超时", stored.id))
            })??;

        let prediction = RiskPrediction {
            id: prediction_id,
            reading_id: stored.id,
            patient_id: stored.reading.patient_id.clone(),
            timestamp: stored.reading.timestamp,
            risk_score: assessment.risk_score,
            risk_tier: assessment.risk_tier,
            contributing_factors: assessment.contributing_factors,
            scorer: assessment.scorer,
            created_at: Utc::now(),
            actual_outcome: None,
        };

        let store = self.predictions.clone();
        with_retry(&self.retry, "append_prediction", || {
            let store = store.clone();
            let prediction = prediction.clone();
            async move { store.append(prediction).await }
        })
        .await?;

        Ok(prediction)
    }
}
