//! 内存存储
//!
//! 读数与预测记录的内存参考实现，支持 JSON 快照以便跨重启保留标识和结局标注。

use crate::repository::{PredictionStore, ReadingStore, SortOrder};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use vitaltwin_core::{
    PredictionId, ReadingId, Result, RiskPrediction, StoredReading, VitalError, VitalsReading,
};

/// 存储快照
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub readings: Vec<StoredReading>,
    pub predictions: Vec<RiskPrediction>,
}

#[derive(Debug, Default)]
struct StoreInner {
    readings: HashMap<ReadingId, StoredReading>,
    predictions: HashMap<PredictionId, RiskPrediction>,
    patient_readings: HashMap<String, Vec<ReadingId>>,       // patient_id -> reading_ids
    patient_predictions: HashMap<String, Vec<PredictionId>>, // patient_id -> prediction_ids
}

impl StoreInner {
    fn insert_reading(&mut self, stored: StoredReading) {
        self.patient_readings
            .entry(stored.reading.patient_id.clone())
            .or_insert_with(Vec::new)
            .push(stored.id);
        self.readings.insert(stored.id, stored);
    }

    fn insert_prediction(&mut self, prediction: RiskPrediction) {
        self.patient_predictions
            .entry(prediction.patient_id.clone())
            .or_insert_with(Vec::new)
            .push(prediction.id);
        self.predictions.insert(prediction.id, prediction);
    }
}

/// 内存存储
#[derive(Debug)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
    available: AtomicBool,
    injected_failures: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            available: AtomicBool::new(true),
            injected_failures: AtomicUsize::new(0),
        }
    }

    /// 从快照恢复
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut inner = StoreInner::default();
        for stored in snapshot.readings {
            inner.insert_reading(stored);
        }
        for prediction in snapshot.predictions {
            if !inner.readings.contains_key(&prediction.reading_id) {
                return Err(VitalError::Validation(format!(
                    "快照中的预测 {} 缺少来源读数 {}",
                    prediction.id, prediction.reading_id
                )));
            }
            inner.insert_prediction(prediction);
        }

        Ok(Self {
            inner: RwLock::new(inner),
            available: AtomicBool::new(true),
            injected_failures: AtomicUsize::new(0),
        })
    }

    /// 从快照文件加载，文件不存在时返回空存储
    pub async fn load_snapshot(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let json = tokio::fs::read_to_string(path).await?;
        let snapshot: StoreSnapshot = serde_json::from_str(&json)?;
        info!(
            "Loaded snapshot from {}: {} readings, {} predictions",
            path.display(),
            snapshot.readings.len(),
            snapshot.predictions.len()
        );
        Self::from_snapshot(snapshot)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let inner = self.inner.read().await;
        let mut readings: Vec<StoredReading> = inner.readings.values().cloned().collect();
        readings.sort_by_key(|r| (r.received_at, r.id));
        let mut predictions: Vec<RiskPrediction> = inner.predictions.values().cloned().collect();
        predictions.sort_by_key(|p| (p.created_at, p.id));
        StoreSnapshot { readings, predictions }
    }

    pub async fn save_snapshot(&self, path: &Path) -> Result<()> {
        let snapshot = self.snapshot().await;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        info!("Snapshot saved to {}", path.display());
        Ok(())
    }

    /// 模拟存储整体不可用
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 让接下来的 `count` 次调用返回暂时性错误
    pub fn inject_failures(&self, count: usize) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(VitalError::TransientStore("内存存储已下线".to_string()));
        }

        let consumed = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            warn!("Injected transient store failure");
            return Err(VitalError::TransientStore("注入的暂时性故障".to_string()));
        }

        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadingStore for InMemoryStore {
    async fn append_reading(&self, reading: VitalsReading) -> Result<StoredReading> {
        self.check_available()?;

        let stored = StoredReading {
            id: ReadingId::new(),
            received_at: Utc::now(),
            reading,
        };

        let mut inner = self.inner.write().await;
        inner.insert_reading(stored.clone());
        debug!("Stored reading {} for patient {}", stored.id, stored.reading.patient_id);
        Ok(stored)
    }

    async fn get_reading(&self, id: ReadingId) -> Result<StoredReading> {
        self.check_available()?;
        let inner = self.inner.read().await;
        inner
            .readings
            .get(&id)
            .cloned()
            .ok_or_else(|| VitalError::NotFound(format!("读数 {} 不存在", id)))
    }

    async fn list_readings(&self, patient_id: &str, limit: usize) -> Result<Vec<StoredReading>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut readings: Vec<StoredReading> = inner
            .patient_readings
            .get(patient_id)
            .map(|ids| ids.iter().filter_map(|id| inner.readings.get(id)).cloned().collect())
            .unwrap_or_default();

        readings.sort_by(|a, b| {
            b.reading
                .timestamp
                .cmp(&a.reading.timestamp)
                .then(b.received_at.cmp(&a.received_at))
        });
        readings.truncate(limit);
        Ok(readings)
    }

    async fn count_readings(&self) -> Result<usize> {
        self.check_available()?;
        Ok(self.inner.read().await.readings.len())
    }
}

#[async_trait]
impl PredictionStore for InMemoryStore {
    async fn append(&self, prediction: RiskPrediction) -> Result<PredictionId> {
        self.check_available()?;

        let mut inner = self.inner.write().await;
        if !inner.readings.contains_key(&prediction.reading_id) {
            return Err(VitalError::NotFound(format!(
                "预测 {} 的来源读数 {} 尚未持久化",
                prediction.id, prediction.reading_id
            )));
        }
        if inner.predictions.contains_key(&prediction.id) {
            return Err(VitalError::Validation(format!("预测 {} 已存在", prediction.id)));
        }

        let id = prediction.id;
        inner.insert_prediction(prediction);
        debug!("Appended prediction {}", id);
        Ok(id)
    }

    async fn get(&self, id: PredictionId) -> Result<RiskPrediction> {
        self.check_available()?;
        let inner = self.inner.read().await;
        inner
            .predictions
            .get(&id)
            .cloned()
            .ok_or_else(|| VitalError::NotFound(format!("预测 {} 不存在", id)))
    }

    async fn list_by_patient(
        &self,
        patient_id: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<RiskPrediction>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        let mut predictions: Vec<RiskPrediction> = inner
            .patient_predictions
            .get(patient_id)
            .map(|ids| ids.iter().filter_map(|id| inner.predictions.get(id)).cloned().collect())
            .unwrap_or_default();

        predictions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.created_at.cmp(&b.created_at)));
        if order == SortOrder::NewestFirst {
            predictions.reverse();
        }
        predictions.truncate(limit);
        Ok(predictions)
    }

    async fn annotate_outcome(&self, id: PredictionId, outcome: bool) -> Result<()> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        let prediction = inner
            .predictions
            .get_mut(&id)
            .ok_or_else(|| VitalError::NotFound(format!("预测 {} 不存在", id)))?;

        let current = prediction.actual_outcome;
        match current {
            Some(existing) if existing != outcome => Err(VitalError::Validation(format!(
                "预测 {} 已标注结局 {}，不能改写为 {}",
                id, existing, outcome
            ))),
            _ => {
                prediction.actual_outcome = Some(outcome);
                info!("Prediction {} annotated with outcome {}", id, outcome);
                Ok(())
            }
        }
    }

    async fn list_annotated(&self) -> Result<Vec<RiskPrediction>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .predictions
            .values()
            .filter(|p| p.is_annotated())
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<RiskPrediction>> {
        self.check_available()?;
        Ok(self.inner.read().await.predictions.values().cloned().collect())
    }
}
