//! 存储接口
//!
//! 核心逻辑只依赖这些接口，不假设具体存储引擎。要求同一进程内追加后立即可读，
//! 且标识在重启后保持稳定。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vitaltwin_core::{PredictionId, ReadingId, Result, RiskPrediction, StoredReading, VitalsReading};

/// 排序方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    /// 时间降序
    #[default]
    NewestFirst,
    /// 时间升序
    OldestFirst,
}

/// 读数存储
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// 持久化读数并分配标识
    async fn append_reading(&self, reading: VitalsReading) -> Result<StoredReading>;

    async fn get_reading(&self, id: ReadingId) -> Result<StoredReading>;

    /// 按读数时间戳降序返回患者读数
    async fn list_readings(&self, patient_id: &str, limit: usize) -> Result<Vec<StoredReading>>;

    async fn count_readings(&self) -> Result<usize>;
}

/// 预测记录存储（只追加）
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// 追加预测记录，其来源读数必须已经存在
    async fn append(&self, prediction: RiskPrediction) -> Result<PredictionId>;

    async fn get(&self, id: PredictionId) -> Result<RiskPrediction>;

    /// 按时间戳排序返回患者预测
    async fn list_by_patient(
        &self,
        patient_id: &str,
        limit: usize,
        order: SortOrder,
    ) -> Result<Vec<RiskPrediction>>;

    /// 回写实际结局，未知标识返回 NotFound 且不创建记录
    async fn annotate_outcome(&self, id: PredictionId, outcome: bool) -> Result<()>;

    /// 所有已标注结局的预测
    async fn list_annotated(&self) -> Result<Vec<RiskPrediction>>;

    async fn list_all(&self) -> Result<Vec<RiskPrediction>>;
}
