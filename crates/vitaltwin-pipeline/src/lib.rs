//! # VitalTwin处理流水线
//!
//! 提供读数接收到预测落库的完整链路，以及准确率评估和看板聚合：
//! - 接收服务：校验、持久化读数，在独立任务中评分并写入预测
//! - 重试策略：存储调用的有界重试与超时
//! - 准确率评估：基于结局标注计算混淆矩阵
//! - 看板聚合：风险等级分布与准确率报告

pub mod dashboard;
pub mod evaluator;
pub mod ingest;
pub mod retry;

// 重新导出主要类型
pub use dashboard::{DashboardOverview, DashboardService, TierDistribution};
pub use evaluator::{AccuracyEvaluator, AccuracyReport, ComparedPrediction, ConfusionMatrix, Verdict};
pub use ingest::{HealthSummary, IngestReceipt, IngestService, PipelineConfig};
pub use retry::{with_retry, RetryPolicy};
