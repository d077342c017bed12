//! 核心数据模型定义
//!
//! 体温统一使用华氏度 (°F)。

use crate::error::{Result, VitalError};
use crate::utils::{ensure_finite, ensure_identifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 生命体征读数标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub Uuid);

impl ReadingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReadingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 风险预测标识，在接收读数时分配并返回给调用方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionId(pub Uuid);

impl PredictionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Result<Self> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|e| VitalError::Validation(format!("无效的预测ID {}: {}", value, e)))
    }
}

impl Default for PredictionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PredictionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 患者基本信息，评分核心只把它当作外键使用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub medical_conditions: Vec<String>,
}

/// 单次生命体征读数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalsReading {
    pub patient_id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,                 // 次/分
    pub systolic: f64,                   // mmHg
    pub diastolic: f64,                  // mmHg
    pub temperature: f64,                // °F
    pub oxygen_saturation: f64,          // %
    pub activity_level: f64,             // 0-10
    #[serde(default)]
    pub respiratory_rate: Option<f64>,   // 次/分，可选
}

impl VitalsReading {
    /// 校验读数：标识非空，所有数值有限。超出生理范围的值保留，由归一化阶段截断。
    pub fn validate(&self) -> Result<()> {
        ensure_identifier("patient_id", &self.patient_id)?;
        if let Some(device_id) = &self.device_id {
            ensure_identifier("device_id", device_id)?;
        }

        ensure_finite("heart_rate", self.heart_rate)?;
        ensure_finite("systolic", self.systolic)?;
        ensure_finite("diastolic", self.diastolic)?;
        ensure_finite("temperature", self.temperature)?;
        ensure_finite("oxygen_saturation", self.oxygen_saturation)?;
        ensure_finite("activity_level", self.activity_level)?;

        if let Some(rate) = self.respiratory_rate {
            ensure_finite("respiratory_rate", rate)?;
        }

        Ok(())
    }
}

/// 设备上报的原始负载，必填字段缺失时在边界处拒绝
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingPayload {
    pub patient_id: Option<String>,
    pub device_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub heart_rate: Option<f64>,
    #[serde(alias = "blood_pressure_systolic")]
    pub systolic: Option<f64>,
    #[serde(alias = "blood_pressure_diastolic")]
    pub diastolic: Option<f64>,
    pub temperature: Option<f64>,
    #[serde(alias = "spo2")]
    pub oxygen_saturation: Option<f64>,
    pub activity_level: Option<f64>,
    pub respiratory_rate: Option<f64>,
}

fn required<T>(field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| VitalError::Validation(format!("缺少必填字段: {}", field)))
}

impl TryFrom<ReadingPayload> for VitalsReading {
    type Error = VitalError;

    fn try_from(payload: ReadingPayload) -> Result<Self> {
        let reading = VitalsReading {
            patient_id: required("patient_id", payload.patient_id)?,
            device_id: payload.device_id,
            timestamp: required("timestamp", payload.timestamp)?,
            heart_rate: required("heart_rate", payload.heart_rate)?,
            systolic: required("systolic", payload.systolic)?,
            diastolic: required("diastolic", payload.diastolic)?,
            temperature: required("temperature", payload.temperature)?,
            oxygen_saturation: required("oxygen_saturation", payload.oxygen_saturation)?,
            activity_level: required("activity_level", payload.activity_level)?,
            respiratory_rate: payload.respiratory_rate,
        };
        reading.validate()?;
        Ok(reading)
    }
}

/// 已持久化的读数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: ReadingId,
    pub received_at: DateTime<Utc>,
    pub reading: VitalsReading,
}

/// 风险等级
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }

    pub fn all() -> [RiskTier; 3] {
        [RiskTier::Low, RiskTier::Medium, RiskTier::High]
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 风险预测记录
///
/// 每条读数生成一条，除 `actual_outcome` 的一次性回写外不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub id: PredictionId,
    pub reading_id: ReadingId,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    pub risk_score: f64,
    pub risk_tier: RiskTier,
    pub contributing_factors: Vec<String>,
    pub scorer: String,
    pub created_at: DateTime<Utc>,
    pub actual_outcome: Option<bool>,
}

impl RiskPrediction {
    pub fn is_annotated(&self) -> bool {
        self.actual_outcome.is_some()
    }
}
