//! 特征归一化
//!
//! 将读数映射为固定顺序的特征向量，并按配置边界截断。

use serde::{Deserialize, Serialize};
use vitaltwin_core::utils::clamp;
use vitaltwin_core::VitalsReading;

/// 特征数量
pub const FEATURE_COUNT: usize = 6;

/// 固定特征顺序
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "heart_rate",
    "systolic",
    "diastolic",
    "temperature",
    "oxygen_saturation",
    "activity_level",
];

/// 单个特征的截断区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBound {
    pub min: f64,
    pub max: f64,
}

impl FeatureBound {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn apply(&self, value: f64) -> f64 {
        clamp(value, self.min, self.max)
    }
}

/// 各特征的生理合理区间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub heart_rate: FeatureBound,
    pub systolic: FeatureBound,
    pub diastolic: FeatureBound,
    pub temperature: FeatureBound,
    pub oxygen_saturation: FeatureBound,
    pub activity_level: FeatureBound,
}

impl FeatureBounds {
    /// 按固定特征顺序返回
    pub fn as_array(&self) -> [FeatureBound; FEATURE_COUNT] {
        [
            self.heart_rate,
            self.systolic,
            self.diastolic,
            self.temperature,
            self.oxygen_saturation,
            self.activity_level,
        ]
    }

    /// 截断一组按固定顺序排列的原始值
    pub fn clamp_values(&self, values: [f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let bounds = self.as_array();
        let mut clamped = values;
        for (value, bound) in clamped.iter_mut().zip(bounds.iter()) {
            *value = bound.apply(*value);
        }
        clamped
    }
}

impl Default for FeatureBounds {
    fn default() -> Self {
        Self {
            heart_rate: FeatureBound::new(40.0, 180.0),
            systolic: FeatureBound::new(80.0, 200.0),
            diastolic: FeatureBound::new(40.0, 120.0),
            temperature: FeatureBound::new(95.0, 105.0),
            oxygen_saturation: FeatureBound::new(85.0, 100.0),
            activity_level: FeatureBound::new(0.0, 10.0),
        }
    }
}

/// 归一化后的特征向量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn heart_rate(&self) -> f64 {
        self.0[0]
    }

    pub fn systolic(&self) -> f64 {
        self.0[1]
    }

    pub fn diastolic(&self) -> f64 {
        self.0[2]
    }

    pub fn temperature(&self) -> f64 {
        self.0[3]
    }

    pub fn oxygen_saturation(&self) -> f64 {
        self.0[4]
    }

    pub fn activity_level(&self) -> f64 {
        self.0[5]
    }
}

/// 读数按固定顺序展开的原始值
pub fn raw_values(reading: &VitalsReading) -> [f64; FEATURE_COUNT] {
    [
        reading.heart_rate,
        reading.systolic,
        reading.diastolic,
        reading.temperature,
        reading.oxygen_saturation,
        reading.activity_level,
    ]
}

/// 特征归一化器
#[derive(Debug, Clone, Default)]
pub struct FeatureNormalizer {
    bounds: FeatureBounds,
}

impl FeatureNormalizer {
    pub fn new(bounds: FeatureBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &FeatureBounds {
        &self.bounds
    }

    /// 生成截断后的特征向量
    pub fn normalize(&self, reading: &VitalsReading) -> FeatureVector {
        FeatureVector(self.bounds.clamp_values(raw_values(reading)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(heart_rate: f64, oxygen_saturation: f64) -> VitalsReading {
        VitalsReading {
            patient_id: "P001".to_string(),
            device_id: None,
            timestamp: Utc::now(),
            heart_rate,
            systolic: 120.0,
            diastolic: 80.0,
            temperature: 98.6,
            oxygen_saturation,
            activity_level: 5.0,
            respiratory_rate: None,
        }
    }

    #[test]
    fn test_canonical_order() {
        let normalizer = FeatureNormalizer::default();
        let features = normalizer.normalize(&reading(72.0, 97.0));
        assert_eq!(features.values(), &[72.0, 120.0, 80.0, 98.6, 97.0, 5.0]);
    }

    #[test]
    fn test_clamping() {
        let normalizer = FeatureNormalizer::default();
        let features = normalizer.normalize(&reading(260.0, 60.0));
        assert_eq!(features.heart_rate(), 180.0);
        assert_eq!(features.oxygen_saturation(), 85.0);

        let features = normalizer.normalize(&reading(10.0, 120.0));
        assert_eq!(features.heart_rate(), 40.0);
        assert_eq!(features.oxygen_saturation(), 100.0);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = FeatureNormalizer::default();
        let sample = reading(150.0, 88.0);
        assert_eq!(normalizer.normalize(&sample), normalizer.normalize(&sample));
    }

    #[test]
    fn test_custom_bounds() {
        let mut bounds = FeatureBounds::default();
        bounds.heart_rate = FeatureBound::new(50.0, 150.0);
        let normalizer = FeatureNormalizer::new(bounds);
        assert_eq!(normalizer.normalize(&reading(170.0, 97.0)).heart_rate(), 150.0);
    }
}
