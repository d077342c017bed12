//! 临床阈值规则
//!
//! 规则评分器、解释生成器和合成训练标签共用同一组阈值。

use crate::normalizer::{FeatureBounds, FEATURE_COUNT};

/// 心率过快阈值 (次/分)
pub const HEART_RATE_HIGH: f64 = 100.0;
/// 收缩压过高阈值 (mmHg)
pub const SYSTOLIC_HIGH: f64 = 140.0;
/// 收缩压过低阈值 (mmHg)
pub const SYSTOLIC_LOW: f64 = 90.0;
/// 发热阈值 (°F)
pub const FEVER_F: f64 = 100.4;
/// 低血氧阈值 (%)
pub const OXYGEN_SATURATION_LOW: f64 = 95.0;
/// 低活动量阈值
pub const ACTIVITY_LOW: f64 = 2.0;

/// 合成标签的阳性判定阈值
pub const TRAINING_LABEL_THRESHOLD: f64 = 0.4;

/// 生命体征规则，`ALL` 的顺序即解释输出顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalRule {
    HeartRate,
    BloodPressure,
    Temperature,
    OxygenSaturation,
    Activity,
}

impl VitalRule {
    pub const ALL: [VitalRule; 5] = [
        VitalRule::HeartRate,
        VitalRule::BloodPressure,
        VitalRule::Temperature,
        VitalRule::OxygenSaturation,
        VitalRule::Activity,
    ];

    /// 规则评分器中的权重
    pub fn weight(&self) -> f64 {
        match self {
            VitalRule::HeartRate => 0.2,
            VitalRule::BloodPressure => 0.25,
            VitalRule::Temperature => 0.2,
            VitalRule::OxygenSaturation => 0.3,
            VitalRule::Activity => 0.15,
        }
    }

    /// 合成训练标签中的权重
    pub fn label_weight(&self) -> f64 {
        match self {
            VitalRule::HeartRate => 0.3,
            VitalRule::BloodPressure => 0.25,
            VitalRule::Temperature => 0.2,
            VitalRule::OxygenSaturation => 0.3,
            VitalRule::Activity => 0.15,
        }
    }

    /// 按固定特征顺序的取值判断规则是否触发，触发时返回因素标签
    pub fn finding(&self, values: &[f64; FEATURE_COUNT]) -> Option<&'static str> {
        let [heart_rate, systolic, _diastolic, temperature, oxygen_saturation, activity_level] =
            *values;

        match self {
            VitalRule::HeartRate if heart_rate > HEART_RATE_HIGH => Some("Elevated heart rate"),
            VitalRule::BloodPressure if systolic > SYSTOLIC_HIGH => {
                Some("High systolic blood pressure")
            }
            VitalRule::BloodPressure if systolic < SYSTOLIC_LOW => {
                Some("Low systolic blood pressure")
            }
            VitalRule::Temperature if temperature > FEVER_F => Some("Fever"),
            VitalRule::OxygenSaturation if oxygen_saturation < OXYGEN_SATURATION_LOW => {
                Some("Low oxygen saturation")
            }
            VitalRule::Activity if activity_level < ACTIVITY_LOW => Some("Low activity level"),
            _ => None,
        }
    }

    pub fn is_violated(&self, values: &[f64; FEATURE_COUNT]) -> bool {
        self.finding(values).is_some()
    }

    /// 超出阈值的距离，未触发时为 0
    pub fn excess(&self, values: &[f64; FEATURE_COUNT]) -> f64 {
        let [heart_rate, systolic, _diastolic, temperature, oxygen_saturation, activity_level] =
            *values;

        let distance = match self {
            VitalRule::HeartRate => heart_rate - HEART_RATE_HIGH,
            VitalRule::BloodPressure => (systolic - SYSTOLIC_HIGH).max(SYSTOLIC_LOW - systolic),
            VitalRule::Temperature => temperature - FEVER_F,
            VitalRule::OxygenSaturation => OXYGEN_SATURATION_LOW - oxygen_saturation,
            VitalRule::Activity => ACTIVITY_LOW - activity_level,
        };
        distance.max(0.0)
    }

    /// 规则作用的特征下标及其阈值
    pub fn thresholds(&self) -> (usize, &'static [f64]) {
        match self {
            VitalRule::HeartRate => (0, &[HEART_RATE_HIGH]),
            VitalRule::BloodPressure => (1, &[SYSTOLIC_LOW, SYSTOLIC_HIGH]),
            VitalRule::Temperature => (3, &[FEVER_F]),
            VitalRule::OxygenSaturation => (4, &[OXYGEN_SATURATION_LOW]),
            VitalRule::Activity => (5, &[ACTIVITY_LOW]),
        }
    }
}

/// 截断边界必须严格包含每个规则阈值，否则截断会抹掉规则触发
pub fn unenclosed_threshold(bounds: &FeatureBounds) -> Option<(VitalRule, f64)> {
    let bounds = bounds.as_array();
    VitalRule::ALL.iter().find_map(|rule| {
        let (index, thresholds) = rule.thresholds();
        let bound = bounds[index];
        thresholds
            .iter()
            .find(|threshold| !(bound.min < **threshold && **threshold < bound.max))
            .map(|threshold| (*rule, *threshold))
    })
}

/// 合成训练标签：加权异常和超过阈值即为阳性
pub fn training_label(values: &[f64; FEATURE_COUNT]) -> bool {
    let weighted = VitalRule::ALL
        .iter()
        .filter(|rule| rule.is_violated(values))
        .fold(0.0, |total, rule| total + rule.label_weight());
    weighted > TRAINING_LABEL_THRESHOLD
}
