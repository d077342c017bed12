//! 解释生成
//!
//! 基于原始读数（已校验、未截断）生成贡献因素，与实际使用的评分器无关。

use crate::normalizer::raw_values;
use crate::rules::VitalRule;
use vitaltwin_core::VitalsReading;

/// 解释生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 按固定顺序列出触发的规则标签
    pub fn explain(&self, reading: &VitalsReading) -> Vec<String> {
        let values = raw_values(reading);
        VitalRule::ALL
            .iter()
            .filter_map(|rule| rule.finding(&values))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reading(
        heart_rate: f64,
        systolic: f64,
        temperature: f64,
        oxygen_saturation: f64,
        activity_level: f64,
    ) -> VitalsReading {
        VitalsReading {
            patient_id: "P001".to_string(),
            device_id: None,
            timestamp: Utc::now(),
            heart_rate,
            systolic,
            diastolic: 80.0,
            temperature,
            oxygen_saturation,
            activity_level,
            respiratory_rate: None,
        }
    }

    #[test]
    fn test_normal_reading_has_no_factors() {
        let factors = ExplanationGenerator::new().explain(&reading(85.0, 120.0, 98.6, 98.0, 5.0));
        assert!(factors.is_empty());
    }

    #[test]
    fn test_all_factors_in_fixed_order() {
        let factors = ExplanationGenerator::new().explain(&reading(145.0, 170.0, 101.5, 89.0, 1.0));
        assert_eq!(
            factors,
            vec![
                "Elevated heart rate",
                "High systolic blood pressure",
                "Fever",
                "Low oxygen saturation",
                "Low activity level",
            ]
        );
    }

    #[test]
    fn test_unclamped_values_are_explained() {
        // 超出截断区间的原始值同样触发
        let factors = ExplanationGenerator::new().explain(&reading(85.0, 60.0, 98.6, 70.0, 5.0));
        assert_eq!(factors, vec!["Low systolic blood pressure", "Low oxygen saturation"]);
    }

    #[test]
    fn test_missing_optional_fields_are_skipped() {
        let mut sample = reading(110.0, 120.0, 98.6, 98.0, 5.0);
        sample.respiratory_rate = None;
        sample.device_id = None;
        assert_eq!(ExplanationGenerator::new().explain(&sample), vec!["Elevated heart rate"]);
    }
}
