//! 通用工具函数

use crate::error::{Result, VitalError};

/// 校验数值字段为有限数
pub fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(VitalError::Validation(format!("字段 {} 必须是有限数值，实际为 {}", field, value)))
    }
}

/// 校验标识符非空
pub fn ensure_identifier(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(VitalError::Validation(format!("字段 {} 不能为空", field)))
    } else {
        Ok(())
    }
}

/// 将数值限制在闭区间内
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("heart_rate", 72.0).is_ok());
        assert!(ensure_finite("heart_rate", f64::NAN).is_err());
        assert!(ensure_finite("heart_rate", f64::INFINITY).is_err());
    }

    #[test]
    fn test_ensure_identifier() {
        assert!(ensure_identifier("patient_id", "P001").is_ok());
        assert!(ensure_identifier("patient_id", "").is_err());
        assert!(ensure_identifier("patient_id", "   ").is_err());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(250.0, 40.0, 180.0), 180.0);
        assert_eq!(clamp(10.0, 40.0, 180.0), 40.0);
        assert_eq!(clamp(72.0, 40.0, 180.0), 72.0);
    }
}
