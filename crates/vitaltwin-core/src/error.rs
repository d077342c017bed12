//! 错误定义模块

use thiserror::Error;

/// 风险评分系统统一错误类型
#[derive(Error, Debug)]
pub enum VitalError {
    #[error("验证错误: {0}")]
    Validation(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("存储暂不可用: {0}")]
    TransientStore(String),

    #[error("模型不可用: {0}")]
    ModelUnavailable(String),

    #[error("操作超时: {0}")]
    Timeout(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("系统内部错误: {0}")]
    Internal(String),
}

/// 错误分类，区分调用方输入问题与系统暂时不可用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidInput,
    NotFound,
    Unavailable,
    Internal,
}

impl VitalError {
    /// 错误所属分类
    pub fn class(&self) -> ErrorClass {
        match self {
            VitalError::Validation(_) | VitalError::Config(_) => ErrorClass::InvalidInput,
            VitalError::NotFound(_) => ErrorClass::NotFound,
            VitalError::TransientStore(_)
            | VitalError::ModelUnavailable(_)
            | VitalError::Timeout(_) => ErrorClass::Unavailable,
            VitalError::Io(_) | VitalError::Serialization(_) | VitalError::Internal(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// 调用方是否可以重试整个操作
    pub fn is_retryable(&self) -> bool {
        matches!(self, VitalError::TransientStore(_) | VitalError::Timeout(_))
    }
}

/// 风险评分系统统一结果类型
pub type Result<T> = std::result::Result<T, VitalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(VitalError::Validation("x".into()).class(), ErrorClass::InvalidInput);
        assert_eq!(VitalError::NotFound("x".into()).class(), ErrorClass::NotFound);
        assert_eq!(VitalError::TransientStore("x".into()).class(), ErrorClass::Unavailable);
        assert_eq!(VitalError::Internal("x".into()).class(), ErrorClass::Internal);
    }

    #[test]
    fn test_retryable() {
        assert!(VitalError::TransientStore("down".into()).is_retryable());
        assert!(VitalError::Timeout("slow".into()).is_retryable());
        assert!(!VitalError::Validation("bad".into()).is_retryable());
        assert!(!VitalError::NotFound("gone".into()).is_retryable());
    }
}
