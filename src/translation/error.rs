//! 翻译模块统一错误处理
//!
//! 提供结构化错误类型和错误处理机制。单个文本单元的翻译失败不会走到这里，
//! 后端以 [`TranslationOutcome`](crate::translation::backends::TranslationOutcome)
//! 返回；这里的错误只用于整个运行必须终止的情况。

use std::fmt;

use thiserror::Error;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误（输入文件缺失、凭据缺失、未知后端等）
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 归档错误（容器损坏、无法读取或写入）
    #[error("归档错误: {0}")]
    ArchiveError(String),

    /// 后端错误（认证、网络、配额、本地模型加载）
    #[error("后端错误: {0}")]
    BackendError(String),

    /// 网络错误
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 外部格式转换失败
    #[error("格式转换失败: {0}")]
    ConversionError(String),

    /// 解析错误
    #[error("解析错误: {0}")]
    ParseError(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    SerializationError(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    InternalError(String),
}

impl TranslationError {
    /// 检查错误是否可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_) => true,
            TranslationError::BackendError(_) => true,
            TranslationError::ConfigError(_) => false,
            TranslationError::ArchiveError(_) => false,
            TranslationError::ConversionError(_) => false,
            TranslationError::ParseError(_) => false,
            TranslationError::SerializationError(_) => false,
            TranslationError::InternalError(_) => false,
        }
    }

    /// 获取错误的严重程度
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::ArchiveError(_) => ErrorSeverity::Critical,
            TranslationError::BackendError(_) => ErrorSeverity::Error,
            TranslationError::NetworkError(_) => ErrorSeverity::Warning,
            TranslationError::ConversionError(_) => ErrorSeverity::Critical,
            TranslationError::ParseError(_) => ErrorSeverity::Error,
            TranslationError::SerializationError(_) => ErrorSeverity::Error,
            TranslationError::InternalError(_) => ErrorSeverity::Critical,
        }
    }

    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::ArchiveError(_) => ErrorCategory::Archive,
            TranslationError::BackendError(_) => ErrorCategory::Backend,
            TranslationError::NetworkError(_) => ErrorCategory::Network,
            TranslationError::ConversionError(_) => ErrorCategory::Conversion,
            TranslationError::ParseError(_) => ErrorCategory::Parsing,
            TranslationError::SerializationError(_) => ErrorCategory::Serialization,
            TranslationError::InternalError(_) => ErrorCategory::Internal,
        }
    }

    /// 创建带上下文的错误
    pub fn with_context<T: fmt::Display>(mut self, context: T) -> Self {
        let new_msg = match &self {
            TranslationError::ConfigError(msg)
            | TranslationError::ArchiveError(msg)
            | TranslationError::BackendError(msg)
            | TranslationError::NetworkError(msg)
            | TranslationError::ConversionError(msg)
            | TranslationError::ParseError(msg)
            | TranslationError::SerializationError(msg)
            | TranslationError::InternalError(msg) => format!("{} (上下文: {})", msg, context),
        };

        match &mut self {
            TranslationError::ConfigError(ref mut msg)
            | TranslationError::ArchiveError(ref mut msg)
            | TranslationError::BackendError(ref mut msg)
            | TranslationError::NetworkError(ref mut msg)
            | TranslationError::ConversionError(ref mut msg)
            | TranslationError::ParseError(ref mut msg)
            | TranslationError::SerializationError(ref mut msg)
            | TranslationError::InternalError(ref mut msg) => *msg = new_msg,
        }

        self
    }
}

/// 错误严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Archive,
    Backend,
    Network,
    Conversion,
    Parsing,
    Serialization,
    Internal,
}

/// 标准错误转换
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::ArchiveError(format!("IO错误: {}", error))
    }
}

impl From<zip::result::ZipError> for TranslationError {
    fn from(error: zip::result::ZipError) -> Self {
        TranslationError::ArchiveError(format!("ZIP错误: {}", error))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_status() {
            TranslationError::BackendError(format!("HTTP状态错误: {}", error))
        } else {
            TranslationError::NetworkError(format!("请求失败: {}", error))
        }
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(format!("配置错误: {}", error))
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 记录并返回错误
    pub fn log_error<T>(error: TranslationError) -> TranslationResult<T> {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!("翻译信息: {}", error),
            ErrorSeverity::Warning => tracing::warn!("翻译警告: {}", error),
            ErrorSeverity::Error => tracing::error!("翻译错误: {}", error),
            ErrorSeverity::Critical => tracing::error!("翻译严重错误: {}", error),
        }

        Err(error)
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }

    /// 创建归档错误
    pub fn archive_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ArchiveError(msg.to_string())
    }

    /// 创建后端错误
    pub fn backend_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::BackendError(msg.to_string())
    }
}
