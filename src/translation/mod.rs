//! 翻译模块
//!
//! 采用清晰的模块化架构：
//! - **backends**: 翻译后端（本地模型、DeepL、免费接口、Gemini）
//! - **pipeline**: 单个文档的处理管道（选择、过滤、注入）
//! - **core**: 文档调度、取消与进度
//! - **config**: 配置管理
//! - **error**: 错误处理

// ============================================================================
// 子模块声明
// ============================================================================

/// 翻译后端模块 - 统一的翻译接口和各个实现
pub mod backends;

/// 配置管理模块 - 处理翻译相关的所有配置
///
/// 提供语言设置、后端端点、重试策略和运行范围等配置
pub mod config;

/// 核心调度模块 - 工作池、取消标志、测试模式计数和进度
pub mod core;

/// 错误处理模块 - 统一的错误类型和处理机制
pub mod error;

/// 文本处理管道模块 - 文本选择、过滤和译文注入
pub mod pipeline;

// ============================================================================
// 公共API重新导出
// ============================================================================

pub use backends::{
    create_backend, BackendKind, BackendOptions, Credentials, LanguagePair, TranslationBackend,
    TranslationOutcome,
};
pub use config::{constants, ConfigManager, TranslatorConfig};
pub use self::core::{
    progress_channel, CancellationFlag, Orchestrator, ProgressEvent, ProgressReceiver,
    ProgressSender, RunCounters, RunStatus, RunSummary,
};
pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};
pub use pipeline::{select_units, DocumentTree, TextCollector, TextFilter, TranslatableUnit};

/// 便利函数：判断文本是否需要翻译
pub fn should_translate(text: &str) -> bool {
    pipeline::filters::should_translate(text)
}
