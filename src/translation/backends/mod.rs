//! 翻译后端
//!
//! 所有后端实现同一个 [`TranslationBackend`] 接口：输入一段文本，返回
//! [`TranslationOutcome`]。单个文本的失败只影响这一段文本，不会终止整个运行；
//! 只有创建后端时的错误（缺少凭据、本地模型安装或加载失败）才是致命的。
//!
//! 后端集合是封闭的，由 [`BackendKind`] 描述，每种后端带有固定的并发策略。

pub mod deepl;
pub mod gemini;
pub mod google_free;
pub mod local;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::translation::config::{constants, TranslatorConfig};
use crate::translation::error::{TranslationError, TranslationResult};

pub use deepl::DeeplBackend;
pub use gemini::{GeminiBackend, GeminiEndpoint, PromptEndpoint};
pub use google_free::{FreeEndpoint, FreeHeuristicBackend, GoogleWebEndpoint, RetryPolicy};
pub use local::{
    ensure_installed, ArgosRuntime, InstallStatus, LocalBackend, LocalSession, ModelPackage,
    ModelRuntime, SessionRegistry,
};

/// 后端种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// 本地加载的模型
    Local,
    /// 需要密钥的付费云服务
    CloudKeyed,
    /// 无需认证的免费接口
    FreeHeuristic,
    /// 通过提示词调用的大语言模型
    LlmPrompted,
}

impl BackendKind {
    /// 文档并发数
    pub fn pool_size(self) -> usize {
        match self {
            BackendKind::Local => constants::LOCAL_POOL_SIZE,
            BackendKind::CloudKeyed => constants::CLOUD_KEYED_POOL_SIZE,
            BackendKind::FreeHeuristic | BackendKind::LlmPrompted => constants::DEFAULT_POOL_SIZE,
        }
    }

    /// 配置中使用的名称
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::CloudKeyed => "deepl",
            BackendKind::FreeHeuristic => "google_free",
            BackendKind::LlmPrompted => "gemini",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = TranslationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "local" | "argos" => Ok(BackendKind::Local),
            "deepl" => Ok(BackendKind::CloudKeyed),
            "google_free" | "google" => Ok(BackendKind::FreeHeuristic),
            "gemini" => Ok(BackendKind::LlmPrompted),
            other => Err(TranslationError::ConfigError(format!(
                "未知的翻译后端: '{}' (可选: local, deepl, google_free, gemini)",
                other
            ))),
        }
    }
}

/// 源语言与目标语言
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// 源语言是否交给服务自动识别
    pub fn is_auto_source(&self) -> bool {
        self.source.is_empty() || self.source.eq_ignore_ascii_case("auto")
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source, self.target)
    }
}

/// 单次翻译的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Success(String),
    Failure(String),
}

impl TranslationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TranslationOutcome::Success(_))
    }
}

impl From<TranslationResult<String>> for TranslationOutcome {
    fn from(result: TranslationResult<String>) -> Self {
        match result {
            Ok(text) => TranslationOutcome::Success(text),
            Err(e) => TranslationOutcome::Failure(e.to_string()),
        }
    }
}

/// 翻译后端接口
///
/// 实现必须是线程安全的，同一个实例会被多个文档任务同时调用（本地后端除外，
/// 它的并发数固定为 1）。`translate` 不返回错误，也不能无限阻塞。
pub trait TranslationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationOutcome;
}

/// 各后端需要的凭据
#[derive(Clone, Default)]
pub struct Credentials {
    pub deepl_key: Option<String>,
    pub gemini_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("deepl_key", &self.deepl_key.as_ref().map(|_| "***"))
            .field("gemini_key", &self.gemini_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// 后端端点、超时和重试设置
#[derive(Debug, Clone)]
pub struct BackendOptions {
    pub local_api_url: String,
    pub argospm_command: String,
    pub deepl_api_url: Option<String>,
    pub google_api_url: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub retry: RetryPolicy,
    pub llm_pacing: Duration,
    pub request_timeout: Duration,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self::from_config(&TranslatorConfig::default())
    }
}

impl BackendOptions {
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self {
            local_api_url: config.local_api_url.clone(),
            argospm_command: config.argospm_command.clone(),
            deepl_api_url: config.deepl_api_url.clone(),
            google_api_url: config.google_api_url.clone(),
            gemini_api_url: config.gemini_api_url.clone(),
            gemini_model: config.gemini_model.clone(),
            retry: RetryPolicy {
                max_attempts: config.max_retry_attempts,
                backoff: config.retry_backoff(),
            },
            llm_pacing: config.llm_pacing(),
            request_timeout: config.request_timeout(),
        }
    }
}

/// 创建阻塞式 HTTP 客户端
///
/// 阻塞客户端内部带有自己的运行时，必须在异步上下文之外创建和销毁。
pub fn http_client(timeout: Duration) -> TranslationResult<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| TranslationError::ConfigError(format!("无法创建HTTP客户端: {}", e)))
}

/// 根据后端种类创建后端实例
///
/// 本地后端会在这里完成安装、加载和预热，会话登记到 `sessions` 中，由调用方负责在运行结束时关闭。
pub fn create_backend(
    kind: BackendKind,
    pair: &LanguagePair,
    credentials: &Credentials,
    options: &BackendOptions,
    sessions: &mut SessionRegistry,
) -> TranslationResult<Arc<dyn TranslationBackend>> {
    tracing::info!("创建翻译后端: {} ({})", kind, pair);

    let backend: Arc<dyn TranslationBackend> = match kind {
        BackendKind::Local => {
            let runtime = Arc::new(ArgosRuntime::new(
                &options.local_api_url,
                &options.argospm_command,
                options.request_timeout,
            )?);
            let session = sessions.open(runtime, pair)?;
            Arc::new(LocalBackend::new(session))
        }
        BackendKind::CloudKeyed => {
            let key = credentials.deepl_key.as_deref().ok_or_else(|| {
                TranslationError::ConfigError("使用 deepl 后端需要提供 DeepL API 密钥".to_string())
            })?;
            Arc::new(DeeplBackend::new(
                key,
                options.deepl_api_url.as_deref(),
                options.request_timeout,
            )?)
        }
        BackendKind::FreeHeuristic => {
            let endpoint = GoogleWebEndpoint::new(&options.google_api_url, options.request_timeout)?;
            Arc::new(FreeHeuristicBackend::new(endpoint, options.retry.clone()))
        }
        BackendKind::LlmPrompted => {
            let key = credentials.gemini_key.as_deref().ok_or_else(|| {
                TranslationError::ConfigError("使用 gemini 后端需要提供 Gemini API 密钥".to_string())
            })?;
            let endpoint = GeminiEndpoint::new(
                key,
                &options.gemini_api_url,
                &options.gemini_model,
                options.request_timeout,
            )?;
            Arc::new(GeminiBackend::new(endpoint, options.llm_pacing))
        }
    };

    Ok(backend)
}

/// 截取文本开头用于日志
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("DeepL".parse::<BackendKind>().unwrap(), BackendKind::CloudKeyed);
        assert_eq!(" google_free ".parse::<BackendKind>().unwrap(), BackendKind::FreeHeuristic);
        assert_eq!("gemini".parse::<BackendKind>().unwrap(), BackendKind::LlmPrompted);
        assert!(matches!(
            "babelfish".parse::<BackendKind>(),
            Err(TranslationError::ConfigError(_))
        ));
    }

    #[test]
    fn test_pool_size_policy() {
        assert_eq!(BackendKind::Local.pool_size(), 1);
        assert_eq!(BackendKind::CloudKeyed.pool_size(), 16);
        assert_eq!(BackendKind::FreeHeuristic.pool_size(), 4);
        assert_eq!(BackendKind::LlmPrompted.pool_size(), 4);
    }

    #[test]
    fn test_kind_name_round_trip() {
        for kind in [
            BackendKind::Local,
            BackendKind::CloudKeyed,
            BackendKind::FreeHeuristic,
            BackendKind::LlmPrompted,
        ] {
            assert_eq!(kind.to_string().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_missing_credentials_are_config_errors() {
        let pair = LanguagePair::new("en", "tr");
        let mut sessions = SessionRegistry::new();
        let options = BackendOptions::default();

        for kind in [BackendKind::CloudKeyed, BackendKind::LlmPrompted] {
            let result = create_backend(kind, &pair, &Credentials::default(), &options, &mut sessions);
            assert!(matches!(result, Err(TranslationError::ConfigError(_))));
        }
    }

    #[test]
    fn test_credentials_debug_hides_keys() {
        let credentials = Credentials {
            deepl_key: Some("secret-key:fx".to_string()),
            gemini_key: None,
        };
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: TranslationOutcome = Ok("Merhaba".to_string()).into();
        assert_eq!(ok, TranslationOutcome::Success("Merhaba".to_string()));

        let failed: TranslationOutcome =
            Err(TranslationError::NetworkError("timeout".to_string())).into();
        assert!(!failed.is_success());
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 25), "short");
        assert_eq!(preview("çççççç", 3), "ççç...");
    }

    #[test]
    fn test_auto_source_detection() {
        assert!(LanguagePair::new("auto", "tr").is_auto_source());
        assert!(LanguagePair::new("", "tr").is_auto_source());
        assert!(!LanguagePair::new("en", "tr").is_auto_source());
    }
}
