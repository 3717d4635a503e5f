//! 简化的配置管理器
//!
//! 提供统一的配置接口，支持文件配置、环境变量和默认值。
//! 优先级从低到高：内置默认值、配置文件、`EPUB_TRANSLATOR_*` 环境变量、命令行参数。

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::backends::BackendKind;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译器配置
///
/// 字段与 GUI/HTTP 前端收集的设置一一对应，可以保存为 TOML。
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslatorConfig {
    // 基础配置
    pub source_lang: String,
    pub target_lang: String,
    pub backend: String,

    // 凭据
    pub deepl_key: Option<String>,
    pub gemini_key: Option<String>,

    // 后端端点
    pub local_api_url: String,
    pub argospm_command: String,
    pub deepl_api_url: Option<String>,
    pub google_api_url: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub converter_command: String,

    // 重试与节流
    pub max_retry_attempts: usize,
    pub retry_backoff_ms: u64,
    pub llm_pacing_ms: u64,
    pub request_timeout_secs: u64,

    // 运行范围
    pub test_mode: bool,
    pub test_limit: usize,
    pub start_index: usize,
    pub skip_navigation: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            source_lang: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_lang: constants::DEFAULT_TARGET_LANG.to_string(),
            backend: constants::DEFAULT_BACKEND.to_string(),

            deepl_key: None,
            gemini_key: None,

            local_api_url: constants::DEFAULT_LOCAL_API_URL.to_string(),
            argospm_command: constants::DEFAULT_ARGOSPM_COMMAND.to_string(),
            deepl_api_url: None,
            google_api_url: constants::DEFAULT_GOOGLE_API_URL.to_string(),
            gemini_api_url: constants::DEFAULT_GEMINI_API_URL.to_string(),
            gemini_model: constants::DEFAULT_GEMINI_MODEL.to_string(),
            converter_command: constants::DEFAULT_CONVERTER_COMMAND.to_string(),

            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_backoff_ms: constants::DEFAULT_RETRY_BACKOFF.as_millis() as u64,
            llm_pacing_ms: constants::DEFAULT_LLM_PACING.as_millis() as u64,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),

            test_mode: false,
            test_limit: constants::DEFAULT_TEST_LIMIT,
            start_index: 0,
            skip_navigation: true,
        }
    }
}

impl TranslatorConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.target_lang.trim().is_empty() {
            return Err(TranslationError::ConfigError("目标语言不能为空".to_string()));
        }

        if self.max_retry_attempts == 0 {
            return Err(TranslationError::ConfigError("重试次数至少为1".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(TranslationError::ConfigError("请求超时必须大于0".to_string()));
        }

        self.backend_kind()?;

        Ok(())
    }

    /// 解析后端选择
    pub fn backend_kind(&self) -> TranslationResult<BackendKind> {
        self.backend.parse()
    }

    /// 应用环境变量覆盖（使用类型安全环境变量系统）
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{translation, EnvVar};

        if let Ok(target_lang) = translation::TargetLang::get() {
            self.target_lang = target_lang;
        }

        if let Ok(source_lang) = translation::SourceLang::get() {
            self.source_lang = source_lang;
        }

        if let Ok(test_mode) = translation::TestMode::get() {
            self.test_mode = self.test_mode || test_mode;
        }

        if let Ok(key) = translation::DeeplKey::get() {
            self.deepl_key = Some(key);
        }

        if let Ok(key) = translation::GeminiKey::get() {
            self.gemini_key = Some(key);
        }

        if let Ok(url) = translation::LocalApiUrl::get() {
            self.local_api_url = url;
            tracing::info!("环境变量覆盖本地 API URL: {}", self.local_api_url);
        }

        if let Ok(command) = translation::ConverterCommand::get() {
            self.converter_command = command;
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn llm_pacing(&self) -> Duration {
        Duration::from_millis(self.llm_pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 简化的配置管理器
pub struct ConfigManager {
    config: TranslatorConfig,
    config_path: Option<String>,
}

impl ConfigManager {
    /// 创建新的配置管理器，按搜索路径查找配置文件
    pub fn new() -> TranslationResult<Self> {
        Self::with_file(None)
    }

    /// 使用指定的配置文件创建配置管理器
    pub fn with_file(path: Option<&Path>) -> TranslationResult<Self> {
        let (mut config, config_path) = Self::load_config(path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self {
            config,
            config_path,
        })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// 实际加载的配置文件路径
    pub fn config_path(&self) -> Option<&str> {
        self.config_path.as_deref()
    }

    /// 加载配置
    fn load_config(
        explicit: Option<&Path>,
    ) -> TranslationResult<(TranslatorConfig, Option<String>)> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        let mut builder = Config::builder().add_source(
            Config::try_from(&TranslatorConfig::default())
                .map_err(|e| TranslationError::ConfigError(format!("默认配置错误: {}", e)))?,
        );

        let mut config_path = None;
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(TranslationError::ConfigError(format!(
                    "配置文件不存在: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
            config_path = Some(path.display().to_string());
        } else {
            for path in constants::CONFIG_PATHS {
                let expanded_path = shellexpand::tilde(path);
                if Path::new(expanded_path.as_ref()).exists() {
                    builder = builder.add_source(File::with_name(&expanded_path));
                    config_path = Some(expanded_path.to_string());
                    break;
                }
            }
        }

        match &config_path {
            Some(path) => tracing::info!("加载配置文件: {}", path),
            None => tracing::debug!("未找到配置文件，使用默认配置"),
        }

        builder = builder.add_source(
            Environment::with_prefix(constants::ENV_PREFIX)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("构建配置失败: {}", e)))?;

        let translator_config: TranslatorConfig = config
            .try_deserialize()
            .map_err(|e| TranslationError::ConfigError(format!("反序列化配置失败: {}", e)))?;

        Ok((translator_config, config_path))
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: &Path) -> TranslationResult<()> {
        let config = TranslatorConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}
