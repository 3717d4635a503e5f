//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问。配置文件层面的覆盖由
//! `config` crate 的 `EPUB_TRANSLATOR_*` 前缀处理，这里只放需要单独校验
//! 或者沿用常见名称（如 `DEEPL_API_KEY`）的变量。

use std::env;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "EPUB_TRANSLATOR_LOG_LEVEL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何非空值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "EPUB_TRANSLATOR_TARGET_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Target language code (ISO 639-1, e.g. 'tr')";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language_code(value, Self::NAME, false)
        }
    }

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "EPUB_TRANSLATOR_SOURCE_LANG";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str =
            "Source language code ('auto' is accepted by remote backends)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language_code(value, Self::NAME, true)
        }
    }

    /// DeepL API 密钥
    pub struct DeeplKey;
    impl EnvVar<String> for DeeplKey {
        const NAME: &'static str = "DEEPL_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Authentication key for the DeepL API";

        fn parse(value: &str) -> EnvResult<String> {
            parse_secret(value, Self::NAME)
        }
    }

    /// Gemini API 密钥
    pub struct GeminiKey;
    impl EnvVar<String> for GeminiKey {
        const NAME: &'static str = "GEMINI_API_KEY";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "API key for the Gemini generative language API";

        fn parse(value: &str) -> EnvResult<String> {
            parse_secret(value, Self::NAME)
        }
    }

    /// 本地翻译服务地址
    pub struct LocalApiUrl;
    impl EnvVar<String> for LocalApiUrl {
        const NAME: &'static str = "ARGOS_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Base URL of the local Argos Translate service";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim().trim_end_matches('/');
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 外部格式转换命令
    pub struct ConverterCommand;
    impl EnvVar<String> for ConverterCommand {
        const NAME: &'static str = "EBOOK_CONVERT";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Path to the ebook-convert executable";

        fn parse(value: &str) -> EnvResult<String> {
            let command = value.trim();
            if command.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Command must not be empty".to_string(),
                });
            }
            Ok(command.to_string())
        }
    }

    /// 测试模式
    pub struct TestMode;
    impl EnvVar<bool> for TestMode {
        const NAME: &'static str = "EPUB_TRANSLATOR_TEST_MODE";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Cap the number of translated units per run";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }
}

fn language_code_regex() -> &'static Regex {
    static LANGUAGE_CODE: OnceLock<Regex> = OnceLock::new();
    LANGUAGE_CODE.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[a-z]{2,4})?$").expect("language code pattern is valid")
    })
}

/// 解析语言代码
pub fn parse_language_code(value: &str, name: &str, allow_auto: bool) -> EnvResult<String> {
    let lang = value.trim().to_lowercase();
    if allow_auto && lang == "auto" {
        return Ok(lang);
    }

    if language_code_regex().is_match(&lang) {
        Ok(lang)
    } else {
        Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid language code '{}'", value),
        })
    }
}

fn parse_secret(value: &str, name: &str) -> EnvResult<String> {
    let secret = value.trim();
    if secret.is_empty() {
        Err(EnvError {
            variable: name.to_string(),
            message: "Key must not be empty".to_string(),
        })
    } else {
        Ok(secret.to_string())
    }
}

/// 解析布尔值
pub fn parse_bool(value: &str, name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: name.to_string(),
            message: format!("Invalid boolean '{}'. Use: true/false, 1/0, yes/no, on/off", value),
        }),
    }
}
