//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslatorConfig};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 文本选择相关
    pub const MIN_TEXT_LENGTH: usize = 2;
    pub const PRIMARY_TAGS: &[&str] = &[
        "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "blockquote",
    ];
    pub const LINK_TAG: &str = "a";

    // 注入译文的标记
    pub const MARKER_CLASS: &str = "translation-text";
    pub const MARKER_STYLE: &str = "color: #555; font-size: 90%; background-color: #f4f4f4; display: block; margin-top: 4px; padding: 4px; border-radius: 4px; line-height: 1.4;";

    // 归档相关
    pub const PACKAGE_SUFFIX: &str = ".opf";
    pub const MIMETYPE_MEMBER: &str = "mimetype";
    pub const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];
    pub const CONVERTIBLE_EXTENSIONS: &[&str] = &["mobi", "azw3", "azw"];
    pub const OUTPUT_EXTENSION: &str = "epub";
    pub const NAVIGATION_MARKERS: &[&str] = &["toc", "nav"];

    // 各后端的并发策略
    pub const LOCAL_POOL_SIZE: usize = 1;
    pub const CLOUD_KEYED_POOL_SIZE: usize = 16;
    pub const DEFAULT_POOL_SIZE: usize = 4;

    // 后端默认值
    pub const DEFAULT_SOURCE_LANG: &str = "en";
    pub const DEFAULT_TARGET_LANG: &str = "tr";
    pub const DEFAULT_BACKEND: &str = "google_free";
    pub const DEFAULT_LOCAL_API_URL: &str = "http://127.0.0.1:5000";
    pub const DEFAULT_ARGOSPM_COMMAND: &str = "argospm";
    pub const DEFAULT_CONVERTER_COMMAND: &str = "ebook-convert";
    pub const DEFAULT_GOOGLE_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
    pub const DEFAULT_GEMINI_MODEL: &str = "gemini-pro";
    pub const DEEPL_FREE_API_URL: &str = "https://api-free.deepl.com";
    pub const DEEPL_PRO_API_URL: &str = "https://api.deepl.com";
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 3;
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);
    pub const DEFAULT_LLM_PACING: Duration = Duration::from_millis(500);
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_TEST_LIMIT: usize = 50;
    pub const DEFAULT_PROGRESS_CAPACITY: usize = 64;
    pub const WARMUP_TEXT: &str = "warmup";

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "epub-translator.toml",
        ".epub-translator.toml",
        "~/.config/epub-translator/config.toml",
        "/etc/epub-translator/config.toml",
    ];
    pub const ENV_PREFIX: &str = "EPUB_TRANSLATOR";
}
