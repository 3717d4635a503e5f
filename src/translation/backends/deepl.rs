//! DeepL 后端
//!
//! 每次调用都是独立的 HTTP 请求，失败不重试，直接作为该文本的失败结果返回。

use std::time::Duration;

use serde_json::{json, Value};

use super::{http_client, BackendKind, LanguagePair, TranslationBackend, TranslationOutcome};
use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 免费版密钥的后缀
const FREE_KEY_SUFFIX: &str = ":fx";

pub struct DeeplBackend {
    client: reqwest::blocking::Client,
    api_url: String,
    auth_key: String,
}

impl DeeplBackend {
    /// `api_url` 为空时按密钥类型选择免费或付费端点
    pub fn new(auth_key: &str, api_url: Option<&str>, timeout: Duration) -> TranslationResult<Self> {
        let auth_key = auth_key.trim();
        if auth_key.is_empty() {
            return Err(TranslationError::ConfigError("DeepL API 密钥为空".to_string()));
        }

        let api_url = api_url
            .unwrap_or_else(|| endpoint_for_key(auth_key))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: http_client(timeout)?,
            api_url,
            auth_key: auth_key.to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn request(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String> {
        let response = self
            .client
            .post(format!("{}/v2/translate", self.api_url))
            .header("Authorization", format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&request_body(text, pair))
            .send()?
            .error_for_status()?;

        let body: Value = response.json()?;
        parse_response(&body)
    }
}

impl TranslationBackend for DeeplBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CloudKeyed
    }

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationOutcome {
        self.request(text, pair).into()
    }
}

/// 根据密钥选择端点
pub fn endpoint_for_key(auth_key: &str) -> &'static str {
    if auth_key.ends_with(FREE_KEY_SUFFIX) {
        constants::DEEPL_FREE_API_URL
    } else {
        constants::DEEPL_PRO_API_URL
    }
}

/// 构造请求体，语言代码使用大写
pub fn request_body(text: &str, pair: &LanguagePair) -> Value {
    let mut body = json!({
        "text": [text],
        "target_lang": pair.target.to_uppercase(),
        "preserve_formatting": true,
    });
    if !pair.is_auto_source() {
        body["source_lang"] = Value::String(pair.source.to_uppercase());
    }
    body
}

/// 读取 `translations[0].text`
pub fn parse_response(body: &Value) -> TranslationResult<String> {
    body.get("translations")
        .and_then(|translations| translations.get(0))
        .and_then(|first| first.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslationError::BackendError(format!("DeepL 响应格式无效: {}", body)))
}
