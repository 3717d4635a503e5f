//! Gemini 提示词翻译后端
//!
//! 每次调用后固定等待一段时间，避免触发服务端的吞吐限制。

use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use super::{http_client, BackendKind, LanguagePair, TranslationBackend, TranslationOutcome};
use crate::translation::error::{TranslationError, TranslationResult};

/// 一次提示词接口调用
pub trait PromptEndpoint: Send + Sync {
    fn request(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String>;
}

/// `generateContent` 接口
pub struct GeminiEndpoint {
    client: reqwest::blocking::Client,
    url: String,
    api_key: String,
}

impl GeminiEndpoint {
    pub fn new(
        api_key: &str,
        api_url: &str,
        model: &str,
        timeout: Duration,
    ) -> TranslationResult<Self> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(TranslationError::ConfigError("Gemini API 密钥为空".to_string()));
        }

        Ok(Self {
            client: http_client(timeout)?,
            url: generate_content_url(api_url, model),
            api_key: api_key.to_string(),
        })
    }
}

impl PromptEndpoint for GeminiEndpoint {
    fn request(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String> {
        let body: Value = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(text, pair))
            .send()?
            .error_for_status()?
            .json()?;

        parse_response(&body)
    }
}

/// 每次调用后（无论成功与否）都等待 `pacing` 的提示词后端
pub struct GeminiBackend<E: PromptEndpoint = GeminiEndpoint> {
    endpoint: E,
    pacing: Duration,
}

impl<E: PromptEndpoint> GeminiBackend<E> {
    pub fn new(endpoint: E, pacing: Duration) -> Self {
        Self { endpoint, pacing }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

impl<E: PromptEndpoint> TranslationBackend for GeminiBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::LlmPrompted
    }

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationOutcome {
        let outcome: TranslationOutcome = self.endpoint.request(text, pair).into();
        thread::sleep(self.pacing);
        outcome
    }
}

pub fn generate_content_url(api_url: &str, model: &str) -> String {
    format!("{}/{}:generateContent", api_url.trim_end_matches('/'), model)
}

pub fn build_prompt(text: &str, pair: &LanguagePair) -> String {
    format!("Translate to {}. Output only text: {}", pair.target, text)
}

pub fn request_body(text: &str, pair: &LanguagePair) -> Value {
    json!({
        "contents": [{
            "parts": [{ "text": build_prompt(text, pair) }]
        }]
    })
}

/// 读取 `candidates[0].content.parts[0].text` 并去掉首尾空白
pub fn parse_response(body: &Value) -> TranslationResult<String> {
    let text = body
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslationError::BackendError(format!("Gemini 响应格式无效: {}", body)))?
        .trim();

    if text.is_empty() {
        return Err(TranslationError::BackendError("Gemini 返回空结果".to_string()));
    }

    Ok(text.to_string())
}
