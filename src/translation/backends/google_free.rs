//! 免费的 Google 网页翻译接口
//!
//! 接口无需认证，但不稳定。[`FreeHeuristicBackend`] 在端点之上加了固定间隔的重试：
//! 最多尝试 `max_attempts` 次，全部失败时返回最后一次的错误作为失败结果。

use std::thread;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use super::{http_client, BackendKind, LanguagePair, TranslationBackend, TranslationOutcome};
use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: usize,
    /// 两次尝试之间的固定等待
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            backoff: constants::DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// 一次免费接口调用
pub trait FreeEndpoint: Send + Sync {
    fn request(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String>;
}

/// `translate_a/single` 网页接口
pub struct GoogleWebEndpoint {
    client: reqwest::blocking::Client,
    api_url: Url,
}

impl GoogleWebEndpoint {
    pub fn new(api_url: &str, timeout: Duration) -> TranslationResult<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| TranslationError::ConfigError(format!("无效的接口地址 {}: {}", api_url, e)))?;

        Ok(Self {
            client: http_client(timeout)?,
            api_url,
        })
    }

    /// 拼出请求地址，源语言交给接口自动识别
    pub fn request_url(&self, text: &str, pair: &LanguagePair) -> Url {
        let mut url = self.api_url.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", "auto")
            .append_pair("tl", &pair.target)
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }
}

impl FreeEndpoint for GoogleWebEndpoint {
    fn request(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String> {
        let body: Value = self
            .client
            .get(self.request_url(text, pair))
            .send()?
            .error_for_status()?
            .json()?;

        parse_response(&body)
    }
}

/// 拼接 `[0][i][0]` 中的译文片段
pub fn parse_response(body: &Value) -> TranslationResult<String> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::BackendError("免费翻译接口响应格式无效".to_string()))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if translated.is_empty() {
        return Err(TranslationError::BackendError("免费翻译接口返回空结果".to_string()));
    }

    Ok(translated)
}

/// 带重试的免费后端
pub struct FreeHeuristicBackend<E: FreeEndpoint> {
    endpoint: E,
    policy: RetryPolicy,
}

impl<E: FreeEndpoint> FreeHeuristicBackend<E> {
    pub fn new(endpoint: E, policy: RetryPolicy) -> Self {
        Self { endpoint, policy }
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }
}

impl<E: FreeEndpoint> TranslationBackend for FreeHeuristicBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::FreeHeuristic
    }

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.endpoint.request(text, pair) {
                Ok(translated) => return TranslationOutcome::Success(translated),
                Err(e) if attempt >= max_attempts => {
                    tracing::warn!("翻译失败，已尝试 {} 次: {}", attempt, e);
                    return TranslationOutcome::Failure(e.to_string());
                }
                Err(e) => {
                    tracing::debug!(
                        "翻译失败，{}ms后重试 (尝试 {}/{}): {}",
                        self.policy.backoff.as_millis(),
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    thread::sleep(self.policy.backoff);
                }
            }
        }
    }
}
