//! 本地模型后端
//!
//! 本地后端在第一次翻译之前必须完成一次生命周期：
//!
//! 1. 检查语言对模型是否已安装
//! 2. 未安装时刷新一次远程包索引，找到对应的包并安装
//! 3. 将模型加载到内存
//! 4. 发出一次丢弃结果的预热翻译
//!
//! 会话由运行持有的 [`SessionRegistry`] 管理，运行结束时统一关闭。
//! 同一个会话上的推理调用互斥执行。

use std::collections::HashMap;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use super::{http_client, BackendKind, LanguagePair, TranslationBackend, TranslationOutcome};
use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 可安装的模型包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPackage {
    pub name: String,
    pub from_code: String,
    pub to_code: String,
}

impl ModelPackage {
    pub fn for_pair(pair: &LanguagePair) -> Self {
        Self {
            name: package_name(pair),
            from_code: pair.source.clone(),
            to_code: pair.target.clone(),
        }
    }
}

/// 安装检查的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    AlreadyInstalled,
    Installed(ModelPackage),
}

/// 本地模型运行时
///
/// 生命周期方法返回的错误都是致命的；`translate` 的错误只影响单段文本。
pub trait ModelRuntime: Send + Sync {
    fn is_installed(&self, pair: &LanguagePair) -> TranslationResult<bool>;

    fn update_index(&self) -> TranslationResult<()>;

    fn find_package(&self, pair: &LanguagePair) -> TranslationResult<Option<ModelPackage>>;

    fn install(&self, package: &ModelPackage) -> TranslationResult<()>;

    fn load(&self, pair: &LanguagePair) -> TranslationResult<()>;

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String>;

    fn unload(&self, _pair: &LanguagePair) {}
}

/// 确保语言对模型已安装
pub fn ensure_installed(
    runtime: &dyn ModelRuntime,
    pair: &LanguagePair,
) -> TranslationResult<InstallStatus> {
    match runtime.is_installed(pair) {
        Ok(true) => {
            tracing::info!("模型 {} 已安装", pair);
            return Ok(InstallStatus::AlreadyInstalled);
        }
        Ok(false) => {}
        Err(e) => tracing::warn!("检查已安装模型失败，继续安装流程: {}", e),
    }

    tracing::info!("更新模型包索引...");
    runtime.update_index()?;

    let package = runtime.find_package(pair)?.ok_or_else(|| {
        TranslationError::BackendError(format!("没有找到语言对 {} 的模型包", pair))
    })?;

    tracing::info!("安装模型包: {}", package.name);
    runtime.install(&package)?;
    Ok(InstallStatus::Installed(package))
}

/// 一个已加载并预热的语言对会话
pub struct LocalSession {
    runtime: Arc<dyn ModelRuntime>,
    pair: LanguagePair,
    inference: Mutex<()>,
}

impl LocalSession {
    /// 安装（必要时）、加载并预热
    fn start(runtime: Arc<dyn ModelRuntime>, pair: &LanguagePair) -> TranslationResult<Self> {
        ensure_installed(runtime.as_ref(), pair)?;

        tracing::info!("加载模型 {}", pair);
        runtime
            .load(pair)
            .map_err(|e| TranslationError::BackendError(format!("模型加载失败: {}", e)))?;

        runtime
            .translate(constants::WARMUP_TEXT, pair)
            .map_err(|e| TranslationError::BackendError(format!("模型预热失败: {}", e)))?;
        tracing::debug!("模型 {} 预热完成", pair);

        Ok(Self {
            runtime,
            pair: pair.clone(),
            inference: Mutex::new(()),
        })
    }

    pub fn pair(&self) -> &LanguagePair {
        &self.pair
    }

    pub fn translate(&self, text: &str) -> TranslationResult<String> {
        let _guard = self.inference.lock().unwrap_or_else(|e| e.into_inner());
        self.runtime.translate(text, &self.pair)
    }

    fn close(&self) {
        tracing::debug!("关闭模型会话 {}", self.pair);
        self.runtime.unload(&self.pair);
    }
}

/// 运行期间的会话登记表
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<LanguagePair, Arc<LocalSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开语言对会话，已打开的会话直接复用
    pub fn open(
        &mut self,
        runtime: Arc<dyn ModelRuntime>,
        pair: &LanguagePair,
    ) -> TranslationResult<Arc<LocalSession>> {
        if let Some(session) = self.sessions.get(pair) {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(LocalSession::start(runtime, pair)?);
        self.sessions.insert(pair.clone(), Arc::clone(&session));
        Ok(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 关闭全部会话
    pub fn close_all(&mut self) {
        for (_, session) in self.sessions.drain() {
            session.close();
        }
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// 本地后端
pub struct LocalBackend {
    session: Arc<LocalSession>,
}

impl LocalBackend {
    pub fn new(session: Arc<LocalSession>) -> Self {
        Self { session }
    }
}

impl TranslationBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationOutcome {
        if pair != self.session.pair() {
            return TranslationOutcome::Failure(format!(
                "本地会话只支持 {}，收到 {}",
                self.session.pair(),
                pair
            ));
        }
        self.session.translate(text).into()
    }
}

/// Argos Translate 运行时：HTTP 服务负责推理，`argospm` 负责包管理
pub struct ArgosRuntime {
    client: reqwest::blocking::Client,
    api_url: String,
    argospm_command: String,
}

#[derive(Debug, Deserialize)]
struct ServiceLanguage {
    code: String,
    #[serde(default)]
    targets: Vec<String>,
}

impl ArgosRuntime {
    pub fn new(api_url: &str, argospm: &str, timeout: Duration) -> TranslationResult<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_url: api_url.trim_end_matches('/').to_string(),
            argospm_command: argospm.to_string(),
        })
    }

    fn run_argospm(&self, args: &[&str]) -> TranslationResult<String> {
        tracing::debug!("执行 {} {}", self.argospm_command, args.join(" "));
        let output = Command::new(&self.argospm_command).args(args).output().map_err(|e| {
            TranslationError::BackendError(format!("无法执行 {}: {}", self.argospm_command, e))
        })?;

        if !output.status.success() {
            return Err(TranslationError::BackendError(format!(
                "{} {} 失败: {}",
                self.argospm_command,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn post(&self, path: &str, body: &Value) -> TranslationResult<Value> {
        Ok(self
            .client
            .post(format!("{}{}", self.api_url, path))
            .json(body)
            .send()?
            .error_for_status()?
            .json()?)
    }
}

impl ModelRuntime for ArgosRuntime {
    fn is_installed(&self, pair: &LanguagePair) -> TranslationResult<bool> {
        let languages: Vec<ServiceLanguage> = self
            .client
            .get(format!("{}/languages", self.api_url))
            .send()?
            .error_for_status()?
            .json()?;

        Ok(languages
            .iter()
            .any(|language| language.code == pair.source && language.targets.contains(&pair.target)))
    }

    fn update_index(&self) -> TranslationResult<()> {
        self.run_argospm(&["update"]).map(|_| ())
    }

    fn find_package(&self, pair: &LanguagePair) -> TranslationResult<Option<ModelPackage>> {
        let output = self.run_argospm(&[
            "search",
            "--from-lang",
            pair.source.as_str(),
            "--to-lang",
            pair.target.as_str(),
        ])?;
        Ok(parse_search_output(&output, pair))
    }

    fn install(&self, package: &ModelPackage) -> TranslationResult<()> {
        self.run_argospm(&["install", package.name.as_str()]).map(|_| ())
    }

    fn load(&self, pair: &LanguagePair) -> TranslationResult<()> {
        self.post("/loadmodel", &json!({"source": pair.source, "target": pair.target}))
            .map(|_| ())
    }

    fn translate(&self, text: &str, pair: &LanguagePair) -> TranslationResult<String> {
        let body = self.post("/translate", &translate_body(text, pair))?;
        parse_translate_response(&body)
    }
}

/// 包名形如 `translate-en_tr`
pub fn package_name(pair: &LanguagePair) -> String {
    format!("translate-{}_{}", pair.source, pair.target)
}

/// 在 `argospm search` 的输出中查找语言对对应的包
pub fn parse_search_output(output: &str, pair: &LanguagePair) -> Option<ModelPackage> {
    let wanted = package_name(pair);
    output
        .lines()
        .filter_map(|line| line.split(':').next())
        .map(str::trim)
        .find(|name| *name == wanted)
        .map(|_| ModelPackage::for_pair(pair))
}

pub fn translate_body(text: &str, pair: &LanguagePair) -> Value {
    json!({"q": text, "source": pair.source, "target": pair.target})
}

pub fn parse_translate_response(body: &Value) -> TranslationResult<String> {
    body.get("translatedText")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslationError::BackendError(format!("本地服务响应格式无效: {}", body)))
}
