//! 一次完整运行的入口
//!
//! [`Pipeline`] 把各个部件串起来：校验运行配置、必要时转换输入格式、
//! 解析阅读顺序、创建后端、在当前线程运行时上驱动调度器，最后补齐其余成员
//! 并把临时文件换入输出路径。
//!
//! 输出先写到输出目录中的临时文件，只有运行完成或被用户停止时才会落盘；
//! 致命错误时临时文件被丢弃，不会留下半成品。

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::{NamedTempFile, TempDir};

use crate::archive::{is_navigation_document, resolve_reading_order, ArchiveReader, ArchiveWriter};
use crate::env::{self, core::NoColor, EnvVar};
use crate::translation::backends::{
    create_backend, BackendKind, BackendOptions, Credentials, LanguagePair, SessionRegistry,
    TranslationBackend,
};
use crate::translation::config::{constants, TranslatorConfig};
use crate::translation::core::{
    CancellationFlag, Orchestrator, ProgressEvent, ProgressSender, RunCounters, RunStatus,
    RunSummary,
};
use crate::translation::error::{TranslationError, TranslationResult};

const ANSI_COLOR_RED: &str = "\x1b[31m";
const ANSI_COLOR_RESET: &str = "\x1b[0m";

/// 一次运行的配置，运行期间不变
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input: PathBuf,
    /// 不指定时写到输入文件旁边，见 [`format_output_path`]
    pub output: Option<PathBuf>,
    pub pair: LanguagePair,
    pub backend: BackendKind,
    pub credentials: Credentials,
    pub options: BackendOptions,
    pub converter_command: String,
    pub test_mode: bool,
    pub test_limit: usize,
    /// 阅读顺序中在此之前的文档原样复制
    pub start_index: usize,
    pub skip_navigation: bool,
    pub cancel: CancellationFlag,
}

impl RunConfig {
    /// 以默认配置为基础创建
    pub fn new(input: impl Into<PathBuf>, pair: LanguagePair, backend: BackendKind) -> Self {
        let defaults = TranslatorConfig::default();
        Self {
            input: input.into(),
            output: None,
            pair,
            backend,
            credentials: Credentials::default(),
            options: BackendOptions::from_config(&defaults),
            converter_command: defaults.converter_command,
            test_mode: defaults.test_mode,
            test_limit: defaults.test_limit,
            start_index: defaults.start_index,
            skip_navigation: defaults.skip_navigation,
            cancel: CancellationFlag::new(),
        }
    }

    /// 从已合并的配置创建
    pub fn from_config(config: &TranslatorConfig, input: impl Into<PathBuf>) -> TranslationResult<Self> {
        Ok(Self {
            input: input.into(),
            output: None,
            pair: LanguagePair::new(config.source_lang.trim(), config.target_lang.trim()),
            backend: config.backend_kind()?,
            credentials: Credentials {
                deepl_key: config.deepl_key.clone(),
                gemini_key: config.gemini_key.clone(),
            },
            options: BackendOptions::from_config(config),
            converter_command: config.converter_command.clone(),
            test_mode: config.test_mode,
            test_limit: config.test_limit,
            start_index: config.start_index,
            skip_navigation: config.skip_navigation,
            cancel: CancellationFlag::new(),
        })
    }

    /// 运行前的检查，任何归档读写之前完成
    pub fn validate(&self) -> TranslationResult<()> {
        if !self.input.is_file() {
            return Err(TranslationError::ConfigError(format!(
                "输入文件不存在: {}",
                self.input.display()
            )));
        }

        env::parse_language_code(&self.pair.target, "target_lang", false)
            .map_err(|e| TranslationError::ConfigError(e.to_string()))?;
        // 本地模型按语言对安装，必须给出明确的源语言
        let allow_auto = self.backend != BackendKind::Local;
        env::parse_language_code(&self.pair.source, "source_lang", allow_auto)
            .map_err(|e| TranslationError::ConfigError(e.to_string()))?;

        let missing_key = match self.backend {
            BackendKind::CloudKeyed => is_blank(&self.credentials.deepl_key),
            BackendKind::LlmPrompted => is_blank(&self.credentials.gemini_key),
            BackendKind::Local | BackendKind::FreeHeuristic => false,
        };
        if missing_key {
            return Err(TranslationError::ConfigError(format!(
                "后端 {} 需要 API 密钥",
                self.backend
            )));
        }

        if self.test_mode && self.test_limit == 0 {
            return Err(TranslationError::ConfigError("测试模式的上限必须大于0".to_string()));
        }

        Ok(())
    }

    /// 最终的输出路径
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| format_output_path(&self.input, &self.pair.target))
    }

    fn unit_limit(&self) -> Option<usize> {
        self.test_mode.then_some(self.test_limit)
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// 运行结果
#[derive(Debug, Clone)]
pub struct RunReport {
    pub output_path: PathBuf,
    pub summary: RunSummary,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        self.summary.status
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.summary.status {
            RunStatus::Completed => write!(f, "Done! Saved to {}", self.output_path.display()),
            RunStatus::Stopped => f.write_str("Stopped by user."),
        }
    }
}

/// `<输入文件名>_translated_<目标语言>.epub`，与输入文件放在同一目录
pub fn format_output_path(input: &Path, target_lang: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());

    input.with_file_name(format!(
        "{}_translated_{}.{}",
        stem,
        target_lang,
        constants::OUTPUT_EXTENSION
    ))
}

/// 是否需要先用外部命令转换成 EPUB
pub fn needs_conversion(input: &Path) -> bool {
    input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            constants::CONVERTIBLE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

/// 准备好的输入归档
///
/// 转换产生的临时目录随它一起释放。
#[derive(Debug)]
pub struct PreparedInput {
    pub path: PathBuf,
    _workdir: Option<TempDir>,
}

/// 非 EPUB 输入用转换命令转成临时 EPUB
pub fn prepare_input(input: &Path, converter_command: &str) -> TranslationResult<PreparedInput> {
    if !needs_conversion(input) {
        return Ok(PreparedInput {
            path: input.to_path_buf(),
            _workdir: None,
        });
    }

    let workdir = tempfile::tempdir()?;
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "converted".to_string());
    let converted = workdir
        .path()
        .join(format!("{}.{}", stem, constants::OUTPUT_EXTENSION));

    tracing::info!("转换 {} -> EPUB ({})", input.display(), converter_command);
    let output = Command::new(converter_command)
        .arg(input)
        .arg(&converted)
        .output()
        .map_err(|e| {
            TranslationError::ConversionError(format!("无法执行 {}: {}", converter_command, e))
        })?;

    if !output.status.success() || !converted.is_file() {
        return Err(TranslationError::ConversionError(format!(
            "{} 退出状态 {}: {}",
            converter_command,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(PreparedInput {
        path: converted,
        _workdir: Some(workdir),
    })
}

/// 一次翻译运行
///
/// `run` 会阻塞到运行结束，不能在异步上下文中调用。取消通过配置中的
/// [`CancellationFlag`] 从其他线程发出。进度接收端必须在别的线程上持续接收。
pub struct Pipeline {
    config: RunConfig,
    progress: Option<ProgressSender>,
    backend: Option<Arc<dyn TranslationBackend>>,
}

impl Pipeline {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            progress: None,
            backend: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    /// 使用现成的后端，跳过按配置创建
    pub fn with_backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn run(self) -> TranslationResult<RunReport> {
        let result = self.execute();

        match &result {
            Ok(report) => {
                tracing::info!("{}", report);
                self.send_progress(100.0, report.to_string());
            }
            Err(e) => {
                tracing::error!("运行失败: {}", e);
                self.send_progress(0.0, format!("Error: {}", e));
            }
        }

        result
    }

    fn execute(&self) -> TranslationResult<RunReport> {
        let config = &self.config;
        config.validate()?;

        let output_path = config.output_path();
        let prepared = prepare_input(&config.input, &config.converter_command)?;
        let mut reader = ArchiveReader::open(&prepared.path)?;

        let documents = self.select_documents(&mut reader);
        tracing::info!(
            "{}: {} 个成员，待处理 {} 个文档",
            config.input.display(),
            reader.len(),
            documents.len()
        );

        // 阻塞 HTTP 客户端和本地会话都要在运行时之外创建和释放
        let mut sessions = SessionRegistry::new();
        let backend = match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => create_backend(
                config.backend,
                &config.pair,
                &config.credentials,
                &config.options,
                &mut sessions,
            )?,
        };

        let output_dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&output_dir)?;
        let mut writer = ArchiveWriter::new(temp);

        if reader.contains(constants::MIMETYPE_MEMBER) {
            writer.copy_member(&mut reader, constants::MIMETYPE_MEMBER)?;
        }

        let mut orchestrator = Orchestrator::new(
            Arc::clone(&backend),
            config.pair.clone(),
            Arc::new(RunCounters::new(config.unit_limit())),
            config.cancel.clone(),
        );
        if let Some(progress) = &self.progress {
            orchestrator = orchestrator.with_progress(progress.clone());
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TranslationError::InternalError(format!("无法创建运行时: {}", e)))?;
        let summary = runtime.block_on(orchestrator.run(&mut reader, &mut writer, documents))?;
        drop(runtime);

        self.send_progress(98.0, "Finalizing file...");
        let copied = writer.copy_remaining(&mut reader)?;
        tracing::debug!("原样复制 {} 个成员", copied);

        let temp = writer.finish()?;
        temp.persist(&output_path).map_err(|e| {
            TranslationError::ArchiveError(format!("无法写入 {}: {}", output_path.display(), e))
        })?;

        drop(backend);
        sessions.close_all();

        Ok(RunReport {
            output_path,
            summary,
        })
    }

    /// 阅读顺序中需要处理的文档：跳过起始序号之前的文档和导航文档
    fn select_documents<R>(&self, reader: &mut ArchiveReader<R>) -> Vec<(usize, String)>
    where
        R: std::io::Read + std::io::Seek,
    {
        let config = &self.config;
        resolve_reading_order(reader)
            .into_iter()
            .enumerate()
            .filter(|(ordinal, _)| *ordinal >= config.start_index)
            .filter(|(_, name)| {
                let skip = config.skip_navigation && is_navigation_document(name);
                if skip {
                    tracing::debug!("跳过导航文档: {}", name);
                }
                !skip
            })
            .collect()
    }

    fn send_progress(&self, percent: f32, message: impl Into<String>) {
        if let Some(progress) = &self.progress {
            if progress
                .blocking_send(ProgressEvent::new(percent, message))
                .is_err()
            {
                tracing::debug!("进度接收端已关闭");
            }
        }
    }
}

/// 按配置运行一次翻译
pub fn translate_archive(
    config: RunConfig,
    progress: Option<ProgressSender>,
) -> TranslationResult<RunReport> {
    let mut pipeline = Pipeline::new(config);
    if let Some(progress) = progress {
        pipeline = pipeline.with_progress(progress);
    }
    pipeline.run()
}

/// 在标准错误输出打印错误信息
pub fn print_error_message(msg: &str) {
    if NoColor::get_or_default(false) {
        eprintln!("{msg}");
    } else {
        eprintln!("{ANSI_COLOR_RED}{msg}{ANSI_COLOR_RESET}");
    }
}

/// 在标准错误输出打印进度信息
pub fn print_info_message(msg: &str) {
    eprintln!("{msg}");
}
