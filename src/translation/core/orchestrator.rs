//! 文档调度
//!
//! 一个协调者加一个有界的工作池。每个内容文档对应一个任务（不是每个文本单元），
//! 同时在内存中的 DOM 树数量不超过工作池大小。工作池大小由后端种类决定。
//!
//! 取消检查点：
//!
//! - 提交任务之前（协调者）
//! - 任务开始时
//! - 每个文本单元翻译之前
//! - 接收任务结果时（协调者）；一旦观察到取消就不再提交新任务，已完成的结果照常写出
//!
//! 任务结果按完成顺序写入输出归档，并在每个任务完成后发出进度事件。

use std::collections::VecDeque;
use std::io::{Read, Seek, Write};
use std::sync::Arc;

use tokio::task::JoinSet;
use zip::CompressionMethod;

use super::counters::{CancellationFlag, RunCounters};
use super::progress::{percent_of, ProgressEvent, ProgressSender};
use crate::archive::{ArchiveMember, ArchiveReader, ArchiveWriter};
use crate::translation::backends::{preview, LanguagePair, TranslationBackend, TranslationOutcome};
use crate::translation::error::{TranslationError, TranslationResult};
use crate::translation::pipeline::{inject_translation, DocumentTree, TextCollector, UnitStatus};

/// 运行结束时的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    /// 用户取消；已完成的文档照常写出，输出归档完整可用
    Stopped,
}

/// 一个待处理的内容文档
#[derive(Debug, Clone)]
pub struct DocumentJob {
    /// 在阅读顺序中的位置
    pub ordinal: usize,
    pub member: ArchiveMember,
}

/// 文档的输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutput {
    /// 没有任何修改，原字节写出
    Unchanged,
    Modified(Vec<u8>),
}

/// 单个文档的处理结果
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub name: String,
    pub ordinal: usize,
    pub compression: CompressionMethod,
    pub output: DocumentOutput,
    pub units: usize,
    pub translated: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 任务开始前就已取消
    pub cancelled_before_start: bool,
}

impl DocumentReport {
    fn untouched(job: &DocumentJob, cancelled_before_start: bool) -> Self {
        Self {
            name: job.member.name.clone(),
            ordinal: job.ordinal,
            compression: job.member.compression,
            output: DocumentOutput::Unchanged,
            units: 0,
            translated: 0,
            failed: 0,
            skipped: 0,
            cancelled_before_start,
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self.output, DocumentOutput::Modified(_))
    }
}

/// 整个运行的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub documents_total: usize,
    pub documents_processed: usize,
    pub documents_modified: usize,
    pub units_translated: usize,
    pub units_failed: usize,
    pub units_skipped: usize,
}

/// 任务共享的上下文
struct TaskContext {
    backend: Arc<dyn TranslationBackend>,
    pair: LanguagePair,
    counters: Arc<RunCounters>,
    cancel: CancellationFlag,
}

/// 处理一个文档：选择单元、逐个翻译、注入译文、必要时重新序列化
///
/// 在阻塞线程上运行，DOM 树只属于当前任务。
fn process_document(job: &DocumentJob, ctx: &TaskContext) -> TranslationResult<DocumentReport> {
    if ctx.cancel.is_cancelled() {
        return Ok(DocumentReport::untouched(job, true));
    }

    let name = &job.member.name;
    let tree = DocumentTree::parse(name, &job.member.data);
    let mut units = TextCollector::new().collect_translatable_units(tree.root());
    tracing::debug!("{}: {} 个翻译单元", name, units.len());

    let mut report = DocumentReport::untouched(job, false);
    report.units = units.len();

    for unit in units.iter_mut() {
        if ctx.cancel.is_cancelled() || !ctx.counters.try_reserve() {
            unit.status = UnitStatus::Skipped;
            report.skipped += 1;
            continue;
        }

        tracing::debug!("Translating: {}", preview(&unit.text, 25));
        match ctx.backend.translate(&unit.text, &ctx.pair) {
            TranslationOutcome::Success(translated) if !translated.trim().is_empty() => {
                inject_translation(&tree.dom, &unit.node, &translated);
                unit.status = UnitStatus::Translated;
                report.translated += 1;
            }
            TranslationOutcome::Success(_) => {
                ctx.counters.release();
                unit.status = UnitStatus::Failed("empty translation".to_string());
                report.failed += 1;
            }
            TranslationOutcome::Failure(reason) => {
                ctx.counters.release();
                tracing::warn!("{}: 翻译失败，保留原文: {}", name, reason);
                unit.status = UnitStatus::Failed(reason);
                report.failed += 1;
            }
        }
    }

    if report.translated > 0 {
        report.output = DocumentOutput::Modified(tree.serialize()?);
    }

    Ok(report)
}

/// 文档调度器
pub struct Orchestrator {
    backend: Arc<dyn TranslationBackend>,
    pair: LanguagePair,
    counters: Arc<RunCounters>,
    cancel: CancellationFlag,
    pool_size: usize,
    progress: Option<ProgressSender>,
}

impl Orchestrator {
    /// 工作池大小取后端种类的默认值
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        pair: LanguagePair,
        counters: Arc<RunCounters>,
        cancel: CancellationFlag,
    ) -> Self {
        let pool_size = backend.kind().pool_size();
        Self {
            backend,
            pair,
            counters,
            cancel,
            pool_size,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// 处理 `documents`（阅读顺序中的序号和成员名），把结果写入 `writer`
    ///
    /// 只写出处理过的文档，其余成员由调用方补齐。致命错误时先设置取消标志，
    /// 等待在途任务结束后再返回错误。
    pub async fn run<R, W>(
        &self,
        reader: &mut ArchiveReader<R>,
        writer: &mut ArchiveWriter<W>,
        documents: Vec<(usize, String)>,
    ) -> TranslationResult<RunSummary>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let mut in_flight = JoinSet::new();
        let result = self.drive(reader, writer, documents, &mut in_flight).await;

        if result.is_err() {
            self.cancel.cancel();
            while in_flight.join_next().await.is_some() {}
        }

        result
    }

    async fn drive<R, W>(
        &self,
        reader: &mut ArchiveReader<R>,
        writer: &mut ArchiveWriter<W>,
        documents: Vec<(usize, String)>,
        in_flight: &mut JoinSet<TranslationResult<DocumentReport>>,
    ) -> TranslationResult<RunSummary>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let total = documents.len();
        let mut queue: VecDeque<(usize, String)> = documents.into();
        let ctx = Arc::new(TaskContext {
            backend: Arc::clone(&self.backend),
            pair: self.pair.clone(),
            counters: Arc::clone(&self.counters),
            cancel: self.cancel.clone(),
        });

        let mut summary = RunSummary {
            status: RunStatus::Completed,
            documents_total: total,
            documents_processed: 0,
            documents_modified: 0,
            units_translated: 0,
            units_failed: 0,
            units_skipped: 0,
        };

        tracing::info!(
            "开始处理 {} 个文档，后端 {}，并发 {}",
            total,
            self.backend.kind(),
            self.pool_size
        );

        let mut completed = 0;
        loop {
            while in_flight.len() < self.pool_size && !self.cancel.is_cancelled() {
                let Some((ordinal, name)) = queue.pop_front() else {
                    break;
                };

                let job = DocumentJob {
                    ordinal,
                    member: reader.read_member(&name)?,
                };
                let ctx = Arc::clone(&ctx);
                in_flight.spawn_blocking(move || process_document(&job, &ctx));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };
            let report = joined.map_err(|e| {
                TranslationError::InternalError(format!("文档任务异常结束: {}", e))
            })??;

            completed += 1;
            self.write_report(reader, writer, &report)?;
            summary.record(&report);

            let file_name = report.name.rsplit('/').next().unwrap_or(&report.name);
            self.report_progress(
                percent_of(completed, total),
                format!("Processing {}/{}: {}", completed, total, file_name),
            )
            .await;

            if self.cancel.is_cancelled() && !queue.is_empty() {
                tracing::debug!("观察到取消请求，剩余 {} 个文档不再提交", queue.len());
            }
        }

        if self.cancel.is_cancelled() {
            summary.status = RunStatus::Stopped;
            tracing::info!("运行已停止，完成 {}/{} 个文档", summary.documents_processed, total);
        } else {
            tracing::info!(
                "处理完成: {} 个文档有译文，共翻译 {} 个单元",
                summary.documents_modified,
                summary.units_translated
            );
        }

        Ok(summary)
    }

    fn write_report<R, W>(
        &self,
        reader: &mut ArchiveReader<R>,
        writer: &mut ArchiveWriter<W>,
        report: &DocumentReport,
    ) -> TranslationResult<()>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        match &report.output {
            DocumentOutput::Modified(bytes) => {
                tracing::debug!("{}: 写入 {} 条译文", report.name, report.translated);
                writer.write_member(&report.name, bytes, report.compression)?;
            }
            DocumentOutput::Unchanged => {
                writer.copy_member(reader, &report.name)?;
            }
        }
        Ok(())
    }

    async fn report_progress(&self, percent: f32, message: String) {
        tracing::debug!("[{:5.1}%] {}", percent, message);
        if let Some(progress) = &self.progress {
            if progress.send(ProgressEvent::new(percent, message)).await.is_err() {
                tracing::debug!("进度接收端已关闭");
            }
        }
    }
}

impl RunSummary {
    fn record(&mut self, report: &DocumentReport) {
        if !report.cancelled_before_start {
            self.documents_processed += 1;
        }
        if report.is_modified() {
            self.documents_modified += 1;
        }
        self.units_translated += report.translated;
        self.units_failed += report.failed;
        self.units_skipped += report.skipped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::backends::BackendKind;
    use std::sync::Mutex;

    struct EchoBackend {
        calls: Mutex<Vec<String>>,
    }

    impl TranslationBackend for EchoBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::FreeHeuristic
        }

        fn translate(&self, text: &str, _pair: &LanguagePair) -> TranslationOutcome {
            self.calls.lock().unwrap().push(text.to_string());
            if text.contains("fail") {
                TranslationOutcome::Failure("refused".to_string())
            } else {
                TranslationOutcome::Success(format!("[{}]", text))
            }
        }
    }

    fn context(limit: Option<usize>) -> (TaskContext, Arc<EchoBackend>) {
        let backend = Arc::new(EchoBackend {
            calls: Mutex::new(Vec::new()),
        });
        let ctx = TaskContext {
            backend: backend.clone(),
            pair: LanguagePair::new("en", "tr"),
            counters: Arc::new(RunCounters::new(limit)),
            cancel: CancellationFlag::new(),
        };
        (ctx, backend)
    }

    fn job(html: &str) -> DocumentJob {
        DocumentJob {
            ordinal: 0,
            member: ArchiveMember {
                name: "Text/ch1.html".to_string(),
                data: html.as_bytes().to_vec(),
                compression: CompressionMethod::Deflated,
            },
        }
    }

    #[test]
    fn test_units_are_translated_in_document_order() {
        let (ctx, backend) = context(None);
        let report =
            process_document(&job("<p>First one</p><p>Second one</p><p>Third one</p>"), &ctx)
                .unwrap();

        assert_eq!(report.translated, 3);
        assert!(report.is_modified());
        assert_eq!(
            *backend.calls.lock().unwrap(),
            vec!["First one", "Second one", "Third one"]
        );
    }

    #[test]
    fn test_document_without_units_is_unchanged() {
        let (ctx, backend) = context(None);
        let report = process_document(&job("<div>No blocks</div><p>12</p>"), &ctx).unwrap();
        assert_eq!(report.output, DocumentOutput::Unchanged);
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failures_leave_unit_untranslated_and_return_quota() {
        let (ctx, _) = context(Some(2));
        let report = process_document(
            &job("<p>please fail here</p><p>Good text</p><p>More text</p><p>Extra text</p>"),
            &ctx,
        )
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.translated, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(ctx.counters.translated(), 2);

        let DocumentOutput::Modified(bytes) = report.output else {
            panic!("document should be modified");
        };
        let html = String::from_utf8(bytes).unwrap();
        assert!(html.contains("[Good text]"));
        assert!(!html.contains("[please fail here]"));
        assert!(!html.contains("[Extra text]"));
    }

    #[test]
    fn test_cancelled_before_start_does_nothing() {
        let (ctx, backend) = context(None);
        ctx.cancel.cancel();
        let report = process_document(&job("<p>Some text</p>"), &ctx).unwrap();
        assert!(report.cancelled_before_start);
        assert_eq!(report.output, DocumentOutput::Unchanged);
        assert!(backend.calls.lock().unwrap().is_empty());
    }
}
