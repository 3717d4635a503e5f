// 集成测试公共模块
//
// 内存中的 EPUB 构造器、记录调用的假后端和假模型运行时

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use epub_translator::translation::backends::{ModelPackage, ModelRuntime};
use epub_translator::translation::{
    BackendKind, CancellationFlag, LanguagePair, ProgressEvent, ProgressReceiver,
    TranslationBackend, TranslationError, TranslationOutcome, TranslationResult,
};

pub const MARKER: &str = "class=\"translation-text\"";

/// 构造测试用的 EPUB
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>, CompressionMethod)>,
}

impl EpubBuilder {
    /// 以未压缩的 `mimetype` 开头
    pub fn new() -> Self {
        Self::bare().stored("mimetype", "application/epub+zip")
    }

    /// 不带任何成员
    pub fn bare() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn member(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.to_string(), data.into(), CompressionMethod::Deflated));
        self
    }

    pub fn stored(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.to_string(), data.into(), CompressionMethod::Stored));
        self
    }

    /// XHTML 内容文档
    pub fn chapter(self, name: &str, body: &str) -> Self {
        let document = xhtml_document(body);
        self.member(name, document)
    }

    /// 包元数据，`spine` 为 `(id, href)`，href 相对于 OPF 所在目录
    pub fn package(self, name: &str, spine: &[(&str, &str)]) -> Self {
        let manifest: String = spine
            .iter()
            .map(|(id, href)| {
                format!(
                    "    <item id=\"{}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
                    id, href
                )
            })
            .collect();
        let itemrefs: String = spine
            .iter()
            .map(|(id, _)| format!("    <itemref idref=\"{}\"/>\n", id))
            .collect();

        let opf = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\">\n\
             <manifest>\n{}</manifest>\n<spine>\n{}</spine>\n</package>\n",
            manifest, itemrefs
        );
        self.member(name, opf)
    }

    pub fn build(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data, method) in &self.entries {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default().compression_method(*method))
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

pub fn xhtml_document(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>Test</title></head>\
         <body>{}</body></html>",
        body
    )
}

/// 一本按 spine 排好序、每章一段正文的书
pub fn book_with_chapters(count: usize) -> EpubBuilder {
    let names: Vec<(String, String)> = (1..=count)
        .map(|i| (format!("c{:02}", i), format!("Text/chapter{:02}.xhtml", i)))
        .collect();
    let spine: Vec<(&str, &str)> = names
        .iter()
        .map(|(id, href)| (id.as_str(), href.as_str()))
        .collect();

    let mut builder = EpubBuilder::new()
        .member("META-INF/container.xml", CONTAINER_XML)
        .package("OEBPS/content.opf", &spine)
        .member("OEBPS/Styles/style.css", "p { margin: 0; }")
        .stored("OEBPS/Images/cover.png", PNG_BYTES.to_vec());

    for i in 1..=count {
        builder = builder.chapter(
            &format!("OEBPS/Text/chapter{:02}.xhtml", i),
            &format!("<h1>Chapter number {}</h1>", i),
        );
    }
    builder
}

pub const CONTAINER_XML: &str = "<?xml version=\"1.0\"?>\n\
<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\
<rootfiles><rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/></rootfiles>\
</container>";

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR fake image payload";

/// 输出归档中的一个成员
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
}

/// 按名称读取归档的全部成员
pub fn read_entries(path: &Path) -> BTreeMap<String, Entry> {
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    let mut entries = BTreeMap::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        entries.insert(
            file.name().to_string(),
            Entry {
                data,
                compression: file.compression(),
            },
        );
    }
    entries
}

/// 归档中成员的物理顺序
pub fn entry_order(path: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(std::fs::File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|index| archive.by_index(index).unwrap().name().to_string())
        .collect()
}

pub fn text_of(entries: &BTreeMap<String, Entry>, name: &str) -> String {
    String::from_utf8(entries[name].data.clone()).unwrap()
}

pub fn marker_count(entries: &BTreeMap<String, Entry>) -> usize {
    entries
        .values()
        .map(|entry| String::from_utf8_lossy(&entry.data).matches(MARKER).count())
        .sum()
}

/// 在后台线程上收集进度事件，发送端全部释放后返回
pub fn collect_progress(mut events: ProgressReceiver) -> JoinHandle<Vec<ProgressEvent>> {
    thread::spawn(move || {
        let mut collected = Vec::new();
        while let Some(event) = events.blocking_recv() {
            collected.push(event);
        }
        collected
    })
}

/// 把文本包成 `TR(...)` 的后端；文本含有 `FAIL` 时返回失败
pub struct EchoBackend {
    kind: BackendKind,
    calls: Mutex<Vec<String>>,
}

impl EchoBackend {
    pub fn new(kind: BackendKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl TranslationBackend for EchoBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn translate(&self, text: &str, _pair: &LanguagePair) -> TranslationOutcome {
        self.calls.lock().unwrap().push(text.to_string());
        if text.contains("FAIL") {
            TranslationOutcome::Failure("rejected by test backend".to_string())
        } else {
            TranslationOutcome::Success(format!("TR({})", text))
        }
    }
}

/// 在第 `cancel_on` 次调用时设置取消标志的后端（并发 1）
pub struct CancellingBackend {
    cancel: CancellationFlag,
    cancel_on: usize,
    calls: AtomicUsize,
}

impl CancellingBackend {
    pub fn new(cancel: CancellationFlag, cancel_on: usize) -> Arc<Self> {
        Arc::new(Self {
            cancel,
            cancel_on,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TranslationBackend for CancellingBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn translate(&self, text: &str, _pair: &LanguagePair) -> TranslationOutcome {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_on {
            self.cancel.cancel();
        }
        TranslationOutcome::Success(format!("TR({})", text))
    }
}

/// 记录生命周期调用顺序的模型运行时
pub struct RecordingRuntime {
    installed: bool,
    package_available: bool,
    fail_install: bool,
    fail_warmup: bool,
    events: Mutex<Vec<String>>,
}

impl RecordingRuntime {
    pub fn new(installed: bool) -> Self {
        Self {
            installed,
            package_available: true,
            fail_install: false,
            fail_warmup: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn without_package(mut self) -> Self {
        self.package_available = false;
        self
    }

    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    pub fn failing_warmup(mut self) -> Self {
        self.fail_warmup = true;
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }
}

impl ModelRuntime for RecordingRuntime {
    fn is_installed(&self, _pair: &LanguagePair) -> TranslationResult<bool> {
        self.record("is_installed");
        Ok(self.installed)
    }

    fn update_index(&self) -> TranslationResult<()> {
        self.record("update_index");
        Ok(())
    }

    fn find_package(&self, pair: &LanguagePair) -> TranslationResult<Option<ModelPackage>> {
        self.record("find_package");
        Ok(self.package_available.then(|| ModelPackage::for_pair(pair)))
    }

    fn install(&self, package: &ModelPackage) -> TranslationResult<()> {
        self.record(format!("install:{}", package.name));
        if self.fail_install {
            return Err(TranslationError::BackendError("disk full".to_string()));
        }
        Ok(())
    }

    fn load(&self, _pair: &LanguagePair) -> TranslationResult<()> {
        self.record("load");
        Ok(())
    }

    fn translate(&self, text: &str, _pair: &LanguagePair) -> TranslationResult<String> {
        self.record(format!("translate:{}", text));
        if self.fail_warmup {
            return Err(TranslationError::NetworkError("service unavailable".to_string()));
        }
        Ok(format!("TR({})", text))
    }

    fn unload(&self, _pair: &LanguagePair) {
        self.record("unload");
    }
}
