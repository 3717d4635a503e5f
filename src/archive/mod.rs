//! # 归档容器模块
//!
//! EPUB 是一个 ZIP 容器。这里负责：
//!
//! - 枚举成员并按名称读取原始字节
//! - 以原始压缩数据直接复制未修改的成员（不解压、不重新压缩）
//! - 按原成员的压缩方式写入修改后的成员
//!
//! 输出归档的成员集合必须与输入完全一致，`ArchiveWriter` 会记录已写入的名称，
//! 保证同一成员不会被写两次，`copy_remaining` 负责补齐其余成员。

pub mod package;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::translation::config::constants;
use crate::translation::error::{TranslationError, TranslationResult};

pub use package::{resolve_reading_order, PackageDocument};

/// 归档中的一个成员
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    /// 成员名，在归档内唯一
    pub name: String,
    /// 解压后的内容
    pub data: Vec<u8>,
    /// 原始压缩方式
    pub compression: CompressionMethod,
}

/// 判断成员是否为内容文档（按扩展名）
pub fn is_markup_member(name: &str) -> bool {
    let lowercased = name.to_lowercase();
    constants::MARKUP_EXTENSIONS
        .iter()
        .any(|ext| lowercased.ends_with(&format!(".{ext}")))
}

/// 判断成员是否为目录/导航文档（文件名主干包含 `toc` 或 `nav`）
pub fn is_navigation_document(name: &str) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
        .to_lowercase();
    constants::NAVIGATION_MARKERS
        .iter()
        .any(|marker| stem.contains(marker))
}

/// 只读归档
pub struct ArchiveReader<R: Read + Seek = BufReader<File>> {
    archive: ZipArchive<R>,
    names: Vec<String>,
}

impl ArchiveReader<BufReader<File>> {
    /// 打开磁盘上的归档
    pub fn open(path: &Path) -> TranslationResult<Self> {
        let file = File::open(path).map_err(|e| {
            TranslationError::ArchiveError(format!("无法打开归档 {}: {}", path.display(), e))
        })?;
        Self::new(BufReader::new(file))
            .map_err(|e| e.with_context(path.display()))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// 从任意可寻址的读取器创建
    pub fn new(reader: R) -> TranslationResult<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index)?;
            names.push(file.name().to_string());
        }

        Ok(Self { archive, names })
    }

    /// 按归档自身的枚举顺序返回全部成员名
    pub fn member_names(&self) -> &[String] {
        &self.names
    }

    /// 按枚举顺序返回全部内容文档
    pub fn markup_members(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| is_markup_member(name))
            .cloned()
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.archive.index_for_name(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 读取并解压一个成员
    pub fn read_member(&mut self, name: &str) -> TranslationResult<ArchiveMember> {
        let index = self.index_of(name)?;
        let mut file = self.archive.by_index(index)?;
        let compression = file.compression();

        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| TranslationError::ArchiveError(format!("读取成员 {} 失败: {}", name, e)))?;

        Ok(ArchiveMember {
            name: name.to_string(),
            data,
            compression,
        })
    }

    fn index_of(&self, name: &str) -> TranslationResult<usize> {
        self.archive
            .index_for_name(name)
            .ok_or_else(|| TranslationError::ArchiveError(format!("归档中不存在成员: {}", name)))
    }
}

/// 输出归档
pub struct ArchiveWriter<W: Write + Seek> {
    writer: ZipWriter<W>,
    written: HashSet<String>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: ZipWriter::new(inner),
            written: HashSet::new(),
        }
    }

    pub fn is_written(&self, name: &str) -> bool {
        self.written.contains(name)
    }

    pub fn written_count(&self) -> usize {
        self.written.len()
    }

    /// 原样复制成员的压缩数据；已写入过的成员返回 `false`
    pub fn copy_member<R: Read + Seek>(
        &mut self,
        reader: &mut ArchiveReader<R>,
        name: &str,
    ) -> TranslationResult<bool> {
        if self.written.contains(name) {
            return Ok(false);
        }

        let index = reader.index_of(name)?;
        self.writer.raw_copy_file(reader.archive.by_index_raw(index)?)?;
        self.written.insert(name.to_string());
        Ok(true)
    }

    /// 写入新的成员内容，沿用原成员的压缩方式
    pub fn write_member(
        &mut self,
        name: &str,
        data: &[u8],
        compression: CompressionMethod,
    ) -> TranslationResult<bool> {
        if self.written.contains(name) {
            return Ok(false);
        }

        let method = match compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);

        self.writer.start_file(name, options)?;
        self.writer
            .write_all(data)
            .map_err(|e| TranslationError::ArchiveError(format!("写入成员 {} 失败: {}", name, e)))?;
        self.written.insert(name.to_string());
        Ok(true)
    }

    /// 补齐所有尚未写入的成员，返回复制的数量
    pub fn copy_remaining<R: Read + Seek>(
        &mut self,
        reader: &mut ArchiveReader<R>,
    ) -> TranslationResult<usize> {
        let names = reader.member_names().to_vec();
        let mut copied = 0;
        for name in names {
            if self.copy_member(reader, &name)? {
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// 写出中央目录并返回底层写入器
    pub fn finish(self) -> TranslationResult<W> {
        Ok(self.writer.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_archive() -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        writer.start_file("mimetype", stored).unwrap();
        writer.write_all(b"application/epub+zip").unwrap();
        writer.start_file("OEBPS/ch1.xhtml", deflated).unwrap();
        writer.write_all(b"<html><body><p>Chapter one</p></body></html>").unwrap();
        writer.start_file("OEBPS/cover.jpg", stored).unwrap();
        writer.write_all(&[0xFF, 0xD8, 0xFF, 0x00]).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_markup_detection() {
        assert!(is_markup_member("OEBPS/Text/ch1.xhtml"));
        assert!(is_markup_member("index.HTML"));
        assert!(is_markup_member("a.htm"));
        assert!(!is_markup_member("content.opf"));
        assert!(!is_markup_member("style.css"));
    }

    #[test]
    fn test_navigation_detection() {
        assert!(is_navigation_document("OEBPS/toc.xhtml"));
        assert!(is_navigation_document("OEBPS/nav.xhtml"));
        assert!(is_navigation_document("Text/TOC_1.html"));
        assert!(!is_navigation_document("OEBPS/chapter1.xhtml"));
        // 只看文件名，不看目录
        assert!(!is_navigation_document("navigation/chapter1.xhtml"));
    }

    #[test]
    fn test_reader_enumerates_in_archive_order() {
        let reader = ArchiveReader::new(Cursor::new(sample_archive())).unwrap();
        assert_eq!(
            reader.member_names(),
            &["mimetype", "OEBPS/ch1.xhtml", "OEBPS/cover.jpg"]
        );
        assert_eq!(reader.markup_members(), vec!["OEBPS/ch1.xhtml".to_string()]);
        assert!(reader.contains("OEBPS/cover.jpg"));
        assert!(!reader.contains("missing.xhtml"));
    }

    #[test]
    fn test_read_member_reports_compression() {
        let mut reader = ArchiveReader::new(Cursor::new(sample_archive())).unwrap();
        let member = reader.read_member("OEBPS/ch1.xhtml").unwrap();
        assert_eq!(member.compression, CompressionMethod::Deflated);
        assert!(String::from_utf8(member.data).unwrap().contains("Chapter one"));

        assert!(matches!(
            reader.read_member("missing.xhtml"),
            Err(TranslationError::ArchiveError(_))
        ));
    }

    #[test]
    fn test_writer_never_duplicates_members() {
        let mut reader = ArchiveReader::new(Cursor::new(sample_archive())).unwrap();
        let mut writer = ArchiveWriter::new(Cursor::new(Vec::new()));

        assert!(writer.copy_member(&mut reader, "mimetype").unwrap());
        assert!(writer
            .write_member("OEBPS/ch1.xhtml", b"<p>changed</p>", CompressionMethod::Deflated)
            .unwrap());
        assert!(!writer.copy_member(&mut reader, "OEBPS/ch1.xhtml").unwrap());
        assert_eq!(writer.copy_remaining(&mut reader).unwrap(), 1);

        let bytes = writer.finish().unwrap().into_inner();
        let mut output = ArchiveReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(output.member_names()[0], "mimetype");
        assert_eq!(output.len(), 3);
        let mimetype = output.read_member("mimetype").unwrap();
        assert_eq!(mimetype.compression, CompressionMethod::Stored);
        assert_eq!(output.read_member("OEBPS/ch1.xhtml").unwrap().data, b"<p>changed</p>");
    }

    #[test]
    fn test_corrupt_archive_is_archive_error() {
        let result = ArchiveReader::new(Cursor::new(b"not a zip file".to_vec()));
        assert!(matches!(result, Err(TranslationError::ArchiveError(_))));
    }
}
