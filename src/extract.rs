//! Format-specific text extraction (slides, PDF, Word, plain text).
//!
//! Every extractor turns a file into an ordered list of [`Section`]s, stops
//! after `max_sections` content sections (appending one marker section when
//! content was left out), and never fails: any problem is reported as a
//! single [`SectionKind::Error`] section.

use std::io::Read;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use quick_xml::events::Event;
use tracing::{debug, warn};

use crate::models::{Section, SectionKind};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Lower bound on lines grouped into one text chunk.
const MIN_LINES_PER_CHUNK: usize = 20;

/// A document format the scanner can read.
///
/// Implementations must be cheap to share across threads: the registry
/// hands out `&dyn Extractor` to concurrent scan tasks.
pub trait Extractor: Send + Sync {
    /// Human-readable type label, e.g. `"PowerPoint"`.
    fn type_name(&self) -> &str;

    /// Lowercase extensions including the leading dot, e.g. `[".pptx"]`.
    fn extensions(&self) -> &[&str];

    /// Extract at most `max_sections` content sections from `path`.
    fn extract(&self, path: &Path, max_sections: usize) -> Vec<Section>;
}

/// Reads a file and runs `parse` on its bytes, converting any failure
/// (including a panic inside the parser) into one error section.
fn guarded<F>(type_name: &str, path: &Path, parse: F) -> Vec<Section>
where
    F: FnOnce(&[u8]) -> Result<Vec<Section>, String>,
{
    debug!(path = %path.display(), "extracting {} text", type_name);
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => return failed(type_name, path, e.to_string()),
    };
    match catch_unwind(AssertUnwindSafe(|| parse(&bytes))) {
        Ok(Ok(sections)) => sections,
        Ok(Err(e)) => failed(type_name, path, e),
        Err(_) => failed(type_name, path, "parser panicked".to_string()),
    }
}

fn failed(type_name: &str, path: &Path, reason: String) -> Vec<Section> {
    warn!(path = %path.display(), error = %reason, "{} extraction failed", type_name);
    vec![Section::error(format!(
        "{} extraction failed: {}",
        type_name, reason
    ))]
}

fn marker(index: usize, kind: SectionKind, text: String) -> Section {
    Section::new(index as u32, kind, text)
}

// ============ PowerPoint ============

pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn type_name(&self) -> &str {
        "PowerPoint"
    }

    fn extensions(&self) -> &[&str] {
        &[".pptx"]
    }

    fn extract(&self, path: &Path, max_sections: usize) -> Vec<Section> {
        guarded(self.type_name(), path, |bytes| {
            extract_pptx(bytes, max_sections)
        })
    }
}

fn extract_pptx(bytes: &[u8], max_sections: usize) -> Result<Vec<Section>, String> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let mut slide_names: Vec<(u32, String)> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .filter_map(|n| {
            n.trim_start_matches("ppt/slides/slide")
                .trim_end_matches(".xml")
                .parse::<u32>()
                .ok()
                .map(|num| (num, n.to_string()))
        })
        .collect();
    slide_names.sort();

    let total = slide_names.len();
    let mut sections = Vec::new();
    for (position, (_, name)) in slide_names.iter().enumerate() {
        if position >= max_sections {
            sections.push(marker(
                position + 1,
                SectionKind::Slide,
                format!(
                    "... {} more slides not processed ({} total) ...",
                    total - max_sections,
                    total
                ),
            ));
            break;
        }
        let xml = read_zip_entry_bounded(&mut archive, name)?;
        let text = slide_paragraphs(&xml)?.join("\n");
        sections.push(Section::new(
            (position + 1) as u32,
            SectionKind::Slide,
            text.trim(),
        ));
    }
    Ok(sections)
}

/// Collects the `a:p` paragraphs of a slide, each the concatenation of its `a:t` runs.
fn slide_paragraphs(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = current.trim();
                    if !line.is_empty() {
                        paragraphs.push(line.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}

// ============ PDF ============

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn type_name(&self) -> &str {
        "PDF"
    }

    fn extensions(&self) -> &[&str] {
        &[".pdf"]
    }

    fn extract(&self, path: &Path, max_sections: usize) -> Vec<Section> {
        guarded(self.type_name(), path, |bytes| {
            let pages =
                pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())?;
            Ok(paginate_pages(pages, max_sections))
        })
    }
}

fn paginate_pages(pages: Vec<String>, max_sections: usize) -> Vec<Section> {
    let total = pages.len();
    let mut sections: Vec<Section> = pages
        .into_iter()
        .take(max_sections)
        .enumerate()
        .map(|(i, text)| Section::new((i + 1) as u32, SectionKind::Page, text.trim()))
        .collect();
    if total > max_sections {
        sections.push(marker(
            max_sections + 1,
            SectionKind::Page,
            format!(
                "... more pages available (processed {} of {} pages) ...",
                max_sections, total
            ),
        ));
    }
    sections
}

// ============ Word ============

pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn type_name(&self) -> &str {
        "Word"
    }

    fn extensions(&self) -> &[&str] {
        &[".docx"]
    }

    fn extract(&self, path: &Path, max_sections: usize) -> Vec<Section> {
        guarded(self.type_name(), path, |bytes| {
            let mut archive =
                zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| e.to_string())?;
            let xml = read_zip_entry_bounded(&mut archive, "word/document.xml")?;
            let blocks = body_blocks(&xml)?;
            Ok(sections_from_blocks(blocks, max_sections))
        })
    }
}

/// A top-level unit of a Word document body.
#[derive(Debug, PartialEq)]
enum Block {
    Paragraph(String),
    Table(String),
}

/// Walks `word/document.xml` in document order, yielding non-empty
/// top-level paragraphs and tables. Table cells are tab-separated and rows
/// newline-separated; nested tables are folded into their enclosing cell.
fn body_blocks(xml: &[u8]) -> Result<Vec<Block>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut blocks = Vec::new();
    let mut paragraph = String::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut table_depth = 0usize;
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"tbl" => {
                    table_depth += 1;
                    if table_depth == 1 {
                        rows.clear();
                    }
                }
                b"tr" if table_depth == 1 => rows.push(Vec::new()),
                b"tc" if table_depth == 1 => {
                    if let Some(row) = rows.last_mut() {
                        row.push(String::new());
                    }
                }
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" => paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                paragraph.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let text = paragraph.trim();
                    if table_depth == 0 {
                        if !text.is_empty() {
                            blocks.push(Block::Paragraph(text.to_string()));
                        }
                    } else if let Some(cell) = rows.last_mut().and_then(|r| r.last_mut()) {
                        if !text.is_empty() {
                            if !cell.is_empty() {
                                cell.push('\n');
                            }
                            cell.push_str(text);
                        }
                    }
                    paragraph.clear();
                }
                b"tbl" => {
                    table_depth = table_depth.saturating_sub(1);
                    if table_depth == 0 {
                        let text = rows
                            .iter()
                            .map(|row| row.join("\t"))
                            .collect::<Vec<_>>()
                            .join("\n");
                        let text = text.trim();
                        if !text.is_empty() {
                            blocks.push(Block::Table(text.to_string()));
                        }
                        rows.clear();
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(blocks)
}

fn sections_from_blocks(blocks: Vec<Block>, max_sections: usize) -> Vec<Section> {
    let total = blocks.len();
    let mut sections = Vec::new();
    for (i, block) in blocks.into_iter().enumerate() {
        if i >= max_sections {
            sections.push(marker(
                i + 1,
                SectionKind::Paragraph,
                format!(
                    "... {} more paragraphs or tables not processed ...",
                    total - max_sections
                ),
            ));
            break;
        }
        let (kind, text) = match block {
            Block::Paragraph(t) => (SectionKind::Paragraph, t),
            Block::Table(t) => (SectionKind::Table, t),
        };
        sections.push(Section::new((i + 1) as u32, kind, text));
    }
    sections
}

// ============ Plain text ============

pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn type_name(&self) -> &str {
        "Text"
    }

    fn extensions(&self) -> &[&str] {
        &[
            ".txt", ".md", ".py", ".js", ".html", ".css", ".json", ".xml", ".csv", ".ini",
            ".conf", ".log",
        ]
    }

    fn extract(&self, path: &Path, max_sections: usize) -> Vec<Section> {
        guarded(self.type_name(), path, |bytes| {
            Ok(chunk_lines(&decode_text(bytes), max_sections))
        })
    }
}

/// Decodes UTF-8, falling back to EUC-KR (CP949) and then Windows-1252.
fn decode_text(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.strip_prefix('\u{feff}').unwrap_or(s).to_string();
    }
    let (text, had_errors) = encoding_rs::EUC_KR.decode_without_bom_handling(bytes);
    if !had_errors {
        return text.into_owned();
    }
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

/// Groups lines into at most `max_sections` chunks of
/// `max(20, total_lines / max_sections)` lines each.
fn chunk_lines(content: &str, max_sections: usize) -> Vec<Section> {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let per_chunk = MIN_LINES_PER_CHUNK.max(total / max_sections.max(1));
    let covered = total.min(max_sections * per_chunk);

    let mut sections: Vec<Section> = lines[..covered]
        .chunks(per_chunk)
        .enumerate()
        .map(|(i, chunk)| Section::new((i + 1) as u32, SectionKind::TextChunk, chunk.join("\n")))
        .collect();
    if total > covered {
        sections.push(marker(
            sections.len() + 1,
            SectionKind::TextChunk,
            format!(
                "... more content available (processed {} of {} lines) ...",
                covered, total
            ),
        ));
    }
    sections
}

// ============ Shared ============

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>, String> {
    let entry = archive.by_name(name).map_err(|e| format!("{}: {}", name, e))?;
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(|e| e.to_string())?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        ));
    }
    Ok(out)
}
