//! Searching real document formats end to end: Word, PowerPoint, PDF and
//! legacy-encoded text, plus broken files that must not break a scan.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use file_search::models::SearchResult;
use file_search::progress::NoProgress;
use file_search::registry::ExtractorRegistry;
use file_search::scan::{ScanOptions, Scanner};
use tempfile::TempDir;

/// Minimal valid PDF containing the text "quarterly revenue phrase".
/// Builds body then xref with correct byte offsets so pdf-extract can parse it.
fn minimal_pdf_with_phrase() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let content = b"BT /F1 12 Tf 100 700 Td (quarterly revenue phrase) Tj ET";
    let o4 = out.len();
    out.extend_from_slice(format!("4 0 obj << /Length {} >> stream\n", content.len()).as_bytes());
    out.extend_from_slice(content);
    out.extend_from_slice(b"\nendstream endobj\n");
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn zip_bytes(entries: &[(&str, String)]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buf
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}<w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell kiosk</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>42</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>",
        body
    );
    zip_bytes(&[("word/document.xml", xml)])
}

fn minimal_pptx(slides: &[&str]) -> Vec<u8> {
    let entries: Vec<(String, String)> = slides
        .iter()
        .enumerate()
        .map(|(i, text)| {
            (
                format!("ppt/slides/slide{}.xml", i + 1),
                format!(
                    "<p:sld xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
                    text
                ),
            )
        })
        .collect();
    let borrowed: Vec<(&str, String)> = entries
        .iter()
        .map(|(n, b)| (n.as_str(), b.clone()))
        .collect();
    zip_bytes(&borrowed)
}

async fn scan(dir: &Path, keyword: &str) -> Vec<SearchResult> {
    let scanner = Scanner::new(
        Arc::new(ExtractorRegistry::with_builtins()),
        ScanOptions::default(),
    );
    scanner.scan(dir, keyword, None, &NoProgress).await.unwrap()
}

#[tokio::test]
async fn docx_paragraphs_and_tables_are_searched() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("plan.docx"),
        minimal_docx(&["Kiosk rollout plan", "Budget for the kiosk pilot"]),
    )
    .unwrap();

    let results = scan(tmp.path(), "kiosk").await;
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.detected_type, "Word");
    assert_eq!(r.match_count, 3);
    let indices: Vec<u32> = r.content_matches.iter().map(|m| m.section_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(r.content_matches[2].preview.contains("cell kiosk\t42"));
}

#[tokio::test]
async fn pptx_slides_are_searched() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join("deck.pptx"),
        minimal_pptx(&["Intro", "Kiosk costs", "Summary: kiosk kiosk"]),
    )
    .unwrap();

    let results = scan(tmp.path(), "kiosk").await;
    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.detected_type, "PowerPoint");
    assert_eq!(r.match_count, 3);
    let indices: Vec<u32> = r.content_matches.iter().map(|m| m.section_index).collect();
    assert_eq!(indices, vec![2, 3]);
}

#[tokio::test]
async fn pdf_pages_are_searched() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("report.pdf"), minimal_pdf_with_phrase()).unwrap();

    let results = scan(tmp.path(), "revenue").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].detected_type, "PDF");
    assert_eq!(results[0].content_matches[0].section_index, 1);
}

#[tokio::test]
async fn legacy_korean_text_is_decoded() {
    let tmp = TempDir::new().unwrap();
    let (encoded, _, _) = encoding_rs::EUC_KR.encode("올해 예산 보고서\n예산 승인");
    fs::write(tmp.path().join("memo.txt"), &encoded[..]).unwrap();

    let results = scan(tmp.path(), "예산").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].match_count, 2);
    assert!(results[0].content_matches[0].preview.contains("예산"));
}

#[tokio::test]
async fn broken_documents_do_not_stop_the_scan() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("broken.docx"), b"not a zip").unwrap();
    fs::write(tmp.path().join("broken.pptx"), b"PK\x03\x04garbage").unwrap();
    fs::write(tmp.path().join("broken.pdf"), b"%PDF-1.4 truncated").unwrap();
    fs::write(tmp.path().join("ok.md"), "the kiosk works").unwrap();

    let results = scan(tmp.path(), "kiosk").await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].filename, "ok.md");
}
