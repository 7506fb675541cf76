//! Text extraction — turns uploaded files into candidate `Document`s.
//!
//! One task per upload, each bounded by a timeout. A document that fails,
//! times out or yields no text comes back with empty text and a flag; it never
//! aborts the batch. `extract_all` returns only after every upload has settled,
//! in upload order.
//!
//! PDF and DOCX parsing is CPU-bound and runs inside `tokio::task::spawn_blocking`.
//! A blocking parse cannot be cancelled: when the timeout fires the document is
//! flagged, but the thread keeps running until the parser returns. At most
//! `MAX_BLOCKING_PARSES` such parses run at once; waiting for a slot counts
//! against the document's timeout.

use std::fmt;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::models::{Document, ExtractionFailure};

/// Longest display name derived from document text.
const MAX_NAME_CHARS: usize = 40;

const MAX_BLOCKING_PARSES: usize = 4;

static BLOCKING_PARSES: Semaphore = Semaphore::const_new(MAX_BLOCKING_PARSES);

/// Path of the main body part inside a DOCX package.
const DOCX_BODY: &str = "word/document.xml";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A raw uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
}

/// The outcome of extracting one upload.
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub file_name: String,
    pub document: Document,
    pub flag: Option<ExtractionFailure>,
}

/// Per-file summary returned to the uploader.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub file_name: String,
    pub candidate_name: String,
    pub characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<ExtractionFailure>,
}

impl From<&ExtractedDocument> for ExtractionSummary {
    fn from(extracted: &ExtractedDocument) -> Self {
        Self {
            file_name: extracted.file_name.clone(),
            candidate_name: extracted.document.display_name.clone(),
            characters: extracted.document.raw_text.chars().count(),
            flag: extracted.flag.clone(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor trait and backends
// ────────────────────────────────────────────────────────────────────────────

/// Pulls plain text out of one file's bytes.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, data: Bytes) -> Result<String, ExtractionFailure>;
}

/// UTF-8 text files. Invalid sequences are replaced, not rejected.
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, data: Bytes) -> Result<String, ExtractionFailure> {
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

/// PDF text via `pdf-extract`.
pub struct PdfExtractor;

#[async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, data: Bytes) -> Result<String, ExtractionFailure> {
        parse_blocking(&BLOCKING_PARSES, "PDF", move || {
            pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| ExtractionFailure::Unreadable(e.to_string()))
        })
        .await
    }
}

/// DOCX body text: the `w:t` runs of `word/document.xml`, one line per paragraph.
pub struct DocxExtractor;

#[async_trait]
impl TextExtractor for DocxExtractor {
    async fn extract(&self, data: Bytes) -> Result<String, ExtractionFailure> {
        parse_blocking(&BLOCKING_PARSES, "DOCX", move || docx_text(&data)).await
    }
}

/// Runs a parser on the blocking pool while holding a permit from `slots`.
/// The permit moves into the blocking task, so it is released only when the
/// parser actually finishes, even if the caller has stopped waiting.
async fn parse_blocking<F>(
    slots: &'static Semaphore,
    format: &'static str,
    parse: F,
) -> Result<String, ExtractionFailure>
where
    F: FnOnce() -> Result<String, ExtractionFailure> + Send + 'static,
{
    let permit = slots
        .acquire()
        .await
        .map_err(|e| ExtractionFailure::Unreadable(format!("{format} parser unavailable: {e}")))?;

    tokio::task::spawn_blocking(move || {
        let _permit = permit;
        parse()
    })
    .await
    .map_err(|e| ExtractionFailure::Unreadable(format!("{format} parser aborted: {e}")))?
}

fn docx_text(data: &[u8]) -> Result<String, ExtractionFailure> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(invalid_docx)?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(invalid_docx)?
        .read_to_string(&mut xml)
        .map_err(invalid_docx)?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event().map_err(invalid_docx)? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push(' '),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_run_text => {
                text.push_str(&t.unescape().map_err(invalid_docx)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

fn invalid_docx(e: impl fmt::Display) -> ExtractionFailure {
    ExtractionFailure::Unreadable(format!("invalid DOCX: {e}"))
}

/// Picks a backend from the file extension.
pub fn extractor_for(file_name: &str) -> Result<Arc<dyn TextExtractor>, ExtractionFailure> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => Ok(Arc::new(PdfExtractor)),
        "docx" => Ok(Arc::new(DocxExtractor)),
        "txt" | "text" | "md" => Ok(Arc::new(PlainTextExtractor)),
        "" => Err(ExtractionFailure::UnsupportedFormat(
            "file has no extension".to_string(),
        )),
        other => Err(ExtractionFailure::UnsupportedFormat(format!(".{other}"))),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Batch extraction
// ────────────────────────────────────────────────────────────────────────────

/// Extracts every upload concurrently and waits for all of them.
pub async fn extract_all(uploads: Vec<Upload>, timeout: Duration) -> Vec<ExtractedDocument> {
    let handles: Vec<_> = uploads
        .into_iter()
        .map(|upload| {
            let file_name = upload.file_name.clone();
            let handle = tokio::spawn(async move {
                match extractor_for(&upload.file_name) {
                    Ok(extractor) => extract_with(extractor, upload, timeout).await,
                    Err(failure) => failed(upload.file_name, failure),
                }
            });
            (file_name, handle)
        })
        .collect();

    let mut extracted = Vec::with_capacity(handles.len());
    for (file_name, handle) in handles {
        let document = match handle.await {
            Ok(document) => document,
            Err(e) => failed(
                file_name,
                ExtractionFailure::Unreadable(format!("extraction task failed: {e}")),
            ),
        };
        extracted.push(document);
    }

    debug!(
        documents = extracted.len(),
        flagged = extracted.iter().filter(|d| d.flag.is_some()).count(),
        "Extraction batch complete"
    );
    extracted
}

/// Runs one extractor under a timeout.
pub async fn extract_with(
    extractor: Arc<dyn TextExtractor>,
    upload: Upload,
    timeout: Duration,
) -> ExtractedDocument {
    let Upload { file_name, data } = upload;

    match tokio::time::timeout(timeout, extractor.extract(data)).await {
        Ok(Ok(text)) if text.trim().is_empty() => failed(file_name, ExtractionFailure::Empty),
        Ok(Ok(text)) => {
            let display_name = candidate_name(&text, &file_name);
            ExtractedDocument {
                document: Document::new(display_name, text),
                file_name,
                flag: None,
            }
        }
        Ok(Err(failure)) => failed(file_name, failure),
        Err(_) => failed(file_name, ExtractionFailure::TimedOut),
    }
}

fn failed(file_name: String, failure: ExtractionFailure) -> ExtractedDocument {
    warn!(file = %file_name, reason = %failure, "Document extraction failed; screening it as empty");
    ExtractedDocument {
        document: Document::new(file_name.clone(), String::new()),
        file_name,
        flag: Some(failure),
    }
}

/// First non-blank line of the text, capped at 40 characters.
/// Falls back to the file name when the text has no visible line.
pub fn candidate_name(text: &str, file_name: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_NAME_CHARS).collect::<String>().trim_end().to_string())
        .unwrap_or_else(|| file_name.to_string())
}

/// Minimal DOCX package: one `w:p` per paragraph, tabs as `w:tab`.
#[cfg(test)]
pub fn docx_fixture(paragraphs: &[&str]) -> Bytes {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|paragraph| {
            let runs: Vec<String> = paragraph
                .split('\t')
                .map(|part| {
                    let escaped = part
                        .replace('&', "&amp;")
                        .replace('<', "&lt;")
                        .replace('>', "&gt;");
                    format!(r#"<w:r><w:t xml:space="preserve">{escaped}</w:t></w:r>"#)
                })
                .collect();
            format!("<w:p>{}</w:p>", runs.join("<w:r><w:tab/></w:r>"))
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCX_BODY, zip::write::FileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    Bytes::from(writer.finish().unwrap().into_inner())
}
