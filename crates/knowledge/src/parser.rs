//! Source file loading and text extraction.
//!
//! PDF files yield one document per page, CSV files one document per data
//! row (`"column: value"` lines), text and markdown files one document each.

use placement_core::{AppError, AppResult};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::{meta, Document};

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Pdf,
    Csv,
    Markdown,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pdf") => Self::Pdf,
            Some("csv") => Self::Csv,
            Some("md") | Some("markdown") => Self::Markdown,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Markdown => "markdown",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// A source file and the documents it produced.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content_type: ContentType,
    pub documents: Vec<Document>,
}

/// Load every corpus path. Directories are walked in file-name order.
///
/// A missing path is an error: the corpus is fixed and ingestion must not
/// silently serve a partial index. Document ids are keyed by the file's path
/// below its corpus entry (`corpus/2024/rules.txt`), so files sharing a name
/// in different directories stay distinct.
pub fn load_sources(paths: &[PathBuf]) -> AppResult<Vec<SourceFile>> {
    let mut sources = Vec::new();
    let mut keys = HashSet::new();

    for path in paths {
        if path.is_file() {
            let key = unique_key(&mut keys, relative_key(path, path), path);
            sources.push(parse_source_keyed(path, &key)?);
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file()
                    && ContentType::from_path(entry_path) != ContentType::Unknown
                {
                    let key = unique_key(&mut keys, relative_key(path, entry_path), entry_path);
                    sources.push(parse_source_keyed(entry_path, &key)?);
                }
            }
        } else {
            return Err(AppError::Knowledge(format!(
                "Corpus document not found: {:?}",
                path
            )));
        }
    }

    Ok(sources)
}

/// `path` relative to the parent of the corpus entry `root`, with `/` separators.
fn relative_key(root: &Path, path: &Path) -> String {
    let base = root.parent().unwrap_or(root);
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Two listed entries can still map to one key; the later one falls back to its full path.
fn unique_key(keys: &mut HashSet<String>, key: String, path: &Path) -> String {
    if keys.insert(key.clone()) {
        return key;
    }
    let fallback = path.to_string_lossy().to_string();
    tracing::warn!("Duplicate corpus key '{}', using {:?}", key, fallback);
    keys.insert(fallback.clone());
    fallback
}

/// Parse one file into documents keyed by its file name.
pub fn parse_source(path: &Path) -> AppResult<SourceFile> {
    let name = file_name(path);
    parse_source_keyed(path, &name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Parse one file; `key` prefixes the document ids, the file name stays the display source.
pub fn parse_source_keyed(path: &Path, key: &str) -> AppResult<SourceFile> {
    let content_type = ContentType::from_path(path);
    let source = file_name(path);

    let base = |id: String, content: String| {
        Document::new(id, content)
            .with_metadata(meta::SOURCE, source.clone())
            .with_metadata(meta::PATH, path.to_string_lossy())
            .with_metadata(meta::KIND, content_type.as_str())
    };

    let documents = match content_type {
        ContentType::Pdf => extract_pdf_pages(path)?
            .into_iter()
            .enumerate()
            .map(|(i, page)| {
                base(format!("{}#p{}", key, i + 1), page)
                    .with_metadata(meta::PAGE, (i + 1).to_string())
            })
            .collect(),
        ContentType::Csv => parse_csv_rows(path)?
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                base(format!("{}#row{}", key, i), row).with_metadata(meta::ROW, i.to_string())
            })
            .collect(),
        ContentType::Markdown => vec![base(key.to_string(), clean_markdown(&read_text(path)?))],
        ContentType::PlainText => vec![base(key.to_string(), read_text(path)?)],
        ContentType::Unknown => {
            let raw = read_text(path)?;
            if !is_likely_text(&raw) {
                tracing::warn!("Skipping likely binary file: {:?}", path);
                return Err(AppError::Knowledge(format!(
                    "Binary file not supported: {:?}",
                    path
                )));
            }
            vec![base(key.to_string(), raw)]
        }
    };

    tracing::debug!(
        "Loaded {:?} as {}: {} documents",
        path,
        content_type.as_str(),
        documents.len()
    );

    Ok(SourceFile {
        path: path.to_path_buf(),
        content_type,
        documents,
    })
}

/// Extract the text of a whole PDF (used for resumes).
pub fn extract_pdf_text(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read PDF {:?}: {}", path, e)))?;

    pdf_extract::extract_text_from_mem(&bytes).map_err(|e| {
        AppError::Knowledge(format!("Failed to extract text from PDF {:?}: {}", path, e))
    })
}

/// Extract PDF text split into pages on form feeds.
fn extract_pdf_pages(path: &Path) -> AppResult<Vec<String>> {
    let text = extract_pdf_text(path)?;
    Ok(split_pages(&text))
}

fn split_pages(text: &str) -> Vec<String> {
    let mut pages: Vec<String> = text.split('\u{c}').map(|p| p.to_string()).collect();
    // A trailing form feed leaves an empty final page
    if pages.len() > 1 && pages.last().map_or(false, |p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

/// Read CSV rows as `"column: value"` lines keyed by the header.
fn parse_csv_rows(path: &Path) -> AppResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to open CSV {:?}: {}", path, e)))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::Knowledge(format!("Failed to read CSV header {:?}: {}", path, e)))?
        .clone();

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::Knowledge(format!("Failed to read CSV row {} in {:?}: {}", i, path, e))
        })?;

        let lines: Vec<String> = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| format!("{}: {}", column.trim(), value.trim()))
            .collect();
        rows.push(lines.join("\n"));
    }

    Ok(rows)
}

fn read_text(path: &Path) -> AppResult<String> {
    fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        // Remove markdown headers
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
