//! Row extractors (C4) — one module per listing-dialect family. Every
//! extractor consumes a parsed document plus the directory's own URL and
//! emits a flat list of [`ExtractedEntry`]; the dispatcher (`dispatch.rs`)
//! turns those into the `ParsedDirectory`'s `subdirectories`/`files`.

pub mod model01;
pub mod preformatted;
pub mod simple;
pub mod tabular;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractedKind {
    Directory,
    File,
}

#[derive(Debug, Clone)]
pub struct ExtractedEntry {
    pub kind: ExtractedKind,
    pub url: String,
    pub name: String,
    /// Only meaningful for files; `None` for directories.
    pub file_size: Option<i64>,
    pub description: Option<String>,
}

impl ExtractedEntry {
    pub fn directory(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind: ExtractedKind::Directory, url: url.into(), name: name.into(), file_size: None, description: None }
    }

    pub fn file(url: impl Into<String>, name: impl Into<String>, file_size: i64) -> Self {
        Self {
            kind: ExtractedKind::File,
            url: url.into(),
            name: name.into(),
            file_size: Some(file_size),
            description: None,
        }
    }

    /// Attach a Description-column/token value read by the caller's extractor.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Result of one dialect's extraction attempt.
pub struct ExtractionOutcome {
    pub entries: Vec<ExtractedEntry>,
    pub header_count: usize,
}

impl ExtractionOutcome {
    pub fn new(entries: Vec<ExtractedEntry>, header_count: usize) -> Self {
        Self { entries, header_count }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
