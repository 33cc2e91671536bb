//! Core data model: the parsed-directory tree, file entries, and the
//! header-classification types used by the dispatcher and extractors.

use serde::Serialize;
use std::sync::{Arc, RwLock, Weak};

/// Sentinel for "size unknown" — distinct from a genuinely empty (0-byte) file.
pub const UNKNOWN_SIZE: i64 = -1;

// ---------------------------------------------------------------------------
// Parsed tree
// ---------------------------------------------------------------------------

/// One directory node in the discovered tree.
///
/// Created by the caller as a shell holding only `url` and `parent`, then
/// mutated exclusively by the extractor it is routed to, and finalized by
/// the sanitizer. Thereafter immutable from the parser's standpoint.
#[derive(Clone, Serialize)]
pub struct ParsedDirectory {
    pub url: String,
    pub name: String,
    #[serde(skip)]
    pub parent: Option<Weak<RwLock<ParsedDirectory>>>,
    pub subdirectories: Vec<Arc<RwLock<ParsedDirectory>>>,
    pub files: Vec<ParsedFile>,
    pub description: Option<String>,
    pub parser: Option<Dialect>,
    pub parsed_successfully: bool,
    pub error: bool,
    pub header_count: usize,
    pub start_time: Option<i64>,
    pub finish_time: Option<i64>,
    pub finished: bool,
}

impl ParsedDirectory {
    /// Build the shell the caller hands to [`crate::parse_html`]: only `url`
    /// and an optional `parent` are known up front.
    pub fn shell(url: impl Into<String>, parent: Option<Weak<RwLock<ParsedDirectory>>>) -> Self {
        let url = url.into();
        let name = derive_name(&url);
        Self {
            url,
            name,
            parent,
            subdirectories: Vec::new(),
            files: Vec::new(),
            description: None,
            parser: None,
            parsed_successfully: false,
            error: false,
            header_count: 0,
            start_time: None,
            finish_time: None,
            finished: false,
        }
    }

    /// Like [`Self::shell`], but with a name supplied by the extractor
    /// rather than derived from the URL (e.g. a `?folder=`-decoded name).
    pub fn shell_named(
        url: impl Into<String>,
        name: impl Into<String>,
        parent: Option<Weak<RwLock<ParsedDirectory>>>,
    ) -> Self {
        let mut dir = Self::shell(url, parent);
        dir.name = name.into();
        dir
    }

    /// Mark this directory as a parse failure: no entries are retained.
    pub fn mark_error(&mut self) {
        self.error = true;
        self.parsed_successfully = false;
        self.subdirectories.clear();
        self.files.clear();
    }
}

/// Decode the final path segment of a URL for display; `"ROOT"` when empty
/// (the crawl root itself has no meaningful last segment).
pub fn derive_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or("");
    if last.is_empty() {
        "ROOT".to_string()
    } else {
        percent_decode(last)
    }
}

fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize)]
pub struct ParsedFile {
    pub url: String,
    pub file_name: String,
    /// Bytes, or [`UNKNOWN_SIZE`] when unknown.
    pub file_size: i64,
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Header classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HeaderType {
    Unknown,
    FileName,
    FileSize,
    Modified,
    Description,
    Type,
}

#[derive(Debug, Clone)]
pub struct HeaderInfo {
    pub header: String,
    pub kind: HeaderType,
}

/// 1-based column index -> classified header.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    pub columns: std::collections::BTreeMap<usize, HeaderInfo>,
}

impl ColumnMap {
    pub fn kind_at(&self, idx: usize) -> HeaderType {
        self.columns.get(&idx).map(|h| h.kind).unwrap_or(HeaderType::Unknown)
    }

    pub fn column_for(&self, kind: HeaderType) -> Option<usize> {
        self.columns.iter().find(|(_, h)| h.kind == kind).map(|(i, _)| *i)
    }
}

// ---------------------------------------------------------------------------
// Dialect tag
// ---------------------------------------------------------------------------

/// Identifies the extractor that produced a [`ParsedDirectory`], for
/// diagnostics only — never semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Dialect {
    ParseTablesDirectoryListing,
    DirectoryListingCom,
    H5ai,
    Snif,
    PureGodir,
    CustomDiv1,
    CustomDiv2,
    Hfs,
    PreFormatted,
    JavaScriptDrawn,
    UlRoot,
    MduiList,
    DirectoryLister,
    ListGroup,
    GenericUl,
    AnchorOnlyFallback,
    Model01,
    Ipfs,
    Blitzfiles,
    GoogleDriveBhadoo,
    GoogleDriveGoIndex,
    GoogleDriveGo2Index,
    GoogleDriveGdIndex,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ParseTablesDirectoryListing => "ParseTablesDirectoryListing",
            Self::DirectoryListingCom => "DirectoryListingCom",
            Self::H5ai => "H5ai",
            Self::Snif => "Snif",
            Self::PureGodir => "PureGodir",
            Self::CustomDiv1 => "CustomDiv1",
            Self::CustomDiv2 => "CustomDiv2",
            Self::Hfs => "Hfs",
            Self::PreFormatted => "PreFormatted",
            Self::JavaScriptDrawn => "JavaScriptDrawn",
            Self::UlRoot => "UlRoot",
            Self::MduiList => "MduiList",
            Self::DirectoryLister => "DirectoryLister",
            Self::ListGroup => "ListGroup",
            Self::GenericUl => "GenericUl",
            Self::AnchorOnlyFallback => "AnchorOnlyFallback",
            Self::Model01 => "Model01",
            Self::Ipfs => "Ipfs",
            Self::Blitzfiles => "Blitzfiles",
            Self::GoogleDriveBhadoo => "GoogleDriveBhadoo",
            Self::GoogleDriveGoIndex => "GoogleDriveGoIndex",
            Self::GoogleDriveGo2Index => "GoogleDriveGo2Index",
            Self::GoogleDriveGdIndex => "GoogleDriveGdIndex",
        }
    }
}
