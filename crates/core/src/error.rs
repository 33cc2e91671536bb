//! Error taxonomy (C8) — every extractor and sub-fetch returns a typed
//! [`ParseError`]; the dispatcher maps it onto `ParsedDirectory::error`.

/// Errors an extractor or dispatcher pass can raise.
///
/// `ParseFailure` and `Friendly` both collapse to `error = true` on the
/// directory; `SymlinkLoop` additionally clears any entries already
/// populated; `SubfetchFailure` is logged and parsing continues without
/// the lost signal; `Cancelled` is surfaced to the caller unconverted.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to parse directory listing: {0}")]
    ParseFailure(String),

    #[error("{0}")]
    Friendly(String),

    #[error("symlink loop detected")]
    SymlinkLoop,

    #[error("sub-fetch failed: {0}")]
    SubfetchFailure(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ParseError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
