use std::sync::Arc;

/// Minimum number of matched tokens for a region to qualify as a duplicate.
pub const DEFAULT_CHUNK_TOKENS: usize = 100;

/// Minimum number of source lines a duplicate must span.
pub const DEFAULT_MIN_LINES: u32 = 3;

/// Maximum number of accepted matches per file before scanning of that
/// file is cut short.
pub const MAX_SINGLE_FILE_MATCHES: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Minimum duplicate length in tokens; also the rolling-hash window size.
    pub chunk: usize,
    /// Minimum duplicate length in lines (inclusive span).
    pub min_lines: u32,
    /// Replace identifier/literal text with a placeholder before matching.
    pub fuzzy: bool,
    /// Stop scanning a file once it has produced this many accepted matches.
    pub max_file_matches: usize,
    /// Same-file candidates closer than this many lines are dismissed as
    /// trivial self-matches (e.g. long literal arrays).
    pub same_file_line_gap: u32,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            chunk: DEFAULT_CHUNK_TOKENS,
            min_lines: DEFAULT_MIN_LINES,
            fuzzy: false,
            max_file_matches: MAX_SINGLE_FILE_MATCHES,
            same_file_line_gap: 3,
        }
    }
}

impl DetectOptions {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.chunk < 2 {
            return Err(Error::InvalidOptions(format!(
                "chunk must be at least 2 tokens, got {}",
                self.chunk
            )));
        }
        if self.min_lines == 0 {
            return Err(Error::InvalidOptions(
                "min-lines must be at least 1".to_string(),
            ));
        }
        if self.max_file_matches == 0 {
            return Err(Error::InvalidOptions(
                "max-file-matches must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetectStats {
    pub candidate_files: u64,
    pub scanned_files: u64,
    pub scanned_tokens: u64,
    pub windows_indexed: u64,
    pub candidates_checked: u64,
    pub matches_accepted: u64,
    pub skipped_unreadable: u64,
    pub skipped_unsupported: u64,
    pub capped_files: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectOutcome<T> {
    pub result: T,
    pub stats: DetectStats,
}

/// One verified occurrence of a duplicated region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub path: Arc<str>,
    pub start_line: u32,
    pub start_offset: usize,
    pub end_line: u32,
    pub end_offset: usize,
    pub token_len: usize,
}

impl Match {
    /// Inclusive line count of this occurrence.
    pub fn line_count(&self) -> u32 {
        debug_assert!(self.start_line <= self.end_line);
        self.end_line - self.start_line + 1
    }
}

/// Two or more content-identical occurrences, confirmed by a SHA-1 digest
/// of the full matched token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSet {
    pub digest: [u8; 20],
    pub matches: Vec<Match>,
}

impl MatchSet {
    /// Reported duplication size: the minimum line count among the
    /// occurrences. Occurrences can differ slightly in raw line span
    /// because blank/ignored lines are stripped.
    pub fn matched_lines(&self) -> u32 {
        self.matches
            .iter()
            .map(Match::line_count)
            .min()
            .unwrap_or(0)
    }

    /// Lines duplicated beyond the first occurrence: the sum of all
    /// occurrence line counts minus `matched_lines`.
    pub fn duplicate_line_count(&self) -> u64 {
        let total: u64 = self.matches.iter().map(|m| u64::from(m.line_count())).sum();
        total - u64::from(self.matched_lines())
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}
