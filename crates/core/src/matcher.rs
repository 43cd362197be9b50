use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha1::{Digest as _, Sha1};

use crate::lexer::TokenizerRegistry;
use crate::rolling::{RollingHash, token_hash};
use crate::store::{CandidatePos, MatchRegion, MatchStore};
use crate::token::{DupTokenPolicy, Token, TokenStream, tokenize_source};
use crate::types::{DetectOptions, DetectOutcome, DetectStats, Error, MatchSet};

struct SourceFile {
    path: Arc<str>,
    stream: TokenStream,
}

struct Verified {
    token_len: usize,
    digest: [u8; 20],
    end1: MatchEnd,
    end2: MatchEnd,
}

#[derive(Debug, Clone, Copy)]
struct MatchEnd {
    line: u32,
    end_offset: usize,
}

/// Rabin-Karp duplicate detector. Drives tokenization and the rolling hash
/// file by file; cross-file matches fall out because earlier files'
/// candidate positions stay resident in the match store for later files to
/// hit, so any file order yields the same cluster set.
pub struct DupDetector {
    options: DetectOptions,
    registry: TokenizerRegistry,
}

impl DupDetector {
    pub fn new(options: DetectOptions) -> Result<Self, Error> {
        Self::with_registry(options, TokenizerRegistry::with_default_languages())
    }

    pub fn with_registry(
        options: DetectOptions,
        registry: TokenizerRegistry,
    ) -> Result<Self, Error> {
        options.validate()?;
        Ok(Self { options, registry })
    }

    pub fn registry(&self) -> &TokenizerRegistry {
        &self.registry
    }

    /// Scan `files` and return the confirmed duplicate clusters, unsorted.
    /// Unreadable or unsupported files are skipped with a logged warning;
    /// they never abort the run.
    pub fn run(&self, files: &[PathBuf]) -> DetectOutcome<Vec<MatchSet>> {
        let mut stats = DetectStats::default();
        let mut store = MatchStore::new(self.options.chunk);
        let mut rolling = RollingHash::new(self.options.chunk);
        let mut sources: Vec<SourceFile> = Vec::with_capacity(files.len());

        for path in files {
            stats.candidate_files = stats.candidate_files.saturating_add(1);
            let Some(source) = self.load_source(path, &mut stats) else {
                continue;
            };
            let file_id = sources.len();
            sources.push(source);
            stats.scanned_files = stats.scanned_files.saturating_add(1);
            self.scan_file(file_id, &sources, &mut rolling, &mut store, &mut stats);
        }

        let paths: Vec<Arc<str>> = sources.iter().map(|s| Arc::clone(&s.path)).collect();
        DetectOutcome {
            result: store.into_match_sets(&paths),
            stats,
        }
    }

    fn load_source(&self, path: &Path, stats: &mut DetectStats) -> Option<SourceFile> {
        let Some(lexer) = self.registry.lexer_for_path(path) else {
            stats.skipped_unsupported = stats.skipped_unsupported.saturating_add(1);
            log::debug!("no lexer for {}, skipping", path.display());
            return None;
        };
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                stats.skipped_unreadable = stats.skipped_unreadable.saturating_add(1);
                log::warn!("skipping unreadable file {}: {err}", path.display());
                return None;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        let stream = tokenize_source(&text, lexer.as_ref(), &DupTokenPolicy, self.options.fuzzy);
        Some(SourceFile {
            path: Arc::from(path.to_string_lossy().as_ref()),
            stream,
        })
    }

    /// Slide the rolling window over one file. A window is indexed and
    /// queried when its oldest token is about to be evicted; querying is
    /// suppressed while still inside the span of an accepted match.
    fn scan_file(
        &self,
        file_id: usize,
        sources: &[SourceFile],
        rolling: &mut RollingHash,
        store: &mut MatchStore,
        stats: &mut DetectStats,
    ) {
        let tokens = sources[file_id].stream.tokens();
        // Windows never span two files.
        rolling.restart();
        let mut in_match_countdown = 0usize;
        let mut file_matches = 0usize;

        for (idx, token) in tokens.iter().enumerate() {
            if let Some(evicted) = rolling.evict() {
                let first = &tokens[evicted.first_index];
                if in_match_countdown == 0 {
                    in_match_countdown = self.find_matches(
                        evicted.window_hash,
                        file_id,
                        first,
                        sources,
                        store,
                        stats,
                        &mut file_matches,
                    );
                } else {
                    in_match_countdown -= 1;
                }
                store.add_hash(
                    evicted.window_hash,
                    &first.text,
                    CandidatePos {
                        file: file_id,
                        line: first.line,
                        offset: first.offset,
                    },
                );
                stats.windows_indexed = stats.windows_indexed.saturating_add(1);
            }
            rolling.add(token_hash(&token.text), idx);
            stats.scanned_tokens = stats.scanned_tokens.saturating_add(1);

            if file_matches > self.options.max_file_matches {
                stats.capped_files = stats.capped_files.saturating_add(1);
                log::debug!(
                    "match cap reached in {}, stopping scan of this file",
                    sources[file_id].path
                );
                break;
            }
        }
    }

    /// Query the store for the just-evicted window and verify surviving
    /// candidates. Returns the longest accepted match length, which the
    /// scan loop uses to suppress redundant queries inside that span.
    #[allow(clippy::too_many_arguments)]
    fn find_matches(
        &self,
        window_hash: u64,
        file_id: usize,
        first: &Token,
        sources: &[SourceFile],
        store: &mut MatchStore,
        stats: &mut DetectStats,
        file_matches: &mut usize,
    ) -> usize {
        let candidates = store.hash_matches(window_hash, &first.text);
        if candidates.is_empty() {
            return 0;
        }
        let candidates: Vec<CandidatePos> = candidates.to_vec();

        let mut max_len = 0usize;
        for candidate in candidates {
            if !self.is_possible_match(file_id, first, candidate) {
                continue;
            }
            stats.candidates_checked = stats.candidates_checked.saturating_add(1);

            let Some(verified) = self.find_match_length(file_id, first, candidate, sources) else {
                continue;
            };

            // Both the new and the candidate occurrence must clear the
            // token and line thresholds; no partial results.
            let lines1 = verified.end1.line - first.line + 1;
            let lines2 = verified.end2.line - candidate.line + 1;
            if verified.token_len < self.options.chunk
                || lines1 < self.options.min_lines
                || lines2 < self.options.min_lines
            {
                continue;
            }

            let accepted = store.add_exact_match(
                verified.token_len,
                verified.digest,
                MatchRegion {
                    file: file_id,
                    start_line: first.line,
                    start_offset: first.offset,
                    end_line: verified.end1.line,
                    end_offset: verified.end1.end_offset,
                },
                MatchRegion {
                    file: candidate.file,
                    start_line: candidate.line,
                    start_offset: candidate.offset,
                    end_line: verified.end2.line,
                    end_offset: verified.end2.end_offset,
                },
            );
            if accepted {
                stats.matches_accepted = stats.matches_accepted.saturating_add(1);
                *file_matches += 1;
                max_len = max_len.max(verified.token_len);
            }
        }
        max_len
    }

    /// Same-file candidates closer than the line-gap threshold are trivial
    /// self-matches from repetitive constructs; cross-file candidates
    /// always survive.
    fn is_possible_match(&self, file_id: usize, first: &Token, candidate: CandidatePos) -> bool {
        if candidate.file != file_id {
            return true;
        }
        first.line.abs_diff(candidate.line) > self.options.same_file_line_gap
    }

    /// Walk both cached token streams forward from the two start offsets,
    /// comparing token text and folding it into a SHA-1 digest, until the
    /// first mismatch or the end of either stream. A hash-collision false
    /// positive simply comes back shorter than the threshold.
    fn find_match_length(
        &self,
        file_id: usize,
        first: &Token,
        candidate: CandidatePos,
        sources: &[SourceFile],
    ) -> Option<Verified> {
        let candidate_token = sources[candidate.file].stream.at_offset(candidate.offset)?;
        if candidate_token.text != first.text {
            return None;
        }
        if candidate.file == file_id {
            // Within one file, require real separation and scan order.
            if first.offset.abs_diff(candidate.offset) <= self.options.chunk
                || first.line <= candidate.line
            {
                return None;
            }
        }

        let stream1 = sources[file_id].stream.from_offset(first.offset)?;
        let stream2 = sources[candidate.file].stream.from_offset(candidate.offset)?;

        let mut sha1 = Sha1::new();
        let mut token_len = 0usize;
        let mut ends: Option<(MatchEnd, MatchEnd)> = None;
        for (tok1, tok2) in stream1.iter().zip(stream2.iter()) {
            if tok1.text != tok2.text {
                break;
            }
            sha1.update(tok1.text.as_bytes());
            token_len += 1;
            ends = Some((
                MatchEnd {
                    line: tok1.line,
                    end_offset: tok1.end_offset(),
                },
                MatchEnd {
                    line: tok2.line,
                    end_offset: tok2.end_offset(),
                },
            ));
        }

        let (end1, end2) = ends?;
        Some(Verified {
            token_len,
            digest: sha1.finalize().into(),
            end1,
            end2,
        })
    }
}
