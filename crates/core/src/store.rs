use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::types::{Match, MatchSet};
use crate::util::{fnv1a64, fnv1a64_continue};

pub(crate) type Digest = [u8; 20];

/// An unverified window position recorded during scanning: the file and the
/// byte offset/line of the window's first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CandidatePos {
    pub(crate) file: usize,
    pub(crate) line: u32,
    pub(crate) offset: usize,
}

/// One verified region inside a single file, offsets half-open.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchRegion {
    pub(crate) file: usize,
    pub(crate) start_line: u32,
    pub(crate) start_offset: usize,
    pub(crate) end_line: u32,
    pub(crate) end_offset: usize,
}

#[derive(Debug)]
struct MatchSetBuilder {
    token_len: usize,
    regions: Vec<MatchRegion>,
    /// Dedup key: a region is identified by where it starts.
    seen: HashSet<(usize, usize)>,
}

impl MatchSetBuilder {
    fn new(token_len: usize) -> Self {
        Self {
            token_len,
            regions: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn add(&mut self, region: MatchRegion) {
        if !self.seen.insert((region.file, region.start_offset)) {
            return;
        }
        // No two occurrences in one cluster may overlap in the same file.
        let overlaps = self.regions.iter().any(|r| {
            r.file == region.file
                && region.start_offset < r.end_offset
                && r.start_offset < region.end_offset
        });
        if !overlaps {
            self.regions.push(region);
        }
    }
}

/// Fold the numeric rolling hash together with the window's first token
/// text, so unrelated windows sharing a numeric hash land in different
/// buckets.
fn fold_key(rolling_hash: u64, token_text: &str) -> u64 {
    fnv1a64_continue(fnv1a64(&rolling_hash.to_le_bytes()), token_text.as_bytes())
}

/// Two responsibilities: a fast approximate candidate index over window
/// hashes, and a registry of confirmed duplicate clusters keyed by the
/// strong digest of the full matched token sequence.
#[derive(Debug)]
pub(crate) struct MatchStore {
    min_tokens: usize,
    index: HashMap<u64, Vec<CandidatePos>>,
    sets: HashMap<Digest, MatchSetBuilder>,
}

impl MatchStore {
    pub(crate) fn new(min_tokens: usize) -> Self {
        Self {
            min_tokens,
            index: HashMap::new(),
            sets: HashMap::new(),
        }
    }

    pub(crate) fn add_hash(&mut self, rolling_hash: u64, token_text: &str, pos: CandidatePos) {
        self.index
            .entry(fold_key(rolling_hash, token_text))
            .or_default()
            .push(pos);
    }

    /// Previously recorded positions whose folded window key matches.
    pub(crate) fn hash_matches(&self, rolling_hash: u64, token_text: &str) -> &[CandidatePos] {
        self.index
            .get(&fold_key(rolling_hash, token_text))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Commit a fully verified pair. Returns false when the pair is a
    /// self-overlap within one file and was rejected. Region ordering and
    /// the minimum length are invariants, not input conditions.
    pub(crate) fn add_exact_match(
        &mut self,
        token_len: usize,
        digest: Digest,
        first: MatchRegion,
        second: MatchRegion,
    ) -> bool {
        for region in [&first, &second] {
            assert!(
                region.start_offset < region.end_offset,
                "match region offsets out of order"
            );
            assert!(
                region.start_line <= region.end_line,
                "match region lines out of order"
            );
        }
        assert!(token_len >= self.min_tokens, "match below minimum length");

        if first.file == second.file
            && first.start_offset < second.end_offset
            && second.start_offset < first.end_offset
        {
            return false;
        }

        let builder = self
            .sets
            .entry(digest)
            .or_insert_with(|| MatchSetBuilder::new(token_len));
        debug_assert_eq!(
            builder.token_len, token_len,
            "digest collision across different token sequences"
        );
        builder.add(first);
        builder.add(second);
        true
    }

    /// All retained clusters (two or more occurrences), unordered. Callers
    /// sort by matched line count for reporting.
    pub(crate) fn into_match_sets(self, paths: &[Arc<str>]) -> Vec<MatchSet> {
        let mut out = Vec::new();
        for (digest, builder) in self.sets {
            if builder.regions.len() < 2 {
                continue;
            }
            let mut matches: Vec<Match> = builder
                .regions
                .iter()
                .map(|r| Match {
                    path: Arc::clone(&paths[r.file]),
                    start_line: r.start_line,
                    start_offset: r.start_offset,
                    end_line: r.end_line,
                    end_offset: r.end_offset,
                    token_len: builder.token_len,
                })
                .collect();
            matches.sort_by(|a, b| {
                (&a.path, a.start_line, a.start_offset).cmp(&(&b.path, b.start_line, b.start_offset))
            });
            out.push(MatchSet { digest, matches });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(file: usize, start_line: u32, start: usize, end_line: u32, end: usize) -> MatchRegion {
        MatchRegion {
            file,
            start_line,
            start_offset: start,
            end_line,
            end_offset: end,
        }
    }

    fn paths(n: usize) -> Vec<Arc<str>> {
        (0..n).map(|i| Arc::from(format!("f{i}.c").as_str())).collect()
    }

    #[test]
    fn candidate_index_discriminates_by_token_text() {
        let mut store = MatchStore::new(2);
        let pos = CandidatePos {
            file: 0,
            line: 1,
            offset: 0,
        };
        store.add_hash(42, "alpha", pos);
        assert_eq!(store.hash_matches(42, "alpha").len(), 1);
        // Same numeric hash, different leading token: different bucket.
        assert!(store.hash_matches(42, "beta").is_empty());
        assert!(store.hash_matches(43, "alpha").is_empty());
    }

    #[test]
    fn self_overlapping_pair_is_rejected() {
        let mut store = MatchStore::new(2);
        let digest = [1u8; 20];
        let accepted = store.add_exact_match(
            10,
            digest,
            region(0, 1, 0, 5, 100),
            region(0, 3, 50, 8, 150),
        );
        assert!(!accepted);
        assert!(store.into_match_sets(&paths(1)).is_empty());
    }

    #[test]
    fn adjacent_same_file_regions_are_accepted() {
        let mut store = MatchStore::new(2);
        let digest = [2u8; 20];
        // Half-open ranges [0,100) and [100,200) do not intersect.
        let accepted = store.add_exact_match(
            10,
            digest,
            region(0, 1, 0, 5, 100),
            region(0, 6, 100, 10, 200),
        );
        assert!(accepted);
        let sets = store.into_match_sets(&paths(1));
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 2);
    }

    #[test]
    fn same_digest_grows_one_cluster() {
        let mut store = MatchStore::new(2);
        let digest = [3u8; 20];
        let a = region(0, 1, 0, 5, 100);
        let b = region(1, 10, 0, 14, 100);
        let c = region(2, 20, 0, 24, 100);
        assert!(store.add_exact_match(10, digest, a, b));
        // Later scan pairs the third occurrence with the first again.
        assert!(store.add_exact_match(10, digest, c, a));
        let sets = store.into_match_sets(&paths(3));
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 3, "duplicate occurrences must be deduped");
        assert_eq!(sets[0].matched_lines(), 5);
    }

    #[test]
    #[should_panic(expected = "out of order")]
    fn inverted_region_is_a_fatal_invariant_violation() {
        let mut store = MatchStore::new(2);
        store.add_exact_match(
            10,
            [4u8; 20],
            region(0, 5, 100, 1, 0),
            region(1, 1, 0, 5, 100),
        );
    }

    #[test]
    #[should_panic(expected = "minimum length")]
    fn short_match_is_a_fatal_invariant_violation() {
        let mut store = MatchStore::new(50);
        store.add_exact_match(
            10,
            [5u8; 20],
            region(0, 1, 0, 5, 100),
            region(1, 1, 0, 5, 100),
        );
    }
}
