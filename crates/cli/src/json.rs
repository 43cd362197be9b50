use std::io;

use cdd_core::{DetectStats, MatchSet};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonDetectStats {
    pub(crate) candidate_files: u64,
    pub(crate) scanned_files: u64,
    pub(crate) scanned_tokens: u64,
    pub(crate) windows_indexed: u64,
    pub(crate) candidates_checked: u64,
    pub(crate) matches_accepted: u64,
    pub(crate) skipped_unreadable: u64,
    pub(crate) skipped_unsupported: u64,
    pub(crate) capped_files: u64,
}

impl From<DetectStats> for JsonDetectStats {
    fn from(stats: DetectStats) -> Self {
        Self {
            candidate_files: stats.candidate_files,
            scanned_files: stats.scanned_files,
            scanned_tokens: stats.scanned_tokens,
            windows_indexed: stats.windows_indexed,
            candidates_checked: stats.candidates_checked,
            matches_accepted: stats.matches_accepted,
            skipped_unreadable: stats.skipped_unreadable,
            skipped_unsupported: stats.skipped_unsupported,
            capped_files: stats.capped_files,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonMatch {
    pub(crate) path: String,
    pub(crate) start_line: u32,
    pub(crate) end_line: u32,
    pub(crate) line_count: u32,
    pub(crate) token_len: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonMatchSet {
    pub(crate) digest: String,
    pub(crate) matched_lines: u32,
    pub(crate) matches: Vec<JsonMatch>,
}

fn hex_digest(digest: &[u8; 20]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

pub(crate) fn map_match_sets(sets: &[MatchSet]) -> Vec<JsonMatchSet> {
    sets.iter()
        .map(|set| JsonMatchSet {
            digest: hex_digest(&set.digest),
            matched_lines: set.matched_lines(),
            matches: set
                .matches
                .iter()
                .map(|m| JsonMatch {
                    path: m.path.to_string(),
                    start_line: m.start_line,
                    end_line: m.end_line,
                    line_count: m.line_count(),
                    token_len: m.token_len,
                })
                .collect(),
        })
        .collect()
}

pub(crate) fn write_json<T: Serialize>(value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::other(format!("json encode: {e}")))?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use cdd_core::Match;

    #[test]
    fn match_sets_serialize_with_camel_case_keys() {
        let sets = vec![MatchSet {
            digest: [0xab; 20],
            matches: vec![Match {
                path: Arc::from("a.c"),
                start_line: 2,
                start_offset: 10,
                end_line: 6,
                end_offset: 99,
                token_len: 40,
            }],
        }];

        let json = serde_json::to_string(&map_match_sets(&sets)).unwrap();
        assert!(json.contains("\"digest\":\"abababababababababababababababababababab\""));
        assert!(json.contains("\"matchedLines\":5"));
        assert!(json.contains("\"startLine\":2"));
        assert!(json.contains("\"tokenLen\":40"));
    }
}
