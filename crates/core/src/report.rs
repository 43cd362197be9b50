use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::types::MatchSet;

/// Sort clusters by duplicated size (matched line count) descending, with
/// a stable path/line tiebreak so report order is deterministic.
pub fn sort_match_sets(sets: &mut [MatchSet]) {
    sets.sort_by(|a, b| {
        b.matched_lines().cmp(&a.matched_lines()).then_with(|| {
            let ka = a.matches.first().map(|m| (&m.path, m.start_line));
            let kb = b.matches.first().map(|m| (&m.path, m.start_line));
            ka.cmp(&kb)
        })
    });
}

/// Plain-text report: one block per cluster plus a trailing total of
/// duplicated lines. `sets` is expected to be pre-sorted.
pub fn write_text_report<W: Write>(out: &mut W, sets: &[MatchSet]) -> io::Result<()> {
    let mut total_duplicate_lines = 0u64;
    for (idx, set) in sets.iter().enumerate() {
        writeln!(out, "{}", "=".repeat(50))?;
        writeln!(out, "Match {}:", idx + 1)?;
        writeln!(
            out,
            "Found a minimum {} line duplication in {} files.",
            set.matched_lines(),
            set.len()
        )?;
        for m in &set.matches {
            writeln!(out, "Starting at line {} of {}", m.start_line, m.path)?;
        }
        total_duplicate_lines += set.duplicate_line_count();
    }
    writeln!(out, "Total duplicate lines : {total_duplicate_lines}")?;
    Ok(())
}

fn peer_info(set: &MatchSet, skip_path: &str, strip_prefix: &str) -> String {
    let peers: Vec<String> = set
        .matches
        .iter()
        .filter(|m| m.path.as_ref() != skip_path)
        .map(|m| {
            let path = m.path.strip_prefix(strip_prefix).unwrap_or(&m.path);
            format!("{}:{}+{}", path, m.start_line, m.line_count())
        })
        .collect();
    peers.join(" ")
}

/// Rewrite each matched file, bracketing every duplicate region with
/// `//!DUPLICATE BEGIN`/`END` marker comments that name the peer
/// occurrences. Driven purely by match start/line-count data. Regions are
/// processed bottom-up per file so earlier insertions do not shift the
/// line numbers of later ones. Returns the number of markers inserted.
pub fn insert_duplicate_markers(sets: &[MatchSet], strip_prefix: &Path) -> io::Result<usize> {
    let strip_prefix = strip_prefix.to_string_lossy();

    // (path, start line, line count, peer description, marker id)
    let mut regions: Vec<(&str, u32, u32, String, usize)> = Vec::new();
    let mut marker_id = 0usize;
    for set in sets {
        for m in &set.matches {
            regions.push((
                m.path.as_ref(),
                m.start_line,
                m.line_count(),
                peer_info(set, &m.path, &strip_prefix),
                marker_id,
            ));
            marker_id += 1;
        }
    }
    regions.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut inserted = 0usize;
    let mut i = 0usize;
    while i < regions.len() {
        let path = regions[i].0;
        let mut j = i;
        while j < regions.len() && regions[j].0 == path {
            j += 1;
        }

        // Lossy, matching how detection read the file; markers must not
        // fail on sources that are not valid UTF-8.
        let original = String::from_utf8_lossy(&fs::read(path)?).into_owned();
        let mut lines: Vec<&str> = original.lines().collect();
        let had_trailing_newline = original.ends_with('\n');

        let mut markers: Vec<(usize, String)> = Vec::new();
        for &(_, start_line, line_count, ref info, id) in &regions[i..j] {
            let begin = (start_line as usize).saturating_sub(1).min(lines.len());
            let end = (begin + line_count as usize).min(lines.len());
            markers.push((end, format!("//!DUPLICATE END {id}")));
            markers.push((begin, format!("//!DUPLICATE BEGIN {id} -- {info}")));
        }
        // Descending insertion point keeps earlier indices valid.
        markers.sort_by(|a, b| b.0.cmp(&a.0));
        for (at, text) in &markers {
            lines.insert(*at, text);
            inserted += 1;
        }

        let mut rewritten = lines.join("\n");
        if had_trailing_newline {
            rewritten.push('\n');
        }
        fs::write(path, rewritten)?;
        i = j;
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Match;

    fn make_match(path: &str, start_line: u32, end_line: u32) -> Match {
        Match {
            path: Arc::from(path),
            start_line,
            start_offset: usize::try_from(start_line).unwrap() * 100,
            end_line,
            end_offset: usize::try_from(end_line).unwrap() * 100 + 99,
            token_len: 120,
        }
    }

    fn make_set(digest_byte: u8, matches: Vec<Match>) -> MatchSet {
        MatchSet {
            digest: [digest_byte; 20],
            matches,
        }
    }

    #[test]
    fn report_lists_sets_largest_first_with_total() {
        let mut sets = vec![
            make_set(1, vec![make_match("a.c", 10, 12), make_match("b.c", 4, 6)]),
            make_set(
                2,
                vec![make_match("a.c", 40, 49), make_match("c.c", 1, 10)],
            ),
        ];
        sort_match_sets(&mut sets);

        let mut out = Vec::new();
        write_text_report(&mut out, &sets).unwrap();
        let text = String::from_utf8(out).unwrap();

        let expected = "\
==================================================
Match 1:
Found a minimum 10 line duplication in 2 files.
Starting at line 40 of a.c
Starting at line 1 of c.c
==================================================
Match 2:
Found a minimum 3 line duplication in 2 files.
Starting at line 10 of a.c
Starting at line 4 of b.c
Total duplicate lines : 13
";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_run_produces_a_valid_report() {
        let mut out = Vec::new();
        write_text_report(&mut out, &[]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Total duplicate lines : 0\n"
        );
    }

    #[test]
    fn markers_bracket_regions_without_shifting_lines() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("dup.c");
        let body: String = (1..=12).map(|i| format!("line{i}\n")).collect();
        fs::write(&file, &body)?;

        let path: Arc<str> = Arc::from(file.to_string_lossy().as_ref());
        let sets = vec![make_set(
            7,
            vec![
                Match {
                    path: Arc::clone(&path),
                    start_line: 2,
                    start_offset: 0,
                    end_line: 4,
                    end_offset: 10,
                    token_len: 30,
                },
                Match {
                    path: Arc::clone(&path),
                    start_line: 8,
                    start_offset: 400,
                    end_line: 10,
                    end_offset: 500,
                    token_len: 30,
                },
            ],
        )];

        let inserted = insert_duplicate_markers(&sets, dir.path())?;
        assert_eq!(inserted, 4);

        let rewritten = fs::read_to_string(&file)?;
        let lines: Vec<&str> = rewritten.lines().collect();
        assert!(lines[1].starts_with("//!DUPLICATE BEGIN"));
        assert_eq!(lines[2], "line2");
        assert_eq!(lines[4], "line4");
        assert!(lines[5].starts_with("//!DUPLICATE END"));
        // The second region still brackets its original content.
        let begin2 = lines
            .iter()
            .position(|l| l.starts_with("//!DUPLICATE BEGIN") && l.contains("-- "))
            .unwrap();
        assert!(begin2 < lines.len());
        assert!(rewritten.contains("line8"));
        assert!(rewritten.ends_with('\n'));
        Ok(())
    }

    #[test]
    fn markers_survive_non_utf8_file_content() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("latin.c");
        fs::write(&file, b"caf\xe9 ( ) ;\nx1 = 1 ;\nx2 = 2 ;\nx3 = 3 ;\n")?;

        let path: Arc<str> = Arc::from(file.to_string_lossy().as_ref());
        let sets = vec![make_set(
            9,
            vec![
                Match {
                    path: Arc::clone(&path),
                    start_line: 2,
                    start_offset: 12,
                    end_line: 2,
                    end_offset: 20,
                    token_len: 10,
                },
                Match {
                    path: Arc::clone(&path),
                    start_line: 4,
                    start_offset: 30,
                    end_line: 4,
                    end_offset: 38,
                    token_len: 10,
                },
            ],
        )];

        let inserted = insert_duplicate_markers(&sets, dir.path())?;
        assert_eq!(inserted, 4);

        let rewritten = String::from_utf8(fs::read(&file)?).unwrap();
        assert!(rewritten.contains("//!DUPLICATE BEGIN"));
        assert!(rewritten.contains("x1 = 1 ;"));
        Ok(())
    }
}
