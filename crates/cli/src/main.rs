use std::collections::HashSet;
use std::env;
use std::io;
use std::path::PathBuf;

use cdd_core::{
    DetectStats, DupDetector, default_ignore_dirs, insert_duplicate_markers, list_source_files,
    sort_match_sets, write_text_report,
};

mod args;
mod json;

use args::{Command, HELP_TEXT, ParsedArgs, parse_args};
use json::{JsonDetectStats, map_match_sets, write_json};

fn format_detect_stats(stats: &DetectStats) -> String {
    let mut out = String::new();
    out.push_str("== detect stats ==\n");
    out.push_str(&format!(
        "candidates={} scanned={} tokens={} windows={}\n",
        stats.candidate_files, stats.scanned_files, stats.scanned_tokens, stats.windows_indexed
    ));
    out.push_str(&format!(
        "checked={} accepted={}\n",
        stats.candidates_checked, stats.matches_accepted
    ));

    let mut skips: Vec<(&str, u64)> = vec![
        ("unreadable", stats.skipped_unreadable),
        ("unsupported", stats.skipped_unsupported),
        ("capped_files", stats.capped_files),
    ];
    skips.retain(|(_, v)| *v > 0);
    if !skips.is_empty() {
        out.push_str("skipped:\n");
        for (k, v) in skips {
            out.push_str(&format!("- {k}={v}\n"));
        }
    }
    out.push('\n');
    out
}

fn main() {
    env_logger::init();

    let argv: Vec<String> = env::args().skip(1).collect();
    let parsed = match parse_args(&argv) {
        Ok(Command::Help) => {
            print!("{HELP_TEXT}");
            return;
        }
        Ok(Command::Version) => {
            println!("cdd {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Ok(Command::Run(parsed)) => parsed,
        Err(message) => {
            eprintln!("Error: {message}\n");
            print!("{HELP_TEXT}");
            std::process::exit(2);
        }
    };

    let detector = match DupDetector::new(parsed.options.clone()) {
        Ok(detector) => detector,
        Err(err) => {
            eprintln!("Error: {err}\n");
            print!("{HELP_TEXT}");
            std::process::exit(2);
        }
    };

    match run(&parsed, &detector) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(parsed: &ParsedArgs, detector: &DupDetector) -> io::Result<()> {
    let mut ignore_dirs: HashSet<String> = default_ignore_dirs();
    ignore_dirs.extend(parsed.ignore_dirs.iter().cloned());

    let files = list_source_files(
        &parsed.roots,
        detector.registry(),
        parsed.respect_gitignore,
        &ignore_dirs,
    )?;

    let outcome = detector.run(&files);
    let mut sets = outcome.result;
    sort_match_sets(&mut sets);

    if parsed.json {
        let json_sets = map_match_sets(&sets);
        if parsed.stats {
            write_json(&serde_json::json!({
                "matchSets": json_sets,
                "detectStats": JsonDetectStats::from(outcome.stats.clone()),
            }))?;
        } else {
            write_json(&json_sets)?;
        }
    } else {
        let stdout = io::stdout();
        write_text_report(&mut stdout.lock(), &sets)?;
        if parsed.stats {
            eprint!("{}", format_detect_stats(&outcome.stats));
        }
    }

    if parsed.insert_comments {
        let strip_prefix: PathBuf = parsed.roots.first().cloned().unwrap_or_default();
        let inserted = insert_duplicate_markers(&sets, &strip_prefix)?;
        log::info!("inserted {inserted} duplicate markers");
    }

    Ok(())
}
