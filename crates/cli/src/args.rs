use std::env;
use std::path::PathBuf;

use cdd_core::DetectOptions;

pub(crate) const HELP_TEXT: &str = concat!(
    "cdd (token-based code duplication detector)\n",
    "\n",
    "Usage:\n",
    "  cdd [options] [root ...]\n",
    "\n",
    "Options:\n",
    "  --chunk <n>             Minimum duplicate length in tokens (default: 100)\n",
    "  --min-lines <n>         Minimum duplicate length in lines (default: 3)\n",
    "  --fuzzy                 Ignore identifier and literal spelling when matching\n",
    "  --max-file-matches <n>  Stop scanning a file after n accepted matches (default: 50)\n",
    "  --insert-comments       Rewrite matched files with duplicate marker comments\n",
    "  --json                  Output JSON\n",
    "  --stats                 Include detect stats (JSON) or print to stderr\n",
    "  --no-gitignore          Do not respect .gitignore rules\n",
    "  --gitignore             Respect .gitignore rules (default: on)\n",
    "  --ignore-dir <name>     Add an ignored directory name (repeatable)\n",
    "  -V, --version           Show version\n",
    "  -h, --help              Show help\n",
    "\n",
    "Examples:\n",
    "  cdd .\n",
    "  cdd --fuzzy --min-lines 5 src\n",
    "  cdd --ignore-dir vendor --ignore-dir .venv .\n",
    "\n"
);

#[derive(Debug, Clone)]
pub(crate) enum Command {
    Help,
    Version,
    Run(ParsedArgs),
}

#[derive(Debug, Clone)]
pub(crate) struct ParsedArgs {
    pub(crate) json: bool,
    pub(crate) stats: bool,
    pub(crate) insert_comments: bool,
    pub(crate) respect_gitignore: bool,
    pub(crate) ignore_dirs: Vec<String>,
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) options: DetectOptions,
}

fn parse_usize_min(name: &str, raw: &str, min: usize) -> Result<usize, String> {
    let value = raw
        .parse::<usize>()
        .map_err(|_| format!("{name} must be an integer"))?;
    if value < min {
        return Err(format!("{name} must be at least {min}"));
    }
    Ok(value)
}

fn parse_u32_min(name: &str, raw: &str, min: u32) -> Result<u32, String> {
    let value = raw
        .parse::<u32>()
        .map_err(|_| format!("{name} must be an integer"))?;
    if value < min {
        return Err(format!("{name} must be at least {min}"));
    }
    Ok(value)
}

pub(crate) fn parse_args(argv: &[String]) -> Result<Command, String> {
    let mut roots: Vec<PathBuf> = Vec::new();
    let mut ignore_dirs: Vec<String> = Vec::new();
    let mut json = false;
    let mut stats = false;
    let mut fuzzy = false;
    let mut insert_comments = false;
    let mut respect_gitignore = true;
    let mut chunk: Option<usize> = None;
    let mut min_lines: Option<u32> = None;
    let mut max_file_matches: Option<usize> = None;

    let mut i = 0;
    while i < argv.len() {
        let arg = &argv[i];
        if arg == "--" {
            roots.extend(argv[(i + 1)..].iter().map(PathBuf::from));
            break;
        }
        if arg == "-h" || arg == "--help" {
            return Ok(Command::Help);
        }
        if arg == "-V" || arg == "--version" {
            return Ok(Command::Version);
        }
        if arg == "--json" {
            json = true;
            i += 1;
            continue;
        }
        if arg == "--stats" {
            stats = true;
            i += 1;
            continue;
        }
        if arg == "--fuzzy" {
            fuzzy = true;
            i += 1;
            continue;
        }
        if arg == "--insert-comments" {
            insert_comments = true;
            i += 1;
            continue;
        }
        if arg == "--no-gitignore" {
            respect_gitignore = false;
            i += 1;
            continue;
        }
        if arg == "--gitignore" {
            respect_gitignore = true;
            i += 1;
            continue;
        }
        if arg == "--chunk" {
            let raw = argv.get(i + 1).ok_or("--chunk requires a value")?;
            chunk = Some(parse_usize_min("--chunk", raw, 2)?);
            i += 2;
            continue;
        }
        if arg == "--min-lines" {
            let raw = argv.get(i + 1).ok_or("--min-lines requires a value")?;
            min_lines = Some(parse_u32_min("--min-lines", raw, 1)?);
            i += 2;
            continue;
        }
        if arg == "--max-file-matches" {
            let raw = argv
                .get(i + 1)
                .ok_or("--max-file-matches requires a value")?;
            max_file_matches = Some(parse_usize_min("--max-file-matches", raw, 1)?);
            i += 2;
            continue;
        }
        if arg == "--ignore-dir" {
            let value = argv.get(i + 1).ok_or("--ignore-dir requires a value")?;
            ignore_dirs.push(value.to_string());
            i += 2;
            continue;
        }
        if arg.starts_with('-') {
            return Err(format!("Unknown option: {arg}"));
        }
        roots.push(PathBuf::from(arg));
        i += 1;
    }

    let mut options = DetectOptions {
        fuzzy,
        ..DetectOptions::default()
    };
    if let Some(chunk) = chunk {
        options.chunk = chunk;
    }
    if let Some(min_lines) = min_lines {
        options.min_lines = min_lines;
    }
    if let Some(max_file_matches) = max_file_matches {
        options.max_file_matches = max_file_matches;
    }

    let roots = if roots.is_empty() {
        vec![env::current_dir().map_err(|e| format!("failed to get cwd: {e}"))?]
    } else {
        roots
    };

    Ok(Command::Run(ParsedArgs {
        json,
        stats,
        insert_comments,
        respect_gitignore,
        ignore_dirs,
        roots,
        options,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn parse_run(args: &[&str]) -> ParsedArgs {
        match parse_args(&argv(args)).unwrap() {
            Command::Run(parsed) => parsed,
            other => panic!("expected a run command, got {other:?}"),
        }
    }

    #[test]
    fn flags_and_roots_parse() {
        let parsed = parse_run(&["--chunk", "40", "--min-lines", "5", "--fuzzy", "src"]);
        assert_eq!(parsed.options.chunk, 40);
        assert_eq!(parsed.options.min_lines, 5);
        assert!(parsed.options.fuzzy);
        assert_eq!(parsed.roots, vec![PathBuf::from("src")]);
        assert!(parsed.respect_gitignore);
    }

    #[test]
    fn ignore_dir_is_repeatable() {
        let parsed = parse_run(&["--ignore-dir", "vendor", "--ignore-dir", ".venv", "."]);
        assert_eq!(parsed.ignore_dirs, vec!["vendor", ".venv"]);
    }

    #[test]
    fn help_wins_over_other_arguments() {
        assert!(matches!(
            parse_args(&argv(&["--chunk", "40", "-h"])).unwrap(),
            Command::Help
        ));
    }

    #[test]
    fn unknown_option_is_rejected() {
        let err = parse_args(&argv(&["--bogus"])).unwrap_err();
        assert!(err.contains("Unknown option"));
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = parse_args(&argv(&["--chunk"])).unwrap_err();
        assert!(err.contains("requires a value"));
    }

    #[test]
    fn chunk_below_minimum_is_rejected() {
        let err = parse_args(&argv(&["--chunk", "1"])).unwrap_err();
        assert!(err.contains("at least 2"));
    }

    #[test]
    fn double_dash_ends_option_parsing() {
        let parsed = parse_run(&["--", "--fuzzy"]);
        assert!(!parsed.options.fuzzy);
        assert_eq!(parsed.roots, vec![PathBuf::from("--fuzzy")]);
    }
}
