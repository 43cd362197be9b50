use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::PathBuf;

use ignore::WalkBuilder;

use crate::lexer::TokenizerRegistry;

pub fn default_ignore_dirs() -> HashSet<String> {
    [
        ".git", ".hg", ".svn", "node_modules", "target", "dist", "build", "out", ".cache",
        ".venv", "vendor",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn validate_roots(roots: &[PathBuf]) -> io::Result<()> {
    for root in roots {
        let meta = fs::metadata(root)
            .map_err(|err| io::Error::new(err.kind(), format!("root {}: {err}", root.display())))?;
        if !meta.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("root {} is not a directory", root.display()),
            ));
        }
    }
    Ok(())
}

/// Walk `roots` and collect the files the registry can tokenize, sorted
/// for a stable default scan order. Walk errors on individual entries are
/// logged and skipped; duplicate detection itself is order-independent.
pub fn list_source_files(
    roots: &[PathBuf],
    registry: &TokenizerRegistry,
    respect_gitignore: bool,
    ignore_dirs: &HashSet<String>,
) -> io::Result<Vec<PathBuf>> {
    validate_roots(roots)?;

    let mut files = Vec::new();
    for root in roots {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .follow_links(false)
            .ignore(false)
            .git_ignore(respect_gitignore)
            .git_global(false)
            .git_exclude(respect_gitignore)
            .parents(false)
            .require_git(false);

        let ignore_dirs = ignore_dirs.clone();
        let walker = builder
            .filter_entry(move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                if !is_dir {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !ignore_dirs.contains(name))
            })
            .build();

        for result in walker {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    log::warn!("walk error under {}: {err}", root.display());
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }
            let path = entry.into_path();
            if registry.supports(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_supported_files() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.c"), "int a;\n")?;
        fs::write(dir.path().join("b.py"), "x = 1\n")?;
        fs::write(dir.path().join("notes.txt"), "plain text\n")?;
        fs::create_dir(dir.path().join("node_modules"))?;
        fs::write(dir.path().join("node_modules").join("dep.js"), "var x;\n")?;

        let registry = TokenizerRegistry::with_default_languages();
        let files = list_source_files(
            &[dir.path().to_path_buf()],
            &registry,
            true,
            &default_ignore_dirs(),
        )?;

        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.c", "b.py"]);
        Ok(())
    }

    #[test]
    fn respects_gitignore_when_enabled() -> io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(".gitignore"), "generated.c\n")?;
        fs::write(dir.path().join("kept.c"), "int a;\n")?;
        fs::write(dir.path().join("generated.c"), "int b;\n")?;

        let registry = TokenizerRegistry::with_default_languages();
        let roots = [dir.path().to_path_buf()];

        let filtered = list_source_files(&roots, &registry, true, &default_ignore_dirs())?;
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].ends_with("kept.c"));

        let unfiltered = list_source_files(&roots, &registry, false, &default_ignore_dirs())?;
        assert_eq!(unfiltered.len(), 2);
        Ok(())
    }

    #[test]
    fn missing_root_is_an_error() {
        let registry = TokenizerRegistry::with_default_languages();
        let err = list_source_files(
            &[PathBuf::from("/definitely/not/here")],
            &registry,
            true,
            &default_ignore_dirs(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
