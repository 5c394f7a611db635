//! Recursive repository walk. Grounded on the teacher's workspace
//! dependency on `ignore`/`globset` (declared in the root `Cargo.toml` but
//! unused by any teacher module) — this is the first real use of either.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

/// Directories skipped unconditionally, regardless of `.gitignore` state —
/// these are virtually never source of record and walking them wastes
/// most of a scan's wall-clock on large repos.
const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "env",
    "dist",
    "build",
    "target",
    "__pycache__",
    ".tox",
];

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

pub struct Walker {
    root: PathBuf,
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>, options: &WalkOptions) -> Self {
        let include = if options.include.is_empty() {
            None
        } else {
            Some(build_glob_set(&options.include))
        };
        let exclude = build_glob_set(&options.exclude);
        Walker {
            root: root.into(),
            include,
            exclude,
        }
    }

    /// Walk the repository, yielding `(relative_path, bytes)` for every
    /// file that survives the default skip-set and the configured
    /// include/exclude globs. Binary/non-UTF8 files are still yielded —
    /// it's up to a parser's `can_parse` to decide whether it cares.
    pub fn walk(&self) -> Vec<(PathBuf, Vec<u8>)> {
        let mut out = Vec::new();
        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(false).git_ignore(true).git_exclude(true);

        for entry in builder.build() {
            let Ok(entry) = entry else { continue };
            let path = entry.path();

            if path == self.root {
                continue;
            }
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            if self.in_default_skip_dir(path) {
                continue;
            }

            let relative = path.strip_prefix(&self.root).unwrap_or(path).to_path_buf();

            if self.exclude.is_match(&relative) {
                continue;
            }
            if let Some(include) = &self.include {
                if !include.is_match(&relative) {
                    continue;
                }
            }

            let Ok(bytes) = std::fs::read(path) else { continue };
            out.push((relative, bytes));
        }

        out
    }

    fn in_default_skip_dir(&self, path: &Path) -> bool {
        path.components().any(|c| {
            let s = c.as_os_str().to_string_lossy();
            DEFAULT_SKIP_DIRS.contains(&s.as_ref())
        })
    }
}

fn build_glob_set(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSetBuilder::new().build().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn skips_default_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/pkg.js"), b"x").unwrap();
        fs::write(dir.path().join("app.py"), b"print(1)").unwrap();

        let walker = Walker::new(dir.path(), &WalkOptions::default());
        let files: Vec<_> = walker.walk().into_iter().map(|(p, _)| p).collect();

        assert!(files.iter().any(|p| p == Path::new("app.py")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("node_modules")));
    }

    #[test]
    fn include_glob_restricts_to_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), b"x").unwrap();
        fs::write(dir.path().join("main.go"), b"x").unwrap();

        let options = WalkOptions {
            include: vec!["*.py".to_string()],
            exclude: vec![],
        };
        let walker = Walker::new(dir.path(), &options);
        let files: Vec<_> = walker.walk().into_iter().map(|(p, _)| p).collect();

        assert_eq!(files, vec![PathBuf::from("app.py")]);
    }

    #[test]
    fn exclude_glob_removes_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.py"), b"x").unwrap();
        fs::write(dir.path().join("app_test.py"), b"x").unwrap();

        let options = WalkOptions {
            include: vec![],
            exclude: vec!["*_test.py".to_string()],
        };
        let walker = Walker::new(dir.path(), &options);
        let files: Vec<_> = walker.walk().into_iter().map(|(p, _)| p).collect();

        assert_eq!(files, vec![PathBuf::from("app.py")]);
    }
}
