//! Import closure resolution
//!
//! Computes the set of source files reachable from entry wrappers through
//! import statements, i.e. what must be copied along with a wrapper.
//!
//! Specifiers resolve against the importing file's directory with `.ts`
//! appended. Candidates that do not exist (package imports, assets) are
//! skipped silently. One visited set is shared by all entries of a call,
//! so cyclic imports terminate.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, trace};

use crate::parser;
use crate::{Error, Result};

/// How many imports of one file are followed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClosureMode {
    /// Stop at the first import of a file that exists on disk
    #[default]
    FirstResolved,
    /// Follow every import that exists on disk
    Exhaustive,
}

#[derive(Debug, Clone)]
pub struct ImportResolver {
    base_dir: PathBuf,
    mode: ClosureMode,
}

impl ImportResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        ImportResolver {
            base_dir: base_dir.into(),
            mode: ClosureMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ClosureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Closure of a single entry file, the entry included
    pub fn closure(&self, entry: &Path) -> Result<BTreeSet<PathBuf>> {
        self.closure_of_list(std::slice::from_ref(&entry.to_path_buf()))
    }

    /// Union of the closures of every entry, sharing one visited set
    pub fn closure_of_list(&self, entries: &[PathBuf]) -> Result<BTreeSet<PathBuf>> {
        let mut visited = BTreeSet::new();
        for entry in entries {
            let entry = normalize(&self.base_dir.join(entry));
            self.visit(&entry, &mut visited)?;
        }
        debug!(entries = entries.len(), files = visited.len(), "import closure computed");
        Ok(visited)
    }

    fn visit(&self, file: &Path, visited: &mut BTreeSet<PathBuf>) -> Result<()> {
        if !visited.insert(file.to_path_buf()) {
            return Ok(());
        }

        let text = fs::read_to_string(file).map_err(|e| Error::io(file, e))?;
        let specifiers = parser::parse_imports(&text)
            .map_err(|e| match e {
                Error::ParseError(msg) => Error::ParseError(format!("{}: {}", file.display(), msg)),
                other => other,
            })?;

        for specifier in specifiers {
            let path = candidate(file, &specifier);
            if !path.is_file() {
                trace!(specifier = %specifier, candidate = %path.display(), "import not on disk, skipped");
                continue;
            }
            self.visit(&path, visited)?;
            if self.mode == ClosureMode::FirstResolved {
                break;
            }
        }
        Ok(())
    }
}

/// `dir(file) / specifier`, plus `.ts` when missing. `file` is already
/// rooted at the base directory.
pub fn candidate(file: &Path, specifier: &str) -> PathBuf {
    let dir = file.parent().unwrap_or_else(|| Path::new(""));
    let target = if specifier.ends_with(".ts") {
        specifier.to_string()
    } else {
        format!("{}.ts", specifier)
    };
    normalize(&dir.join(target))
}

/// Fold `.` and `..` components without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_))) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
