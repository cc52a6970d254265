//! Project layout configuration
//!
//! Locates wrapper sources, compiled artifacts and generated output
//! relative to a project root.

use std::path::{Path, PathBuf};

pub const DEFAULT_WRAPPERS_DIR: &str = "wrappers";
pub const DEFAULT_BUILD_DIR: &str = "build";
pub const DEFAULT_OUTPUT_DIR: &str = "dapp/public";

/// Schema artifact file name inside the output directory
pub const WRAPPERS_FILE: &str = "wrappers.json";
/// Display overlay file name inside the output directory
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub wrappers_dir: PathBuf,
    pub build_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl ProjectLayout {
    /// Conventional layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        ProjectLayout {
            wrappers_dir: root.join(DEFAULT_WRAPPERS_DIR),
            build_dir: root.join(DEFAULT_BUILD_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            root,
        }
    }

    /// Override a directory; relative paths are taken from the root
    pub fn with_wrappers_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.wrappers_dir = self.root.join(dir);
        self
    }

    pub fn with_build_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.build_dir = self.root.join(dir);
        self
    }

    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = self.root.join(dir);
        self
    }

    pub fn wrappers_file(&self) -> PathBuf {
        self.output_dir.join(WRAPPERS_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.output_dir.join(CONFIG_FILE)
    }

    /// `./`-prefixed path of `file` relative to the root, `/`-separated.
    /// Files outside the root keep their full path.
    pub fn display_path(&self, file: &Path) -> String {
        match file.strip_prefix(&self.root) {
            Ok(relative) => {
                let parts: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("./{}", parts.join("/"))
            }
            Err(_) => file.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = ProjectLayout::new("/proj");
        assert_eq!(layout.wrappers_dir, PathBuf::from("/proj/wrappers"));
        assert_eq!(layout.build_dir, PathBuf::from("/proj/build"));
        assert_eq!(layout.wrappers_file(), PathBuf::from("/proj/dapp/public/wrappers.json"));
        assert_eq!(layout.config_file(), PathBuf::from("/proj/dapp/public/config.json"));
    }

    #[test]
    fn test_overrides_relative_and_absolute() {
        let layout = ProjectLayout::new("/proj")
            .with_wrappers_dir("src/wrappers")
            .with_output_dir("/tmp/out");
        assert_eq!(layout.wrappers_dir, PathBuf::from("/proj/src/wrappers"));
        assert_eq!(layout.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_display_path() {
        let layout = ProjectLayout::new("/proj");
        assert_eq!(layout.display_path(Path::new("/proj/wrappers/Counter.ts")), "./wrappers/Counter.ts");
        assert_eq!(layout.display_path(Path::new("/elsewhere/A.ts")), "/elsewhere/A.ts");
    }
}
