//! Compiled-bytecode artifact lookup
//!
//! A lookup is keyed by class name and yields hex-encoded bytecode. Every
//! failure is an `ArtifactError`; callers treat it as a recoverable miss.

use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::{Error, Result};

/// Keyed source of compiled contract code
pub trait ArtifactStore {
    /// Hex-encoded bytecode for `class_name`
    fn code_hex(&self, class_name: &str) -> Result<String>;
}

/// Reads `<build_dir>/<Name>.compiled.json` and takes its `"hex"` field
#[derive(Debug, Clone)]
pub struct BuildDirArtifacts {
    build_dir: PathBuf,
}

impl BuildDirArtifacts {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        BuildDirArtifacts {
            build_dir: build_dir.into(),
        }
    }

    pub fn artifact_path(&self, class_name: &str) -> PathBuf {
        self.build_dir.join(format!("{}.compiled.json", class_name))
    }
}

impl ArtifactStore for BuildDirArtifacts {
    fn code_hex(&self, class_name: &str) -> Result<String> {
        let path = self.artifact_path(class_name);
        debug!(path = %path.display(), "reading compiled artifact");

        let text = fs::read_to_string(&path)
            .map_err(|e| Error::ArtifactError(format!("{}: {}", path.display(), e)))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| Error::ArtifactError(format!("{}: {}", path.display(), e)))?;
        let code = json
            .get("hex")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::ArtifactError(format!("{}: missing \"hex\" field", path.display())))?;

        hex::decode(code)
            .map_err(|e| Error::ArtifactError(format!("{}: {}", path.display(), e)))?;
        Ok(code.to_string())
    }
}
