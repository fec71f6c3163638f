//! Source path to output path mapping.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathMapError {
    #[error("{path} is not inside source root {root}")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{path} does not have the .{expected} extension")]
    ExtensionMismatch { path: PathBuf, expected: String },
}

/// Maps files under a source root to files under an output root.
///
/// `docs/a/b.md` under source root `docs` and output root `site` becomes
/// `site/a/b.html`. Only the final extension is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    source_root: PathBuf,
    output_root: PathBuf,
    source_ext: String,
    output_ext: String,
}

impl PathMapper {
    pub fn new(
        source_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        source_ext: &str,
        output_ext: &str,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            output_root: output_root.into(),
            source_ext: normalize_ext(source_ext),
            output_ext: normalize_ext(output_ext),
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn source_ext(&self) -> &str {
        &self.source_ext
    }

    /// True when the path carries the source extension
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(&self.source_ext))
    }

    /// Destination for `source`.
    pub fn map(&self, source: &Path) -> Result<PathBuf, PathMapError> {
        let relative = self.relative(source)?;

        if !self.is_source_file(relative) {
            return Err(PathMapError::ExtensionMismatch {
                path: source.to_path_buf(),
                expected: self.source_ext.clone(),
            });
        }

        Ok(self
            .output_root
            .join(relative)
            .with_extension(&self.output_ext))
    }

    /// `source` relative to the source root, compared component-wise.
    pub fn relative<'a>(&self, source: &'a Path) -> Result<&'a Path, PathMapError> {
        source
            .strip_prefix(&self.source_root)
            .ok()
            .filter(|rel| rel.file_name().is_some())
            .ok_or_else(|| PathMapError::OutsideRoot {
                path: source.to_path_buf(),
                root: self.source_root.clone(),
            })
    }
}

/// Map a single path without building a [`PathMapper`].
pub fn map_path(
    source: &Path,
    source_root: &Path,
    output_root: &Path,
    source_ext: &str,
    output_ext: &str,
) -> Result<PathBuf, PathMapError> {
    PathMapper::new(source_root, output_root, source_ext, output_ext).map(source)
}

fn normalize_ext(ext: &str) -> String {
    ext.trim_start_matches('.').to_string()
}
