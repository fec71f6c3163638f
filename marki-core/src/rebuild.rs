//! Full rebuilds of an output directory from a tree of Markdown files.

use crate::converter::{ConvertError, ConvertOptions, DocumentConverter, WriteError};
use crate::paths::PathMapper;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// What to do when a single document fails to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the failure, keep building the remaining documents
    #[default]
    Continue,
    /// Stop at the first failure
    Abort,
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("refusing to overwrite source {path} with its own output")]
    SameFile { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// A document that could not be built
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: FileError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

#[derive(Error, Debug)]
pub enum RebuildError {
    #[error("input directory {path} does not exist")]
    MissingInput { path: PathBuf },

    #[error("output directory {output} contains the input directory {input}")]
    OverlappingRoots { input: PathBuf, output: PathBuf },

    #[error("failed to prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clear {path}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "{failed} of {total} documents failed to build",
        failed = .failures.len(),
        total = .failures.len() + .written
    )]
    Partial {
        failures: Vec<FileFailure>,
        written: usize,
    },
}

impl RebuildError {
    /// Per-document failures, empty for rebuild-level errors
    pub fn failures(&self) -> &[FileFailure] {
        match self {
            RebuildError::Partial { failures, .. } => failures,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct RebuildOptions {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub source_ext: String,
    pub output_ext: String,
    pub convert: ConvertOptions,
    pub failure_policy: FailurePolicy,
}

impl RebuildOptions {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            source_ext: "md".to_string(),
            output_ext: "html".to_string(),
            convert: ConvertOptions::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Summary of a successful rebuild
#[derive(Debug, Clone, Default)]
pub struct RebuildReport {
    /// Files written, in walk order
    pub written: Vec<PathBuf>,
    /// Non-source files seen under the input root
    pub skipped: usize,
    /// Files removed from the output root before building
    pub cleared: usize,
}

/// Clears the output root and rebuilds it from every source file.
pub struct SiteRebuilder {
    converter: DocumentConverter,
    failure_policy: FailurePolicy,
}

impl SiteRebuilder {
    /// Resolve both roots and check they are safe to use together.
    ///
    /// The output root is created if missing. An output root that equals or
    /// contains the input root is rejected, since clearing it would delete
    /// the sources.
    pub fn new(options: RebuildOptions) -> Result<Self, RebuildError> {
        let input_root = options
            .input_root
            .canonicalize()
            .ok()
            .filter(|p| p.is_dir())
            .ok_or_else(|| RebuildError::MissingInput {
                path: options.input_root.clone(),
            })?;

        fs::create_dir_all(&options.output_root).map_err(|e| RebuildError::Output {
            path: options.output_root.clone(),
            source: e,
        })?;
        let output_root = options
            .output_root
            .canonicalize()
            .map_err(|e| RebuildError::Output {
                path: options.output_root.clone(),
                source: e,
            })?;

        if input_root.starts_with(&output_root) {
            return Err(RebuildError::OverlappingRoots {
                input: input_root,
                output: output_root,
            });
        }

        let mapper = PathMapper::new(
            input_root,
            output_root,
            &options.source_ext,
            &options.output_ext,
        );

        Ok(Self {
            converter: DocumentConverter::new(mapper, options.convert),
            failure_policy: options.failure_policy,
        })
    }

    pub fn input_root(&self) -> &Path {
        self.converter.mapper().source_root()
    }

    pub fn output_root(&self) -> &Path {
        self.converter.mapper().output_root()
    }

    /// Clear the output root, then convert and write every source file.
    pub fn rebuild(&self) -> Result<RebuildReport, RebuildError> {
        let input_root = self.input_root();
        let output_root = self.output_root();

        if !input_root.is_dir() {
            return Err(RebuildError::MissingInput {
                path: input_root.to_path_buf(),
            });
        }
        fs::create_dir_all(output_root).map_err(|e| RebuildError::Output {
            path: output_root.to_path_buf(),
            source: e,
        })?;

        tracing::info!("Rebuilding {:?} -> {:?}", input_root, output_root);

        let mut report = RebuildReport {
            cleared: self.clear_output()?,
            ..RebuildReport::default()
        };
        let mut failures = Vec::new();

        let walker = WalkDir::new(input_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !e.path().starts_with(output_root));

        for entry in walker {
            let outcome = match entry {
                Ok(entry) if entry.file_type().is_dir() => continue,
                Ok(entry) if !self.converter.mapper().is_source_file(entry.path()) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(entry) => self
                    .build_document(entry.path())
                    .map_err(|error| FileFailure {
                        path: entry.path().to_path_buf(),
                        error,
                    }),
                Err(err) => Err(FileFailure {
                    path: err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| input_root.to_path_buf()),
                    error: FileError::Walk {
                        path: input_root.to_path_buf(),
                        source: err,
                    },
                }),
            };

            match outcome {
                Ok(written) => {
                    tracing::debug!("Wrote {:?}", written);
                    report.written.push(written);
                }
                Err(failure) => {
                    tracing::warn!("{}", failure);
                    failures.push(failure);
                    if self.failure_policy == FailurePolicy::Abort {
                        break;
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Err(RebuildError::Partial {
                written: report.written.len(),
                failures,
            });
        }

        tracing::info!(
            "Built {} documents ({} other files skipped, {} stale files cleared)",
            report.written.len(),
            report.skipped,
            report.cleared
        );

        Ok(report)
    }

    fn build_document(&self, source: &Path) -> Result<PathBuf, FileError> {
        let document = self.converter.convert(source)?;
        document.write()?;
        Ok(document.save_to_path)
    }

    /// Remove every non-directory entry under the output root.
    ///
    /// Directories are left in place. A failure part way through leaves the
    /// output root partially cleared.
    fn clear_output(&self) -> Result<usize, RebuildError> {
        self.clear_output_with(|path| fs::remove_file(path))
    }

    fn clear_output_with<F>(&self, mut remove: F) -> Result<usize, RebuildError>
    where
        F: FnMut(&Path) -> std::io::Result<()>,
    {
        let output_root = self.output_root();
        let mut stale = Vec::new();

        for entry in WalkDir::new(output_root).min_depth(1) {
            let entry = entry.map_err(|e| RebuildError::Cleanup {
                path: e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| output_root.to_path_buf()),
                source: e.into(),
            })?;
            if !entry.file_type().is_dir() {
                stale.push(entry.into_path());
            }
        }

        for path in &stale {
            remove(path).map_err(|e| RebuildError::Cleanup {
                path: path.clone(),
                source: e,
            })?;
        }

        Ok(stale.len())
    }
}

/// Convert one Markdown file to an explicit destination file.
///
/// `source` must carry `source_ext`. The destination may not be the source
/// itself.
pub fn convert_single(
    source: &Path,
    destination: &Path,
    source_ext: &str,
    options: ConvertOptions,
) -> Result<PathBuf, FileError> {
    let source = source.canonicalize().map_err(|e| FileError::Source {
        path: source.to_path_buf(),
        source: e,
    })?;
    if let Ok(existing) = destination.canonicalize() {
        if existing == source {
            return Err(FileError::SameFile { path: source });
        }
    }

    let source_root = source.parent().unwrap_or(Path::new("/"));
    let output_ext = destination
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mapper = PathMapper::new(
        source_root,
        destination.parent().unwrap_or(Path::new(".")),
        source_ext,
        &output_ext,
    );

    let document = DocumentConverter::new(mapper, options).convert_to(&source, destination)?;
    document.write()?;
    tracing::info!("Wrote {:?}", document.save_to_path);
    Ok(document.save_to_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::PathMapError;
    use tempfile::tempdir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_rejects_missing_input() {
        let dir = tempdir().unwrap();
        let result = SiteRebuilder::new(RebuildOptions::new(
            dir.path().join("nope"),
            dir.path().join("out"),
        ));
        assert!(matches!(result, Err(RebuildError::MissingInput { .. })));
    }

    #[test]
    fn test_rejects_output_containing_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("site/src");
        fs::create_dir_all(&input).unwrap();

        let same = SiteRebuilder::new(RebuildOptions::new(&input, &input));
        assert!(matches!(same, Err(RebuildError::OverlappingRoots { .. })));

        let parent = SiteRebuilder::new(RebuildOptions::new(&input, dir.path().join("site")));
        assert!(matches!(parent, Err(RebuildError::OverlappingRoots { .. })));
    }

    #[test]
    fn test_creates_output_root() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("in/a.md"), "# A\n");

        let rebuilder =
            SiteRebuilder::new(RebuildOptions::new(dir.path().join("in"), dir.path().join("out")))
                .unwrap();
        let report = rebuilder.rebuild().unwrap();

        assert_eq!(report.written.len(), 1);
        assert!(dir.path().join("out/a.html").is_file());
    }

    #[test]
    fn test_clear_keeps_directories() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("in/a.md"), "# A\n");
        write(&dir.path().join("out/assets/old.css"), "body {}");
        fs::create_dir_all(dir.path().join("out/empty")).unwrap();

        let rebuilder =
            SiteRebuilder::new(RebuildOptions::new(dir.path().join("in"), dir.path().join("out")))
                .unwrap();
        let report = rebuilder.rebuild().unwrap();

        assert_eq!(report.cleared, 1);
        assert!(!dir.path().join("out/assets/old.css").exists());
        assert!(dir.path().join("out/assets").is_dir());
        assert!(dir.path().join("out/empty").is_dir());
    }

    #[test]
    fn test_nested_output_is_not_walked() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in");
        write(&input.join("a.md"), "# A\n");

        let rebuilder =
            SiteRebuilder::new(RebuildOptions::new(&input, input.join("_site"))).unwrap();
        rebuilder.rebuild().unwrap();
        let report = rebuilder.rebuild().unwrap();

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.skipped, 0);
        assert!(input.join("_site/a.html").is_file());
    }

    #[test]
    fn test_abort_policy_stops_at_first_failure() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("in/a.md"), "---\ntitle: [broken\n---\n");
        write(&dir.path().join("in/b.md"), "---\ntitle: [broken\n---\n");
        write(&dir.path().join("in/c.md"), "# fine\n");

        let mut options = RebuildOptions::new(dir.path().join("in"), dir.path().join("out"));
        options.failure_policy = FailurePolicy::Abort;
        let err = SiteRebuilder::new(options).unwrap().rebuild().unwrap_err();

        assert_eq!(err.failures().len(), 1);
        assert!(!dir.path().join("out/c.html").exists());
    }

    #[test]
    fn test_convert_single() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("README.md"), "---\ntitle: Readme\n---\nHello\n");

        let dest = dir.path().join("public/readme.html");
        let written = convert_single(
            &dir.path().join("README.md"),
            &dest,
            "md",
            ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(written, dest);
        let html = fs::read_to_string(&dest).unwrap();
        assert!(html.contains("name=\"title\" content=\"Readme\""));
    }

    #[test]
    fn test_convert_single_refuses_to_overwrite_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.md");
        write(&source, "# keep me\n");

        let err = convert_single(&source, &source, "md", ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, FileError::SameFile { .. }));

        let spelled = dir.path().join(".").join("a.md");
        let err = convert_single(&source, &spelled, "md", ConvertOptions::default()).unwrap_err();
        assert!(matches!(err, FileError::SameFile { .. }));

        assert_eq!(fs::read_to_string(&source).unwrap(), "# keep me\n");
    }

    #[test]
    fn test_convert_single_uses_configured_extension() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("page.markdown"), "# Page\n");
        write(&dir.path().join("page.md"), "# Page\n");

        convert_single(
            &dir.path().join("page.markdown"),
            &dir.path().join("out/page.html"),
            "markdown",
            ConvertOptions::default(),
        )
        .unwrap();
        assert!(dir.path().join("out/page.html").is_file());

        let err = convert_single(
            &dir.path().join("page.md"),
            &dir.path().join("out/other.html"),
            "markdown",
            ConvertOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FileError::Convert(ConvertError::Path(PathMapError::ExtensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_convert_single_marker_ignores_path_spelling() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("docs/a.md"), "---\ntitle: A\n---\n");

        let direct = dir.path().join("docs/a.md");
        let roundabout = dir.path().join("docs/../docs/./a.md");
        for (source, dest) in [(&direct, "one.html"), (&roundabout, "two.html")] {
            convert_single(source, &dir.path().join(dest), "md", ConvertOptions::default())
                .unwrap();
        }

        assert_eq!(
            fs::read_to_string(dir.path().join("one.html")).unwrap(),
            fs::read_to_string(dir.path().join("two.html")).unwrap()
        );
    }

    #[test]
    fn test_cleanup_failure_aborts_rebuild() {
        let dir = tempdir().unwrap();
        write(&dir.path().join("in/a.md"), "# A\n");
        write(&dir.path().join("out/keep/stale.html"), "old");
        write(&dir.path().join("out/other.html"), "old");

        let rebuilder =
            SiteRebuilder::new(RebuildOptions::new(dir.path().join("in"), dir.path().join("out")))
                .unwrap();
        let err = rebuilder
            .clear_output_with(|path| {
                if path.ends_with("keep/stale.html") {
                    Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
                } else {
                    fs::remove_file(path)
                }
            })
            .unwrap_err();

        match err {
            RebuildError::Cleanup { path, .. } => assert!(path.ends_with("keep/stale.html")),
            other => panic!("expected cleanup error, got {other:?}"),
        }
        assert!(dir.path().join("out/keep/stale.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unremovable_stale_file_is_cleanup_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        write(&dir.path().join("in/a.md"), "# A\n");
        let locked = dir.path().join("out/locked");
        write(&locked.join("stale.html"), "old");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // privileged users can still delete inside a read-only directory
        if fs::write(locked.join("write-check"), "").is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let rebuilder =
            SiteRebuilder::new(RebuildOptions::new(dir.path().join("in"), dir.path().join("out")))
                .unwrap();
        let result = rebuilder.rebuild();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(RebuildError::Cleanup { path, .. }) => {
                assert!(path.ends_with("locked/stale.html"))
            }
            other => panic!("expected cleanup error, got {other:?}"),
        }
        assert!(!dir.path().join("out/a.html").exists());
    }
}
