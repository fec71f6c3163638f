//! Single-document conversion: Markdown file in, self-contained HTML out.

use crate::markdown::highlight::html_escape;
use crate::markdown::{MarkdownProcessor, RenderError};
use crate::models::{scalar_to_string, FrontMatter, RenderedDocument, SourceDocument};
use crate::paths::{PathMapError, PathMapper};
use crate::theme::DEFAULT_THEME;
use serde_yaml::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error(transparent)]
    Path(#[from] PathMapError),
}

#[derive(Error, Debug)]
#[error("failed to write {path}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Highlight theme identifier
    pub theme: String,

    /// Append a script that moves the document's `<meta>` tags into `<head>`
    pub relocate_meta: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            relocate_meta: true,
        }
    }
}

/// Converts Markdown files into HTML documents placed by a [`PathMapper`].
pub struct DocumentConverter {
    mapper: PathMapper,
    processor: MarkdownProcessor,
    options: ConvertOptions,
}

impl DocumentConverter {
    pub fn new(mapper: PathMapper, options: ConvertOptions) -> Self {
        Self {
            mapper,
            processor: MarkdownProcessor::new(),
            options,
        }
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    /// Convert a file under the mapper's source root.
    pub fn convert(&self, source: &Path) -> Result<RenderedDocument, ConvertError> {
        let save_to_path = self.mapper.map(source)?;
        let marker = marker_for(self.mapper.relative(source)?);
        self.render_document(source, save_to_path, marker)
    }

    /// Convert a file under the mapper's source root to an explicit
    /// destination instead of the mapped one.
    pub fn convert_to(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<RenderedDocument, ConvertError> {
        let relative = self.mapper.relative(source)?;
        if !self.mapper.is_source_file(relative) {
            return Err(PathMapError::ExtensionMismatch {
                path: source.to_path_buf(),
                expected: self.mapper.source_ext().to_string(),
            }
            .into());
        }
        let marker = marker_for(relative);
        self.render_document(source, destination.to_path_buf(), marker)
    }

    fn render_document(
        &self,
        source: &Path,
        save_to_path: PathBuf,
        marker: String,
    ) -> Result<RenderedDocument, ConvertError> {
        let document = SourceDocument::read(source).map_err(|e| ConvertError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let rendered = self
            .processor
            .render(&document.text(), &self.options.theme)
            .map_err(|e| ConvertError::Render {
                path: source.to_path_buf(),
                source: e,
            })?;

        let meta_html = meta_tags(&rendered.front_matter, &marker);

        let mut html = String::with_capacity(meta_html.len() + rendered.html.len());
        html.push_str(&meta_html);
        html.push_str(&rendered.html);
        if self.options.relocate_meta && !meta_html.is_empty() {
            html.push_str(&relocation_script(&marker));
        }

        let save_to_dir = save_to_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(RenderedDocument {
            source_path: document.path,
            body_html: rendered.html,
            front_matter: rendered.front_matter,
            marker,
            meta_html,
            html,
            save_to_path,
            save_to_dir,
        })
    }
}

impl RenderedDocument {
    /// Write `html` to `save_to_path`, creating parent directories.
    pub fn write(&self) -> Result<(), WriteError> {
        fs::create_dir_all(&self.save_to_dir).map_err(|e| WriteError {
            path: self.save_to_dir.clone(),
            source: e,
        })?;
        fs::write(&self.save_to_path, self.html.as_bytes()).map_err(|e| WriteError {
            path: self.save_to_path.clone(),
            source: e,
        })
    }
}

/// Class name for a document's meta tags: `marki-` plus 8 hex chars of the
/// BLAKE3 hash of its path. Stable across rebuilds, distinct between files.
pub fn marker_for(path: &Path) -> String {
    let key = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    let hash = blake3::hash(key.as_bytes());
    format!("marki-{}", &hash.to_hex()[..8])
}

/// One `<meta>` line per front-matter key.
pub fn meta_tags(front_matter: &FrontMatter, marker: &str) -> String {
    let mut html = String::new();
    for (key, value) in front_matter.entries() {
        html.push_str(&format!(
            "<meta class=\"{}\" name=\"{}\" content=\"{}\">\n",
            html_escape(marker),
            html_escape(&key),
            html_escape(&meta_content(value)),
        ));
    }
    html
}

fn meta_content(value: &Value) -> String {
    if let Some(text) = scalar_to_string(value) {
        return text;
    }
    match value {
        Value::Sequence(items) => items
            .iter()
            .map(meta_content)
            .collect::<Vec<_>>()
            .join(", "),
        other => serde_json::to_string(other).unwrap_or_else(|_| {
            serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        }),
    }
}

fn relocation_script(marker: &str) -> String {
    format!(
        r#"<script>
(() => {{
    const head = document.querySelector('head')
    if (!head) return
    document.querySelectorAll('meta.{marker}').forEach((elm) => head.appendChild(elm))
}})()
</script>
"#
    )
}
