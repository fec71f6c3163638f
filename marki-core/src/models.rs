//! Document model: source text, front matter, and rendered output.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Structured metadata parsed from a document's leading `---` block.
///
/// Keeps the YAML mapping as written, so iteration follows document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter(Mapping);

impl FrontMatter {
    pub fn new(mapping: Mapping) -> Self {
        Self(mapping)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate over `(key, value)` pairs with keys rendered as text.
    ///
    /// Scalar keys (numbers, booleans) are rendered to their textual form;
    /// structured keys are skipped.
    pub fn entries(&self) -> impl Iterator<Item = (String, &Value)> + '_ {
        self.0
            .iter()
            .filter_map(|(key, value)| scalar_to_string(key).map(|k| (k, value)))
    }
}

/// Render a YAML scalar as plain text. Returns `None` for sequences/mappings.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// A Markdown file read from disk. Lives for one conversion only.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            bytes,
        })
    }

    /// Source as text. Invalid UTF-8 sequences become U+FFFD.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Result of converting one [`SourceDocument`].
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// Path of the Markdown file this was produced from
    pub source_path: PathBuf,

    /// Body HTML as produced by the Markdown renderer
    pub body_html: String,

    /// Parsed front matter (possibly empty)
    pub front_matter: FrontMatter,

    /// Class name shared by this document's `<meta>` tags
    pub marker: String,

    /// One `<meta>` line per front-matter key
    pub meta_html: String,

    /// Complete file content: meta fragment, body, optional relocation script
    pub html: String,

    /// Destination file
    pub save_to_path: PathBuf,

    /// Directory containing `save_to_path`
    pub save_to_dir: PathBuf,
}
