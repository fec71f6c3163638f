//! Front matter parsing from markdown files.

use crate::models::{scalar_to_string, FrontMatter};
use regex::Regex;
use serde_yaml::Value;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Front matter must be a mapping of keys to values, found {0}")]
    NotAMapping(&'static str),

    #[error("Front matter key must be a scalar")]
    StructuredKey,
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)").unwrap()
    })
}

/// Parse front matter from markdown content
///
/// Returns a tuple of (front matter, markdown body).
/// If no front matter is present, returns an empty mapping with the full content as body.
///
/// # Example
///
/// ```
/// use marki_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: Home\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.get("title").and_then(|v| v.as_str()), Some("Home"));
/// assert_eq!(body, "# Hello World\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(FrontMatter, &str), FrontmatterError> {
    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((FrontMatter::default(), content));
    };

    let whole = captures.get(0).map_or(0, |m| m.end());
    let body = &content[whole..];
    let yaml = captures.get(1).map_or("", |m| m.as_str());

    if yaml.trim().is_empty() {
        return Ok((FrontMatter::default(), body));
    }

    let mapping = match serde_yaml::from_str::<Value>(yaml)? {
        Value::Null => Default::default(),
        Value::Mapping(mapping) => mapping,
        Value::Sequence(_) => return Err(FrontmatterError::NotAMapping("a list")),
        Value::Tagged(_) => return Err(FrontmatterError::NotAMapping("a tagged value")),
        _ => return Err(FrontmatterError::NotAMapping("a scalar")),
    };

    if mapping.keys().any(|k| scalar_to_string(k).is_none()) {
        return Err(FrontmatterError::StructuredKey);
    }

    Ok((FrontMatter::new(mapping), body))
}
