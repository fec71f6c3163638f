//! Markdown rendering: front matter extraction, heading ids, hard wraps,
//! and highlighted code blocks.

pub mod highlight;

use crate::frontmatter::{parse_frontmatter, FrontmatterError};
use crate::models::FrontMatter;
use crate::slug::SlugAllocator;
use crate::theme::{self, ThemeError};
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use thiserror::Error;

pub use highlight::HighlightTransformer;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("malformed front matter: {0}")]
    Frontmatter(#[from] FrontmatterError),
}

/// Output of [`MarkdownProcessor::render`]
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Body-level HTML fragment
    pub html: String,
    pub front_matter: FrontMatter,
}

/// Markdown processor with highlighting and heading ids
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a Markdown document with the named highlight theme.
    ///
    /// The theme is checked first, so an unknown theme fails even for
    /// documents without code blocks.
    pub fn render(&self, source: &str, theme_name: &str) -> Result<Rendered, RenderError> {
        let theme = theme::lookup(theme_name)?;
        let (front_matter, body) = parse_frontmatter(source)?;

        let events: Vec<Event> = Parser::new_ext(body, self.options).collect();
        let events = attach_heading_ids(events);
        let events = hard_wrap(events);
        let events = HighlightTransformer::new(theme).transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(Rendered {
            html: html_output,
            front_matter,
        })
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Give every heading without an explicit `{#id}` a slug id.
///
/// Explicit ids are reserved up front so generated ids never collide with them.
fn attach_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut slugs = SlugAllocator::new();
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    for event in &events {
        match event {
            Event::Start(Tag::Heading { id, .. }) => {
                if let Some(id) = id {
                    slugs.reserve(id);
                }
                current = Some(String::new());
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(title) = current.as_mut() {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(title) = current.take() {
                    texts.push(title);
                }
            }
            _ => {}
        }
    }

    let mut texts = texts.into_iter();
    events
        .into_iter()
        .map(|event| match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let text = texts.next().unwrap_or_default();
                let id = id.or_else(|| Some(slugs.allocate(&text).into()));
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                })
            }
            other => other,
        })
        .collect()
}

/// Render soft line breaks as `<br />`
fn hard_wrap(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    events
        .into_iter()
        .map(|event| match event {
            Event::SoftBreak => Event::HardBreak,
            other => other,
        })
        .collect()
}
