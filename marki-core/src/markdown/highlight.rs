//! Code syntax highlighting using syntect.

use crate::theme::css_color;
use pulldown_cmark::{CodeBlockKind, Event, Tag, TagEnd};
use std::sync::OnceLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::Theme;
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Transformer for syntax highlighting fenced code blocks
pub struct HighlightTransformer {
    theme: &'static Theme,
}

impl HighlightTransformer {
    pub fn new(theme: &'static Theme) -> Self {
        Self { theme }
    }

    /// Replace every fenced code block with pre-highlighted HTML
    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut result = Vec::with_capacity(events.len());
        let mut block: Option<(String, String)> = None;

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    block = Some((language_token(&info).to_string(), String::new()));
                }
                Event::Text(text) if block.is_some() => {
                    if let Some((_, code)) = block.as_mut() {
                        code.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if block.is_some() => {
                    if let Some((lang, code)) = block.take() {
                        result.push(Event::Html(self.highlight_code(&code, &lang).into()));
                    }
                }
                other => result.push(other),
            }
        }

        result
    }

    /// Highlight a code snippet, falling back to an escaped block on failure
    pub fn highlight_code(&self, code: &str, lang: &str) -> String {
        let ss = syntax_set();
        let syntax = ss
            .find_syntax_by_token(lang)
            .or_else(|| ss.find_syntax_by_extension(lang))
            .unwrap_or_else(|| ss.find_syntax_plain_text());

        match self.highlight_lines(code, lang, syntax) {
            Ok(html) => html,
            Err(err) => {
                tracing::warn!("Highlighting failed for {:?} block: {}", lang, err);
                format!("<pre><code>{}</code></pre>\n", html_escape(code))
            }
        }
    }

    /// One flex row per source line: a line-number cell and the styled tokens.
    fn highlight_lines(
        &self,
        code: &str,
        lang: &str,
        syntax: &SyntaxReference,
    ) -> Result<String, syntect::Error> {
        let settings = &self.theme.settings;
        let background = settings.background.map(css_color);
        let foreground = settings.foreground.map(css_color);
        let gutter = settings.gutter_foreground.or(settings.foreground).map(css_color);

        let mut html = String::from("<pre class=\"marki-code\" style=\"");
        if let Some(bg) = &background {
            html.push_str(&format!("background-color:{};", bg));
        }
        if let Some(fg) = &foreground {
            html.push_str(&format!("color:{};", fg));
        }
        html.push_str("\"><code");
        if !lang.is_empty() {
            html.push_str(&format!(" class=\"language-{}\"", html_escape(lang)));
        }
        html.push('>');

        let mut highlighter = HighlightLines::new(syntax, self.theme);
        for (idx, line) in LinesWithEndings::from(code).enumerate() {
            let regions = highlighter.highlight_line(line, syntax_set())?;
            let line_html = styled_line_to_highlighted_html(&regions[..], IncludeBackground::No)?;

            html.push_str("<span class=\"line\" style=\"display:flex;\">");
            html.push_str(
                "<span class=\"ln\" style=\"white-space:pre;user-select:none;margin-right:0.4em;padding:0 0.4em 0 0.4em;",
            );
            if let Some(color) = &gutter {
                html.push_str(&format!("color:{};", color));
            }
            html.push_str(&format!("\">{}</span>", idx + 1));
            html.push_str(&format!("<span class=\"cl\">{}</span></span>", line_html));
        }

        html.push_str("</code></pre>\n");
        Ok(html)
    }
}

/// First word of a fence info string (` ```rust,ignore ` -> `rust`)
fn language_token(info: &str) -> &str {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .next()
        .unwrap_or("")
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
