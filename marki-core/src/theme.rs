//! Named highlight palettes for fenced code blocks.
//!
//! A handful of palettes are defined here directly; the rest come from the
//! theme set bundled with syntect. Lookup is by exact identifier.

use once_cell::sync::Lazy;
use std::str::FromStr;
use syntect::highlighting::{
    Color, FontStyle, ScopeSelectors, StyleModifier, Theme, ThemeItem, ThemeSet, ThemeSettings,
};
use thiserror::Error;

/// Theme used when none is configured
pub const DEFAULT_THEME: &str = "dracula";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThemeError {
    #[error("theme [{name}] is not a valid theme (available: {available})")]
    Unknown { name: String, available: String },
}

/// Colors for one hand-authored palette, as 0xRRGGBB
struct Palette {
    name: &'static str,
    background: u32,
    foreground: u32,
    gutter: u32,
    comment: u32,
    keyword: u32,
    string: u32,
    number: u32,
    constant: u32,
    function: u32,
    ty: u32,
    variable: u32,
    operator: u32,
}

const PALETTES: &[Palette] = &[
    Palette {
        name: "dracula",
        background: 0x282a36,
        foreground: 0xf8f8f2,
        gutter: 0x6272a4,
        comment: 0x6272a4,
        keyword: 0xff79c6,
        string: 0xf1fa8c,
        number: 0xbd93f9,
        constant: 0xbd93f9,
        function: 0x50fa7b,
        ty: 0x8be9fd,
        variable: 0xf8f8f2,
        operator: 0xff79c6,
    },
    Palette {
        name: "nord",
        background: 0x2e3440,
        foreground: 0xd8dee9,
        gutter: 0x4c566a,
        comment: 0x616e88,
        keyword: 0x81a1c1,
        string: 0xa3be8c,
        number: 0xb48ead,
        constant: 0x81a1c1,
        function: 0x88c0d0,
        ty: 0x8fbcbb,
        variable: 0xd8dee9,
        operator: 0x81a1c1,
    },
    Palette {
        name: "monokai",
        background: 0x272822,
        foreground: 0xf8f8f2,
        gutter: 0x90908a,
        comment: 0x75715e,
        keyword: 0xf92672,
        string: 0xe6db74,
        number: 0xae81ff,
        constant: 0xae81ff,
        function: 0xa6e22e,
        ty: 0x66d9ef,
        variable: 0xf8f8f2,
        operator: 0xf92672,
    },
    Palette {
        name: "gruvbox-dark",
        background: 0x282828,
        foreground: 0xebdbb2,
        gutter: 0x7c6f64,
        comment: 0x928374,
        keyword: 0xfb4934,
        string: 0xb8bb26,
        number: 0xd3869b,
        constant: 0xd3869b,
        function: 0xfabd2f,
        ty: 0x8ec07c,
        variable: 0x83a598,
        operator: 0xfe8019,
    },
    Palette {
        name: "one-dark",
        background: 0x282c34,
        foreground: 0xabb2bf,
        gutter: 0x4b5263,
        comment: 0x5c6370,
        keyword: 0xc678dd,
        string: 0x98c379,
        number: 0xd19a66,
        constant: 0xd19a66,
        function: 0x61afef,
        ty: 0xe5c07b,
        variable: 0xe06c75,
        operator: 0x56b6c2,
    },
    Palette {
        name: "github-light",
        background: 0xffffff,
        foreground: 0x24292e,
        gutter: 0xbabbbc,
        comment: 0x6a737d,
        keyword: 0xd73a49,
        string: 0x032f62,
        number: 0x005cc5,
        constant: 0x005cc5,
        function: 0x6f42c1,
        ty: 0x005cc5,
        variable: 0x24292e,
        operator: 0xd73a49,
    },
];

/// Identifier -> key in syntect's bundled theme set
const BUNDLED: &[(&str, &str)] = &[
    ("inspired-github", "InspiredGitHub"),
    ("solarized-dark", "Solarized (dark)"),
    ("solarized-light", "Solarized (light)"),
    ("base16-ocean-dark", "base16-ocean.dark"),
    ("base16-ocean-light", "base16-ocean.light"),
    ("base16-eighties-dark", "base16-eighties.dark"),
    ("base16-mocha-dark", "base16-mocha.dark"),
];

static REGISTRY: Lazy<Vec<(&'static str, Theme)>> = Lazy::new(|| {
    let mut themes: Vec<(&'static str, Theme)> =
        PALETTES.iter().map(|p| (p.name, p.to_theme())).collect();

    let mut bundled = ThemeSet::load_defaults();
    for &(name, key) in BUNDLED {
        match bundled.themes.remove(key) {
            Some(theme) => themes.push((name, theme)),
            None => tracing::warn!("Bundled theme {:?} missing from syntect defaults", key),
        }
    }

    themes
});

/// All recognized theme identifiers, in a stable order
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Resolve a theme identifier (exact, case-sensitive)
pub fn lookup(name: &str) -> Result<&'static Theme, ThemeError> {
    REGISTRY
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, theme)| theme)
        .ok_or_else(|| ThemeError::Unknown {
            name: name.to_string(),
            available: theme_names().collect::<Vec<_>>().join(", "),
        })
}

/// Check that a theme identifier is recognized
pub fn validate(name: &str) -> Result<(), ThemeError> {
    lookup(name).map(|_| ())
}

fn rgb(hex: u32) -> Color {
    Color {
        r: ((hex >> 16) & 0xff) as u8,
        g: ((hex >> 8) & 0xff) as u8,
        b: (hex & 0xff) as u8,
        a: 0xff,
    }
}

/// CSS hex notation for a syntect color
pub(crate) fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

impl Palette {
    fn to_theme(&self) -> Theme {
        let item = |selectors: &str, color: u32, font_style: FontStyle| ThemeItem {
            scope: ScopeSelectors::from_str(selectors).expect("static scope selector"),
            style: StyleModifier {
                foreground: Some(rgb(color)),
                background: None,
                font_style: Some(font_style),
            },
        };
        let plain = FontStyle::empty();

        Theme {
            name: Some(self.name.to_string()),
            author: None,
            settings: ThemeSettings {
                foreground: Some(rgb(self.foreground)),
                background: Some(rgb(self.background)),
                gutter_foreground: Some(rgb(self.gutter)),
                ..ThemeSettings::default()
            },
            scopes: vec![
                item("variable, variable.parameter", self.variable, plain),
                item("keyword.operator, punctuation.separator", self.operator, plain),
                item("keyword, storage, entity.name.tag", self.keyword, plain),
                item("string, punctuation.definition.string", self.string, plain),
                item("constant.numeric", self.number, plain),
                item(
                    "constant.language, constant.character, support.constant",
                    self.constant,
                    plain,
                ),
                item(
                    "entity.name.function, support.function, entity.other.attribute-name",
                    self.function,
                    plain,
                ),
                item(
                    "entity.name.type, entity.name.class, support.type, support.class, storage.type",
                    self.ty,
                    plain,
                ),
                item(
                    "comment, punctuation.definition.comment",
                    self.comment,
                    FontStyle::ITALIC,
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_themes_resolve() {
        for name in ["dracula", "nord", "monokai", "solarized-dark", "inspired-github"] {
            assert!(lookup(name).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn test_default_theme_is_registered() {
        assert!(theme_names().any(|name| name == DEFAULT_THEME));
    }

    #[test]
    fn test_unknown_theme() {
        let err = lookup("Dracula").unwrap_err();
        let ThemeError::Unknown { name, available } = err;
        assert_eq!(name, "Dracula");
        assert!(available.contains("dracula"));
    }

    #[test]
    fn test_palette_colors() {
        let theme = lookup("dracula").unwrap();
        let bg = theme.settings.background.unwrap();
        assert_eq!(css_color(bg), "#282a36");
    }
}
