//! # marki-core
//!
//! Converts a tree of Markdown documents into HTML files and keeps the
//! output in sync while the sources change.
//!
//! The pipeline is: [`WatchLoop`] (or a one-shot call) drives a
//! [`SiteRebuilder`], which maps each source with a [`PathMapper`] and
//! renders it with a [`DocumentConverter`].

pub mod config;
pub mod converter;
pub mod frontmatter;
pub mod markdown;
pub mod models;
pub mod paths;
pub mod rebuild;
pub mod slug;
pub mod supervisor;
pub mod theme;
pub mod watch;

pub use config::{Config, ConfigError};
pub use converter::{ConvertError, ConvertOptions, DocumentConverter, WriteError};
pub use markdown::{MarkdownProcessor, RenderError};
pub use models::{FrontMatter, RenderedDocument, SourceDocument};
pub use paths::{map_path, PathMapError, PathMapper};
pub use rebuild::{
    convert_single, FailurePolicy, FileError, FileFailure, RebuildError, RebuildOptions,
    RebuildReport, SiteRebuilder,
};
pub use slug::slugify;
pub use supervisor::{supervise, RestartPolicy, SupervisorError};
pub use theme::{theme_names, ThemeError, DEFAULT_THEME};
pub use watch::{
    Backpressure, ChangeEvent, ChangeKind, RebuildTriggers, WatchError, WatchLoop, WatchOptions,
    WatchState,
};
