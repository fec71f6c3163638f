//! CLI command implementations.

pub mod convert;
pub mod themes;
pub mod watch;

pub use convert::{convert, ConvertArgs};
pub use themes::list_themes;
