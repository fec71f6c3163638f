//! List highlight themes.

use anyhow::{Context, Result};
use marki_core::{theme_names, Config, DEFAULT_THEME};
use std::path::Path;

pub fn list_themes(config_path: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = Config::discover(config_path, &cwd).context("Failed to load configuration")?;

    for name in theme_names() {
        println!("{}", label(name, &config.theme));
    }
    Ok(())
}

fn label(name: &str, configured: &str) -> String {
    if name == DEFAULT_THEME {
        format!("{} (default)", name)
    } else if name == configured {
        format!("{} (configured)", name)
    } else {
        name.to_string()
    }
}
