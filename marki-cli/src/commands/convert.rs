//! Convert command implementation.

use super::watch::watch_directory;
use anyhow::{bail, Context, Result};
use marki_core::{convert_single, Config, RebuildError, SiteRebuilder};
use std::path::{Path, PathBuf};

pub struct ConvertArgs {
    pub src: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub theme: Option<String>,
    pub watch: bool,
}

/// What the source/destination pair turned out to be
#[derive(Debug, PartialEq, Eq)]
enum Target {
    File,
    Directory,
}

pub async fn convert(config_path: Option<&Path>, args: ConvertArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let mut config = Config::discover(config_path, &cwd).context("Failed to load configuration")?;

    let src = match args.src {
        Some(src) => src,
        None => config.require_source().context("missing <SRC>")?,
    };
    let out = match args.out {
        Some(out) => out,
        None => config.require_output().context("missing <OUT>")?,
    };
    if let Some(theme) = args.theme {
        config.theme = theme;
    }
    config.validate().context("Invalid configuration")?;

    let target = classify(&src, &out)?;

    println!("🤘 marki launch!");

    match (target, args.watch) {
        (Target::File, true) => bail!("--watch requires <SRC> to be a directory"),
        (Target::File, false) => {
            convert_single(&src, &out, &config.source_extension, config.convert_options())
                .with_context(|| format!("Failed to convert {}", src.display()))?;
            Ok(())
        }
        (Target::Directory, false) => build_directory(&config, &src, &out),
        (Target::Directory, true) => watch_directory(&config, &src, &out).await,
    }
}

fn build_directory(config: &Config, src: &Path, out: &Path) -> Result<()> {
    let rebuilder = SiteRebuilder::new(config.rebuild_options(src, out))
        .with_context(|| format!("Failed to prepare {:?} -> {:?}", src, out))?;

    match rebuilder.rebuild() {
        Ok(report) => {
            println!("📝 wrote {} file(s) to {}", report.written.len(), out.display());
            Ok(())
        }
        Err(err @ RebuildError::Partial { .. }) => {
            let details: Vec<String> = err.failures().iter().map(|f| f.to_string()).collect();
            bail!("{}:\n  {}", err, details.join("\n  "))
        }
        Err(err) => Err(err).context("Rebuild failed"),
    }
}

/// Check that source and destination agree on being files or directories.
fn classify(src: &Path, out: &Path) -> Result<Target> {
    if src.is_file() {
        if out.is_dir() {
            bail!(
                "<OUT> must be a file path when <SRC> is a file, but {} is a directory",
                out.display()
            );
        }
        if is_same_file(src, out) {
            bail!(
                "<OUT> {} is the same file as <SRC>, refusing to overwrite it",
                out.display()
            );
        }
        if out.extension().is_none() {
            bail!(
                "<OUT> must be a file path with an extension when <SRC> is a file, got {}",
                out.display()
            );
        }
        Ok(Target::File)
    } else if src.is_dir() {
        if out.is_file() {
            bail!(
                "<OUT> must be a directory when <SRC> is a directory, but {} is a file",
                out.display()
            );
        }
        Ok(Target::Directory)
    } else {
        bail!("<SRC> {} does not exist", src.display())
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
