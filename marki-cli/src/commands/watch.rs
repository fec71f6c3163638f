//! Watch mode: rebuild on change, restarting the loop after failures.

use anyhow::{Context, Result};
use marki_core::{supervise, Config, SiteRebuilder, WatchLoop};
use std::path::Path;
use std::sync::Arc;

pub async fn watch_directory(config: &Config, src: &Path, out: &Path) -> Result<()> {
    let rebuilder = SiteRebuilder::new(config.rebuild_options(src, out))
        .with_context(|| format!("Failed to prepare {:?} -> {:?}", src, out))?;
    let rebuilder = Arc::new(rebuilder);
    let options = config.watch_options();
    let policy = config.restart_policy();

    println!("👁️  watching {} (Ctrl+C to stop)", src.display());

    let supervised = supervise(&policy, |attempt| {
        let rebuilder = Arc::clone(&rebuilder);
        let options = options.clone();
        async move {
            if attempt > 0 {
                tracing::info!("Restarting watch loop (attempt {})", attempt + 1);
            }
            let mut watch = WatchLoop::new(rebuilder, options);
            watch.run().await
        }
    });

    tokio::select! {
        res = supervised => res.context("Watch mode stopped")?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted, stopping watch"),
    }

    Ok(())
}
