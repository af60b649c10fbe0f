//! Dev command - development server with live reload

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use color_eyre::eyre::{Result, WrapErr};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use numark_generator::{BuildMode, BuildStats, Builder};
use tokio::{
    net::TcpListener,
    sync::{broadcast, mpsc},
};

use super::load_config;
use crate::{
    rebuild::{self, DEBOUNCE, RebuildOutcome, Rebuilder, SiteBuilder},
    server::{ServerState, create_router, inject_livereload},
};

/// Command-line overrides for the dev server.
#[derive(Debug, Clone, Default)]
pub struct DevOptions {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub open: bool,
    pub no_livereload: bool,
}

/// Builds the site from its config file in development mode.
///
/// The config is reloaded on every build so edits to it take effect.
#[derive(Debug)]
pub struct DevSite {
    config_path: PathBuf,
    livereload: bool,
}

impl DevSite {
    pub fn new(config_path: impl Into<PathBuf>, livereload: bool) -> Self {
        Self {
            config_path: config_path.into(),
            livereload,
        }
    }
}

impl SiteBuilder for DevSite {
    fn build(&self) -> Result<BuildStats> {
        let config = load_config(&self.config_path)?;
        let output = config.output_path();

        let stats = Builder::new(config)
            .with_mode(BuildMode::Development)
            .build()
            .wrap_err("Build failed")?;

        if self.livereload {
            let injected = inject_livereload(&output).wrap_err("Failed to inject live reload")?;
            tracing::debug!(files = injected, "injected live-reload client");
        }

        Ok(stats)
    }
}

/// Run the dev command.
///
/// Builds once, then serves the output directory and rebuilds whenever a
/// watched file changes.
pub async fn run(config_path: &Path, options: DevOptions) -> Result<()> {
    tracing::info!(?config_path, ?options, "Starting dev server");

    let config = load_config(config_path)?;
    let port = options.port.unwrap_or(config.dev_server.port);
    let host = options
        .host
        .clone()
        .unwrap_or_else(|| config.dev_server.host.clone());
    let livereload = config.dev_server.livereload && !options.no_livereload;
    let open_browser = options.open || config.dev_server.open;
    let output_dir = config.output_path();

    let (reload_tx, _) = broadcast::channel(16);
    let site = Arc::new(DevSite::new(config_path, livereload));
    let rebuilder = Arc::new(Rebuilder::new(site, reload_tx));

    println!("  Running initial build...");
    match rebuilder.rebuild().await {
        RebuildOutcome::Built(stats) => print_build_stats(&stats),
        RebuildOutcome::Failed(message) => eprintln!("  ✗ Initial build failed: {message}"),
        RebuildOutcome::Skipped => {}
    }

    let (tx, rx) = mpsc::channel::<()>(64);
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event)
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) =>
            {
                tracing::trace!(paths = ?event.paths, "file change");
                // A full channel already has a rebuild pending.
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "watch error"),
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    for dir in [
        config.input_path(),
        config.templates_path(),
        config.themes_path(),
        config.assets_path(),
        config.public_path(),
    ] {
        if dir.is_dir() {
            watcher
                .watch(&dir, RecursiveMode::Recursive)
                .wrap_err_with(|| format!("Failed to watch {}", dir.display()))?;
            tracing::debug!(dir = %dir.display(), "watching directory");
        }
    }
    if config_path.is_file() {
        watcher
            .watch(config_path, RecursiveMode::NonRecursive)
            .wrap_err("Failed to watch configuration file")?;
    }

    tokio::spawn(rebuild::debounce(rx, DEBOUNCE, Arc::clone(&rebuilder)));

    let app = create_router(&output_dir, ServerState::new(rebuilder, config.title.clone()));
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    let url = format!("http://{addr}");
    println!();
    println!("  Dev server running at {url}");
    if livereload {
        println!("  Live reload enabled");
    }
    println!("  Press Ctrl+C to stop");
    println!();

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "failed to open browser");
        }
    }

    // Keep watcher alive
    let _watcher = watcher;

    axum::serve(listener, app).await.wrap_err("Server error")?;

    Ok(())
}

/// Print build statistics in a user-friendly format.
fn print_build_stats(stats: &BuildStats) {
    println!();
    println!("  Build Statistics:");
    println!("  ─────────────────────────────────");
    println!("  Pages:        {:>6}", stats.pages);
    println!("  Index pages:  {:>6}", stats.index_pages);
    println!("  Errors:       {:>6}", stats.render_errors);
    println!("  Assets:       {:>6}", stats.assets);
    println!("  ─────────────────────────────────");
    println!("  Duration:     {:>6}ms", stats.duration_ms);
    println!();
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_dev_site_builds_drafts_with_livereload() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("numark.toml");
        fs::write(&config_path, "title = \"Dev\"\noptimize_images = false\n").unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(
            dir.path().join("content/wip.md"),
            "---\ntitle: WIP\ndraft: true\n---\nSoon\n",
        )
        .unwrap();

        let stats = DevSite::new(&config_path, true).build().unwrap();

        assert_eq!(stats.pages, 1);
        let html = fs::read_to_string(dir.path().join("dist/wip/index.html")).unwrap();
        assert!(html.contains("/__livereload"));
    }

    #[test]
    fn test_dev_site_reports_config_errors() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("numark.toml");
        fs::write(&config_path, "title = \"\"\n").unwrap();

        let err = DevSite::new(&config_path, false).build().unwrap_err();
        assert!(format!("{err:#}").contains("title"));
    }
}
