//! NuMark CLI Library
//!
//! Command implementations and the development server behind the `numark`
//! binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (build, dev, clean, new, check)
//! - [`rebuild`] - Idle/building rebuild state machine and change debouncing
//! - [`server`] - Development server with live reload
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use numark::cmd;
//!
//! // Build a site for production
//! cmd::build::run(Path::new("numark.toml"), None, false).unwrap();
//! ```

pub mod cmd;
pub mod rebuild;
pub mod server;

pub use numark_core::{Config, Page};
pub use numark_generator::{BuildStats, Builder, SiteContent};

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
