//! Gravtime CLI
//!
//! Thin front-end over the runtime and analysis crates.

pub mod commands;
pub mod render;

pub use commands::*;
pub use render::*;

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gravtime=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
