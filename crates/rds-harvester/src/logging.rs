//! Tracing setup: human-readable stderr output plus a plain-text log file.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Default directive when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_FILTER: &str = "rds_harvester=info";

/// Added by `--verbose` on top of whichever base filter is active.
const VERBOSE_DIRECTIVE: &str = "rds_harvester=debug";

/// Install the global subscriber. Call once, before any work starts.
///
/// `RUST_LOG` replaces the default filter; `verbose` then raises the crate to
/// debug in either case. The file layer appends without ANSI colors.
pub fn init(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = || build_filter(env.as_deref(), verbose);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(())
}

fn build_filter(env: Option<&str>, verbose: bool) -> EnvFilter {
    let base = env
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));
    if verbose {
        base.add_directive(
            VERBOSE_DIRECTIVE
                .parse()
                .expect("verbose directive is valid"),
        )
    } else {
        base
    }
}
