//! Tracing subscriber setup for the `mjop` binary.
//!
//! Filter priority, highest first:
//!
//! 1. `MJOP_LOG` (per-target directives, e.g. `mjop::store=debug,warn`)
//! 2. `RUST_LOG`
//! 3. `--verbose` / `--quiet`
//! 4. `warn`
//!
//! Logs go to stderr so command output on stdout stays machine-readable.

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const ENV_LOG: &str = "MJOP_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    /// Verbose wins when both flags are given.
    pub const fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    pub const fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }
}

/// Install the global subscriber. Call once, before loading configuration.
///
/// With `json` set, each event is written as one JSON object per line.
pub fn init_subscriber(verbosity: Verbosity, json: bool) {
    let filter = build_env_filter(verbosity);
    let use_ansi = std::io::IsTerminal::is_terminal(&std::io::stderr());

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(layer.json().with_current_span(false)).init();
    } else if verbosity == Verbosity::Verbose {
        registry
            .with(layer.with_ansi(use_ansi).with_timer(fmt::time::uptime()))
            .init();
    } else {
        registry
            .with(layer.with_ansi(use_ansi).without_time().compact())
            .init();
    }
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    // An unparseable MJOP_LOG falls through instead of failing startup.
    if let Ok(directives) = std::env::var(ENV_LOG)
        && let Ok(filter) = EnvFilter::try_new(&directives)
    {
        return filter;
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = verbosity.default_level();
    let directive = if verbosity == Verbosity::Verbose {
        format!("{},mjop=debug", level)
    } else {
        level.to_string()
    };
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Verbose);
    }

    #[test]
    fn test_default_level_mapping() {
        assert_eq!(Verbosity::Quiet.default_level(), Level::ERROR);
        assert_eq!(Verbosity::Normal.default_level(), Level::WARN);
        assert_eq!(Verbosity::Verbose.default_level(), Level::DEBUG);
    }

    #[test]
    fn test_build_env_filter_never_panics() {
        let _ = build_env_filter(Verbosity::Quiet);
        let _ = build_env_filter(Verbosity::Normal);
        let _ = build_env_filter(Verbosity::Verbose);
    }
}
