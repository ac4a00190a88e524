//! Tracing subscriber setup for the command-line binary.

use tracing_subscriber::EnvFilter;

/// How much the binary logs, chosen by the number of `-v` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings and errors only.
    #[default]
    Quiet,
    /// Phase milestones and run summaries.
    Info,
    /// Per-prompt progress, accepted categories and their confidence.
    Debug,
}

impl Verbosity {
    /// Maps a `-v` count to a level: none is quiet, one is info, two or more
    /// is debug.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Self::Quiet,
            1 => Self::Info,
            _ => Self::Debug,
        }
    }

    /// The filter directive for this level.
    pub fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

/// Installs a stderr `fmt` subscriber.
///
/// `RUST_LOG`, when set and valid, takes precedence over `verbosity`.
/// Calling this more than once is harmless; later calls are ignored.
pub fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flag_count() {
        assert_eq!(Verbosity::from_occurrences(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_occurrences(1), Verbosity::Info);
        assert_eq!(Verbosity::from_occurrences(2), Verbosity::Debug);
        assert_eq!(Verbosity::from_occurrences(9), Verbosity::Debug);
    }

    #[test]
    fn quiet_still_shows_warnings() {
        assert_eq!(Verbosity::default().directive(), "warn");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing(Verbosity::Quiet);
        init_tracing(Verbosity::Debug);
    }
}
