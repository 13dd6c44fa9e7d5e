use std::env;
use std::io::Write;

use log::LevelFilter;

pub const LOG_ENV: &str = "CHESS_DATASET_LOG";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "error" | "err" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }

    fn shifted(self, by: i8) -> Self {
        match (self as i8 + by).clamp(0, 4) {
            0 => Self::Error,
            1 => Self::Warn,
            2 => Self::Info,
            3 => Self::Debug,
            _ => Self::Trace,
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn resolve_level(raw: Option<&str>, verbosity: i8) -> LevelFilter {
    raw.map(Level::from_str)
        .unwrap_or(Level::Info)
        .shifted(verbosity)
        .filter()
}

/// Installs the global logger. `verbosity` is `-v` count minus `-q` count.
///
/// `RUST_LOG` still applies on top for per-module filters.
pub fn init(verbosity: i8) {
    let level = resolve_level(env::var(LOG_ENV).ok().as_deref(), verbosity);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(buf, "[{}] {}: {}", record.level(), record.target(), record.args())
        })
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Stderr);

    // A second init (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_aliases() {
        assert_eq!(Level::from_str("err"), Level::Error);
        assert_eq!(Level::from_str("WARNING"), Level::Warn);
        assert_eq!(Level::from_str(" debug "), Level::Debug);
        assert_eq!(Level::from_str("nonsense"), Level::Info);
    }

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(resolve_level(None, 0), LevelFilter::Info);
    }

    #[test]
    fn test_verbosity_shifts_and_clamps() {
        assert_eq!(resolve_level(None, 1), LevelFilter::Debug);
        assert_eq!(resolve_level(Some("warn"), -5), LevelFilter::Error);
        assert_eq!(resolve_level(Some("debug"), 7), LevelFilter::Trace);
    }
}
