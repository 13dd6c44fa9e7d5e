use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = DatasetError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to launch renderer '{}': {source}", binary.display())]
    RendererSpawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("renderer exited with {status} while rendering '{fen}'")]
    RendererFailed { status: ExitStatus, fen: String },

    #[error(
        "timed out after {:.1}s waiting for renders in '{}'; found: [{}]",
        waited.as_secs_f64(),
        staging.display(),
        found.join(", ")
    )]
    RenderTimeout {
        staging: PathBuf,
        waited: Duration,
        found: Vec<String>,
    },

    #[error("CSV error in '{}': {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("JSON error in '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("position list '{}' contains no positions", path.display())]
    EmptyPositionList { path: PathBuf },

    #[error("PGN error in '{}': {message}", path.display())]
    Pgn { path: PathBuf, message: String },

    #[error("invalid viewpoint '{0}' (expected 'white' or 'black')")]
    InvalidViewpoint(String),

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl DatasetError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Collects row-level problems so a whole game can be reported with one line.
#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator {
    first: Option<String>,
    count: usize,
}

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        if self.first.is_none() {
            self.first = Some(msg.to_string());
        }
        self.count += 1;
    }

    /// Returns a summary like `"3 rows dropped (first: ...)"` and resets the accumulator.
    pub fn take(&mut self) -> Option<String> {
        let first = self.first.take()?;
        let count = std::mem::take(&mut self.count);
        if count == 1 {
            Some(first)
        } else {
            Some(format!("{first} (and {} more)", count - 1))
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::{DatasetError, ErrorAccumulator};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_push_single_message() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("first error");

        assert_eq!(accumulator.len(), 1);
        assert_eq!(accumulator.take().as_deref(), Some("first error"));
    }

    #[test]
    fn test_push_multiple_messages_keeps_first_and_counts_rest() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("first");
        accumulator.push("second");
        accumulator.push("third");

        assert_eq!(accumulator.len(), 3);
        assert_eq!(
            accumulator.take().as_deref(),
            Some("first (and 2 more)")
        );
    }

    #[test]
    fn test_take_consumes_accumulator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("error");

        assert_eq!(accumulator.take().as_deref(), Some("error"));
        assert!(accumulator.is_empty());
        assert_eq!(accumulator.len(), 0);
        assert!(accumulator.take().is_none());
    }

    #[test]
    fn test_default_is_empty() {
        let accumulator = ErrorAccumulator::default();
        assert!(accumulator.is_empty());
    }

    #[test]
    fn test_timeout_message_lists_found_files() {
        let err = DatasetError::RenderTimeout {
            staging: PathBuf::from("renders"),
            waited: Duration::from_millis(1500),
            found: vec!["1_overhead.png".to_string(), "notes.txt".to_string()],
        };

        let msg = err.to_string();
        assert!(msg.contains("1.5s"));
        assert!(msg.contains("1_overhead.png, notes.txt"));
    }
}
