mod fixed_list;
mod pgn;
mod simulated;

pub use fixed_list::FixedListSource;
pub use pgn::{PgnPositionVisitor, extract_positions, write_position_list};
pub use simulated::SimulatedGameSource;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use rand::RngCore;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::config::SourceConfig;
use crate::error::{DatasetError, Result};
use crate::types::{Position, SourceKind};

/// Supplies the positions rendered for each game.
pub trait PositionSource {
    /// Called once before the first position of every game.
    fn begin_game(&mut self) {}

    fn next_position(&mut self, rng: &mut dyn RngCore) -> Result<Position>;

    fn kind(&self) -> SourceKind;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("zstd") || normalized.eq_ignore_ascii_case("zst") {
            Ok(Self::Zstd)
        } else if normalized.is_empty() || normalized.eq_ignore_ascii_case("none") {
            Ok(Self::Plain)
        } else {
            Err(DatasetError::Config(format!(
                "Invalid compression value '{}'. Supported values: 'zstd' or 'none'.",
                normalized
            )))
        }
    }

    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

pub type SourceInput = Box<dyn Read + Send>;

pub fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<SourceInput> {
    let file = File::open(path).map_err(|e| DatasetError::io(path, e))?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(file)),
        CompressionMode::Zstd => ZstdDecoder::new(file)
            .map(|decoder| Box::new(decoder) as SourceInput)
            .map_err(|e| DatasetError::io(path, e)),
    }
}

/// Builds the source named by the `[source]` config section.
pub fn from_config(config: &SourceConfig) -> Result<Box<dyn PositionSource>> {
    let compression = config.compression_mode()?;
    let path = || {
        config.path.as_deref().ok_or_else(|| {
            DatasetError::Config(format!("source.path is required for '{}'", config.kind))
        })
    };

    Ok(match config.kind {
        SourceKind::Simulated => Box::new(SimulatedGameSource::new()),
        SourceKind::FenList => Box::new(FixedListSource::load(path()?, compression)?),
        SourceKind::Pgn => Box::new(FixedListSource::from_pgn(
            path()?,
            compression,
            config.include_start,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_compression_mode_case_insensitive() {
        assert_eq!(CompressionMode::parse("ZSTD").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse(" zstd ").unwrap(), CompressionMode::Zstd);
        assert_eq!(CompressionMode::parse("none").unwrap(), CompressionMode::Plain);
    }

    #[test]
    fn test_parse_compression_mode_rejects_unsupported_value() {
        let err = CompressionMode::parse("gzip").unwrap_err();
        assert!(err.to_string().contains("Invalid compression value 'gzip'"));
    }

    #[test]
    fn test_compression_for_path() {
        assert_eq!(
            CompressionMode::for_path(&PathBuf::from("a/fens.txt.zst")),
            CompressionMode::Zstd
        );
        assert_eq!(
            CompressionMode::for_path(&PathBuf::from("a/fens.txt")),
            CompressionMode::Plain
        );
    }

    #[test]
    fn test_open_missing_file_reports_path() {
        let err = open_input_stream(Path::new("does/not/exist.txt"), CompressionMode::Plain)
            .err()
            .unwrap();
        assert!(err.to_string().contains("does/not/exist.txt"));
    }
}
