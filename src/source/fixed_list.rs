use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use rand::RngCore;

use super::{CompressionMode, PositionSource, extract_positions, open_input_stream};
use crate::error::{DatasetError, Result};
use crate::types::{Position, SourceKind};

/// Pre-extracted positions, served cyclically. The cursor survives across games,
/// so consecutive games continue where the previous one stopped.
#[derive(Debug)]
pub struct FixedListSource {
    positions: Vec<Position>,
    cursor: usize,
    kind: SourceKind,
}

impl FixedListSource {
    pub fn new(positions: Vec<Position>, path: &Path) -> Result<Self> {
        Self::with_kind(positions, path, SourceKind::FenList)
    }

    fn with_kind(positions: Vec<Position>, path: &Path, kind: SourceKind) -> Result<Self> {
        if positions.is_empty() {
            return Err(DatasetError::EmptyPositionList {
                path: path.to_path_buf(),
            });
        }
        Ok(Self {
            positions,
            cursor: 0,
            kind,
        })
    }

    /// One position per line; only the first whitespace token of a line is kept and
    /// blank lines are ignored.
    pub fn load(path: &Path, compression: CompressionMode) -> Result<Self> {
        let reader = BufReader::new(open_input_stream(path, compression)?);
        let mut positions = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| DatasetError::io(path, e))?;
            if let Some(position) = Position::from_fen_field(&line) {
                positions.push(position);
            }
        }

        info!("Loaded {} positions from {}", positions.len(), path.display());
        Self::new(positions, path)
    }

    /// Every mainline position of every game in a PGN file.
    pub fn from_pgn(
        path: &Path,
        compression: CompressionMode,
        include_start: bool,
    ) -> Result<Self> {
        let input = open_input_stream(path, compression)?;
        let positions = extract_positions(input, path, include_start)?;

        info!(
            "Extracted {} positions from PGN {}",
            positions.len(),
            path.display()
        );
        Self::with_kind(positions, path, SourceKind::Pgn)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionSource for FixedListSource {
    fn next_position(&mut self, _rng: &mut dyn RngCore) -> Result<Position> {
        let position = self.positions[self.cursor % self.positions.len()].clone();
        self.cursor += 1;
        Ok(position)
    }

    fn kind(&self) -> SourceKind {
        self.kind
    }
}
