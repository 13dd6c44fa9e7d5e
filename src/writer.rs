use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use rand::Rng;
use rand::seq::index;

use crate::error::{DatasetError, Result};
use crate::types::{FrameRecord, GameMetadata, Position, ViewCount};

pub const IMAGES_DIR: &str = "images";
pub const GAME_LOG_FILE: &str = "game.csv";
pub const GAME_METADATA_FILE: &str = "game.json";
pub const GAME_LOG_HEADER: [&str; 3] = ["from_frame", "to_frame", "fen"];

pub fn frame_file_name(frame: u32) -> String {
    format!("frame_{frame:06}.png")
}

/// `rename`, falling back to copy + delete when staging and output live on
/// different filesystems.
pub fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_file() => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Writes `game.csv`: fixed header, then one row per retained image.
pub fn write_game_log(path: &Path, rows: &[FrameRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| DatasetError::csv(path, e))?;

    writer
        .write_record(GAME_LOG_HEADER)
        .map_err(|e| DatasetError::csv(path, e))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| DatasetError::csv(path, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(path, e))
}

pub fn write_game_metadata(path: &Path, metadata: &GameMetadata) -> Result<()> {
    let file = File::create(path).map_err(|e| DatasetError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, metadata).map_err(|e| DatasetError::json(path, e))?;
    writeln!(writer).map_err(|e| DatasetError::io(path, e))?;
    writer.flush().map_err(|e| DatasetError::io(path, e))
}

/// Reads `game.json` if the folder has one.
pub fn read_game_metadata(game_dir: &Path) -> Result<Option<GameMetadata>> {
    let path = game_dir.join(GAME_METADATA_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(DatasetError::io(&path, e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| DatasetError::json(&path, e))
}

/// Claims rendered images for one game folder and accumulates its log rows.
///
/// Frame indices start at 0 and grow by one per moved image across all positions
/// of the game. Rows stay in memory until [`GameWriter::finish`].
#[derive(Debug)]
pub struct GameWriter {
    game_dir: PathBuf,
    images_dir: PathBuf,
    next_frame: u32,
    rows: Vec<FrameRecord>,
}

impl GameWriter {
    pub fn create(game_dir: &Path) -> Result<Self> {
        let images_dir = game_dir.join(IMAGES_DIR);
        fs::create_dir_all(&images_dir).map_err(|e| DatasetError::io(&images_dir, e))?;
        Ok(Self {
            game_dir: game_dir.to_path_buf(),
            images_dir,
            next_frame: 0,
            rows: Vec::new(),
        })
    }

    /// Moves the kept subset of `outputs` into `images/` and logs one row per image.
    /// Unkept outputs are deleted from staging. Returns the number of frames added.
    pub fn record<R: Rng + ?Sized>(
        &mut self,
        position: &Position,
        outputs: &[PathBuf],
        view_count: ViewCount,
        rng: &mut R,
    ) -> Result<usize> {
        let keep = view_count.get().min(outputs.len());
        let selected: Vec<&PathBuf> = if keep == outputs.len() {
            outputs.iter().collect()
        } else {
            index::sample(rng, outputs.len(), keep)
                .into_iter()
                .map(|i| &outputs[i])
                .collect()
        };

        for src in &selected {
            let dst = self.images_dir.join(frame_file_name(self.next_frame));
            move_file(src, &dst).map_err(|e| DatasetError::io(src, e))?;
            debug!("Moved {} -> {}", src.display(), dst.display());

            self.rows.push(FrameRecord::single(self.next_frame, position));
            self.next_frame += 1;
        }

        if selected.len() < outputs.len() {
            for leftover in outputs.iter().filter(|p| p.exists()) {
                fs::remove_file(leftover).map_err(|e| DatasetError::io(leftover, e))?;
            }
        }

        Ok(selected.len())
    }

    pub fn frames(&self) -> u32 {
        self.next_frame
    }

    pub fn rows(&self) -> &[FrameRecord] {
        &self.rows
    }

    /// Writes `game.csv` and `game.json`. Called exactly once, after the last position.
    pub fn finish(self, metadata: &GameMetadata) -> Result<PathBuf> {
        write_game_log(&self.game_dir.join(GAME_LOG_FILE), &self.rows)?;
        write_game_metadata(&self.game_dir.join(GAME_METADATA_FILE), metadata)?;
        Ok(self.game_dir)
    }
}
