//! Post-processing pass that turns each finished game's `game.csv` into `gt.csv`
//! (`image_name,fen,viewpoint`), resolving every logged frame to the image file
//! that actually exists under `images/`.

use std::fmt;
use std::path::Path;

use glob::Pattern;
use log::{info, warn};

use crate::error::{DatasetError, ErrorAccumulator, Result};
use crate::indexer::game_dirs;
use crate::render::{file_names, is_image};
use crate::types::{GroundTruthRow, Viewpoint};
use crate::writer::{GAME_LOG_FILE, IMAGES_DIR, read_game_metadata};

pub const GROUND_TRUTH_FILE: &str = "gt.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingGameLog,
    MissingImages,
    UnreadableGameLog(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingGameLog => write!(f, "{GAME_LOG_FILE} not found"),
            Self::MissingImages => write!(f, "{IMAGES_DIR} folder not found"),
            Self::UnreadableGameLog(e) => write!(f, "cannot read {GAME_LOG_FILE}: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    Written { rows: usize, dropped: usize },
    /// Every row was dropped; no `gt.csv` is written.
    Empty { dropped: usize },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub games_scanned: usize,
    pub games_written: usize,
    pub games_skipped: usize,
    pub rows_written: usize,
    pub rows_dropped: usize,
}

/// Strips a leading frame-number token: `"7 rnbqkbnr/..."` becomes `"rnbqkbnr/..."`.
/// Anything else is returned unchanged.
pub fn clean_fen(raw: &str) -> &str {
    match raw.trim().split_once(' ') {
        Some((head, rest)) if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) => {
            rest
        }
        _ => raw,
    }
}

fn trailing_number(name: &str) -> Option<u64> {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let digits = stem.len() - stem.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    stem[stem.len() - digits..].parse().ok()
}

/// Picks the image for `frame` among `names` (sorted). Candidates match `*{frame}.*`
/// and carry an image extension; a candidate whose trailing digits equal `frame`
/// beats one that only contains the number (`frame_000015.png` for frame 5).
pub fn find_image<'a>(names: &'a [String], frame: u32) -> Option<&'a str> {
    let pattern = Pattern::new(&format!("*{frame}.*")).ok()?;
    let candidates: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| pattern.matches(name) && is_image(name))
        .collect();

    let exact = candidates
        .iter()
        .copied()
        .filter(|name| trailing_number(name) == Some(u64::from(frame)))
        .min();

    exact.or_else(|| candidates.into_iter().min())
}

/// `game.json` first, then the folder name.
pub fn resolve_viewpoint(game_dir: &Path) -> Viewpoint {
    match read_game_metadata(game_dir) {
        Ok(Some(meta)) => return meta.viewpoint,
        Ok(None) => {}
        Err(e) => warn!("{e}; falling back to folder name"),
    }

    let name = game_dir
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    Viewpoint::from_folder_name(&name)
}

fn parse_row(
    record: &csv::StringRecord,
    images: &[String],
    viewpoint: Viewpoint,
) -> std::result::Result<Option<GroundTruthRow>, String> {
    let frame_field = record.get(0).ok_or("empty row")?.trim();
    let frame: u32 = frame_field
        .parse()
        .map_err(|e| format!("bad frame number '{frame_field}': {e}"))?;
    let raw_fen = record
        .get(record.len().saturating_sub(1))
        .ok_or("missing position column")?;

    Ok(find_image(images, frame).map(|image| GroundTruthRow {
        image_name: image.to_string(),
        fen: clean_fen(raw_fen).to_string(),
        viewpoint,
    }))
}

/// Writes `gt.csv` for one game folder.
pub fn normalize_game(game_dir: &Path) -> Result<GameOutcome> {
    let log_path = game_dir.join(GAME_LOG_FILE);
    let images_dir = game_dir.join(IMAGES_DIR);
    if !log_path.is_file() {
        return Ok(GameOutcome::Skipped(SkipReason::MissingGameLog));
    }
    if !images_dir.is_dir() {
        return Ok(GameOutcome::Skipped(SkipReason::MissingImages));
    }

    let mut reader = match csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(&log_path)
    {
        Ok(reader) => reader,
        Err(e) => return Ok(GameOutcome::Skipped(SkipReason::UnreadableGameLog(e.to_string()))),
    };

    let images = file_names(&images_dir).map_err(|e| DatasetError::io(&images_dir, e))?;
    let viewpoint = resolve_viewpoint(game_dir);

    let mut rows = Vec::new();
    let mut errors = ErrorAccumulator::default();
    let mut unmatched = 0usize;
    for (line, record) in reader.records().enumerate() {
        let parsed = record
            .map_err(|e| e.to_string())
            .and_then(|record| parse_row(&record, &images, viewpoint));
        match parsed {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => unmatched += 1,
            Err(msg) => errors.push(&format!("row {}: {msg}", line + 1)),
        }
    }

    let dropped = unmatched + errors.len();
    if let Some(summary) = errors.take() {
        warn!("{}: dropped malformed rows: {}", game_dir.display(), summary);
    }

    if rows.is_empty() {
        return Ok(GameOutcome::Empty { dropped });
    }

    let out = game_dir.join(GROUND_TRUTH_FILE);
    let mut writer = csv::Writer::from_path(&out).map_err(|e| DatasetError::csv(&out, e))?;
    for row in &rows {
        writer.serialize(row).map_err(|e| DatasetError::csv(&out, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(&out, e))?;

    Ok(GameOutcome::Written {
        rows: rows.len(),
        dropped,
    })
}

/// Runs [`normalize_game`] over every `game_*` folder under `root`, in name order.
pub fn normalize_dataset(root: &Path) -> Result<NormalizeSummary> {
    let dirs = game_dirs(root)?;
    info!("Found {} games. Generating {} files...", dirs.len(), GROUND_TRUTH_FILE);

    let mut summary = NormalizeSummary::default();
    for dir in &dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        summary.games_scanned += 1;

        match normalize_game(dir)? {
            GameOutcome::Written { rows, dropped } => {
                info!("Generated {GROUND_TRUTH_FILE} for {name} ({rows} rows, {dropped} dropped)");
                summary.games_written += 1;
                summary.rows_written += rows;
                summary.rows_dropped += dropped;
            }
            GameOutcome::Empty { dropped } => {
                info!("No valid rows generated for {name}");
                summary.rows_dropped += dropped;
            }
            GameOutcome::Skipped(reason) => {
                info!("Skipping {name}: {reason}");
                summary.games_skipped += 1;
            }
        }
    }

    Ok(summary)
}
