use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use glob::Pattern;
use regex::Regex;

use crate::error::{DatasetError, Result};

static GAME_DIR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^game_(\d{4})$").expect("valid game folder regex"));

/// Highest index whose folder name `next_start_index` can still read back.
pub const MAX_GAME_INDEX: u32 = 9999;

pub fn game_dir_name(index: u32) -> String {
    format!("game_{index:04}")
}

/// Index encoded in a `game_NNNN` folder name (exactly four digits).
pub fn parse_game_index(name: &str) -> Option<u32> {
    GAME_DIR_RE
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Existing `game_*` directories under `root`, sorted by path.
pub fn game_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/game_*", Pattern::escape(&root.to_string_lossy()));
    let mut dirs: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// First unused game index: one past the highest `game_NNNN` folder, or 0.
/// Creates `root` when it does not exist yet.
pub fn next_start_index(root: &Path) -> Result<u32> {
    fs::create_dir_all(root).map_err(|e| DatasetError::io(root, e))?;

    let max = game_dirs(root)?
        .iter()
        .filter_map(|path| path.file_name()?.to_str())
        .filter_map(parse_game_index)
        .max();

    Ok(max.map_or(0, |m| m + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_root_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(next_start_index(dir.path()).unwrap(), 0);
    }

    #[test]
    fn test_missing_root_is_created() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("dataset");
        assert_eq!(next_start_index(&root).unwrap(), 0);
        assert!(root.is_dir());
    }

    #[test]
    fn test_next_index_is_max_plus_one() {
        let dir = TempDir::new().unwrap();
        for name in ["game_0000", "game_0003", "game_0001"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        assert_eq!(next_start_index(dir.path()).unwrap(), 4);
    }

    #[test]
    fn test_non_matching_names_are_ignored() {
        let dir = TempDir::new().unwrap();
        for name in ["game_0002", "game_12345", "game_7", "game_0009_black", "other"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("game_0042"), b"not a folder").unwrap();
        assert_eq!(next_start_index(dir.path()).unwrap(), 3);
    }

    #[test]
    fn test_root_with_glob_metacharacters() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("run[1]");
        fs::create_dir_all(root.join("game_0005")).unwrap();
        assert_eq!(next_start_index(&root).unwrap(), 6);
    }

    #[test]
    fn test_game_dir_name_padding() {
        assert_eq!(game_dir_name(0), "game_0000");
        assert_eq!(game_dir_name(57), "game_0057");
        assert_eq!(parse_game_index("game_0057"), Some(57));
        assert_eq!(parse_game_index("game_57"), None);
    }
}
