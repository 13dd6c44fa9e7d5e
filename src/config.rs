use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DatasetError, Result};
use crate::render::PollPolicy;
use crate::source::CompressionMode;
use crate::types::{SourceKind, ViewCount, Viewpoint};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub renderer: RendererConfig,
    pub dataset: DatasetConfig,
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub binary: PathBuf,
    pub scene: PathBuf,
    pub script: PathBuf,
    pub staging_dir: PathBuf,
    pub resolution: u32,
    pub samples: u32,
    pub clean_staging: bool,
    pub poll_interval_ms: u64,
    pub poll_max_interval_ms: u64,
    pub poll_backoff: f64,
    pub timeout_secs: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("blender"),
            scene: PathBuf::from("chess-set.blend"),
            script: PathBuf::from("chess_position_api_v2.py"),
            staging_dir: PathBuf::from("renders"),
            resolution: 1024,
            samples: 16,
            clean_staging: true,
            poll_interval_ms: 250,
            poll_max_interval_ms: 250,
            poll_backoff: 1.0,
            timeout_secs: 120,
        }
    }
}

impl RendererConfig {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.poll_max_interval_ms.max(self.poll_interval_ms)),
            backoff: self.poll_backoff,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    pub output_root: PathBuf,
    pub num_games: u32,
    /// `seed = "random"` in TOML gives `None`, which seeds from OS entropy.
    #[serde(deserialize_with = "deserialize_seed", serialize_with = "serialize_seed")]
    pub seed: Option<u64>,
    pub plies_options: Vec<usize>,
    pub views_per_position_options: Vec<ViewCount>,
    pub view_options: Vec<Viewpoint>,
    pub enforce_view_balance: bool,
}

const RANDOM_SEED: &str = "random";

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedSetting {
    Fixed(u64),
    Named(String),
}

fn deserialize_seed<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    match SeedSetting::deserialize(deserializer)? {
        SeedSetting::Fixed(seed) => Ok(Some(seed)),
        SeedSetting::Named(name) if name.trim().eq_ignore_ascii_case(RANDOM_SEED) => Ok(None),
        SeedSetting::Named(name) => Err(D::Error::custom(format!(
            "seed must be a non-negative integer or \"{RANDOM_SEED}\", got '{name}'"
        ))),
    }
}

fn serialize_seed<S: Serializer>(
    seed: &Option<u64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match seed {
        Some(seed) => serializer.serialize_u64(*seed),
        None => serializer.serialize_str(RANDOM_SEED),
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("synthetic_dataset"),
            num_games: 50,
            seed: Some(42),
            plies_options: vec![40, 50, 60],
            views_per_position_options: vec![ViewCount::THREE],
            view_options: vec![Viewpoint::White, Viewpoint::Black],
            enforce_view_balance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
    /// `"zstd"`; when absent, inferred from a `.zst` extension.
    pub compression: Option<String>,
    /// PGN only: also emit the position before the first move of each game.
    pub include_start: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Simulated,
            path: None,
            compression: None,
            include_start: false,
        }
    }
}

impl SourceConfig {
    pub fn compression_mode(&self) -> Result<CompressionMode> {
        match (&self.compression, &self.path) {
            (Some(raw), _) => CompressionMode::parse(raw),
            (None, Some(path)) => Ok(CompressionMode::for_path(path)),
            (None, None) => Ok(CompressionMode::Plain),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| DatasetError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.renderer;
        let d = &self.dataset;

        if r.resolution == 0 {
            return Err(DatasetError::Config("renderer.resolution must be positive".into()));
        }
        if r.samples == 0 {
            return Err(DatasetError::Config("renderer.samples must be positive".into()));
        }
        if r.timeout_secs == 0 {
            return Err(DatasetError::Config("renderer.timeout_secs must be positive".into()));
        }
        if r.poll_interval_ms == 0 {
            return Err(DatasetError::Config(
                "renderer.poll_interval_ms must be positive".into(),
            ));
        }
        if !(r.poll_backoff.is_finite() && r.poll_backoff >= 1.0) {
            return Err(DatasetError::Config(format!(
                "renderer.poll_backoff must be >= 1.0, got {}",
                r.poll_backoff
            )));
        }

        if d.plies_options.is_empty() || d.plies_options.contains(&0) {
            return Err(DatasetError::Config(
                "dataset.plies_options must be non-empty and positive".into(),
            ));
        }
        if d.views_per_position_options.is_empty() {
            return Err(DatasetError::Config(
                "dataset.views_per_position_options must not be empty".into(),
            ));
        }
        if d.view_options.is_empty() {
            return Err(DatasetError::Config("dataset.view_options must not be empty".into()));
        }

        match self.source.kind {
            SourceKind::Simulated => {}
            SourceKind::FenList | SourceKind::Pgn => {
                if self.source.path.is_none() {
                    return Err(DatasetError::Config(format!(
                        "source.path is required for the '{}' source",
                        self.source.kind
                    )));
                }
            }
        }
        self.source.compression_mode()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.dataset.num_games, 50);
        assert_eq!(config.renderer.poll_policy().interval, Duration::from_millis(250));
        assert_eq!(config.renderer.poll_policy().timeout, Duration::from_secs(120));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
[renderer]
resolution = 768

[dataset]
num_games = 4
views_per_position_options = [2, 3]
view_options = ["black"]

[source]
kind = "fen-list"
path = "fens.txt"
"#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.renderer.resolution, 768);
        assert_eq!(config.renderer.samples, 16);
        assert_eq!(config.dataset.num_games, 4);
        assert_eq!(
            config.dataset.views_per_position_options,
            vec![ViewCount::TWO, ViewCount::THREE]
        );
        assert_eq!(config.dataset.view_options, vec![Viewpoint::Black]);
        assert_eq!(config.source.kind, SourceKind::FenList);
    }

    #[test]
    fn test_rejects_view_count_outside_two_or_three() {
        let err = Config::from_toml_str("[dataset]\nviews_per_position_options = [4]\n")
            .unwrap_err();
        assert!(err.contains("2 or 3"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        assert!(Config::from_toml_str("[renderer]\nresolutoin = 5\n").is_err());
    }

    #[test]
    fn test_list_source_requires_path() {
        let mut config = Config::default();
        config.source.kind = SourceKind::Pgn;
        assert!(matches!(config.validate(), Err(DatasetError::Config(_))));
    }

    #[test]
    fn test_omitted_seed_keeps_default() {
        let config = Config::from_toml_str("[dataset]\nnum_games = 2\n").unwrap();
        assert_eq!(config.dataset.seed, Some(42));
    }

    #[test]
    fn test_random_seed_opts_into_entropy() {
        let config = Config::from_toml_str("[dataset]\nseed = \"random\"\n").unwrap();
        assert_eq!(config.dataset.seed, None);

        let config = Config::from_toml_str("[dataset]\nseed = 7\n").unwrap();
        assert_eq!(config.dataset.seed, Some(7));

        assert!(Config::from_toml_str("[dataset]\nseed = \"lucky\"\n").is_err());
    }

    #[test]
    fn test_random_seed_survives_toml_round_trip() {
        let mut config = Config::default();
        config.dataset.seed = None;
        let text = toml::to_string(&config).unwrap();
        assert!(text.contains("seed = \"random\""));
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_empty_plies() {
        let mut config = Config::default();
        config.dataset.plies_options.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_compression_inferred_from_extension() {
        let mut source = SourceConfig {
            kind: SourceKind::FenList,
            path: Some(PathBuf::from("fens.txt.zst")),
            ..SourceConfig::default()
        };
        assert_eq!(source.compression_mode().unwrap(), CompressionMode::Zstd);

        source.compression = Some("bogus".into());
        assert!(source.compression_mode().is_err());
    }
}
