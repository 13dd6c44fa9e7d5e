//! Synthetic chess image dataset generation.
//!
//! A run walks a sequence of board positions (random legal games, a FEN list, or PGN
//! mainlines), renders each one through an external renderer, and files the images
//! under `game_NNNN/images/` with a per-game `game.csv`. The [`normalize`] pass later
//! turns those logs into `gt.csv` ground truth.

pub mod allocator;
pub mod config;
pub mod error;
pub mod generator;
pub mod indexer;
pub mod log;
pub mod normalize;
pub mod render;
pub mod source;
pub mod types;
pub mod writer;

pub use config::Config;
pub use error::{DatasetError, Result};
pub use generator::{Generator, RunSummary};
pub use normalize::{NormalizeSummary, normalize_dataset};
pub use render::{Renderer, SubprocessRenderer};
pub use source::PositionSource;
pub use types::{Position, ViewCount, Viewpoint};
