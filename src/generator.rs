use chrono::Utc;
use log::{debug, info};
use rand::RngCore;
use rand::seq::IndexedRandom;

use crate::allocator::ViewAllocator;
use crate::config::Config;
use crate::error::{DatasetError, Result};
use crate::indexer::{MAX_GAME_INDEX, game_dir_name, next_start_index};
use crate::render::Renderer;
use crate::source::PositionSource;
use crate::types::{GameMetadata, Viewpoint};
use crate::writer::GameWriter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub start_index: u32,
    pub games_written: u32,
    pub games_skipped: u32,
    pub frames_written: u64,
    pub white_games: u32,
    pub black_games: u32,
}

/// One generation run: picks up after the highest existing game folder and writes
/// `num_games` new ones, rendering every position through `renderer`.
pub struct Generator<R, G> {
    config: Config,
    renderer: R,
    source: Box<dyn PositionSource>,
    rng: G,
}

impl<R: Renderer, G: RngCore> Generator<R, G> {
    pub fn new(config: Config, renderer: R, source: Box<dyn PositionSource>, rng: G) -> Self {
        Self {
            config,
            renderer,
            source,
            rng,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        let dataset = &self.config.dataset;
        let root = dataset.output_root.clone();
        let start = next_start_index(&root)?;
        let end = start
            .checked_add(dataset.num_games)
            .filter(|&end| end <= MAX_GAME_INDEX + 1)
            .ok_or_else(|| {
                DatasetError::Config(format!(
                    "cannot write {} games starting at {}: indices above {} are not 4-digit folder names",
                    dataset.num_games,
                    game_dir_name(start),
                    MAX_GAME_INDEX
                ))
            })?;

        let mut allocator = ViewAllocator::new(
            dataset.num_games as usize,
            dataset.enforce_view_balance,
            dataset.view_options.clone(),
            dataset.views_per_position_options.clone(),
        );

        info!(
            "Generating games {}..{} into {} (source: {})",
            game_dir_name(start),
            game_dir_name(end),
            root.display(),
            self.source.kind()
        );

        let mut summary = RunSummary {
            start_index: start,
            ..RunSummary::default()
        };

        for game_index in start..end {
            let game_dir = root.join(game_dir_name(game_index));
            if game_dir.exists() {
                info!("[Game {game_index:04}] {} already exists, skipping", game_dir.display());
                summary.games_skipped += 1;
                continue;
            }

            let viewpoint = allocator.choose_view(&mut self.rng);
            let positions = *self
                .config
                .dataset
                .plies_options
                .choose(&mut self.rng)
                .ok_or_else(|| DatasetError::Config("dataset.plies_options is empty".into()))?;
            let view_count = allocator.choose_view_count(&mut self.rng);

            info!(
                "[Game {game_index:04}] view={viewpoint} positions={positions} views_per_position={}",
                view_count.get()
            );

            self.source.begin_game();
            let mut writer = GameWriter::create(&game_dir)?;
            for ply in 0..positions {
                let position = self.source.next_position(&mut self.rng)?;
                let outputs = self.renderer.render(&position, viewpoint)?;
                let kept = writer.record(&position, &outputs, view_count, &mut self.rng)?;
                debug!("[Game {game_index:04}] ply {ply}: kept {kept} of {} images", outputs.len());
            }

            let frames = writer.frames();
            let metadata = GameMetadata {
                game_index,
                viewpoint,
                positions,
                views_per_position: view_count,
                frames,
                resolution: self.config.renderer.resolution,
                samples: self.config.renderer.samples,
                source: self.source.kind(),
                created_at: Utc::now().to_rfc3339(),
            };
            writer.finish(&metadata)?;
            info!("[OK] {} ({frames} frames)", game_dir.display());

            summary.games_written += 1;
            summary.frames_written += u64::from(frames);
            match viewpoint {
                Viewpoint::White => summary.white_games += 1,
                Viewpoint::Black => summary.black_games += 1,
            }
        }

        info!(
            "Done: {} games written, {} skipped, {} frames (white={}, black={})",
            summary.games_written,
            summary.games_skipped,
            summary.frames_written,
            summary.white_games,
            summary.black_games
        );
        Ok(summary)
    }
}
