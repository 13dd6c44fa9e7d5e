use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use chess_dataset::config::Config;
use chess_dataset::generator::Generator;
use chess_dataset::indexer::next_start_index;
use chess_dataset::normalize::normalize_dataset;
use chess_dataset::render::SubprocessRenderer;
use chess_dataset::source::{self, CompressionMode, extract_positions, open_input_stream};
use chess_dataset::types::SourceKind;

#[derive(Parser, Debug)]
#[command(author, version, about = "Synthetic chess image dataset generator")]
struct Cli {
    /// TOML configuration file; built-in defaults otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Less log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render new games after the highest existing game folder
    Generate(GenerateArgs),
    /// Write gt.csv for every game folder
    Normalize {
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Expand PGN mainlines into a one-FEN-per-line list
    ExtractFens {
        #[arg(long)]
        pgn: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Also emit the position before the first move of each game
        #[arg(long)]
        include_start: bool,
    },
    /// Print the next unused game index
    NextIndex {
        #[arg(long)]
        root: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    output_root: Option<PathBuf>,
    #[arg(long)]
    num_games: Option<u32>,
    #[arg(long, conflicts_with = "random_seed")]
    seed: Option<u64>,
    /// Seed from OS entropy, ignoring any configured seed
    #[arg(long)]
    random_seed: bool,
    #[arg(long, value_enum)]
    source: Option<SourceArg>,
    /// FEN list or PGN file for list sources
    #[arg(long)]
    positions: Option<PathBuf>,
    #[arg(long)]
    staging_dir: Option<PathBuf>,
    #[arg(long)]
    resolution: Option<u32>,
    #[arg(long)]
    samples: Option<u32>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Draw viewpoints uniformly instead of enforcing an exact white/black split
    #[arg(long)]
    no_balance: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SourceArg {
    Simulated,
    FenList,
    Pgn,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Simulated => Self::Simulated,
            SourceArg::FenList => Self::FenList,
            SourceArg::Pgn => Self::Pgn,
        }
    }
}

impl GenerateArgs {
    fn apply(self, config: &mut Config) {
        let dataset = &mut config.dataset;
        let renderer = &mut config.renderer;

        if let Some(root) = self.output_root {
            dataset.output_root = root;
        }
        if let Some(n) = self.num_games {
            dataset.num_games = n;
        }
        if self.random_seed {
            dataset.seed = None;
        } else if self.seed.is_some() {
            dataset.seed = self.seed;
        }
        if self.no_balance {
            dataset.enforce_view_balance = false;
        }
        if let Some(kind) = self.source {
            config.source.kind = kind.into();
        }
        if let Some(path) = self.positions {
            config.source.path = Some(path);
        }
        if let Some(dir) = self.staging_dir {
            renderer.staging_dir = dir;
        }
        if let Some(resolution) = self.resolution {
            renderer.resolution = resolution;
        }
        if let Some(samples) = self.samples {
            renderer.samples = samples;
        }
        if let Some(secs) = self.timeout_secs {
            renderer.timeout_secs = secs;
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn generate(mut config: Config, args: GenerateArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let seed = config.dataset.seed.unwrap_or_else(rand::random);
    log::info!("Using seed {seed}");
    let rng = Xoshiro256PlusPlus::seed_from_u64(seed);

    let source = source::from_config(&config.source).context("failed to open position source")?;
    let renderer = SubprocessRenderer::from_config(&config.renderer);

    let mut generator = Generator::new(config, renderer, source, rng);
    let summary = generator.run().context("generation aborted")?;

    println!(
        "games_written={} games_skipped={} frames={} white={} black={} start_index={}",
        summary.games_written,
        summary.games_skipped,
        summary.frames_written,
        summary.white_games,
        summary.black_games,
        summary.start_index
    );
    Ok(())
}

/// `-v` count minus `-q` count, saturating at the `i8` range.
fn verbosity(verbose: u8, quiet: u8) -> i8 {
    let up = i8::try_from(verbose).unwrap_or(i8::MAX);
    let down = i8::try_from(quiet).unwrap_or(i8::MAX);
    up.saturating_sub(down)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    chess_dataset::log::init(verbosity(cli.verbose, cli.quiet));

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Generate(args) => generate(config, args)?,
        Command::Normalize { root } => {
            let root = root.unwrap_or(config.dataset.output_root);
            let summary = normalize_dataset(&root)
                .with_context(|| format!("failed to normalize {}", root.display()))?;
            println!(
                "games_scanned={} games_written={} games_skipped={} rows_written={} rows_dropped={}",
                summary.games_scanned,
                summary.games_written,
                summary.games_skipped,
                summary.rows_written,
                summary.rows_dropped
            );
        }
        Command::ExtractFens {
            pgn,
            out,
            include_start,
        } => {
            let input = open_input_stream(&pgn, CompressionMode::for_path(&pgn))?;
            let positions = extract_positions(input, &pgn, include_start)
                .with_context(|| format!("failed to read {}", pgn.display()))?;
            let written = source::write_position_list(&positions, &out)?;
            log::info!("Wrote {} positions to {}", written, out.display());
            println!("{written}");
        }
        Command::NextIndex { root } => {
            let root = root.unwrap_or(config.dataset.output_root);
            println!("{}", next_start_index(&root)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_args(args: &[&str]) -> GenerateArgs {
        let argv = ["chess-dataset", "generate"].into_iter().chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Generate(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_random_seed_flag_clears_configured_seed() {
        let mut config = Config::default();
        generate_args(&["--random-seed"]).apply(&mut config);
        assert_eq!(config.dataset.seed, None);
    }

    #[test]
    fn test_seed_flag_overrides_config() {
        let mut config = Config::default();
        generate_args(&["--seed", "9"]).apply(&mut config);
        assert_eq!(config.dataset.seed, Some(9));

        let mut config = Config::default();
        generate_args(&[]).apply(&mut config);
        assert_eq!(config.dataset.seed, Some(42));
    }

    #[test]
    fn test_seed_and_random_seed_conflict() {
        let parsed =
            Cli::try_parse_from(["chess-dataset", "generate", "--seed", "1", "--random-seed"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_verbosity_saturates() {
        assert_eq!(verbosity(2, 1), 1);
        assert_eq!(verbosity(0, 3), -3);
        assert_eq!(verbosity(255, 0), i8::MAX);
        assert_eq!(verbosity(127, 255), 0);
        assert_eq!(verbosity(0, 255), -127);
    }
}
