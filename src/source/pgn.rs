use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::mem;
use std::ops::ControlFlow;
use std::path::Path;

use log::warn;
use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};

use crate::error::{DatasetError, Result};
use crate::types::Position;

/// Streaming PGN visitor (pgn-reader) that replays the mainline and records the
/// board field after every move. A `[FEN]` tag sets the starting position.
///
/// A game whose FEN tag or moves cannot be replayed yields `Err` with the reason;
/// the reader then skips to the next game.
pub struct PgnPositionVisitor {
    include_start: bool,
    positions: Vec<Position>,
    ply: usize,
}

impl PgnPositionVisitor {
    pub fn new(include_start: bool) -> Self {
        Self {
            include_start,
            positions: Vec::new(),
            ply: 0,
        }
    }

    fn push_board(&mut self, pos: &Chess) {
        let fen = Fen::from_position(pos, EnPassantMode::Legal).to_string();
        let board = fen.split(' ').next().unwrap_or(&fen);
        self.positions.push(Position::new(board));
    }
}

impl Visitor for PgnPositionVisitor {
    type Tags = Option<Chess>;
    type Movetext = Chess;
    type Output = std::result::Result<Vec<Position>, String>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.positions.clear();
        self.ply = 0;
        ControlFlow::Continue(None)
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        key: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        if key != b"FEN" {
            return ControlFlow::Continue(());
        }

        let start = Fen::from_ascii(value.as_bytes())
            .map_err(|e| format!("invalid FEN tag: {e}"))
            .and_then(|fen| {
                fen.into_position::<Chess>(CastlingMode::Chess960)
                    .map_err(|e| format!("illegal FEN tag: {e}"))
            });

        match start {
            Ok(pos) => {
                *tags = Some(pos);
                ControlFlow::Continue(())
            }
            Err(msg) => ControlFlow::Break(Err(msg)),
        }
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let pos = tags.unwrap_or_default();
        if self.include_start {
            self.push_board(&pos);
        }
        ControlFlow::Continue(pos)
    }

    fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn san(&mut self, pos: &mut Self::Movetext, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        self.ply += 1;
        match san_plus.san.to_move(pos) {
            Ok(m) => {
                pos.play_unchecked(m);
                self.push_board(pos);
                ControlFlow::Continue(())
            }
            Err(e) => ControlFlow::Break(Err(format!(
                "illegal move {} at ply {}: {}",
                san_plus, self.ply, e
            ))),
        }
    }

    fn end_game(&mut self, _: Self::Movetext) -> Self::Output {
        Ok(mem::take(&mut self.positions))
    }
}

/// Replays every game of a PGN stream and returns all recorded positions in order.
/// Games that fail to replay are skipped with a warning.
pub fn extract_positions<R: Read>(
    input: R,
    source_path: &Path,
    include_start: bool,
) -> Result<Vec<Position>> {
    let mut reader = Reader::new(input);
    let mut visitor = PgnPositionVisitor::new(include_start);
    let mut positions = Vec::new();
    let mut game_index = 0usize;

    loop {
        game_index += 1;
        match reader.read_game(&mut visitor) {
            Ok(Some(Ok(mut game))) => positions.append(&mut game),
            Ok(Some(Err(reason))) => {
                warn!(
                    "Skipping game: file='{}'; game_index={}; error={}",
                    source_path.display(),
                    game_index,
                    reason
                );
            }
            Ok(None) => break,
            Err(error) => {
                return Err(DatasetError::Pgn {
                    path: source_path.to_path_buf(),
                    message: format!("game_index={game_index}: {error}"),
                });
            }
        }
    }

    Ok(positions)
}

/// Writes one board field per line, the format `FixedListSource::load` reads.
pub fn write_position_list(positions: &[Position], out: &Path) -> Result<usize> {
    let file = File::create(out).map_err(|e| DatasetError::io(out, e))?;
    let mut writer = BufWriter::new(file);
    for position in positions {
        writeln!(writer, "{position}").map_err(|e| DatasetError::io(out, e))?;
    }
    writer.flush().map_err(|e| DatasetError::io(out, e))?;
    Ok(positions.len())
}
