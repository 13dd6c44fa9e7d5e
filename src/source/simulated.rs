use rand::{Rng, RngCore};
use shakmaty::fen::Fen;
use shakmaty::{Chess, EnPassantMode, Position as _};

use super::PositionSource;
use crate::error::Result;
use crate::types::{Position, SourceKind};

/// Halfmove clock at which the 75-move rule ends the game.
const SEVENTY_FIVE_MOVE_HALFMOVES: u32 = 150;

/// Random legal playout: every call yields the current board and then plays one
/// uniformly chosen legal move, restarting from the initial position when the
/// game is over.
pub struct SimulatedGameSource {
    pos: Chess,
}

impl SimulatedGameSource {
    pub fn new() -> Self {
        Self {
            pos: Chess::default(),
        }
    }

    fn board_field(pos: &Chess) -> Position {
        let fen = Fen::from_position(pos, EnPassantMode::Legal).to_string();
        let board = fen.split(' ').next().unwrap_or(&fen);
        Position::new(board)
    }

    fn is_terminal(pos: &Chess) -> bool {
        pos.is_game_over() || pos.halfmoves() >= SEVENTY_FIVE_MOVE_HALFMOVES
    }

    fn advance(&mut self, rng: &mut dyn RngCore) {
        if Self::is_terminal(&self.pos) {
            self.pos = Chess::default();
        }

        let legal = self.pos.legal_moves();
        if legal.is_empty() {
            return;
        }
        let m = legal[rng.random_range(0..legal.len())].clone();
        self.pos.play_unchecked(m);
    }
}

impl Default for SimulatedGameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for SimulatedGameSource {
    fn begin_game(&mut self) {
        self.pos = Chess::default();
    }

    fn next_position(&mut self, rng: &mut dyn RngCore) -> Result<Position> {
        let current = Self::board_field(&self.pos);
        self.advance(rng);
        Ok(current)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Simulated
    }
}
