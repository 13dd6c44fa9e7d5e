use rand::Rng;
use rand::seq::IndexedRandom;

use crate::types::{ViewCount, Viewpoint};

/// Per-game choice of camera viewpoint and number of kept angles.
///
/// With balance enforcement the allocator holds a white/black budget seeded from
/// the run's game count (`n / 2` white, the remainder black). Each allocation
/// spends one unit; once a side is exhausted the other side is forced, so after
/// exactly `n` allocations the split is exact.
#[derive(Debug, Clone)]
pub struct ViewAllocator {
    enforce_balance: bool,
    remaining_white: usize,
    remaining_black: usize,
    view_options: Vec<Viewpoint>,
    view_count_options: Vec<ViewCount>,
}

impl ViewAllocator {
    pub fn new(
        num_games: usize,
        enforce_balance: bool,
        view_options: Vec<Viewpoint>,
        view_count_options: Vec<ViewCount>,
    ) -> Self {
        let remaining_white = num_games / 2;
        Self {
            enforce_balance,
            remaining_white,
            remaining_black: num_games - remaining_white,
            view_options,
            view_count_options,
        }
    }

    pub fn choose_view<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Viewpoint {
        if !self.enforce_balance {
            return self
                .view_options
                .choose(rng)
                .copied()
                .unwrap_or(Viewpoint::White);
        }

        let view = if self.remaining_white == 0 {
            Viewpoint::Black
        } else if self.remaining_black == 0 {
            Viewpoint::White
        } else if rng.random_bool(0.5) {
            Viewpoint::White
        } else {
            Viewpoint::Black
        };

        match view {
            Viewpoint::White => self.remaining_white = self.remaining_white.saturating_sub(1),
            Viewpoint::Black => self.remaining_black = self.remaining_black.saturating_sub(1),
        }
        view
    }

    pub fn choose_view_count<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ViewCount {
        self.view_count_options
            .choose(rng)
            .copied()
            .unwrap_or(ViewCount::THREE)
    }

    /// `(remaining_white, remaining_black)`.
    pub fn remaining(&self) -> (usize, usize) {
        (self.remaining_white, self.remaining_black)
    }
}
