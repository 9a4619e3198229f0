//! Unopinionated standalone utilities.

mod bits;
pub use bits::BitGrid;

mod geom;
pub use geom::{bresenham_line, Quadrant, VecExt, DIR_4, DIR_8, QUADRANTS};

mod grid;
pub use grid::Grid;

mod rng;
pub use rng::srng;

pub type FastHasher = rustc_hash::FxHasher;

/// Map with an efficient hash function.
pub use rustc_hash::FxHashMap as HashMap;

/// Set with an efficient hash function.
pub use rustc_hash::FxHashSet as HashSet;

/// Good default concrete rng.
pub type GameRng = rand_xorshift::XorShiftRng;
