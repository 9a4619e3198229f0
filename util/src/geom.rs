use glam::{ivec2, IVec2};
use serde::{Deserialize, Serialize};

/// 8 directions, clock face order.
pub const DIR_8: [IVec2; 8] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([1, 1]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 1]),
    IVec2::from_array([-1, 0]),
    IVec2::from_array([-1, -1]),
];

/// 4 directions, clock face order.
pub const DIR_4: [IVec2; 4] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 0]),
];

pub trait VecExt: Sized {
    /// Absolute size of vector in taxicab metric.
    fn taxi_len(&self) -> i32;

    /// Absolute size of vector in chessboard metric.
    fn chess_len(&self) -> i32;

    /// Vec points to an adjacent cell, left, right, up or down.
    fn is_adjacent(&self) -> bool {
        self.taxi_len() == 1
    }
}

impl VecExt for IVec2 {
    fn taxi_len(&self) -> i32 {
        self.x.abs() + self.y.abs()
    }

    fn chess_len(&self) -> i32 {
        self.x.abs().max(self.y.abs())
    }
}

/// One of the four diagonal quarter-planes around an origin.
///
/// The map uses screen coordinates, y grows south, so `Ne` covers deltas
/// with `dx >= 0 && dy <= 0`. Axis-aligned deltas sit on the boundary of
/// two quadrants and resolve to the first match in this order.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize,
)]
pub enum Quadrant {
    Ne,
    Se,
    Sw,
    Nw,
}

use Quadrant::*;

pub const QUADRANTS: [Quadrant; 4] = [Ne, Se, Sw, Nw];

impl Quadrant {
    pub fn from_delta(d: impl Into<IVec2>) -> Self {
        let d = d.into();
        Self::from_signs(d.x, d.y)
    }

    /// Quadrant from the signs of an x and y displacement.
    pub fn from_signs(dx: i32, dy: i32) -> Self {
        match (dx >= 0, dy <= 0) {
            (true, true) => Ne,
            (true, false) => Se,
            (false, false) => Sw,
            (false, true) => Nw,
        }
    }

    /// The two unit steps whose span covers this quadrant.
    pub fn unit_steps(self) -> [IVec2; 2] {
        match self {
            Ne => [ivec2(0, -1), ivec2(1, 0)],
            Se => [ivec2(0, 1), ivec2(1, 0)],
            Sw => [ivec2(0, 1), ivec2(-1, 0)],
            Nw => [ivec2(0, -1), ivec2(-1, 0)],
        }
    }

    /// The diagonal step into this quadrant.
    pub fn diag_step(self) -> IVec2 {
        let [a, b] = self.unit_steps();
        a + b
    }
}

pub fn bresenham_line(
    a: impl Into<IVec2>,
    b: impl Into<IVec2>,
) -> impl Iterator<Item = IVec2> {
    let (a, b): (IVec2, IVec2) = (a.into(), b.into());

    let d = b - a;
    let step = d.signum();
    let d = d.abs() * ivec2(1, -1);
    let mut p = a;
    let mut err = d.x + d.y;

    std::iter::from_fn(move || {
        if p == b {
            None
        } else {
            let ret = p;

            let e2 = 2 * err;
            if e2 >= d.y {
                err += d.y;
                p.x += step.x;
            }
            if e2 <= d.x {
                err += d.x;
                p.y += step.y;
            }
            Some(ret)
        }
    })
}
