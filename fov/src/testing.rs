//! Shared fixtures for the caster tests.

use util::Quadrant;

use crate::Radiance;

/// Open-air attenuation coefficient used by the test beam.
pub const OPEN_AIR: f32 = 0.038376418;

/// Minimal exponential-falloff payload: transparency is an attenuation
/// coefficient, zero is opaque.
pub struct Beam;

impl Radiance for Beam {
    type Value = f32;
    type Cell = f32;

    fn neutral() -> f32 {
        OPEN_AIR
    }

    fn calc(numerator: f32, cumulative: f32, dist: i32) -> f32 {
        numerator / (cumulative * dist as f32).exp()
    }

    fn check(transparency: f32, _intensity: f32) -> bool {
        transparency > 0.0
    }

    fn accumulate(cumulative: f32, current: f32, dist: i32) -> f32 {
        ((dist - 1) as f32 * cumulative + current) / dist as f32
    }

    fn update(cell: &mut f32, value: f32, _q: Quadrant) {
        *cell = cell.max(value);
    }
}

pub fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-6
}
