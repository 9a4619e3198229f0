use derive_more::{Deref, DerefMut};
use fov::Radiance;
use serde::{Deserialize, Serialize};
use util::Quadrant;

use crate::{LIGHT_TRANSPARENCY_OPEN_AIR, LIGHT_TRANSPARENCY_SOLID};

/// Apparent brightness below which a tile reads as pitch dark.
pub const LIGHT_AMBIENT_LOW: f32 = 3.5;
/// Enough light for night-vision to resolve detail.
pub const LIGHT_AMBIENT_DIM: f32 = 5.0;
/// Comfortable reading light.
pub const LIGHT_AMBIENT_LIT: f32 = 10.0;
/// Direct light source territory.
pub const LIGHT_SOURCE_BRIGHT: f32 = 20.0;

/// Per-tile light split by the quadrant it arrived from, so the two
/// visible faces of a wall corner can shade differently.
#[derive(
    Copy, Clone, PartialEq, Default, Debug, Deref, DerefMut, Serialize,
    Deserialize,
)]
pub struct FourQuadrants([f32; 4]);

impl FourQuadrants {
    pub fn new(value: f32) -> Self {
        FourQuadrants([value; 4])
    }

    /// Max-merge a light contribution arriving from quadrant `q`.
    pub fn update(&mut self, q: Quadrant, value: f32) {
        let i = q as usize;
        self.0[i] = self.0[i].max(value);
    }

    /// Brightest face; what an omnidirectional observer reads.
    pub fn max(&self) -> f32 {
        self.0.iter().copied().fold(0.0, f32::max)
    }
}

impl std::ops::Index<Quadrant> for FourQuadrants {
    type Output = f32;

    fn index(&self, q: Quadrant) -> &f32 {
        &self.0[q as usize]
    }
}

/// Discretized apparent brightness of a tile.
#[derive(
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Serialize,
    Deserialize,
)]
pub enum LitLevel {
    #[default]
    Dark,
    /// Hazy shapes only.
    Low,
    /// Resolvable with night vision.
    BrightOnly,
    Lit,
    Bright,
}

/// Bucket an apparent brightness value.
pub fn lit_level(apparent: f32) -> LitLevel {
    if apparent >= LIGHT_SOURCE_BRIGHT {
        LitLevel::Bright
    } else if apparent >= LIGHT_AMBIENT_LIT {
        LitLevel::Lit
    } else if apparent >= LIGHT_AMBIENT_DIM {
        LitLevel::BrightOnly
    } else if apparent >= LIGHT_AMBIENT_LOW {
        LitLevel::Low
    } else {
        LitLevel::Dark
    }
}

fn exponential_falloff(numerator: f32, cumulative: f32, dist: i32) -> f32 {
    numerator / (cumulative * dist as f32).exp()
}

fn rolling_mean(cumulative: f32, current: f32, dist: i32) -> f32 {
    ((dist - 1) as f32 * cumulative + current) / dist as f32
}

/// Sight propagation into a scalar seen-fraction grid.
pub struct Sight;

impl Radiance for Sight {
    type Value = f32;
    type Cell = f32;

    fn neutral() -> f32 {
        LIGHT_TRANSPARENCY_OPEN_AIR
    }

    fn calc(numerator: f32, cumulative: f32, dist: i32) -> f32 {
        exponential_falloff(numerator, cumulative, dist)
    }

    fn check(transparency: f32, _intensity: f32) -> bool {
        transparency > LIGHT_TRANSPARENCY_SOLID
    }

    fn accumulate(cumulative: f32, current: f32, dist: i32) -> f32 {
        rolling_mean(cumulative, current, dist)
    }

    fn update(cell: &mut f32, value: f32, _q: Quadrant) {
        *cell = cell.max(value);
    }
}

/// Light propagation into the directional lightmap.
pub struct Light;

impl Radiance for Light {
    type Value = f32;
    type Cell = FourQuadrants;

    fn neutral() -> f32 {
        LIGHT_TRANSPARENCY_OPEN_AIR
    }

    fn calc(numerator: f32, cumulative: f32, dist: i32) -> f32 {
        exponential_falloff(numerator, cumulative, dist)
    }

    fn check(transparency: f32, _intensity: f32) -> bool {
        transparency > LIGHT_TRANSPARENCY_SOLID
    }

    fn accumulate(cumulative: f32, current: f32, dist: i32) -> f32 {
        rolling_mean(cumulative, current, dist)
    }

    fn update(cell: &mut FourQuadrants, value: f32, q: Quadrant) {
        cell.update(q, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_quadrants_merge() {
        let mut fq = FourQuadrants::default();
        fq.update(Quadrant::Ne, 4.0);
        fq.update(Quadrant::Sw, 7.0);
        fq.update(Quadrant::Sw, 2.0);
        assert_eq!(fq[Quadrant::Ne], 4.0);
        assert_eq!(fq[Quadrant::Sw], 7.0);
        assert_eq!(fq[Quadrant::Se], 0.0);
        assert_eq!(fq.max(), 7.0);
    }

    #[test]
    fn lit_level_buckets() {
        assert_eq!(lit_level(0.0), LitLevel::Dark);
        assert_eq!(lit_level(LIGHT_AMBIENT_LOW), LitLevel::Low);
        assert_eq!(lit_level(LIGHT_AMBIENT_DIM), LitLevel::BrightOnly);
        assert_eq!(lit_level(LIGHT_AMBIENT_LIT), LitLevel::Lit);
        assert_eq!(lit_level(60.0), LitLevel::Bright);
    }

    #[test]
    fn open_air_is_transparent() {
        assert!(Sight::check(LIGHT_TRANSPARENCY_OPEN_AIR, 1.0));
        assert!(!Sight::check(LIGHT_TRANSPARENCY_SOLID, 1.0));
    }
}
