#![feature(int_roundings)]
//! Per-z-level cache storage and the sight machinery built on it.
//!
//! A [`LevelCache`] owns the dense per-tile grids for one z-slice:
//! transparency, light, visibility, floor and outside flags and the
//! vehicle back-reference index. The [`Map`] facade owns one cache per
//! level plus the reachability pre-filters, and bundles terrain mutation
//! with cache invalidation so the two cannot drift apart.

use glam::{ivec2, IVec2};

mod fragment;
pub use fragment::{FragmentCloud, FragmentRadiance};

mod level_cache;
pub use level_cache::{LevelCache, VehicleId};

mod light;
pub use light::{
    lit_level, FourQuadrants, Light, LitLevel, Sight, LIGHT_AMBIENT_DIM,
    LIGHT_AMBIENT_LIT, LIGHT_AMBIENT_LOW, LIGHT_SOURCE_BRIGHT,
};

mod map;
pub use map::Map;

mod reachability;
pub use reachability::{HorizontalReach, VerticalReach, MAX_D};

/// Submap block width in tiles; dirty tracking granularity.
pub const SEEX: i32 = 12;
/// Submap block height in tiles.
pub const SEEY: i32 = 12;
/// Map edge length in submaps.
pub const MAPSIZE: i32 = 11;
pub const MAPSIZE_X: i32 = SEEX * MAPSIZE;
pub const MAPSIZE_Y: i32 = SEEY * MAPSIZE;

/// Z-levels below the surface level.
pub const OVERMAP_DEPTH: i32 = 10;
/// Z-levels above the surface level.
pub const OVERMAP_HEIGHT: i32 = 10;
pub const OVERMAP_LAYERS: i32 = OVERMAP_DEPTH + OVERMAP_HEIGHT + 1;

/// Attenuation coefficient of clear air.
pub const LIGHT_TRANSPARENCY_OPEN_AIR: f32 = 0.038376418;
/// Transparency value of a fully opaque tile.
pub const LIGHT_TRANSPARENCY_SOLID: f32 = 0.0;

/// Default vertical reach of 3D field of view, in z-levels.
pub const DEFAULT_FOV_3D_Z_RANGE: i32 = 4;

/// Dimensions of the submap block lattice covering a tile grid.
pub fn submap_blocks(dim: IVec2) -> IVec2 {
    ivec2(dim.x.div_ceil(SEEX), dim.y.div_ceil(SEEY))
}

/// The submap block a tile belongs to.
pub fn block_of(p: IVec2) -> IVec2 {
    ivec2(p.x.div_euclid(SEEX), p.y.div_euclid(SEEY))
}
