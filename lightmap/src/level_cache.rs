use glam::IVec2;
use serde::{Deserialize, Serialize};
use util::{BitGrid, Grid, HashMap};

use crate::{submap_blocks, FourQuadrants, LitLevel};

/// Non-owning handle to a vehicle tracked by the map layer.
///
/// The cache stores these as back-references only; liveness is the
/// owner's problem, exactly like the tile-to-vehicle index it replaces.
#[derive(
    Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize,
)]
pub struct VehicleId(pub u32);

/// All per-tile caches for one z-level.
///
/// Constructed fully zeroed with every dirty flag raised, so the first
/// access after construction always goes through a rebuild instead of
/// reading garbage. Grids are mutated in place by the map layer; nothing
/// here allocates per query.
pub struct LevelCache {
    /// Per-tile attenuation coefficient, fields included.
    pub transparency_cache: Grid<f32>,
    /// Attenuation without fields; feeds the reachability pre-filter.
    pub transparency_cache_wo_fields: Grid<f32>,
    /// Fraction of the tile the player can see, 0..1.
    pub seen_cache: Grid<f32>,
    /// Visibility through remote eyes: mirrors, cameras.
    pub camera_cache: Grid<f32>,
    /// Directional light accumulator.
    pub lm: Grid<FourQuadrants>,
    /// Tile is exposed to weather.
    pub outside_cache: Grid<bool>,
    /// Tile has a supporting floor; blocks sight across z-levels.
    pub floor_cache: Grid<bool>,
    /// Discretized apparent brightness, derived by the map layer.
    pub visibility_cache: Grid<LitLevel>,

    /// One bit per submap block.
    pub transparency_cache_dirty: BitGrid,
    pub outside_cache_dirty: bool,
    pub floor_cache_dirty: bool,

    veh_in_active_range: bool,
    veh_exists_at: Grid<bool>,
    veh_cached_parts: HashMap<IVec2, (VehicleId, usize)>,
    veh_cache_cleared: bool,
}

impl LevelCache {
    pub fn new(dim: impl Into<IVec2>) -> Self {
        let dim = dim.into();
        let mut transparency_cache_dirty = BitGrid::new(submap_blocks(dim));
        transparency_cache_dirty.set_all();

        LevelCache {
            transparency_cache: Grid::new(dim, 0.0),
            transparency_cache_wo_fields: Grid::new(dim, 0.0),
            seen_cache: Grid::new(dim, 0.0),
            camera_cache: Grid::new(dim, 0.0),
            lm: Grid::new(dim, FourQuadrants::default()),
            outside_cache: Grid::new(dim, false),
            floor_cache: Grid::new(dim, false),
            visibility_cache: Grid::new(dim, LitLevel::Dark),
            transparency_cache_dirty,
            outside_cache_dirty: true,
            floor_cache_dirty: true,
            veh_in_active_range: false,
            veh_exists_at: Grid::new(dim, false),
            veh_cached_parts: HashMap::default(),
            veh_cache_cleared: true,
        }
    }

    pub fn dim(&self) -> IVec2 {
        self.transparency_cache.dim()
    }

    /// Effective visibility of a tile: direct sight or any camera feed.
    pub fn seen(&self, p: IVec2) -> f32 {
        self.seen_cache.get(p).max(*self.camera_cache.get(p))
    }

    pub fn get_veh_in_active_range(&self) -> bool {
        self.veh_in_active_range
    }

    pub fn get_veh_exists_at(&self, p: IVec2) -> bool {
        *self.veh_exists_at.get(p)
    }

    pub fn get_veh_cached_parts(
        &self,
        p: IVec2,
    ) -> Option<(VehicleId, usize)> {
        self.veh_cached_parts.get(&p).copied()
    }

    pub fn set_veh_exists_at(&mut self, p: IVec2, exists: bool) {
        *self.veh_exists_at.get_mut(p) = exists;
        if exists {
            self.veh_in_active_range = true;
            self.veh_cache_cleared = false;
        }
    }

    pub fn set_veh_cached_parts(
        &mut self,
        p: IVec2,
        veh: VehicleId,
        part: usize,
    ) {
        self.veh_cached_parts.insert(p, (veh, part));
        self.veh_cache_cleared = false;
    }

    /// Forget every vehicle on the level. Repeated clears short-circuit.
    pub fn clear_vehicle_cache(&mut self) {
        if self.veh_cache_cleared {
            return;
        }
        self.veh_exists_at.fill(false);
        self.veh_cached_parts.clear();
        self.veh_in_active_range = false;
        self.veh_cache_cleared = true;
    }

    /// Drop a single back-reference, e.g. when a vehicle moves off a tile.
    /// A mismatched id is left alone.
    pub fn clear_veh_from_veh_cached_parts(
        &mut self,
        p: IVec2,
        veh: VehicleId,
    ) {
        if let Some((cached, _)) = self.veh_cached_parts.get(&p) {
            if *cached == veh {
                self.veh_cached_parts.remove(&p);
                *self.veh_exists_at.get_mut(p) = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec2;

    use super::*;

    #[test]
    fn starts_zeroed_and_dirty() {
        let cache = LevelCache::new([24, 24]);
        assert!(cache
            .transparency_cache
            .iter()
            .all(|(_, v)| *v == 0.0));
        assert!(cache.lm.iter().all(|(_, v)| v.max() == 0.0));
        assert!(cache
            .visibility_cache
            .iter()
            .all(|(_, v)| *v == LitLevel::Dark));
        assert_eq!(cache.transparency_cache_dirty.count(), 4);
        assert!(cache.outside_cache_dirty);
        assert!(cache.floor_cache_dirty);
        assert!(!cache.get_veh_in_active_range());
    }

    #[test]
    fn vehicle_index_roundtrip() {
        let mut cache = LevelCache::new([24, 24]);
        let p = ivec2(5, 7);
        let truck = VehicleId(3);

        cache.set_veh_exists_at(p, true);
        cache.set_veh_cached_parts(p, truck, 12);
        assert!(cache.get_veh_in_active_range());
        assert!(cache.get_veh_exists_at(p));
        assert_eq!(cache.get_veh_cached_parts(p), Some((truck, 12)));
        assert_eq!(cache.get_veh_cached_parts(ivec2(0, 0)), None);

        // Wrong id leaves the entry alone.
        cache.clear_veh_from_veh_cached_parts(p, VehicleId(9));
        assert_eq!(cache.get_veh_cached_parts(p), Some((truck, 12)));
        cache.clear_veh_from_veh_cached_parts(p, truck);
        assert_eq!(cache.get_veh_cached_parts(p), None);
        assert!(!cache.get_veh_exists_at(p));
    }

    #[test]
    fn clearing_twice_is_cheap_and_total() {
        let mut cache = LevelCache::new([24, 24]);
        cache.set_veh_exists_at(ivec2(1, 1), true);
        cache.set_veh_cached_parts(ivec2(1, 1), VehicleId(0), 0);
        cache.clear_vehicle_cache();
        assert!(!cache.get_veh_exists_at(ivec2(1, 1)));
        assert_eq!(cache.get_veh_cached_parts(ivec2(1, 1)), None);
        assert!(!cache.get_veh_in_active_range());
        // Second clear takes the short-circuit path.
        cache.clear_vehicle_cache();
        assert!(!cache.get_veh_in_active_range());
    }
}
