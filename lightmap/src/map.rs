use glam::{IVec2, IVec3};
use util::{bresenham_line, Grid};

use fov::{cast_light_all, cast_zlight};

use crate::{
    block_of, lit_level, HorizontalReach, LevelCache, Light, LitLevel, Sight,
    VerticalReach, DEFAULT_FOV_3D_Z_RANGE, LIGHT_TRANSPARENCY_SOLID,
    MAPSIZE_X, MAPSIZE_Y, OVERMAP_LAYERS,
};

type SightSplit = for<'a> fn(
    &'a mut LevelCache,
) -> (&'a mut Grid<f32>, &'a Grid<f32>, &'a Grid<bool>);

fn seen_split(
    level: &mut LevelCache,
) -> (&mut Grid<f32>, &Grid<f32>, &Grid<bool>) {
    (
        &mut level.seen_cache,
        &level.transparency_cache,
        &level.floor_cache,
    )
}

fn camera_split(
    level: &mut LevelCache,
) -> (&mut Grid<f32>, &Grid<f32>, &Grid<bool>) {
    (
        &mut level.camera_cache,
        &level.transparency_cache,
        &level.floor_cache,
    )
}

/// Owning facade over the per-level caches.
///
/// Terrain-shaped state flows in through the mutators here, which pair
/// every cache write with the matching invalidation, so a derived cache
/// can never silently go stale against the terrain it was computed from.
pub struct Map {
    z_range: i32,
    levels: Vec<LevelCache>,
    horizontal_reach: Vec<HorizontalReach>,
    /// `vertical_reach[i]` pre-filters sight between levels `i` and
    /// `i + 1`.
    vertical_reach: Vec<VerticalReach>,
}

impl Default for Map {
    /// Production-sized map: the full z-level stack over the standard
    /// reality bubble footprint.
    fn default() -> Self {
        Map::new(
            OVERMAP_LAYERS as usize,
            glam::ivec2(MAPSIZE_X, MAPSIZE_Y),
        )
    }
}

impl Map {
    pub fn new(levels: usize, dim: impl Into<IVec2>) -> Self {
        assert!(levels > 0, "map needs at least one z-level");
        let dim = dim.into();
        Map {
            z_range: DEFAULT_FOV_3D_Z_RANGE,
            levels: (0..levels).map(|_| LevelCache::new(dim)).collect(),
            horizontal_reach: (0..levels)
                .map(|_| HorizontalReach::new(dim))
                .collect(),
            vertical_reach: (0..levels.saturating_sub(1))
                .map(|_| VerticalReach::new(dim))
                .collect(),
        }
    }

    /// How many z-levels up or down field of view may reach.
    pub fn set_fov_3d_z_range(&mut self, z_range: i32) {
        self.z_range = z_range;
    }

    pub fn level(&self, z: i32) -> &LevelCache {
        &self.levels[z as usize]
    }

    fn zlevel_ok(&self, z: i32) -> bool {
        z >= 0 && (z as usize) < self.levels.len()
    }

    /// Set a tile's attenuation coefficient on both transparency grids.
    pub fn set_transparency(&mut self, p: IVec3, transparency: f32) {
        let z = p.z as usize;
        let p2 = p.truncate();
        let level = &mut self.levels[z];
        *level.transparency_cache.get_mut(p2) = transparency;
        *level.transparency_cache_wo_fields.get_mut(p2) = transparency;
        level.transparency_cache_dirty.insert(block_of(p2));

        self.horizontal_reach[z].invalidate_at(p2);
        if z >= 1 {
            self.vertical_reach[z - 1].invalidate_at(p2);
        }
        if z < self.vertical_reach.len() {
            self.vertical_reach[z].invalidate_at(p2);
        }
    }

    /// Set or clear a tile's supporting floor.
    pub fn set_floor(&mut self, p: IVec3, floor: bool) {
        let z = p.z as usize;
        let p2 = p.truncate();
        let level = &mut self.levels[z];
        *level.floor_cache.get_mut(p2) = floor;
        level.floor_cache_dirty = true;

        // This floor is the gap bit of the pair below it, and the roof of
        // the level below.
        if z >= 1 {
            self.vertical_reach[z - 1].invalidate_at(p2);
            self.levels[z - 1].outside_cache_dirty = true;
        }
    }

    /// Recompute the player's seen fractions from `origin`.
    pub fn build_seen_cache(&mut self, origin: IVec3) {
        log::debug!("rebuilding seen cache from {origin}");
        for level in &mut self.levels {
            level.seen_cache.fill(0.0);
        }
        self.cast_sight_into(origin, seen_split);
    }

    /// Merge a remote viewpoint (camera, mirror) into the camera cache.
    /// Multiple viewpoints accumulate; use [`Map::clear_camera_cache`]
    /// between rebuild cycles.
    pub fn build_camera_cache(&mut self, origin: IVec3) {
        self.cast_sight_into(origin, camera_split);
    }

    pub fn clear_camera_cache(&mut self) {
        for level in &mut self.levels {
            level.camera_cache.fill(0.0);
        }
    }

    fn cast_sight_into(&mut self, origin: IVec3, split: SightSplit) {
        assert!(self.zlevel_ok(origin.z));
        let mut outs: Vec<&mut Grid<f32>> =
            Vec::with_capacity(self.levels.len());
        let mut ins: Vec<&Grid<f32>> = Vec::with_capacity(self.levels.len());
        let mut floors: Vec<&Grid<bool>> =
            Vec::with_capacity(self.levels.len());
        for level in &mut self.levels {
            let (out, transparency, floor) = split(level);
            outs.push(out);
            ins.push(transparency);
            floors.push(floor);
        }
        cast_zlight::<Sight>(
            &mut outs,
            &ins,
            &floors,
            origin,
            0,
            1.0,
            self.z_range,
        );
    }

    /// Cast one light source into the directional lightmap of its level.
    pub fn apply_light_source(&mut self, p: IVec3, luminance: f32) {
        assert!(self.zlevel_ok(p.z));
        let level = &mut self.levels[p.z as usize];
        let LevelCache {
            lm,
            transparency_cache,
            ..
        } = level;
        cast_light_all::<Light>(
            lm,
            transparency_cache,
            p.truncate(),
            0,
            luminance,
        );
    }

    /// Effective visibility of a tile: direct sight or any camera feed.
    pub fn seen(&self, p: IVec3) -> f32 {
        self.levels[p.z as usize].seen(p.truncate())
    }

    /// Discretized apparent brightness; also recorded in the level's
    /// visibility cache. Unseen tiles read as dark no matter how lit.
    pub fn visibility_at(&mut self, p: IVec3) -> LitLevel {
        let level = &mut self.levels[p.z as usize];
        let p2 = p.truncate();
        let lit = if level.seen(p2) > 0.0 {
            lit_level(level.lm.get(p2).max())
        } else {
            LitLevel::Dark
        };
        *level.visibility_cache.get_mut(p2) = lit;
        lit
    }

    /// Recompute weather exposure for one level from the roofs above it.
    pub fn build_outside_cache(&mut self, z: i32) {
        assert!(self.zlevel_ok(z));
        let zi = z as usize;
        if !self.levels[zi].outside_cache_dirty {
            return;
        }
        if zi + 1 < self.levels.len() {
            let (below, above) = self.levels.split_at_mut(zi + 1);
            let level = &mut below[zi];
            let roof = &above[0].floor_cache;
            for p in level.outside_cache.points() {
                *level.outside_cache.get_mut(p) = !*roof.get(p);
            }
        } else {
            self.levels[zi].outside_cache.fill(true);
        }
        self.levels[zi].outside_cache_dirty = false;
    }

    /// Can `from` see `to`? Reachability pre-filter first, precise walk
    /// only when the filter cannot rule the pair out.
    pub fn sees(&mut self, from: IVec3, to: IVec3) -> bool {
        if !self.zlevel_ok(from.z) || !self.zlevel_ok(to.z) {
            return false;
        }
        let (from2, to2) = (from.truncate(), to.truncate());

        if from.z == to.z {
            let z = from.z as usize;
            if !self.horizontal_reach[z].has_potential_los(
                from2,
                to2,
                &self.levels[z],
            ) {
                return false;
            }
            let transparency = &self.levels[z].transparency_cache;
            return bresenham_line(from2, to2)
                .skip(1)
                .all(|p| *transparency.get(p) > LIGHT_TRANSPARENCY_SOLID);
        }

        if (to.z - from.z).abs() > self.z_range {
            return false;
        }
        if !self.levels[0].transparency_cache.contains(from2)
            || !self.levels[0].transparency_cache.contains(to2)
        {
            return false;
        }
        if (to.z - from.z).abs() == 1 {
            let lower_z = from.z.min(to.z) as usize;
            let (lowers, uppers) = self.levels.split_at(lower_z + 1);
            if !self.vertical_reach[lower_z].has_potential_los(
                from2,
                to2,
                &uppers[0],
                &lowers[lower_z],
            ) {
                return false;
            }
        }
        self.sees_through_shaft(from, to)
    }

    /// Precise cross-level pass: sight runs along the line on the
    /// starting level, drops through an open shaft column, and continues
    /// on the target level. Endpoint tiles are exempt from the
    /// transparency walk, like walls seen face-on.
    fn sees_through_shaft(&self, from: IVec3, to: IVec3) -> bool {
        let (a, b) = (from.truncate(), to.truncate());
        let lo = from.z.min(to.z);
        let hi = from.z.max(to.z);
        let from_level = &self.levels[from.z as usize];
        let to_level = &self.levels[to.z as usize];

        let line: Vec<IVec2> =
            bresenham_line(a, b).chain(std::iter::once(b)).collect();
        let clear = |level: &LevelCache, p: IVec2| {
            *level.transparency_cache.get(p) > LIGHT_TRANSPARENCY_SOLID
        };

        for (i, &c) in line.iter().enumerate() {
            let shaft_open = (lo + 1..=hi)
                .all(|z| !*self.levels[z as usize].floor_cache.get(c));
            if !shaft_open {
                continue;
            }
            let prefix_ok =
                line[1..=i].iter().all(|&p| clear(from_level, p));
            let suffix_ok = line[i..line.len() - 1]
                .iter()
                .all(|&p| clear(to_level, p));
            if prefix_ok && suffix_ok {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use glam::{ivec2, ivec3, IVec3};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{LitLevel, LIGHT_TRANSPARENCY_OPEN_AIR as OPEN};

    fn open_map(levels: usize, dim: [i32; 2]) -> Map {
        let mut map = Map::new(levels, dim);
        for z in 0..levels as i32 {
            for p in map.level(z).transparency_cache.points() {
                map.set_transparency(p.extend(z), OPEN);
            }
        }
        map
    }

    #[test]
    fn mutation_invalidates_without_extra_calls() {
        let mut map = open_map(1, [26, 5]);
        let from = ivec3(0, 2, 0);
        let to = ivec3(25, 2, 0);
        assert!(map.sees(from, to));

        for y in 0..5 {
            map.set_transparency(ivec3(13, y, 0), LIGHT_TRANSPARENCY_SOLID);
        }
        assert!(!map.sees(from, to));
    }

    #[test]
    fn seen_snapshot_along_corridor() {
        let mut map = open_map(1, [6, 1]);
        map.set_transparency(ivec3(3, 0, 0), LIGHT_TRANSPARENCY_SOLID);
        map.build_seen_cache(ivec3(0, 0, 0));

        let rendered: String = (0..6)
            .map(|x| {
                if *map.level(0).seen_cache.get(ivec2(x, 0)) > 0.0 {
                    '*'
                } else {
                    '.'
                }
            })
            .collect();
        // The wall itself shows its face, nothing behind it does.
        assert_eq!(rendered, "****..");
    }

    #[test]
    fn light_source_and_visibility() {
        let mut map = open_map(1, [13, 13]);
        let origin = ivec3(6, 6, 0);
        map.set_transparency(ivec3(8, 6, 0), LIGHT_TRANSPARENCY_SOLID);
        map.build_seen_cache(origin);
        map.apply_light_source(origin, 21.0);

        assert_eq!(map.level(0).lm.get(origin.truncate()).max(), 21.0);
        assert_eq!(map.visibility_at(origin), LitLevel::Bright);
        assert_eq!(map.visibility_at(ivec3(6, 1, 0)), LitLevel::Lit);
        // Behind the wall: unseen, so dark regardless of light.
        assert_eq!(map.seen(ivec3(9, 6, 0)), 0.0);
        assert_eq!(map.visibility_at(ivec3(9, 6, 0)), LitLevel::Dark);
        assert_eq!(
            *map.level(0).visibility_cache.get(glam::ivec2(9, 6)),
            LitLevel::Dark
        );
    }

    #[test]
    fn camera_extends_sight() {
        let mut map = open_map(1, [9, 9]);
        for y in 0..9 {
            map.set_transparency(ivec3(4, y, 0), LIGHT_TRANSPARENCY_SOLID);
        }
        map.build_seen_cache(ivec3(2, 4, 0));
        assert_eq!(map.seen(ivec3(6, 4, 0)), 0.0);

        map.build_camera_cache(ivec3(6, 4, 0));
        assert!(map.seen(ivec3(6, 4, 0)) > 0.0);
        // The player's own seen cache is untouched by the camera.
        assert_eq!(*map.level(0).seen_cache.get(glam::ivec2(6, 4)), 0.0);
    }

    #[test]
    fn sees_across_levels_through_floor_gap() {
        let mut map = open_map(2, [9, 9]);
        for p in map.level(1).floor_cache.points() {
            map.set_floor(p.extend(1), true);
        }
        map.set_floor(ivec3(4, 4, 1), false);

        let from: IVec3 = ivec3(2, 4, 1);
        assert!(map.sees(from, ivec3(4, 4, 0)));
        // Right below the observer the floor is solid.
        assert!(!map.sees(from, ivec3(2, 4, 0)));
    }

    #[test]
    fn outside_cache_follows_roofs() {
        let mut map = open_map(2, [6, 6]);
        map.set_floor(ivec3(3, 3, 1), true);
        map.build_outside_cache(0);
        map.build_outside_cache(1);

        assert!(!*map.level(0).outside_cache.get(glam::ivec2(3, 3)));
        assert!(*map.level(0).outside_cache.get(glam::ivec2(0, 0)));
        assert!(*map.level(1).outside_cache.get(glam::ivec2(3, 3)));

        // Clean flag short-circuits until the roof changes again.
        assert!(!map.level(0).outside_cache_dirty);
        map.set_floor(ivec3(3, 3, 1), false);
        assert!(map.level(0).outside_cache_dirty);
        map.build_outside_cache(0);
        assert!(*map.level(0).outside_cache.get(glam::ivec2(3, 3)));
    }
}
