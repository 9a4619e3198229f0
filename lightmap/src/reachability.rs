use glam::IVec2;
use itertools::iproduct;
use util::{BitGrid, Grid, Quadrant, VecExt, QUADRANTS};

use crate::{
    block_of, submap_blocks, LevelCache, LIGHT_TRANSPARENCY_SOLID, SEEX, SEEY,
};

/// Saturation ceiling for the distance layers; leaves headroom under
/// `u8::MAX` for the +2 diagonal step.
pub const MAX_D: u8 = 252;

/// Four per-quadrant distance layers plus block-granular dirty state.
struct CacheLayers {
    layers: [Grid<u8>; 4],
    dirty_blocks: BitGrid,
    dirty_any: bool,
}

impl CacheLayers {
    fn new(dim: IVec2) -> Self {
        let mut dirty_blocks = BitGrid::new(submap_blocks(dim));
        dirty_blocks.set_all();
        CacheLayers {
            layers: std::array::from_fn(|_| Grid::new(dim, 0)),
            dirty_blocks,
            dirty_any: true,
        }
    }

    fn invalidate(&mut self) {
        self.dirty_blocks.set_all();
        self.dirty_any = true;
    }

    fn invalidate_at(&mut self, p: IVec2) {
        let b = block_of(p);
        if self.dirty_blocks.contains(b) {
            self.dirty_blocks.insert(b);
            self.dirty_any = true;
        }
    }

    fn mark_clean(&mut self) {
        self.dirty_blocks.clear();
        self.dirty_any = false;
    }

    fn layer(&self, q: Quadrant) -> &Grid<u8> {
        &self.layers[q as usize]
    }
}

/// Sweep one quadrant layer in dependency order, skipping clean blocks.
///
/// `cell_value` computes a cell from already-swept neighbor values. A
/// block is recomputed when its own dirty bit is set or when an upstream
/// block's recompute changed any value; the change could have crossed the
/// block boundary, so downstream neighbors are conservatively enqueued.
fn rebuild_layer(
    layer: &mut Grid<u8>,
    q: Quadrant,
    dirty_blocks: &BitGrid,
    cell_value: impl Fn(IVec2, &Grid<u8>) -> u8,
) {
    let dim = layer.dim();
    let blocks = submap_blocks(dim);
    let [u1, u2] = q.unit_steps();

    // Values flow opposite to the quadrant's unit steps: a cell reads
    // neighbors one step deeper into the quadrant, so the sweep starts at
    // the deep edge. Step -1 on an axis means ascending iteration.
    let block_ys: Vec<i32> = if u1.y < 0 {
        (0..blocks.y).collect()
    } else {
        (0..blocks.y).rev().collect()
    };
    let block_xs: Vec<i32> = if u2.x > 0 {
        (0..blocks.x).rev().collect()
    } else {
        (0..blocks.x).collect()
    };

    let mut propagated = BitGrid::new(blocks);
    for (&by, &bx) in iproduct!(&block_ys, &block_xs) {
        let b = IVec2::new(bx, by);
        if !dirty_blocks.get(b) && !propagated.get(b) {
            continue;
        }

        let ys: Vec<i32> = {
            let (y0, y1) = (by * SEEY, ((by + 1) * SEEY).min(dim.y));
            if u1.y < 0 {
                (y0..y1).collect()
            } else {
                (y0..y1).rev().collect()
            }
        };
        let xs: Vec<i32> = {
            let (x0, x1) = (bx * SEEX, ((bx + 1) * SEEX).min(dim.x));
            if u2.x > 0 {
                (x0..x1).rev().collect()
            } else {
                (x0..x1).collect()
            }
        };

        let mut changed = false;
        for &y in &ys {
            for &x in &xs {
                let p = IVec2::new(x, y);
                let v = cell_value(p, layer);
                if *layer.get(p) != v {
                    *layer.get_mut(p) = v;
                    changed = true;
                }
            }
        }

        if changed {
            for d in [u1, u2, u1 + u2] {
                let nb = b - d;
                if propagated.contains(nb) {
                    propagated.insert(nb);
                }
            }
        }
    }
}

/// Same-level line-of-sight pre-filter.
///
/// Each quadrant layer holds the longest taxicab distance sight can run
/// from a tile using only that quadrant's two cardinal directions, so a
/// query reduces to one distance comparison. The answer is necessary, not
/// sufficient: "false" guarantees no line of sight, "true" means run the
/// precise check.
pub struct HorizontalReach {
    cache: CacheLayers,
}

impl HorizontalReach {
    pub fn new(dim: impl Into<IVec2>) -> Self {
        HorizontalReach {
            cache: CacheLayers::new(dim.into()),
        }
    }

    /// Mark the whole level stale.
    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Mark the submap block containing `p` stale.
    pub fn invalidate_at(&mut self, p: IVec2) {
        self.cache.invalidate_at(p);
    }

    /// Might `from` see `to`? O(1) after the lazy rebuild.
    pub fn has_potential_los(
        &mut self,
        from: IVec2,
        to: IVec2,
        level: &LevelCache,
    ) -> bool {
        self.ensure_built(level);
        if !level.transparency_cache_wo_fields.contains(from)
            || !level.transparency_cache_wo_fields.contains(to)
        {
            return false;
        }
        let delta = to - from;
        let q = Quadrant::from_delta(delta);
        delta.taxi_len() <= *self.cache.layer(q).get(from) as i32
    }

    fn ensure_built(&mut self, level: &LevelCache) {
        if !self.cache.dirty_any {
            return;
        }
        log::trace!(
            "rebuilding horizontal reachability, {} dirty blocks",
            self.cache.dirty_blocks.count()
        );
        let transparency = &level.transparency_cache_wo_fields;
        for q in QUADRANTS {
            let [u1, u2] = q.unit_steps();
            let diag = u1 + u2;
            rebuild_layer(
                &mut self.cache.layers[q as usize],
                q,
                &self.cache.dirty_blocks,
                |p, layer| {
                    if *transparency.get(p) <= LIGHT_TRANSPARENCY_SOLID {
                        return 0;
                    }
                    let cardinal =
                        layer.get_or(p + u1, 0).max(layer.get_or(p + u2, 0));
                    // Bresenham squeezes through sealed corners, so the
                    // diagonal neighbor counts at step cost 2 whenever it
                    // is on the map at all.
                    let diagonal = if layer.contains(p + diag) {
                        layer.get_or(p + diag, 0).saturating_add(1)
                    } else {
                        0
                    };
                    cardinal
                        .max(diagonal)
                        .saturating_add(1)
                        .min(MAX_D)
                },
            );
        }
        self.cache.mark_clean();
    }
}

/// Cross-level line-of-sight pre-filter for one adjacent z-level pair.
///
/// Inverted bookkeeping: a layer value is the taxicab distance from a
/// tile to the nearest floor gap reachable within the quadrant, 0 on a
/// gap and saturated at [`MAX_D`] where sight can never pass between the
/// levels. Sight crossing levels must route over a gap between the
/// endpoints, so any pair closer together than the gap distance is
/// rejected outright.
pub struct VerticalReach {
    cache: CacheLayers,
}

impl VerticalReach {
    pub fn new(dim: impl Into<IVec2>) -> Self {
        VerticalReach {
            cache: CacheLayers::new(dim.into()),
        }
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    pub fn invalidate_at(&mut self, p: IVec2) {
        self.cache.invalidate_at(p);
    }

    /// Might sight pass between `from` on one level of the pair and `to`
    /// on the other? Horizontal positions only; the pair orientation is
    /// fixed by which caches the filter was built from.
    pub fn has_potential_los(
        &mut self,
        from: IVec2,
        to: IVec2,
        upper: &LevelCache,
        lower: &LevelCache,
    ) -> bool {
        self.ensure_built(upper, lower);
        if !upper.floor_cache.contains(from)
            || !upper.floor_cache.contains(to)
        {
            return false;
        }
        let delta = to - from;
        let q = Quadrant::from_delta(delta);
        let d = delta.taxi_len();
        d < MAX_D as i32 && d >= *self.cache.layer(q).get(from) as i32
    }

    fn ensure_built(&mut self, upper: &LevelCache, lower: &LevelCache) {
        if !self.cache.dirty_any {
            return;
        }
        log::trace!(
            "rebuilding vertical reachability, {} dirty blocks",
            self.cache.dirty_blocks.count()
        );
        for q in QUADRANTS {
            let [u1, u2] = q.unit_steps();
            let diag = u1 + u2;
            rebuild_layer(
                &mut self.cache.layers[q as usize],
                q,
                &self.cache.dirty_blocks,
                |p, layer| {
                    if !*upper.floor_cache.get(p) {
                        return 0;
                    }
                    let open = *upper.transparency_cache_wo_fields.get(p)
                        > LIGHT_TRANSPARENCY_SOLID
                        || *lower.transparency_cache_wo_fields.get(p)
                            > LIGHT_TRANSPARENCY_SOLID;
                    if !open {
                        return MAX_D;
                    }
                    let cardinal = layer
                        .get_or(p + u1, MAX_D)
                        .min(layer.get_or(p + u2, MAX_D));
                    let diagonal =
                        layer.get_or(p + diag, MAX_D).saturating_add(1);
                    cardinal
                        .min(diagonal)
                        .saturating_add(1)
                        .min(MAX_D)
                },
            );
        }
        self.cache.mark_clean();
    }
}
