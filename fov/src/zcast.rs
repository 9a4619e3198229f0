use glam::{ivec2, IVec3};
use util::{Grid, Quadrant, QUADRANTS};

use crate::{cast::MAX_CAST_RADIUS, Radiance};

/// Cast payload from `origin` across a stack of z-level grids.
///
/// `origin.z` indexes into the slices; all slices must share one grid
/// dimension. A tile on a level above the origin is occluded when its own
/// floor bit is set, a tile below when the floor bit of the level above it
/// is set; occluded tiles block onward propagation and are not written.
/// `z_range` bounds how many levels up or down the cast may reach.
#[allow(clippy::too_many_arguments)]
pub fn cast_zlight<'g, P: Radiance>(
    outputs: &mut [&'g mut Grid<P::Cell>],
    inputs: &[&'g Grid<P::Value>],
    floors: &[&'g Grid<bool>],
    origin: IVec3,
    offset_distance: i32,
    numerator: P::Value,
    z_range: i32,
) {
    assert_eq!(outputs.len(), inputs.len());
    assert_eq!(floors.len(), inputs.len());
    assert!(origin.z >= 0 && (origin.z as usize) < inputs.len());
    debug_assert!(inputs
        .iter()
        .all(|grid| grid.dim() == inputs[0].dim()));

    let mut ctx = Ctx::<P> {
        outputs,
        inputs,
        floors,
        origin,
        offset_distance,
        numerator,
        z_range,
    };

    let o2 = origin.truncate();
    if ctx.inputs[origin.z as usize].contains(o2) {
        let v = P::calc(numerator, P::neutral(), offset_distance);
        for q in QUADRANTS {
            P::update(ctx.outputs[origin.z as usize].get_mut(o2), v, q);
        }
        // Rings are keyed on horizontal distance, so the column straight
        // above and below the source is walked separately.
        ctx.cast_origin_column(1);
        ctx.cast_origin_column(-1);
    }

    // 8 horizontal octants, each cast both up and down.
    macro_rules! seg {
        ($xx:expr, $xy:expr, $yx:expr, $yy:expr) => {
            ctx.segment::<{ $xx }, { $xy }, { $yx }, { $yy }, 1>(
                1,
                0.0,
                1.0,
                0.0,
                1.0,
                P::neutral(),
            );
            ctx.segment::<{ $xx }, { $xy }, { $yx }, { $yy }, -1>(
                1,
                0.0,
                1.0,
                0.0,
                1.0,
                P::neutral(),
            );
        };
    }
    seg!(1, 0, 0, 1);
    seg!(0, 1, 1, 0);
    seg!(-1, 0, 0, 1);
    seg!(0, -1, 1, 0);
    seg!(1, 0, 0, -1);
    seg!(0, 1, -1, 0);
    seg!(-1, 0, 0, -1);
    seg!(0, -1, -1, 0);
}

struct Ctx<'a, 'g, P: Radiance> {
    outputs: &'a mut [&'g mut Grid<P::Cell>],
    inputs: &'a [&'g Grid<P::Value>],
    floors: &'a [&'g Grid<bool>],
    origin: IVec3,
    offset_distance: i32,
    numerator: P::Value,
    z_range: i32,
}

/// A contiguous stretch of same-transparency open tiles in one z-row of a
/// ring, with the angular rectangle it subtends.
struct Run<V> {
    major_lo: f32,
    major_hi: f32,
    minor_lo: f32,
    minor_hi: f32,
    transparency: V,
}

impl<P: Radiance> Ctx<'_, '_, P> {
    /// Propagate straight up (`zz = 1`) or down (`zz = -1`) from the
    /// source tile through successive floor gaps.
    fn cast_origin_column(&mut self, zz: i32) {
        let levels = self.inputs.len() as i32;
        let o2 = self.origin.truncate();
        let mut cumulative = P::neutral();
        for dz in 1..=self.z_range {
            let cz = self.origin.z + dz * zz;
            if cz < 0 || cz >= levels {
                break;
            }
            let blocked = if zz > 0 {
                *self.floors[cz as usize].get(o2)
            } else {
                *self.floors[(cz + 1) as usize].get(o2)
            };
            if blocked {
                break;
            }
            let transparency = *self.inputs[cz as usize].get(o2);
            let intensity =
                P::calc(self.numerator, cumulative, dz + self.offset_distance);
            for q in QUADRANTS {
                P::update(self.outputs[cz as usize].get_mut(o2), intensity, q);
            }
            if !P::check(transparency, intensity) {
                break;
            }
            cumulative = P::accumulate(cumulative, transparency, dz);
        }
    }

    /// One octant-and-vertical-direction segment.
    ///
    /// Angular spans ascend from 0 (level / straight ahead) to 1
    /// (diagonal); `major` tracks the vertical slope `dz / distance`,
    /// `minor` the horizontal slope `dx / distance`, both with exact
    /// `±0.5` cell edges. A ring whose visible cells all share one
    /// transparency continues in place with the accumulated average;
    /// otherwise each open run recurses with the angular rectangle it
    /// subtends and the scan stops here. Overlapping edge wedges between
    /// neighboring rows merge by max, so the split never darkens anything.
    fn segment<
        const XX: i32,
        const XY: i32,
        const YX: i32,
        const YY: i32,
        const ZZ: i32,
    >(
        &mut self,
        row: i32,
        start_major: f32,
        end_major: f32,
        start_minor: f32,
        end_minor: f32,
        mut cumulative: P::Value,
    ) {
        if start_major > end_major || start_minor > end_minor {
            return;
        }
        let radius = MAX_CAST_RADIUS - self.offset_distance;
        let levels = self.inputs.len() as i32;
        let dim = self.inputs[0].dim();
        let quad = Quadrant::from_signs(XX + XY, YX + YY);

        for distance in row..=radius {
            let dy = distance;
            let intensity = P::calc(
                self.numerator,
                cumulative,
                distance + self.offset_distance,
            );
            let mut any_cell = false;
            let mut mixed = false;
            let mut shared = P::Value::default();
            let mut runs: Vec<Run<P::Value>> = Vec::new();

            for dz in 0..=distance.min(self.z_range) {
                let trailing_major = (dz as f32 - 0.5) / (dy as f32 + 0.5);
                let leading_major = (dz as f32 + 0.5) / (dy as f32 - 0.5);
                if start_major > leading_major {
                    continue;
                }
                if end_major < trailing_major {
                    break;
                }
                let cz = self.origin.z + dz * ZZ;
                if cz < 0 || cz >= levels {
                    continue;
                }
                let major_lo = start_major.max(trailing_major);
                let major_hi = end_major.min(leading_major);

                let mut run: Option<Run<P::Value>> = None;
                for dx in 0..=distance {
                    let current = ivec2(
                        self.origin.x + dx * XX + dy * XY,
                        self.origin.y + dx * YX + dy * YY,
                    );
                    let trailing_minor =
                        (dx as f32 - 0.5) / (dy as f32 + 0.5);
                    let leading_minor =
                        (dx as f32 + 0.5) / (dy as f32 - 0.5);
                    if start_minor > leading_minor {
                        continue;
                    }
                    if end_minor < trailing_minor {
                        break;
                    }
                    if !(current.x >= 0
                        && current.y >= 0
                        && current.x < dim.x
                        && current.y < dim.y)
                    {
                        // Off the map; close the open run rather than
                        // stretch it over unknown tiles.
                        if let Some(r) = run.take() {
                            runs.push(r);
                        }
                        continue;
                    }

                    let mut transparency =
                        *self.inputs[cz as usize].get(current);
                    let mut floor_block = false;
                    if cz > self.origin.z {
                        if *self.floors[cz as usize].get(current) {
                            floor_block = true;
                            transparency = P::solid();
                        }
                    } else if cz < self.origin.z
                        && *self.floors[(cz + 1) as usize].get(current)
                    {
                        floor_block = true;
                        transparency = P::solid();
                    }

                    if !any_cell {
                        any_cell = true;
                        shared = transparency;
                    } else if transparency != shared {
                        mixed = true;
                    }

                    if !floor_block {
                        let q = if P::check(transparency, intensity) {
                            Quadrant::Ne
                        } else {
                            quad
                        };
                        P::update(
                            self.outputs[cz as usize].get_mut(current),
                            intensity,
                            q,
                        );
                    }

                    let minor_lo = start_minor.max(trailing_minor);
                    let minor_hi = end_minor.min(leading_minor);
                    if P::check(transparency, intensity) {
                        match &mut run {
                            Some(r) if r.transparency == transparency => {
                                r.minor_hi = minor_hi;
                            }
                            _ => {
                                if let Some(r) = run.take() {
                                    runs.push(r);
                                }
                                run = Some(Run {
                                    major_lo,
                                    major_hi,
                                    minor_lo,
                                    minor_hi,
                                    transparency,
                                });
                            }
                        }
                    } else if let Some(r) = run.take() {
                        runs.push(r);
                    }
                }
                if let Some(r) = run.take() {
                    runs.push(r);
                }
            }

            if !any_cell {
                return;
            }
            if !mixed {
                if P::check(shared, intensity) {
                    cumulative = P::accumulate(cumulative, shared, distance);
                    continue;
                }
                return;
            }
            for r in runs {
                self.segment::<XX, XY, YX, YY, ZZ>(
                    distance + 1,
                    r.major_lo,
                    r.major_hi,
                    r.minor_lo,
                    r.minor_hi,
                    P::accumulate(cumulative, r.transparency, distance),
                );
            }
            return;
        }
    }
}
