use glam::{ivec2, IVec2};
use util::{Grid, Quadrant, QUADRANTS};

use crate::Radiance;

/// View distance hard bound. The per-call radius is this minus the relay
/// offset distance, so chained sources cannot cast past it.
pub const MAX_CAST_RADIUS: i32 = 60;

/// Cast payload from `origin` into every tile it reaches, merging into
/// `output`.
///
/// Runs restrictive precise-angle shadowcasting once per map octant. The
/// output only ever increases, so calls for multiple sources compose in
/// any order. `offset_distance` is the distance already traveled when the
/// payload is relayed from an earlier cast.
pub fn cast_light_all<P: Radiance>(
    output: &mut Grid<P::Cell>,
    input: &Grid<P::Value>,
    origin: IVec2,
    offset_distance: i32,
    numerator: P::Value,
) {
    debug_assert_eq!(output.dim(), input.dim());

    // The source tile is its own brightest point, on every face.
    if input.contains(origin) {
        let v = P::calc(numerator, P::neutral(), offset_distance);
        for q in QUADRANTS {
            P::update(output.get_mut(origin), v, q);
        }
    }

    // (XX, XY, YX, YY) transforms mapping the scanned octant onto each
    // map octant.
    let d = offset_distance;
    let n = numerator;
    cast_octant::<P, 0, 1, 1, 0>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, 1, 0, 0, 1>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, 0, -1, 1, 0>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, -1, 0, 0, 1>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, 0, 1, -1, 0>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, 1, 0, 0, -1>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, 0, -1, -1, 0>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
    cast_octant::<P, -1, 0, 0, -1>(output, input, origin, d, n, 1, 1.0, 0.0, P::neutral());
}

/// One octant of the recursive caster.
///
/// Scans outward in Chebyshev rings. Angular spans run from `start` down
/// to `end`; a cell's edges are the slopes through its corner half-offsets,
/// so all span boundaries are exact `±0.5` constructions on tile deltas.
/// When a ring cell's transparency differs from the span's, the span
/// walked so far recurses into the next ring with its accumulated average
/// transparency and the remainder continues in place.
#[allow(clippy::too_many_arguments)]
fn cast_octant<
    P: Radiance,
    const XX: i32,
    const XY: i32,
    const YX: i32,
    const YY: i32,
>(
    output: &mut Grid<P::Cell>,
    input: &Grid<P::Value>,
    offset: IVec2,
    offset_distance: i32,
    numerator: P::Value,
    row: i32,
    mut start: f32,
    end: f32,
    mut cumulative_transparency: P::Value,
) {
    if start < end {
        return;
    }
    let radius = MAX_CAST_RADIUS - offset_distance;
    // Which quadrant this octant's tiles lie in, seen from the source.
    let quad = Quadrant::from_signs(-XX - XY, -YX - YY);

    for distance in row..=radius {
        let dy = -distance;
        let mut started_row = false;
        let mut current_transparency = P::Value::default();
        let last_intensity =
            P::calc(numerator, cumulative_transparency, distance + offset_distance);

        for dx in -distance..=0 {
            let current = ivec2(
                offset.x + dx * XX + dy * XY,
                offset.y + dx * YX + dy * YY,
            );
            let left_slope = (dx as f32 - 0.5) / (dy as f32 + 0.5);
            let right_slope = (dx as f32 + 0.5) / (dy as f32 - 0.5);

            if start < right_slope {
                continue;
            } else if end > left_slope {
                break;
            }
            if !input.contains(current) {
                continue;
            }

            if !started_row {
                started_row = true;
                current_transparency = *input.get(current);
            }

            let new_transparency = *input.get(current);
            // Opaque tiles still show their face toward the source.
            if P::check(new_transparency, last_intensity) {
                P::update(output.get_mut(current), last_intensity, Quadrant::Ne);
            } else {
                P::update(output.get_mut(current), last_intensity, quad);
            }

            if new_transparency == current_transparency {
                continue;
            }

            // Only the span walked so far casts onward.
            if P::check(current_transparency, last_intensity) {
                cast_octant::<P, XX, XY, YX, YY>(
                    output,
                    input,
                    offset,
                    offset_distance,
                    numerator,
                    distance + 1,
                    start,
                    left_slope,
                    P::accumulate(
                        cumulative_transparency,
                        current_transparency,
                        distance,
                    ),
                );
            }
            // The remaining span starts at the leading edge of the
            // previous tile.
            start = (dx as f32 - 0.5) / (dy as f32 - 0.5);
            current_transparency = new_transparency;
        }

        if !P::check(current_transparency, last_intensity) {
            break;
        }
        cumulative_transparency =
            P::accumulate(cumulative_transparency, current_transparency, distance);
    }
}

#[cfg(test)]
mod tests {
    use glam::ivec2;
    use util::Grid;

    use crate::testing::{close, Beam, OPEN_AIR};
    use crate::{cast_light_all, MAX_CAST_RADIUS};

    #[test]
    fn origin_is_brightest() {
        let input = Grid::new([9, 9], OPEN_AIR);
        let mut out = Grid::new([9, 9], 0.0f32);
        cast_light_all::<Beam>(&mut out, &input, ivec2(4, 4), 0, 1.0);
        assert_eq!(out[ivec2(4, 4)], 1.0);
        for (p, v) in out.iter() {
            assert!(*v <= 1.0, "{p} brighter than the source");
        }
    }

    #[test]
    fn open_room_uniform_falloff() {
        let input = Grid::new([13, 13], OPEN_AIR);
        let mut out = Grid::new([13, 13], 0.0f32);
        let origin = ivec2(6, 6);
        cast_light_all::<Beam>(&mut out, &input, origin, 0, 1.0);

        let expected = 1.0 / (OPEN_AIR * 5.0).exp();
        for dir in [
            ivec2(1, 0),
            ivec2(-1, 0),
            ivec2(0, 1),
            ivec2(0, -1),
            ivec2(1, 1),
            ivec2(1, -1),
            ivec2(-1, 1),
            ivec2(-1, -1),
        ] {
            let v = out[origin + dir * 5];
            assert!(
                close(v, expected),
                "{dir} at range 5: {v} != {expected}"
            );
        }
    }

    #[test]
    fn monotonic_merge() {
        let input = Grid::new([13, 13], OPEN_AIR);
        let mut out = Grid::new([13, 13], 0.0f32);
        cast_light_all::<Beam>(&mut out, &input, ivec2(3, 3), 0, 1.0);
        let snapshot = out.clone();
        cast_light_all::<Beam>(&mut out, &input, ivec2(9, 9), 0, 0.5);
        for (p, v) in out.iter() {
            assert!(*v >= snapshot[p], "{p} got darker");
        }
    }

    #[test]
    fn wall_is_lit_but_casts_shadow() {
        let mut input = Grid::new([9, 5], OPEN_AIR);
        input[ivec2(4, 2)] = 0.0;
        let mut out = Grid::new([9, 5], 0.0f32);
        cast_light_all::<Beam>(&mut out, &input, ivec2(2, 2), 0, 1.0);

        assert!(out[ivec2(4, 2)] > 0.0, "wall face unlit");
        assert_eq!(out[ivec2(5, 2)], 0.0, "light through a wall");
        assert_eq!(out[ivec2(6, 2)], 0.0, "light through a wall");
    }

    #[test]
    fn offset_distance_shrinks_radius() {
        let input = Grid::new([9, 9], OPEN_AIR);
        let mut out = Grid::new([9, 9], 0.0f32);
        let origin = ivec2(4, 4);
        cast_light_all::<Beam>(&mut out, &input, origin, MAX_CAST_RADIUS - 2, 1.0);
        assert!(out[origin + ivec2(2, 0)] > 0.0);
        assert_eq!(out[origin + ivec2(3, 0)], 0.0);
    }
}
