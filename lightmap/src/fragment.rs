use fov::Radiance;
use util::Quadrant;

/// Fragments slower than this just embed themselves in whatever is near.
pub const MIN_FRAGMENT_VELOCITY: f32 = 70.0;
/// Density floor below which a cloud is spent.
pub const MIN_FRAGMENT_DENSITY: f32 = 0.0001;
/// Drag of open air on a fragment cloud.
pub const FRAGMENT_AIR_DRAG: f32 = 0.0038;

/// Shrapnel state per tile: how fast the fragments still move and how
/// many of them are left.
///
/// Doubles as the medium description on the input side, where `velocity`
/// and `density` hold the tile's drag and absorption coefficients.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub struct FragmentCloud {
    pub velocity: f32,
    pub density: f32,
}

impl FragmentCloud {
    pub fn new(velocity: f32, density: f32) -> Self {
        FragmentCloud { velocity, density }
    }
}

/// Fragment propagation through the shadowcasting engine.
///
/// The same recursion that carries light carries shrapnel; only the
/// numeric policy differs. Attenuation is component-wise exponential and
/// propagation stops once the cloud is too slow or too thin to matter,
/// not just when it hits a wall.
pub struct FragmentRadiance;

impl Radiance for FragmentRadiance {
    type Value = FragmentCloud;
    type Cell = FragmentCloud;

    fn neutral() -> FragmentCloud {
        FragmentCloud::new(FRAGMENT_AIR_DRAG, 0.0)
    }

    fn calc(
        numerator: FragmentCloud,
        cumulative: FragmentCloud,
        dist: i32,
    ) -> FragmentCloud {
        FragmentCloud {
            velocity: numerator.velocity
                / (cumulative.velocity * dist as f32).exp(),
            density: numerator.density
                / (cumulative.density * dist as f32).exp(),
        }
    }

    fn check(
        transparency: FragmentCloud,
        intensity: FragmentCloud,
    ) -> bool {
        transparency.velocity > 0.0
            && intensity.velocity > MIN_FRAGMENT_VELOCITY
            && intensity.density > MIN_FRAGMENT_DENSITY
    }

    fn accumulate(
        cumulative: FragmentCloud,
        current: FragmentCloud,
        dist: i32,
    ) -> FragmentCloud {
        let mean = |a: f32, b: f32| ((dist - 1) as f32 * a + b) / dist as f32;
        FragmentCloud {
            velocity: mean(cumulative.velocity, current.velocity),
            density: mean(cumulative.density, current.density),
        }
    }

    fn update(cell: &mut FragmentCloud, value: FragmentCloud, _q: Quadrant) {
        cell.velocity = cell.velocity.max(value.velocity);
        cell.density = cell.density.max(value.density);
    }
}
