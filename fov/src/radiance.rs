use util::Quadrant;

/// Numeric policy for one kind of propagating payload.
///
/// The casters are generic over this so light, sight and fragment-cloud
/// propagation share the span-splitting machinery. All methods are
/// associated functions and implementors are zero-sized tag types, keeping
/// the recursion monomorphized.
pub trait Radiance {
    /// Per-tile transparency / intensity payload.
    type Value: Copy + PartialEq + Default;

    /// Output grid cell the payload merges into.
    type Cell;

    /// The fully clear medium; the cumulative transparency a cast starts
    /// from.
    fn neutral() -> Self::Value;

    /// A medium that blocks propagation entirely. Tiles occluded by a
    /// floor or roof read as this in the z-caster.
    fn solid() -> Self::Value {
        Self::Value::default()
    }

    /// Attenuation law: what is left of `numerator` after `dist` tile
    /// steps through a medium averaging `cumulative`.
    fn calc(
        numerator: Self::Value,
        cumulative: Self::Value,
        dist: i32,
    ) -> Self::Value;

    /// Is the tile clear enough, at the given intensity, to keep casting
    /// through?
    fn check(transparency: Self::Value, intensity: Self::Value) -> bool;

    /// Fold one more tile into the running distance-weighted average of
    /// transparency along the path.
    fn accumulate(
        cumulative: Self::Value,
        current: Self::Value,
        dist: i32,
    ) -> Self::Value;

    /// Max-merge a computed intensity into an output cell. `q` is the
    /// quadrant the tile lies in relative to the source; outputs that
    /// shade wall faces keep the four directions apart, scalar outputs
    /// ignore it. Must never decrease the cell.
    fn update(cell: &mut Self::Cell, value: Self::Value, q: Quadrant);
}
