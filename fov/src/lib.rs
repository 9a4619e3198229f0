//! Generic recursive shadowcasting.
//!
//! The same recursion propagates any payload that attenuates over tile
//! paths, parameterized by a [`Radiance`] policy: light and sight use an
//! exponential falloff, fragment clouds a drag law. Outputs only ever
//! max-merge, so repeated casts from many sources compose in any order.

mod radiance;
pub use radiance::Radiance;

mod cast;
pub use cast::{cast_light_all, MAX_CAST_RADIUS};

mod zcast;
pub use zcast::cast_zlight;

#[cfg(test)]
mod testing;
