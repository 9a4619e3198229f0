use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_xorshift::XorShiftRng;

/// Construct a throwaway random number generator seeded by a noise value.
///
/// Good for short-term use in immutable contexts given a varying source of
/// noise like map position coordinates.
pub fn srng(seed: &(impl Hash + ?Sized)) -> XorShiftRng {
    let mut h = crate::FastHasher::default();
    seed.hash(&mut h);
    XorShiftRng::seed_from_u64(h.finish())
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn deterministic_seeding() {
        let a: u64 = srng("maze-7").gen();
        let b: u64 = srng("maze-7").gen();
        let c: u64 = srng("maze-8").gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
