//! Deterministic seeding for per-entity random streams.
//!
//! Every source and server owns a private `StdRng`. Their seeds are derived from a
//! single master seed, so identical configurations replay identically and no
//! generator state is ever shared.

use rand::rngs::StdRng;
use rand::SeedableRng;

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub const SEED_DOMAIN_SOURCE: u64 = 0x534F_5552_4345_5F5F; // "SOURCE__" (tag)
pub const SEED_DOMAIN_SERVER: u64 = 0x5345_5256_4552_5F5F; // "SERVER__" (tag)

/// Derive the seed for entity `index` of `domain` from the master seed.
pub fn derive_seed(master: u64, domain: u64, index: u64) -> u64 {
    splitmix64(splitmix64(master ^ domain).wrapping_add(index))
}

/// Build the private generator for entity `index` of `domain`.
pub fn entity_rng(master: u64, domain: u64, index: u64) -> StdRng {
    StdRng::seed_from_u64(derive_seed(master, domain, index))
}
