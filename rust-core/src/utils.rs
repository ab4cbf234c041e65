use rand::{rngs::SmallRng, SeedableRng};

/// 有种子时可复现，否则使用系统熵（wasm 下经由 getrandom/js）。
pub fn rng_from_seed(seed: Option<u32>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(u64::from(seed)),
        None => SmallRng::from_entropy(),
    }
}
