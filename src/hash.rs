use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hash whatever `f` feeds into a fresh `DefaultHasher`.
pub fn stable_hash_with(f: impl FnOnce(&mut DefaultHasher)) -> u64 {
    let mut hasher = DefaultHasher::new();
    f(&mut hasher);
    hasher.finish()
}

/// Seed for one file's random stream, derived from the run seed and its id.
pub fn file_seed(seed: u64, file_id: &str) -> u64 {
    stable_hash_with(|hasher| {
        seed.hash(hasher);
        file_id.hash(hasher);
    })
}

/// Seed for a named sub-stream of one file (scoring vs. generation).
pub fn stream_seed(seed: u64, file_id: &str, stream: &str) -> u64 {
    stable_hash_with(|hasher| {
        file_seed(seed, file_id).hash(hasher);
        stream.hash(hasher);
    })
}
