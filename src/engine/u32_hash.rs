//! ### English
//! Identity-hashed map for `u32` stream ids.
//!
//! ### 中文
//! 以 `u32` 流 id 为 key 的恒等哈希表。

use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hasher};

/// ### English
/// Identity hasher for `u32` keys. Stream ids come from a monotonic counter, so they already
/// spread evenly across buckets.
///
/// ### 中文
/// `u32` key 的恒等哈希。流 id 来自单调计数器，本身就能均匀分布到各个桶。
#[derive(Default)]
pub(crate) struct U32IdentityHasher(u64);

impl Hasher for U32IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .chunks(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf[..chunk.len()].copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .fold(0, |hash, word| hash ^ word);
    }

    fn write_u32(&mut self, i: u32) {
        self.0 = u64::from(i);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

pub(crate) type U32HashMap<V> = HashMap<u32, V, BuildHasherDefault<U32IdentityHasher>>;

#[cfg(test)]
mod tests {
    use std::hash::{BuildHasher, BuildHasherDefault};

    use super::*;

    #[test]
    fn u32_keys_hash_to_themselves() {
        let build = BuildHasherDefault::<U32IdentityHasher>::default();
        assert_eq!(build.hash_one(7u32), 7);
        assert_eq!(build.hash_one(u32::MAX), u64::from(u32::MAX));
    }

    #[test]
    fn map_round_trips_entries() {
        let mut map: U32HashMap<&str> = U32HashMap::default();
        map.insert(1, "one");
        map.insert(2, "two");
        assert_eq!(map.get(&2), Some(&"two"));
        assert_eq!(map.remove(&1), Some("one"));
        assert!(!map.contains_key(&1));
    }
}
