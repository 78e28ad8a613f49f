// Copyright 2019 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! A small, fast, non-cryptographic 32-bit hash used for fingerprinting resource content.

use core::hash::Hasher;

/// Largest number of bytes accepted by a single call to [`FastHasher::feed`].
pub const MAX_FEED_LEN: usize = 255;

/// Incremental Jenkins one-at-a-time hash, seeded with a salt.
///
/// Content is fed in chunks of at most [`MAX_FEED_LEN`] bytes; [`FastHasher::write`] splits
/// larger inputs automatically. Feeding the same bytes always yields the same value, no
/// matter how the input is split.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FastHasher {
    hash: u32,
}

impl FastHasher {
    /// Starts a new hash seeded with `salt`.
    pub fn new(salt: u32) -> FastHasher {
        FastHasher { hash: salt }
    }

    /// Feeds up to [`MAX_FEED_LEN`] bytes into the hash.
    pub fn feed(&mut self, data: &[u8]) {
        debug_assert!(data.len() <= MAX_FEED_LEN);
        for &b in data {
            self.hash = self.hash.wrapping_add(b as u32);
            self.hash = self.hash.wrapping_add(self.hash << 10);
            self.hash ^= self.hash >> 6;
        }
    }

    /// Finishes the hash, returning its 32-bit value.
    pub fn finish_u32(&self) -> u32 {
        let mut hash = self.hash;
        hash = hash.wrapping_add(hash << 3);
        hash ^= hash >> 11;
        hash.wrapping_add(hash << 15)
    }
}

impl Hasher for FastHasher {
    fn finish(&self) -> u64 {
        self.finish_u32() as u64
    }

    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(MAX_FEED_LEN) {
            self.feed(chunk);
        }
    }
}

/// Hashes `content` in one go, seeded with `salt`.
pub fn hash_content(salt: u32, content: &[u8]) -> u32 {
    let mut hasher = FastHasher::new(salt);
    hasher.write(content);
    hasher.finish_u32()
}
