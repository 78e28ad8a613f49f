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

use crate::fasthash::hash_content;
use core::ops::Deref;

/// Salt used when fingerprinting resource content.
pub const CONTENT_ETAG_SALT: u32 = 0x1234_1234;

/// Type for holding the value of an ETag option.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub struct ETag {
    len: u8,
    bytes: [u8; 8],
}

impl ETag {
    /// Describes the maximum length of an ETag (8 bytes).
    pub const MAX_LEN: usize = 8;

    /// Constant representing an empty ETag.
    pub const EMPTY: ETag = ETag {
        len: 0u8,
        bytes: [0; 8],
    };

    /// Creates a new ETag instance from the given byte slice, or `None` if the slice is
    /// longer than [`ETag::MAX_LEN`].
    pub fn new(x: &[u8]) -> Option<ETag> {
        if x.len() > Self::MAX_LEN {
            return None;
        }
        let mut bytes = [0u8; 8];
        bytes[..x.len()].copy_from_slice(x);
        Some(ETag {
            len: x.len() as u8,
            bytes,
        })
    }

    /// Fingerprints the given resource content. The result is always four bytes long.
    pub fn fingerprint(content: &[u8]) -> ETag {
        ETag::from(hash_content(CONTENT_ETAG_SALT, content))
    }

    /// Returns the length of this ETag in bytes.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if the length of this ETag is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value of this ETag as a byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Returns the value of a four-byte ETag as an integer.
    pub fn to_u32(&self) -> Option<u32> {
        if self.len != 4 {
            return None;
        }
        let mut x = [0u8; 4];
        x.copy_from_slice(self.as_bytes());
        Some(u32::from_be_bytes(x))
    }
}

impl std::fmt::Display for ETag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.as_bytes() {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

impl Default for ETag {
    fn default() -> Self {
        ETag::EMPTY
    }
}

impl Deref for ETag {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl core::cmp::PartialEq<[u8]> for ETag {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

/// Integers always become four-byte ETags, leading zero bytes included.
impl core::convert::From<u32> for ETag {
    fn from(x: u32) -> Self {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&x.to_be_bytes());
        ETag { len: 4, bytes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_width_integer_etag() {
        let etag = ETag::from(0x0000_00FFu32);
        assert_eq!(etag.as_bytes(), &[0, 0, 0, 0xFF]);
        assert_eq!(etag.to_u32(), Some(0xFF));
        assert_eq!(etag.to_string(), "000000FF");
    }

    #[test]
    fn fingerprint_tracks_content() {
        assert_eq!(ETag::fingerprint(b"21.5"), ETag::fingerprint(b"21.5"));
        assert_ne!(ETag::fingerprint(b"21.5"), ETag::fingerprint(b"21.6"));
        assert_eq!(ETag::fingerprint(b"").len(), 4);
    }

    #[test]
    fn oversized_slice_rejected() {
        assert!(ETag::new(&[0; 9]).is_none());
        assert_eq!(ETag::new(&[1, 2]).map(|e| e.len()), Some(2));
    }
}
