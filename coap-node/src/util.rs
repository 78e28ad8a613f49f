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

/// Encodes an unsigned integer option value into `dst` using the minimal number of
/// big-endian bytes, returning the used part of `dst`. Zero encodes to an empty slice.
pub fn encode_u32(value: u32, dst: &mut [u8; 4]) -> &[u8] {
    *dst = value.to_be_bytes();
    let skip = (value.leading_zeros() / 8) as usize;
    &dst[skip..]
}

/// Decodes a big-endian unsigned integer option value of at most four bytes.
/// Returns `None` if `src` is longer than four bytes.
pub fn try_decode_u32(src: &[u8]) -> Option<u32> {
    if src.len() > 4 {
        return None;
    }
    Some(src.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
}

/// Decodes a big-endian unsigned integer option value of at most two bytes.
/// Returns `None` if `src` is longer than two bytes.
pub fn try_decode_u16(src: &[u8]) -> Option<u16> {
    if src.len() > 2 {
        return None;
    }
    try_decode_u32(src).map(|x| x as u16)
}
