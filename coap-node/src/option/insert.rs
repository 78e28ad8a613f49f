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

use super::*;

/// Sink for the options of a message under construction.
///
/// Options can be inserted in any order. Implementations keep them sorted by option
/// number, and options with the same number keep their insertion order.
pub trait OptionInsert {
    /// Inserts option `number` with a raw value.
    fn insert_option_with_bytes(&mut self, number: OptionNumber, value: &[u8])
        -> Result<(), Error>;

    /// Inserts option `number` carrying an unsigned integer, in its shortest big-endian
    /// form. Zero is sent as an empty value.
    fn insert_option_with_u32(&mut self, number: OptionNumber, value: u32) -> Result<(), Error> {
        let mut buf = [0; 4];
        self.insert_option_with_bytes(number, encode_u32(value, &mut buf))
    }

    /// Inserts an ETag option.
    fn insert_etag(&mut self, etag: ETag) -> Result<(), Error> {
        self.insert_option_with_bytes(OptionNumber::ETAG, etag.as_bytes())
    }

    /// Inserts a format option. `number` is either [`OptionNumber::CONTENT_FORMAT`] or
    /// [`OptionNumber::ACCEPT`].
    fn insert_content_format(
        &mut self,
        number: OptionNumber,
        format: ContentFormat,
    ) -> Result<(), Error> {
        debug_assert!(number == OptionNumber::CONTENT_FORMAT || number == OptionNumber::ACCEPT);
        self.insert_option_with_u32(number, u32::from(format.0))
    }
}
