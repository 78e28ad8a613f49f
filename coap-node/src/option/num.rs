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

/// A CoAP option number.
///
/// Only the options a variable resource reads or writes have constants. Any other number
/// is still carried and displayed, and its low bit decides whether a receiver that does
/// not know it must reject the message.
#[derive(Copy, Eq, PartialEq, Hash, Clone, Ord, PartialOrd, Default)]
pub struct OptionNumber(pub u16);

impl OptionNumber {
    /// Entity tag of the representation.
    pub const ETAG: OptionNumber = OptionNumber(4);

    /// Observe registration in requests, notification sequence in responses.
    pub const OBSERVE: OptionNumber = OptionNumber(6);

    /// One path segment. A variable resource has no children, so any segment is 4.04.
    pub const URI_PATH: OptionNumber = OptionNumber(11);

    /// Format of the payload.
    pub const CONTENT_FORMAT: OptionNumber = OptionNumber(12);

    /// Freshness lifetime of the response, in seconds.
    pub const MAX_AGE: OptionNumber = OptionNumber(14);

    /// Payload format the client wants back.
    pub const ACCEPT: OptionNumber = OptionNumber(17);

    const NAMES: &'static [(OptionNumber, &'static str)] = &[
        (OptionNumber::ETAG, "ETag"),
        (OptionNumber::OBSERVE, "Observe"),
        (OptionNumber::URI_PATH, "Uri-Path"),
        (OptionNumber::CONTENT_FORMAT, "Content-Format"),
        (OptionNumber::MAX_AGE, "Max-Age"),
        (OptionNumber::ACCEPT, "Accept"),
    ];

    /// True for odd option numbers, which must not be silently ignored.
    pub fn is_critical(self) -> bool {
        self.0 & 1 == 1
    }

    /// The registered name of a known option.
    pub fn name(self) -> Option<&'static str> {
        OptionNumber::NAMES
            .iter()
            .find(|(number, _)| *number == self)
            .map(|(_, name)| *name)
    }
}

impl core::fmt::Display for OptionNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None if self.is_critical() => write!(f, "Crit-{}", self.0),
            None => write!(f, "Opt-{}", self.0),
        }
    }
}

impl core::fmt::Debug for OptionNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "OptionNumber({}, {})", self.0, self)
    }
}
