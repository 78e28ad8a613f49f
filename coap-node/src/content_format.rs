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

use std::borrow::Cow;

/// Type representing a CoAP content format.
#[derive(Debug, Copy, Eq, PartialEq, Clone, Hash, Ord, PartialOrd)]
pub struct ContentFormat(pub u16);

impl ContentFormat {
    /// From IETF-RFC7252.
    pub const TEXT_PLAIN_UTF8: ContentFormat = ContentFormat(0);

    /// From IETF-RFC7252.
    pub const APPLICATION_LINK_FORMAT: ContentFormat = ContentFormat(40);

    /// From IETF-RFC7252.
    pub const APPLICATION_OCTET_STREAM: ContentFormat = ContentFormat(42);

    /// From IETF-RFC7252.
    pub const APPLICATION_JSON: ContentFormat = ContentFormat(50);

    /// Form-encoded key/value pairs. Not registered with IANA, so it lives in the
    /// experimental range.
    pub const APPLICATION_FORM_URLENCODED: ContentFormat = ContentFormat(65000);

    /// Returns the MIME name of this content format as a `&'static str`, if possible.
    pub fn static_name(self) -> Option<&'static str> {
        Some(match self {
            Self::TEXT_PLAIN_UTF8 => "text/plain;charset=utf-8",
            Self::APPLICATION_LINK_FORMAT => "application/link-format",
            Self::APPLICATION_OCTET_STREAM => "application/octet-stream",
            Self::APPLICATION_JSON => "application/json",
            Self::APPLICATION_FORM_URLENCODED => "application/x-www-form-urlencoded",
            _ => return None,
        })
    }

    /// Returns a MIME name for this content format.
    pub fn name(&self) -> Cow<'static, str> {
        if let Some(name) = self.static_name() {
            Cow::from(name)
        } else {
            Cow::from(self.to_string())
        }
    }

    /// Returns true if a variable resource can represent its value in this format.
    pub fn is_variable_format(self) -> bool {
        match self {
            Self::TEXT_PLAIN_UTF8 | Self::APPLICATION_FORM_URLENCODED => true,
            _ => false,
        }
    }
}

impl Default for ContentFormat {
    fn default() -> Self {
        ContentFormat::TEXT_PLAIN_UTF8
    }
}

impl core::fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(n) = self.static_name() {
            f.write_str(n)
        } else {
            write!(f, "application/x-coap-{}", self.0)
        }
    }
}
