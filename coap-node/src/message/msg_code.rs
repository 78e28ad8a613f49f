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

/// A CoAP message code, stored as its wire byte: three bits of class, five of detail.
///
/// Only the codes a variable resource and its transport can produce or act upon are listed.
#[derive(Debug, Copy, Eq, PartialEq, Clone, Hash)]
pub enum MsgCode {
    /// No code. Pings, resets, empty acknowledgements and responses not yet written.
    Empty = 0x00,

    /// 0.01 GET.
    MethodGet = 0x01,

    /// 0.02 POST.
    MethodPost = 0x02,

    /// 0.03 PUT.
    MethodPut = 0x03,

    /// 0.04 DELETE.
    MethodDelete = 0x04,

    /// 2.05 Content.
    SuccessContent = 0x45,

    /// 4.00 Bad Request.
    ClientErrorBadRequest = 0x80,

    /// 4.02 Bad Option.
    ClientErrorBadOption = 0x82,

    /// 4.04 Not Found.
    ClientErrorNotFound = 0x84,

    /// 4.05 Method Not Allowed.
    ClientErrorMethodNotAllowed = 0x85,

    /// 4.13 Request Entity Too Large.
    ClientErrorRequestEntityTooLarge = 0x8D,

    /// 4.15 Unsupported Content-Format.
    ClientErrorUnsupportedMediaType = 0x8F,

    /// 5.00 Internal Server Error.
    ServerErrorInternalServerError = 0xA0,

    /// 5.01 Not Implemented.
    ServerErrorNotImplemented = 0xA1,
}

impl MsgCode {
    /// The `4` in `4.13`.
    pub fn class(self) -> u8 {
        u8::from(self) >> 5
    }

    /// The `13` in `4.13`.
    pub fn detail(self) -> u8 {
        u8::from(self) & 0x1F
    }

    pub fn is_empty(self) -> bool {
        self == MsgCode::Empty
    }

    /// Requests carry class 0 with a non-zero detail.
    pub fn is_method(self) -> bool {
        !self.is_empty() && self.class() == 0
    }

    /// Client and server errors, classes 4 and 5.
    pub fn is_error(self) -> bool {
        self.class() >= 4
    }
}

impl Default for MsgCode {
    fn default() -> Self {
        MsgCode::Empty
    }
}

impl core::fmt::Display for MsgCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())
    }
}

impl From<MsgCode> for u8 {
    fn from(code: MsgCode) -> Self {
        code as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_form() {
        assert_eq!(MsgCode::SuccessContent.to_string(), "2.05");
        assert_eq!(MsgCode::ClientErrorRequestEntityTooLarge.to_string(), "4.13");
        assert_eq!(MsgCode::ClientErrorUnsupportedMediaType.to_string(), "4.15");
        assert_eq!(MsgCode::ServerErrorNotImplemented.to_string(), "5.01");
    }

    #[test]
    fn classes() {
        assert!(MsgCode::MethodPut.is_method());
        assert!(!MsgCode::Empty.is_method());
        assert!(!MsgCode::SuccessContent.is_method());
        assert!(MsgCode::ClientErrorBadOption.is_error());
        assert!(MsgCode::ServerErrorNotImplemented.is_error());
        assert!(!MsgCode::SuccessContent.is_error());
    }
}
