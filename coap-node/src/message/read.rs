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
use crate::option::OptionIterator;

/// Trait for reading the various parts of a CoAP message.
///
/// The wire codec lives in the protocol engine. Resources only ever see a message through
/// this trait.
pub trait MessageRead {
    /// Gets the message code for this message.
    fn msg_code(&self) -> MsgCode;

    /// Gets the message type for this message.
    fn msg_type(&self) -> MsgType;

    /// Gets the message id for this message.
    fn msg_id(&self) -> MsgId;

    /// Gets the message token for this message.
    fn msg_token(&self) -> MsgToken;

    /// Gets the payload as a byte slice.
    fn payload(&self) -> &[u8];

    /// Gets an iterator for processing the options of the message.
    fn options(&self) -> OptionIterator<'_>;

    /// Gets the payload as a string slice.
    fn payload_as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.payload()).ok()
    }

    /// Value of the first option numbered `number`.
    fn first_option(&self, number: OptionNumber) -> Option<&[u8]> {
        self.options()
            .find(|(n, _)| *n == number)
            .map(|(_, value)| value)
    }

    /// The first option numbered `number`, decoded as an unsigned integer.
    fn option_u32(&self, number: OptionNumber) -> Option<u32> {
        self.first_option(number).and_then(try_decode_u32)
    }

    /// The ETag of the message, if it has a well-formed one.
    fn etag(&self) -> Option<ETag> {
        self.first_option(OptionNumber::ETAG).and_then(ETag::new)
    }

    /// Indicates the content format of the payload, if specified.
    fn content_format(&self) -> Option<ContentFormat> {
        self.first_option(OptionNumber::CONTENT_FORMAT)
            .and_then(try_decode_u16)
            .map(ContentFormat)
    }

    /// Indicates the content format that the sender of the message will accept
    /// for the payload of the response, if specified.
    fn accept(&self) -> Option<ContentFormat> {
        self.first_option(OptionNumber::ACCEPT)
            .and_then(try_decode_u16)
            .map(ContentFormat)
    }
}
