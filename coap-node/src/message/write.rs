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

/// A response being built by a resource handler.
///
/// The engine hands the handler an empty message with the type and token already
/// chosen. The handler sets the code, inserts options, and ends with the payload.
pub trait MessageWrite: OptionInsert {
    /// Sets the message type. The last call wins.
    fn set_msg_type(&mut self, tt: MsgType);

    /// Sets the response code. The last call wins.
    fn set_msg_code(&mut self, code: MsgCode);

    /// Sets the token.
    fn set_msg_token(&mut self, token: MsgToken);

    /// Appends `body` to the payload. Once any payload has been written, no more options
    /// can be inserted.
    fn append_payload_bytes(&mut self, body: &[u8]) -> Result<(), Error>;

    /// Appends the UTF-8 bytes of `body` to the payload.
    fn append_payload_string(&mut self, body: &str) -> Result<(), Error> {
        self.append_payload_bytes(body.as_bytes())
    }

    /// Discards everything the handler wrote. The code goes back to
    /// [`MsgCode::Empty`] and every option and the payload are removed. The type and the
    /// token are kept.
    fn clear(&mut self);
}
