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

use std::fmt;

/// Delivery mode of a CoAP message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MsgType {
    /// Confirmable: the receiver must acknowledge it.
    Con,

    /// Non-confirmable.
    Non,

    /// Acknowledgement of a confirmable message.
    Ack,

    /// Reset: the receiver could not process the message it answers.
    Res,
}

impl MsgType {
    /// The two-bit value carried in the message header.
    pub fn bits(self) -> u8 {
        match self {
            MsgType::Con => 0,
            MsgType::Non => 1,
            MsgType::Ack => 2,
            MsgType::Res => 3,
        }
    }

    /// Returns true if the receiver has to acknowledge the message.
    pub fn expects_ack(self) -> bool {
        self == MsgType::Con
    }

    /// Returns true for the types that answer another message.
    pub fn is_reply(self) -> bool {
        self == MsgType::Ack || self == MsgType::Res
    }

    /// Turns a confirmable message into a non-confirmable one. Group members never
    /// acknowledge, so nothing sent to a multicast address may ask them to.
    pub fn downgrade_for_multicast(&mut self) {
        if self.expects_ack() {
            *self = MsgType::Non;
        }
    }
}

impl Default for MsgType {
    fn default() -> Self {
        MsgType::Con
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MsgType::Con => "CON",
            MsgType::Non => "NON",
            MsgType::Ack => "ACK",
            MsgType::Res => "RST",
        })
    }
}
