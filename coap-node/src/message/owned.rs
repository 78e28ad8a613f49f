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
use std::net::SocketAddr;

/// An in-memory CoAP message that can be both written and read.
///
/// Options are kept sorted by number; options with equal numbers keep their insertion
/// order. The payload is bounded by a fixed capacity, so a response can never grow beyond
/// what the transport is able to send.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OwnedMessage {
    msg_type: MsgType,
    msg_code: MsgCode,
    msg_id: MsgId,
    token: MsgToken,
    options: Vec<(OptionNumber, Vec<u8>)>,
    payload: Vec<u8>,
    capacity: usize,
}

impl Default for OwnedMessage {
    fn default() -> Self {
        OwnedMessage::with_capacity(crate::consts::MAX_PACKET_LENGTH)
    }
}

impl OwnedMessage {
    /// Creates an empty message whose payload may hold at most `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> OwnedMessage {
        OwnedMessage {
            msg_type: MsgType::Con,
            msg_code: MsgCode::Empty,
            msg_id: 0,
            token: MsgToken::EMPTY,
            options: Vec::new(),
            payload: Vec::new(),
            capacity,
        }
    }

    /// Creates a request with the given method code.
    pub fn request(code: MsgCode) -> OwnedMessage {
        let mut ret = OwnedMessage::default();
        ret.msg_code = code;
        ret
    }

    /// Sets the message id.
    pub fn set_msg_id(&mut self, msg_id: MsgId) {
        self.msg_id = msg_id;
    }

    /// Returns the raw value of every option with the given number.
    pub fn option_values(&self, number: OptionNumber) -> Vec<&[u8]> {
        self.options
            .iter()
            .filter(|(n, _)| *n == number)
            .map(|(_, v)| v.as_slice())
            .collect()
    }

    /// Returns true if no code, options or payload have been written.
    pub fn is_blank(&self) -> bool {
        self.msg_code.is_empty() && self.options.is_empty() && self.payload.is_empty()
    }
}

impl OptionInsert for OwnedMessage {
    fn insert_option_with_bytes(&mut self, key: OptionNumber, value: &[u8]) -> Result<(), Error> {
        if !self.payload.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let index = self
            .options
            .iter()
            .position(|(n, _)| *n > key)
            .unwrap_or_else(|| self.options.len());
        self.options.insert(index, (key, value.to_vec()));
        Ok(())
    }
}

impl MessageWrite for OwnedMessage {
    fn set_msg_type(&mut self, tt: MsgType) {
        self.msg_type = tt;
    }

    fn set_msg_code(&mut self, code: MsgCode) {
        self.msg_code = code;
    }

    fn set_msg_token(&mut self, token: MsgToken) {
        self.token = token;
    }

    fn append_payload_bytes(&mut self, body: &[u8]) -> Result<(), Error> {
        if self.payload.len() + body.len() > self.capacity {
            return Err(Error::OutOfSpace);
        }
        self.payload.extend_from_slice(body);
        Ok(())
    }

    fn clear(&mut self) {
        self.msg_code = MsgCode::Empty;
        self.options.clear();
        self.payload.clear();
    }
}

impl MessageRead for OwnedMessage {
    fn msg_code(&self) -> MsgCode {
        self.msg_code
    }

    fn msg_type(&self) -> MsgType {
        self.msg_type
    }

    fn msg_id(&self) -> MsgId {
        self.msg_id
    }

    fn msg_token(&self) -> MsgToken {
        self.token
    }

    fn payload(&self) -> &[u8] {
        &self.payload
    }

    fn options(&self) -> OptionIterator<'_> {
        Box::new(self.options.iter().map(|(n, v)| (*n, v.as_slice())))
    }
}

impl std::fmt::Display for OwnedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", MessageDisplay(self))
    }
}

/// Represents the context for processing an inbound request.
pub trait InboundRequest {
    /// Returns a copy of the remote address of the inbound message.
    fn remote_socket_addr(&self) -> SocketAddr;

    /// Indicates if the engine thinks this message is a duplicate. This is used
    /// for non-idempotent methods (like POST) to determine if the operation should
    /// have real effects or if it should just go through the motions without changing
    /// state.
    fn is_dupe(&self) -> bool;

    /// Returns a reference to a MessageRead trait to inspect the content
    /// of the inbound message.
    fn message(&self) -> &dyn MessageRead;
}

/// An [`InboundRequest`] that owns its message.
#[derive(Debug, Clone)]
pub struct OwnedInboundRequest {
    /// The request itself.
    pub message: OwnedMessage,

    /// Where the request came from.
    pub remote: SocketAddr,

    /// Whether the engine has seen this request before.
    pub is_dupe: bool,
}

impl OwnedInboundRequest {
    /// Wraps a fresh (non-duplicate) request from `remote`.
    pub fn new(message: OwnedMessage, remote: SocketAddr) -> OwnedInboundRequest {
        OwnedInboundRequest {
            message,
            remote,
            is_dupe: false,
        }
    }
}

impl InboundRequest for OwnedInboundRequest {
    fn remote_socket_addr(&self) -> SocketAddr {
        self.remote
    }

    fn is_dupe(&self) -> bool {
        self.is_dupe
    }

    fn message(&self) -> &dyn MessageRead {
        &self.message
    }
}
