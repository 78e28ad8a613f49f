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

//! The boundary between the transport core and the external protocol engine.
//!
//! The engine owns message encoding, retransmission and routing. The transport hands it
//! each received datagram together with a [`OutboundSink`], which carries the
//! [`DispatchContext`] of that datagram and is the only way the engine can send. The sink
//! only lives for one dispatch pass, so the context can never outlive the
//! receive-process-respond cycle it describes.

use super::*;
use std::net::SocketAddr;

/// Addressing information for the datagram currently being processed or about to be sent.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct DispatchContext {
    /// Where the datagram came from, or where the next send goes.
    pub remote: Option<SocketAddr>,

    /// The local address the datagram actually arrived on.
    pub local: Option<SocketAddr>,

    /// The session kind of the descriptor the datagram arrived on.
    pub session: SessionKind,
}

impl DispatchContext {
    /// Creates a context for an outbound exchange of the given session kind with no
    /// recorded addresses.
    pub fn new(session: SessionKind) -> DispatchContext {
        DispatchContext {
            remote: None,
            local: None,
            session,
        }
    }

    /// Creates a context for a datagram received from `remote` on `local`.
    pub fn inbound(remote: SocketAddr, local: Option<SocketAddr>, session: SessionKind) -> Self {
        DispatchContext {
            remote: Some(remote),
            local,
            session,
        }
    }

    /// Forgets both addresses. The session kind falls back to UDP.
    pub fn clear(&mut self) {
        *self = DispatchContext::default();
    }

    /// Returns true while the context describes a datagram.
    pub fn is_active(&self) -> bool {
        self.remote.is_some()
    }
}

/// The sending half of the transport, as seen by the protocol engine during one pass.
pub trait OutboundSink {
    /// The context of the datagram being processed.
    fn context(&self) -> &DispatchContext;

    /// Redirects the next send to `remote`, keeping the recorded local address.
    fn set_remote(&mut self, remote: SocketAddr);

    /// The transport's outbound buffer. Its contents are only meaningful until the next
    /// call to [`OutboundSink::send_buffer`].
    fn buffer(&mut self) -> &mut [u8];

    /// Sends the first `len` bytes of [`OutboundSink::buffer`].
    fn send_buffer(&mut self, len: usize) -> Result<(), Error>;

    /// Copies `datagram` into the outbound buffer and sends it.
    fn send(&mut self, datagram: &[u8]) -> Result<(), Error> {
        let buffer = self.buffer();
        if datagram.len() > buffer.len() {
            return Err(Error::OutOfSpace);
        }
        buffer[..datagram.len()].copy_from_slice(datagram);
        self.send_buffer(datagram.len())
    }

    /// Returns true if the engine is in the middle of building a response.
    fn is_responding(&self) -> bool;

    /// Marks whether the engine is building a response. Cleared at the end of every pass.
    fn set_responding(&mut self, responding: bool);

    /// The remote address of the current datagram.
    fn current_remote_address(&self) -> Option<SocketAddr> {
        self.context().remote
    }

    /// The local address the current datagram arrived on.
    fn current_local_address(&self) -> Option<SocketAddr> {
        self.context().local
    }

    /// The session kind of the current datagram.
    fn current_session_kind(&self) -> SessionKind {
        self.context().session
    }
}

/// The external protocol engine the dispatch loop feeds.
pub trait ProtocolEngine {
    /// Processes one inbound datagram. Any response is sent through `out` before returning.
    fn inbound_process(&mut self, datagram: &[u8], out: &mut dyn OutboundSink)
        -> Result<(), Error>;

    /// Fires every timer whose deadline has passed.
    fn run_due_timers(&mut self, out: &mut dyn OutboundSink);

    /// Delay until the engine's next timer, or
    /// [`CMS_DISTANT_FUTURE`](crate::clock::CMS_DISTANT_FUTURE) if none is pending.
    fn next_timer_deadline(&self) -> Cms;
}

impl<E: ProtocolEngine + ?Sized> ProtocolEngine for &mut E {
    fn inbound_process(
        &mut self,
        datagram: &[u8],
        out: &mut dyn OutboundSink,
    ) -> Result<(), Error> {
        (**self).inbound_process(datagram, out)
    }

    fn run_due_timers(&mut self, out: &mut dyn OutboundSink) {
        (**self).run_due_timers(out)
    }

    fn next_timer_deadline(&self) -> Cms {
        (**self).next_timer_deadline()
    }
}
