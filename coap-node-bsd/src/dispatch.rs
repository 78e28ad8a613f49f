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

//! The receive-process-respond pass.

use super::*;
use crate::pktinfo::{local_address, recv_with_pktinfo};
use crate::send::send_datagram;
use std::io;
use std::net::UdpSocket;

/// [`OutboundSink`] handed to the protocol engine for the duration of one pass.
#[derive(Debug)]
pub struct Outbound<'a> {
    sockets: &'a BTreeMap<SessionKind, UdpSocket>,
    buffer: &'a mut [u8],
    context: DispatchContext,
    responding: bool,
}

impl<'a> Outbound<'a> {
    fn new(
        sockets: &'a BTreeMap<SessionKind, UdpSocket>,
        buffer: &'a mut [u8],
        context: DispatchContext,
    ) -> Outbound<'a> {
        Outbound {
            sockets,
            buffer,
            context,
            responding: false,
        }
    }
}

impl<'a> OutboundSink for Outbound<'a> {
    fn context(&self) -> &DispatchContext {
        &self.context
    }

    fn set_remote(&mut self, remote: SocketAddr) {
        self.context.remote = Some(remote);
    }

    fn buffer(&mut self) -> &mut [u8] {
        &mut *self.buffer
    }

    fn send_buffer(&mut self, len: usize) -> Result<(), Error> {
        let datagram = self.buffer.get(..len).ok_or(Error::OutOfSpace)?;
        send_datagram(self.sockets, &self.context, datagram)
    }

    fn is_responding(&self) -> bool {
        self.responding
    }

    fn set_responding(&mut self, responding: bool) {
        self.responding = responding;
    }
}

impl Transport {
    /// Creates a sink for sending outside of a dispatch pass, such as an observer
    /// notification or a client request.
    pub fn outbound(&mut self, context: DispatchContext) -> Outbound<'_> {
        Outbound::new(&self.sockets, &mut self.outbound, context)
    }

    /// Sends `datagram` to the remote named by `context`, on the socket of its session
    /// kind.
    pub fn send(&mut self, context: &DispatchContext, datagram: &[u8]) -> Result<(), Error> {
        self.outbound(*context).send(datagram)
    }

    /// Runs one receive-process-respond pass without blocking.
    ///
    /// At most one datagram is read from every ready session socket and handed to
    /// `engine` along with its [`DispatchContext`]. An error from the engine or from a
    /// receive aborts the rest of the pass and is returned. Once every ready socket has
    /// been serviced, due timers are fired, whether or not a datagram arrived.
    pub fn process(&mut self, engine: &mut dyn ProtocolEngine) -> Result<(), Error> {
        let ready = self.ready_sessions()?;

        let Transport {
            sockets,
            inbound,
            outbound,
            ..
        } = self;

        let mut out = Outbound::new(sockets, outbound, DispatchContext::default());

        for (kind, fd) in ready {
            let received = match recv_with_pktinfo(fd, inbound) {
                Ok(received) => received,
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => continue,
                Err(err) => {
                    error!("receive on {} socket failed: {}", kind, err);
                    return Err(err.into());
                }
            };

            if received.len == 0 {
                debug!("ignoring empty datagram from {}", received.remote);
                continue;
            }

            if received.truncated {
                warn!(
                    "dropping datagram from {} on {} socket: longer than {} bytes",
                    received.remote,
                    kind,
                    inbound.len()
                );
                continue;
            }

            let port = session_port(sockets, kind);
            let local = received
                .pktinfo
                .map(|pktinfo| local_address(&received.remote, &pktinfo, port));

            debug!(
                "received {} bytes from {} on {:?} ({})",
                received.len, received.remote, local, kind
            );

            out.context = DispatchContext::inbound(received.remote, local, kind);
            out.responding = false;

            engine.inbound_process(&inbound[..received.len], &mut out)?;
        }

        out.context.clear();
        out.responding = false;
        engine.run_due_timers(&mut out);

        Ok(())
    }
}

/// The local port of the socket bound for `kind`, or zero if it is not bound.
fn session_port(sockets: &BTreeMap<SessionKind, UdpSocket>, kind: SessionKind) -> u16 {
    sockets
        .get(&kind)
        .and_then(|socket| socket.local_addr().ok())
        .map_or(0, |addr| addr.port())
}
