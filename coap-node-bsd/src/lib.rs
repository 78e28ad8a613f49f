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

//! This crate provides [`Transport`]\: the BSD-socket side of a [`coap_node`] node.
//!
//! A transport owns one non-blocking UDP socket per bound [`SessionKind`], learns the
//! local address of every received datagram from packet-info ancillary data, and sends
//! replies from that same address. Each call to [`Transport::process`] reads what is
//! waiting, hands it to a [`ProtocolEngine`], and fires the engine's due timers.
//! [`Transport::wait`] blocks until there is something to do.
//!
//! [`FileVarStore`] backs a [`VarNode`](coap_node::var_node::VarNode) with a file, and
//! [`MonotonicClock`] supplies its time base.
//!
//! # Example
//!
//! ```no_run
//! use coap_node::engine::{OutboundSink, ProtocolEngine};
//! use coap_node::readiness::WaitSet;
//! use coap_node::clock::{Cms, CMS_DISTANT_FUTURE};
//! use coap_node::{Error, SessionKind};
//! use coap_node_bsd::Transport;
//!
//! /// Echoes every datagram back to where it came from.
//! struct Echo;
//!
//! impl ProtocolEngine for Echo {
//!     fn inbound_process(&mut self, datagram: &[u8], out: &mut dyn OutboundSink)
//!         -> Result<(), Error> {
//!         out.send(datagram)
//!     }
//!
//!     fn run_due_timers(&mut self, _out: &mut dyn OutboundSink) {}
//!
//!     fn next_timer_deadline(&self) -> Cms {
//!         CMS_DISTANT_FUTURE
//!     }
//! }
//!
//! let mut transport = Transport::default();
//! transport.bind_to_port(SessionKind::Udp, 5683).expect("UDP bind failed");
//!
//! let mut engine = Echo;
//! loop {
//!     transport.wait(&engine, -1, &WaitSet::new()).expect("wait failed");
//!     transport.process(&mut engine).expect("dispatch failed");
//! }
//! ```

#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

#[macro_use]
extern crate log;

use coap_node::clock::Cms;
use coap_node::engine::{DispatchContext, OutboundSink, ProtocolEngine};
use coap_node::{Error, SessionKind};
use coap_node::{ALL_COAP_DEVICES_V6_LL, MAX_PACKET_LENGTH};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::os::unix::io::RawFd;

#[cfg(test)]
use coap_node::ALL_COAP_DEVICES_V4;

mod clock;
pub use clock::MonotonicClock;

mod dispatch;
pub use dispatch::Outbound;

mod file_store;
pub use file_store::FileVarStore;

mod multiplexer;
pub use multiplexer::{effective_timeout, Readiness, WaitOutcome};

pub mod pktinfo;

mod resolver;
pub use resolver::{is_multicast, resolve};

mod send;
pub use send::source_pin;

mod transport;
pub use transport::{AddressFamily, Transport, TransportConfig};
