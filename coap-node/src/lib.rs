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

//! Transport-independent core of a CoAP node.
//!
//! This crate holds the pieces of a node that do not touch the operating system:
//!
//! * deadline arithmetic over a [`Clock`](clock::Clock),
//! * the [`ProtocolEngine`](engine::ProtocolEngine) boundary, through which a transport
//!   feeds datagrams to the external CoAP engine and the engine sends replies,
//! * the observer bookkeeping of [`ObservableSet`](observable::ObservableSet),
//! * and [`VarNode`](var_node::VarNode), an observable resource whose value lives in an
//!   external store such as a device file.
//!
//! A BSD-socket transport that drives all of this lives in the `coap-node-bsd` crate.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]
#![warn(clippy::all)]
#![warn(missing_docs)]

#[macro_use]
extern crate log;

pub mod message;
pub mod option;

mod content_format;
pub use content_format::ContentFormat;

pub mod consts;
#[doc(hidden)]
pub use consts::*;

mod error;
pub use error::*;

mod util;
use util::*;

mod etag;
pub use etag::ETag;

pub mod fasthash;

pub mod clock;
pub mod engine;
pub mod observable;
pub mod readiness;
pub mod var_node;

mod session;
pub use session::SessionKind;

use clock::{Clock, Cms, Timestamp};
use message::{MessageRead, MessageWrite, MsgCode, MsgToken};
use option::{OptionInsert, OptionNumber};

#[cfg(test)]
use clock::ManualClock;

#[doc(hidden)]
pub mod prelude {
    pub use super::clock::Clock;
    pub use super::engine::{DispatchContext, OutboundSink, ProtocolEngine};
    pub use super::observable::{ObservableSet, ObserverKey, TriggerKey};
    pub use super::readiness::{Interest, WaitSet};
    pub use super::var_node::{RequestOutcome, VarNode, VarNodeParams, VarStore};

    pub use super::ContentFormat;
    pub use super::ETag;
    pub use super::Error;
    pub use super::SessionKind;

    pub use super::message::InboundRequest;
    pub use super::message::MessageRead;
    pub use super::message::MessageWrite;
    pub use super::message::MsgCode;
    pub use super::message::MsgToken;
    pub use super::message::MsgType;

    pub use super::option;
    pub use option::OptionInsert;
    pub use option::OptionNumber;
}
