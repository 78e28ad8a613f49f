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

//! Types related to reading and writing CoAP messages.
//!
//! Encoding to and from the wire is the job of the protocol engine. The types here are
//! what a resource handler reads requests from and writes responses into.
use super::*;
use crate::option::{OptionInsert, OptionNumber};

/// Type for representing a CoAP message id.
pub type MsgId = u16;

mod read;
pub use read::MessageRead;

mod write;
pub use write::MessageWrite;

mod msg_code;
pub use msg_code::MsgCode;

mod msg_type;
pub use msg_type::MsgType;

mod display;
pub use display::MessageDisplay;

mod owned;
pub use owned::InboundRequest;
pub use owned::OwnedInboundRequest;
pub use owned::OwnedMessage;

mod token;
pub use token::*;
