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

//! Module defining various CoAP-related constants.

/// The standard default IP port number used for CoAP-over-UDP.
pub const DEFAULT_PORT_COAP_UDP: u16 = 5683;

/// The standard default IP port number used for CoAP-over-DTLS.
pub const DEFAULT_PORT_COAP_DTLS: u16 = 5684;

/// The standard default IP port number used for CoAP-over-TCP.
pub const DEFAULT_PORT_COAP_TCP: u16 = 5683;

/// The standard default IP port number used for CoAP-over-TLS.
pub const DEFAULT_PORT_COAP_TLS: u16 = 5684;

/// The standard URI scheme for vanilla CoAP-over-UDP on IP networks.
pub const URI_SCHEME_COAP: &str = "coap";

/// The standard URI scheme for CoAP-over-DTLS on IP networks.
pub const URI_SCHEME_COAPS: &str = "coaps";

/// The standard URI scheme for CoAP-over-TCP on IP networks.
pub const URI_SCHEME_COAP_TCP: &str = "coap+tcp";

/// The standard URI scheme for CoAP-over-TLS on IP networks.
pub const URI_SCHEME_COAPS_TCP: &str = "coaps+tcp";

/// Maximum length of a packet this node sends or accepts, in bytes.
///
/// This is the `MAX_OUTBOUND_PACKET_LENGTH` transmission parameter recommended for CoAP
/// over IP networks.
pub const MAX_PACKET_LENGTH: usize = 1152;

/// String slice containing the "All CoAP Devices" IPv6 **Link**-Local Multicast Address: `FF02::FD`
pub const ALL_COAP_DEVICES_V6_LL: &str = "FF02::FD";

/// String slice containing the "All CoAP Devices" IPv6 **Realm**-Local Multicast Address: `FF03::FD`
pub const ALL_COAP_DEVICES_V6_RL: &str = "FF03::FD";

/// String slice containing the "All CoAP Devices" IPv4 **Link**-Local Multicast Address: `224.0.1.187`
pub const ALL_COAP_DEVICES_V4: &str = "224.0.1.187";

/// Value for `OptionNumber::OBSERVE` when registering an observer.
///
/// Note that this is only for requests, replies have entirely different semantics.
///
/// Defined by [IETF-RFC7641](https://tools.ietf.org/html/rfc7641).
pub const OBSERVE_REGISTER: u32 = 0;

/// Value for `OptionNumber::OBSERVE` when deregistering an observer.
///
/// Note that this is only for requests, replies have entirely different semantics.
///
/// Defined by [IETF-RFC7641](https://tools.ietf.org/html/rfc7641).
pub const OBSERVE_DEREGISTER: u32 = 1;

/// Observe sequence numbers are 24 bits wide.
pub const OBSERVE_SEQ_MASK: u32 = 0x00FF_FFFF;
