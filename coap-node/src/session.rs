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

/// The kind of session a datagram belongs to.
///
/// All variants always exist so that code can name them, but only the kinds enabled by the
/// corresponding cargo feature (`dtls`, `tcp`, `tls`) can be bound. [`SessionKind::Udp`] is
/// always available.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum SessionKind {
    /// Plain CoAP-over-UDP.
    Udp,

    /// CoAP-over-DTLS. The DTLS framing itself is handled outside of the transport.
    Dtls,

    /// CoAP-over-TCP.
    Tcp,

    /// CoAP-over-TLS.
    Tls,
}

impl SessionKind {
    /// Every session kind, in the order the dispatch loop visits them.
    pub const ALL: [SessionKind; 4] = [
        SessionKind::Udp,
        SessionKind::Dtls,
        SessionKind::Tcp,
        SessionKind::Tls,
    ];

    /// Returns true if this build supports the session kind.
    pub fn is_enabled(self) -> bool {
        match self {
            SessionKind::Udp => true,
            SessionKind::Dtls => cfg!(feature = "dtls"),
            SessionKind::Tcp => cfg!(feature = "tcp"),
            SessionKind::Tls => cfg!(feature = "tls"),
        }
    }

    /// Returns true if sessions of this kind are carried over datagrams.
    pub fn is_datagram(self) -> bool {
        match self {
            SessionKind::Udp | SessionKind::Dtls => true,
            SessionKind::Tcp | SessionKind::Tls => false,
        }
    }

    /// Returns the standard default port for this session kind.
    pub fn default_port(self) -> u16 {
        match self {
            SessionKind::Udp => DEFAULT_PORT_COAP_UDP,
            SessionKind::Dtls => DEFAULT_PORT_COAP_DTLS,
            SessionKind::Tcp => DEFAULT_PORT_COAP_TCP,
            SessionKind::Tls => DEFAULT_PORT_COAP_TLS,
        }
    }

    /// Returns the URI scheme used for this session kind.
    pub fn scheme(self) -> &'static str {
        match self {
            SessionKind::Udp => URI_SCHEME_COAP,
            SessionKind::Dtls => URI_SCHEME_COAPS,
            SessionKind::Tcp => URI_SCHEME_COAP_TCP,
            SessionKind::Tls => URI_SCHEME_COAPS_TCP,
        }
    }
}

impl Default for SessionKind {
    fn default() -> Self {
        SessionKind::Udp
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}
