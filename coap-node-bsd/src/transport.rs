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
use crate::pktinfo::enable_pktinfo;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, UdpSocket};
use std::os::unix::io::{AsRawFd, RawFd};

/// Address family a [`Transport`] is built for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AddressFamily {
    /// IPv4 only.
    Inet4,

    /// IPv6, with IPv4 traffic arriving as v4-mapped addresses.
    Inet6,
}

impl AddressFamily {
    /// The wildcard address of this family.
    pub fn unspecified(self) -> IpAddr {
        match self {
            AddressFamily::Inet4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Inet6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    fn domain(self) -> Domain {
        match self {
            AddressFamily::Inet4 => Domain::IPV4,
            AddressFamily::Inet6 => Domain::IPV6,
        }
    }
}

impl Default for AddressFamily {
    fn default() -> Self {
        AddressFamily::Inet6
    }
}

/// Construction parameters for a [`Transport`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransportConfig {
    /// Address family of every socket the transport opens.
    pub family: AddressFamily,

    /// Size of the inbound and outbound datagram buffers.
    pub max_packet_len: usize,

    /// Join the link-local "All CoAP Devices" group when the transport is created.
    pub join_all_coap_devices: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            family: AddressFamily::default(),
            max_packet_len: MAX_PACKET_LENGTH,
            join_all_coap_devices: true,
        }
    }
}

/// The socket side of a CoAP node.
///
/// Owns at most one bound socket per [`SessionKind`], plus an unbound socket that only
/// carries multicast group memberships. All sockets are non-blocking and are closed when
/// the transport is dropped or [`Transport::close_all`] is called.
#[derive(Debug)]
pub struct Transport {
    pub(crate) config: TransportConfig,
    pub(crate) sockets: BTreeMap<SessionKind, UdpSocket>,
    multicast: Option<UdpSocket>,
    groups: Vec<Ipv6Addr>,
    pub(crate) inbound: Vec<u8>,
    pub(crate) outbound: Vec<u8>,
}

impl Default for Transport {
    fn default() -> Self {
        Transport::new(TransportConfig::default())
    }
}

impl Transport {
    /// Creates a transport with no bound sockets.
    ///
    /// If `config.join_all_coap_devices` is set and the family is IPv6, the link-local
    /// "All CoAP Devices" group is joined. Failing to join is logged and otherwise ignored.
    pub fn new(config: TransportConfig) -> Transport {
        let mut ret = Transport {
            inbound: vec![0; config.max_packet_len],
            outbound: vec![0; config.max_packet_len],
            sockets: BTreeMap::new(),
            multicast: None,
            groups: Vec::new(),
            config,
        };

        if ret.config.join_all_coap_devices && ret.config.family == AddressFamily::Inet6 {
            if let Err(err) = ret.join_multicast(ALL_COAP_DEVICES_V6_LL) {
                warn!(
                    "unable to join {}: {}",
                    ALL_COAP_DEVICES_V6_LL, err
                );
            }
        }

        ret
    }

    /// The configuration this transport was created with.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Binds a socket for `kind` to `addr`.
    ///
    /// Non-datagram and disabled session kinds are rejected with
    /// [`Error::NotImplemented`]. A kind that is already bound is rejected with
    /// [`Error::AddressInUse`] and the existing socket stays open. On any other failure
    /// nothing is left open.
    pub fn bind(&mut self, kind: SessionKind, addr: SocketAddr) -> Result<(), Error> {
        if !kind.is_enabled() || !kind.is_datagram() {
            return Err(Error::NotImplemented);
        }

        if self.sockets.contains_key(&kind) {
            return Err(Error::AddressInUse);
        }

        let family = self.config.family;
        let addr = match (family, addr) {
            (AddressFamily::Inet6, SocketAddr::V4(v4)) => {
                SocketAddr::new(IpAddr::V6(v4.ip().to_ipv6_mapped()), v4.port())
            }
            (AddressFamily::Inet4, SocketAddr::V6(_)) => return Err(Error::InvalidArgument),
            _ => addr,
        };

        let socket = Socket::new(family.domain(), Type::DGRAM, Some(Protocol::UDP))?;

        if family == AddressFamily::Inet6 {
            if let Err(err) = socket.set_only_v6(false) {
                warn!("unable to clear IPV6_V6ONLY: {}", err);
            }
        }

        socket.bind(&addr.into())?;

        if let Err(err) = enable_pktinfo(socket.as_raw_fd(), family == AddressFamily::Inet6) {
            warn!("unable to enable packet info on {}: {}", addr, err);
        }

        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from(socket);
        info!("bound {} socket to {}", kind, socket.local_addr()?);
        self.sockets.insert(kind, socket);

        Ok(())
    }

    /// Binds a socket for `kind` to the wildcard address of the transport's family.
    pub fn bind_to_port(&mut self, kind: SessionKind, port: u16) -> Result<(), Error> {
        let addr = SocketAddr::new(self.config.family.unspecified(), port);
        self.bind(kind, addr)
    }

    /// Joins the multicast group named by `group`.
    ///
    /// Memberships are held by a dedicated unbound socket which is created on first use.
    /// Joining a group that was already joined is a no-op. Only IPv6 groups are supported.
    pub fn join_multicast(&mut self, group: &str) -> Result<(), Error> {
        if self.config.family != AddressFamily::Inet6 {
            return Err(Error::NotImplemented);
        }

        let addr = match group.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => addr,
            Ok(IpAddr::V4(_)) => return Err(Error::NotImplemented),
            Err(_) => match resolve(group, AddressFamily::Inet6, None)? {
                IpAddr::V6(addr) if addr.to_ipv4().is_none() => addr,
                _ => return Err(Error::NotImplemented),
            },
        };

        if !addr.is_multicast() {
            return Err(Error::InvalidArgument);
        }

        if self.groups.contains(&addr) {
            debug!("already a member of {}", addr);
            return Ok(());
        }

        let socket = match self.multicast.take() {
            Some(socket) => socket,
            None => UdpSocket::from(Socket::new(Domain::IPV6, Type::DGRAM, None)?),
        };

        // Every membership lives on this one socket, so put it back before bailing.
        let result = join_v6(&socket, &addr);
        self.multicast = Some(socket);
        result?;

        info!("joined multicast group {}", addr);
        self.groups.push(addr);

        Ok(())
    }

    /// The multicast groups currently joined.
    pub fn multicast_groups(&self) -> &[Ipv6Addr] {
        &self.groups
    }

    /// Closes every socket, including the multicast socket. Safe to call repeatedly.
    pub fn close_all(&mut self) {
        if !self.sockets.is_empty() || self.multicast.is_some() {
            debug!("closing {} session sockets", self.sockets.len());
        }
        self.sockets.clear();
        self.multicast = None;
        self.groups.clear();
    }

    /// The open session sockets, for handing to an external readiness multiplexer.
    ///
    /// The multicast membership socket is never bound and is not included.
    pub fn readiness_set(&self) -> Vec<(SessionKind, RawFd)> {
        self.sockets
            .iter()
            .map(|(kind, socket)| (*kind, socket.as_raw_fd()))
            .collect()
    }

    /// Returns true if a socket for `kind` is open.
    pub fn is_bound(&self, kind: SessionKind) -> bool {
        self.sockets.contains_key(&kind)
    }

    /// The local address of the socket for `kind`.
    pub fn local_addr(&self, kind: SessionKind) -> Option<SocketAddr> {
        self.sockets.get(&kind)?.local_addr().ok()
    }

    /// The local port of the UDP socket, or zero if UDP is not bound.
    pub fn port(&self) -> u16 {
        self.local_addr(SessionKind::Udp)
            .map(|addr| addr.port())
            .unwrap_or(0)
    }
}

fn join_v6(socket: &UdpSocket, addr: &Ipv6Addr) -> Result<(), Error> {
    socket.set_multicast_loop_v6(true)?;

    // Clears any stale membership. Failure is the normal case.
    let _ = socket.leave_multicast_v6(addr, 0);

    socket.join_multicast_v6(addr, 0)?;

    Ok(())
}
