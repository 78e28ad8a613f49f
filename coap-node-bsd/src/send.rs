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
use crate::pktinfo::send_with_pktinfo;
use std::net::{IpAddr, SocketAddrV6, UdpSocket};
use std::os::unix::io::AsRawFd;

/// Returns the source address an outbound datagram to `dest` should be pinned to.
///
/// Pinning is only possible when the local address of the current exchange is known,
/// is a concrete unicast address, and is of the same family as the destination.
/// Otherwise the datagram is sent with the routing table's choice of source.
///
/// A v4-mapped IPv6 address counts as IPv4, so a v4-mapped local never pins a send to
/// a native IPv6 destination.
pub fn source_pin(local: Option<SocketAddr>, dest: &SocketAddr) -> Option<SocketAddr> {
    let local = local?;

    if unmapped(local.ip()).is_ipv4() != unmapped(dest.ip()).is_ipv4() {
        return None;
    }

    match unmapped(local.ip()) {
        ip if ip.is_unspecified() || ip.is_multicast() => None,
        _ => Some(local),
    }
}

fn unmapped(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        ip => ip,
    }
}

/// Rewrites `addr` into the family of `socket`: IPv4 becomes v4-mapped on an IPv6 socket
/// and a v4-mapped address becomes plain IPv4 on an IPv4 socket.
fn address_for(socket: &UdpSocket, addr: SocketAddr) -> SocketAddr {
    match (socket.local_addr(), addr) {
        (Ok(SocketAddr::V6(_)), SocketAddr::V4(v4)) => {
            SocketAddr::V6(SocketAddrV6::new(v4.ip().to_ipv6_mapped(), v4.port(), 0, 0))
        }
        (Ok(SocketAddr::V4(_)), SocketAddr::V6(v6)) => match v6.ip().to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), v6.port()),
            None => addr,
        },
        _ => addr,
    }
}

/// Sends one datagram on `socket` to the remote named by `context`.
///
/// An empty datagram and a context without a remote address are rejected before any
/// system call is made. A datagram the kernel only partially accepts is reported as
/// [`Error::ShortWrite`].
pub(crate) fn send_datagram(
    sockets: &BTreeMap<SessionKind, UdpSocket>,
    context: &DispatchContext,
    datagram: &[u8],
) -> Result<(), Error> {
    if datagram.is_empty() {
        return Err(Error::InvalidArgument);
    }

    let remote = context.remote.ok_or(Error::InvalidArgument)?;
    let socket = sockets
        .get(&context.session)
        .ok_or(Error::SessionNotOpen)?;

    let pin = source_pin(context.local, &remote).map(|local| address_for(socket, local));
    let dest = address_for(socket, remote);

    let result = match pin {
        Some(local) => send_with_pktinfo(socket.as_raw_fd(), datagram, &dest, &local),
        None => socket.send_to(datagram, dest),
    };

    let sent = result.map_err(|err| {
        error!("send to {} failed: {}", dest, err);
        Error::from(err)
    })?;

    if sent < datagram.len() {
        error!(
            "short send to {}: {} of {} bytes",
            dest,
            sent,
            datagram.len()
        );
        return Err(Error::ShortWrite);
    }

    debug!("sent {} bytes to {} ({})", sent, dest, context.session);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    #[test]
    fn pin_requires_matching_family() {
        let dest = addr("[2001:db8::1]:5683");
        assert_eq!(source_pin(None, &dest), None);
        assert_eq!(source_pin(Some(addr("192.0.2.1:5683")), &dest), None);
        assert_eq!(
            source_pin(Some(addr("[2001:db8::2]:5683")), &dest),
            Some(addr("[2001:db8::2]:5683"))
        );
    }

    #[test]
    fn pin_skips_group_and_wildcard_addresses() {
        let dest = addr("[2001:db8::1]:5683");
        assert_eq!(source_pin(Some(addr("[ff02::fd]:5683")), &dest), None);
        assert_eq!(source_pin(Some(addr("[::]:5683")), &dest), None);
        assert_eq!(
            source_pin(Some(addr("[::ffff:224.0.1.187]:5683")), &dest),
            None
        );
    }

    #[test]
    fn mapped_local_counts_as_ipv4() {
        let local = addr("[::ffff:192.0.2.1]:5683");
        assert_eq!(source_pin(Some(local), &addr("[2001:db8::1]:5683")), None);
        assert_eq!(
            source_pin(Some(local), &addr("198.51.100.7:5683")),
            Some(local)
        );
        assert_eq!(
            source_pin(Some(addr("192.0.2.1:5683")), &addr("[::ffff:198.51.100.7]:5683")),
            Some(addr("192.0.2.1:5683"))
        );
    }

    #[test]
    fn addresses_follow_the_socket_family() {
        let v6 = match UdpSocket::bind("[::1]:0") {
            Ok(socket) => socket,
            Err(_) => return,
        };
        assert_eq!(
            address_for(&v6, addr("192.0.2.1:5683")),
            addr("[::ffff:192.0.2.1]:5683")
        );
        assert_eq!(
            address_for(&v6, addr("[2001:db8::1]:5683")),
            addr("[2001:db8::1]:5683")
        );

        let v4 = UdpSocket::bind("127.0.0.1:0").unwrap();
        assert_eq!(
            address_for(&v4, addr("[::ffff:192.0.2.1]:5683")),
            addr("192.0.2.1:5683")
        );
    }
}
