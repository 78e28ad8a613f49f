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

//! Packet-info ancillary data.
//!
//! Received datagrams carry their real destination address in an `IPV6_PKTINFO` (or
//! `IP_PKTINFO`) control message, which is the only way to learn which local address a
//! wildcard-bound socket was reached on. Sent datagrams carry the same structure to pin
//! their source address and interface.

use std::io;
use std::mem;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::os::unix::io::RawFd;

use socket2::SockAddr;

/// Size of the control buffer handed to `recvmsg`, in bytes.
const RECV_CONTROL_LEN: usize = 0x100;

/// Size of the control buffer handed to `sendmsg`, in bytes. Fits either pktinfo structure.
const SEND_CONTROL_LEN: usize = 64;

/// The destination of a received datagram, as reported by the kernel.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PacketInfo {
    /// The destination address of the datagram.
    pub addr: IpAddr,

    /// Index of the interface the datagram arrived on.
    pub ifindex: u32,
}

/// A datagram received with [`recv_with_pktinfo`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Received {
    pub len: usize,
    pub remote: SocketAddr,
    pub pktinfo: Option<PacketInfo>,

    /// The datagram was longer than the buffer and only its first `len` bytes were kept.
    pub truncated: bool,
}

/// Asks the kernel to report the destination address of every datagram received on `fd`.
pub fn enable_pktinfo(fd: RawFd, ipv6: bool) -> io::Result<()> {
    let value: libc::c_int = 1;
    let (level, name) = if ipv6 {
        (libc::IPPROTO_IPV6, libc::IPV6_RECVPKTINFO)
    } else {
        (libc::IPPROTO_IP, libc::IP_PKTINFO)
    };

    // SAFETY: `value` outlives the call and its size is passed along with it.
    let ret = unsafe {
        libc::setsockopt(
            fd,
            level,
            name,
            &value as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Receives one datagram from `fd` into `buf` along with its packet info.
pub fn recv_with_pktinfo(fd: RawFd, buf: &mut [u8]) -> io::Result<Received> {
    // Control buffers hold `cmsghdr` structures, which need word alignment.
    let mut control = [0u64; RECV_CONTROL_LEN / 8];
    let mut iov = libc::iovec {
        iov_base: buf.as_mut_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };
    let mut pktinfo = None;
    let mut truncated = false;

    // SAFETY: every pointer placed in `msg` refers to a buffer that lives until
    // `recvmsg` returns, and the lengths passed are the lengths of those buffers.
    let (len, addr) = unsafe {
        SockAddr::try_init(|storage, storage_len| {
            let mut msg: libc::msghdr = mem::zeroed();
            msg.msg_name = storage as *mut libc::c_void;
            msg.msg_namelen = *storage_len;
            msg.msg_iov = &mut iov;
            msg.msg_iovlen = 1;
            msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;
            msg.msg_controllen = mem::size_of_val(&control) as _;

            let ret = libc::recvmsg(fd, &mut msg, 0);
            if ret < 0 {
                return Err(io::Error::last_os_error());
            }
            *storage_len = msg.msg_namelen;

            pktinfo = parse_control(&msg);
            truncated = msg.msg_flags & libc::MSG_TRUNC != 0;
            Ok(ret as usize)
        })?
    };

    let remote = addr
        .as_socket()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unsupported address family"))?;

    Ok(Received {
        len,
        remote,
        pktinfo,
        truncated,
    })
}

/// Walks the control messages of `msg` looking for packet info.
///
/// # Safety
///
/// `msg` must describe a control buffer just filled in by `recvmsg`.
unsafe fn parse_control(msg: &libc::msghdr) -> Option<PacketInfo> {
    let mut ret = None;
    let mut cmsg = libc::CMSG_FIRSTHDR(msg);

    while !cmsg.is_null() {
        let hdr = &*cmsg;
        let data = libc::CMSG_DATA(cmsg);

        if hdr.cmsg_level == libc::IPPROTO_IPV6 && hdr.cmsg_type == libc::IPV6_PKTINFO {
            let pi: libc::in6_pktinfo = std::ptr::read_unaligned(data as *const _);
            ret = Some(PacketInfo {
                addr: IpAddr::V6(Ipv6Addr::from(pi.ipi6_addr.s6_addr)),
                ifindex: pi.ipi6_ifindex as u32,
            });
        } else if hdr.cmsg_level == libc::IPPROTO_IP && hdr.cmsg_type == libc::IP_PKTINFO {
            let pi: libc::in_pktinfo = std::ptr::read_unaligned(data as *const _);
            ret = Some(PacketInfo {
                addr: IpAddr::V4(Ipv4Addr::from(u32::from_be(pi.ipi_addr.s_addr))),
                ifindex: pi.ipi_ifindex as u32,
            });
        }

        cmsg = libc::CMSG_NXTHDR(msg, cmsg);
    }

    ret
}

/// Rebuilds the local address a datagram from `remote` arrived on.
///
/// The kernel only reports the destination address and interface. The remaining fields
/// are taken from `remote`, and the port is the port the transport is bound to.
pub fn local_address(remote: &SocketAddr, pktinfo: &PacketInfo, port: u16) -> SocketAddr {
    match (pktinfo.addr, remote) {
        (IpAddr::V6(addr), SocketAddr::V6(remote)) => {
            SocketAddr::V6(SocketAddrV6::new(addr, port, remote.flowinfo(), pktinfo.ifindex))
        }
        (IpAddr::V6(addr), SocketAddr::V4(_)) => {
            SocketAddr::V6(SocketAddrV6::new(addr, port, 0, pktinfo.ifindex))
        }
        (IpAddr::V4(addr), _) => SocketAddr::V4(SocketAddrV4::new(addr, port)),
    }
}

/// Sends `buf` to `dest` from `local`, pinning the source address of the datagram.
///
/// `local` and `dest` must be of the same address family.
pub fn send_with_pktinfo(
    fd: RawFd,
    buf: &[u8],
    dest: &SocketAddr,
    local: &SocketAddr,
) -> io::Result<usize> {
    let dest = SockAddr::from(*dest);
    let mut control = [0u64; SEND_CONTROL_LEN / 8];
    let mut iov = libc::iovec {
        iov_base: buf.as_ptr() as *mut libc::c_void,
        iov_len: buf.len(),
    };

    // SAFETY: as in `recv_with_pktinfo`, every pointer in `msg` refers to a live buffer
    // of the stated length.
    let ret = unsafe {
        let mut msg: libc::msghdr = mem::zeroed();
        msg.msg_name = dest.as_ptr() as *mut libc::c_void;
        msg.msg_namelen = dest.len();
        msg.msg_iov = &mut iov;
        msg.msg_iovlen = 1;
        msg.msg_control = control.as_mut_ptr() as *mut libc::c_void;

        match local {
            SocketAddr::V6(local) => {
                let data_len = mem::size_of::<libc::in6_pktinfo>();
                msg.msg_controllen = libc::CMSG_SPACE(data_len as u32) as _;
                let cmsg = &mut *libc::CMSG_FIRSTHDR(&msg);
                cmsg.cmsg_level = libc::IPPROTO_IPV6;
                cmsg.cmsg_type = libc::IPV6_PKTINFO;
                cmsg.cmsg_len = libc::CMSG_LEN(data_len as u32) as _;

                let mut pi: libc::in6_pktinfo = mem::zeroed();
                pi.ipi6_addr.s6_addr = local.ip().octets();
                pi.ipi6_ifindex = local.scope_id() as _;
                std::ptr::write_unaligned(libc::CMSG_DATA(cmsg) as *mut libc::in6_pktinfo, pi);
            }
            SocketAddr::V4(local) => {
                let data_len = mem::size_of::<libc::in_pktinfo>();
                msg.msg_controllen = libc::CMSG_SPACE(data_len as u32) as _;
                let cmsg = &mut *libc::CMSG_FIRSTHDR(&msg);
                cmsg.cmsg_level = libc::IPPROTO_IP;
                cmsg.cmsg_type = libc::IP_PKTINFO;
                cmsg.cmsg_len = libc::CMSG_LEN(data_len as u32) as _;

                let mut pi: libc::in_pktinfo = mem::zeroed();
                pi.ipi_spec_dst.s_addr = u32::from(*local.ip()).to_be();
                pi.ipi_ifindex = 0;
                std::ptr::write_unaligned(libc::CMSG_DATA(cmsg) as *mut libc::in_pktinfo, pi);
            }
        }

        libc::sendmsg(fd, &msg, 0)
    };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_address_overlays_pktinfo() {
        let remote: SocketAddr = "[fe80::1%3]:40000".parse().unwrap();
        let pktinfo = PacketInfo {
            addr: "fe80::2".parse().unwrap(),
            ifindex: 3,
        };
        let local = local_address(&remote, &pktinfo, 5683);
        assert_eq!(local, "[fe80::2%3]:5683".parse().unwrap());

        let remote: SocketAddr = "10.0.0.1:40000".parse().unwrap();
        let pktinfo = PacketInfo {
            addr: "10.0.0.2".parse().unwrap(),
            ifindex: 0,
        };
        assert_eq!(
            local_address(&remote, &pktinfo, 5683),
            "10.0.0.2:5683".parse::<SocketAddr>().unwrap()
        );
    }
}
