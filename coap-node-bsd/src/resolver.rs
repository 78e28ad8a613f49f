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

//! Host name resolution.

use super::*;
use coap_node::message::MsgType;
use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ptr;

/// Owns a `getaddrinfo` result list and frees it on drop.
struct AddrInfoList(*mut libc::addrinfo);

impl AddrInfoList {
    fn lookup(name: &CStr, family: libc::c_int, flags: libc::c_int) -> Result<Self, libc::c_int> {
        // SAFETY: an all-zero addrinfo is a valid "no constraints" hints structure.
        let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
        hints.ai_family = family;
        hints.ai_flags = flags;

        let mut res = ptr::null_mut();

        // SAFETY: `name` is NUL-terminated, `hints` and `res` are valid for the call.
        let ret = unsafe { libc::getaddrinfo(name.as_ptr(), ptr::null(), &hints, &mut res) };

        if ret == 0 {
            Ok(AddrInfoList(res))
        } else {
            Err(ret)
        }
    }

    fn addrs(&self) -> Vec<IpAddr> {
        let mut ret = Vec::new();
        let mut iter = self.0;

        while !iter.is_null() {
            // SAFETY: `iter` is a node of the list returned by getaddrinfo, which stays
            // valid until `freeaddrinfo` is called in `drop`.
            let ai = unsafe { &*iter };

            if !ai.ai_addr.is_null() {
                match ai.ai_family {
                    libc::AF_INET6 => {
                        // SAFETY: AF_INET6 entries carry a sockaddr_in6.
                        let sin6 = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in6) };
                        ret.push(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)));
                    }
                    libc::AF_INET => {
                        // SAFETY: AF_INET entries carry a sockaddr_in.
                        let sin = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in) };
                        ret.push(IpAddr::V4(Ipv4Addr::from(u32::from_be(
                            sin.sin_addr.s_addr,
                        ))));
                    }
                    _ => (),
                }
            }

            iter = ai.ai_next;
        }

        ret
    }
}

impl Drop for AddrInfoList {
    fn drop(&mut self) {
        // SAFETY: the pointer came from a successful getaddrinfo and is freed only here.
        unsafe { libc::freeaddrinfo(self.0) }
    }
}

fn lookup_error(code: libc::c_int) -> Error {
    if code == libc::EAI_AGAIN {
        Error::TemporaryFailure
    } else {
        Error::HostLookupFailure
    }
}

/// Returns true for names made only of digits and dots, including the short forms such as
/// `127.1` that `inet_aton` accepts.
fn looks_like_dotted_quad(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b == b'.' || b.is_ascii_digit())
}

/// Converts `addr` to `family`, or returns `None` if it cannot be expressed in it.
fn fit_family(addr: IpAddr, family: AddressFamily) -> Option<IpAddr> {
    match (family, addr) {
        (AddressFamily::Inet6, IpAddr::V4(v4)) => Some(IpAddr::V6(v4.to_ipv6_mapped())),
        (AddressFamily::Inet4, IpAddr::V6(v6)) => v6.to_ipv4_mapped().map(IpAddr::V4),
        _ => Some(addr),
    }
}

/// Returns true if `addr` is a multicast address, looking through v4-mapped addresses.
pub fn is_multicast(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_multicast(),
        IpAddr::V6(v6) => {
            v6.is_multicast() || v6.to_ipv4_mapped().map_or(false, |v4| v4.is_multicast())
        }
    }
}

fn resolve_name(name: &str, family: AddressFamily) -> Result<IpAddr, Error> {
    // Bracketed literals come straight out of URI authorities.
    let literal = name.trim_start_matches('[').trim_end_matches(']');
    if let Ok(addr) = literal.parse::<IpAddr>() {
        return fit_family(addr, family).ok_or(Error::HostLookupFailure);
    }

    let cname = CString::new(name).map_err(|_| Error::InvalidArgument)?;

    let list = match AddrInfoList::lookup(&cname, libc::AF_UNSPEC, libc::AI_ADDRCONFIG) {
        Ok(list) => list,
        Err(code) if family == AddressFamily::Inet6 && looks_like_dotted_quad(name) => {
            debug!("lookup of {} failed ({}), retrying as v4-mapped", name, code);
            let mapped = CString::new(format!("::ffff:{}", name))
                .map_err(|_| Error::InvalidArgument)?;
            AddrInfoList::lookup(
                &mapped,
                libc::AF_INET6,
                libc::AI_ALL | libc::AI_V4MAPPED,
            )
            .map_err(lookup_error)?
        }
        Err(code) => return Err(lookup_error(code)),
    };

    list.addrs()
        .into_iter()
        .filter_map(|addr| fit_family(addr, family))
        .next()
        .ok_or(Error::HostLookupFailure)
}

/// Resolves `name` to a single address of `family`.
///
/// IP literals, bracketed or not, are parsed directly. Otherwise the system resolver is
/// asked and the first usable answer wins; IPv4 answers are mapped when `family` is IPv6.
/// A resolver that cannot answer right now yields [`Error::TemporaryFailure`], any other
/// failure [`Error::HostLookupFailure`].
///
/// If the result is a multicast address and `msg_type` is given, a confirmable message
/// type is downgraded to non-confirmable, since multicast requests are never confirmable.
pub fn resolve(
    name: &str,
    family: AddressFamily,
    msg_type: Option<&mut MsgType>,
) -> Result<IpAddr, Error> {
    let addr = resolve_name(name, family).map_err(|err| {
        warn!("unable to resolve {:?}: {}", name, err);
        err
    })?;

    debug!("resolved {:?} to {}", name, addr);

    if is_multicast(&addr) {
        if let Some(msg_type) = msg_type {
            msg_type.downgrade_for_multicast();
        }
    }

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_resolve_without_lookup() {
        assert_eq!(
            resolve("::1", AddressFamily::Inet6, None),
            Ok("::1".parse().unwrap())
        );
        assert_eq!(
            resolve("[fe80::1]", AddressFamily::Inet6, None),
            Ok("fe80::1".parse().unwrap())
        );
        assert_eq!(
            resolve("127.0.0.1", AddressFamily::Inet6, None),
            Ok("::ffff:127.0.0.1".parse().unwrap())
        );
        assert_eq!(
            resolve("127.0.0.1", AddressFamily::Inet4, None),
            Ok("127.0.0.1".parse().unwrap())
        );
        assert_eq!(
            resolve("2001:db8::1", AddressFamily::Inet4, None),
            Err(Error::HostLookupFailure)
        );
    }

    #[test]
    fn multicast_downgrades_confirmable() {
        let mut msg_type = MsgType::Con;
        resolve(ALL_COAP_DEVICES_V6_LL, AddressFamily::Inet6, Some(&mut msg_type)).unwrap();
        assert_eq!(msg_type, MsgType::Non);

        let mut msg_type = MsgType::Con;
        resolve(ALL_COAP_DEVICES_V4, AddressFamily::Inet6, Some(&mut msg_type)).unwrap();
        assert_eq!(msg_type, MsgType::Non);

        let mut msg_type = MsgType::Con;
        resolve("::1", AddressFamily::Inet6, Some(&mut msg_type)).unwrap();
        assert_eq!(msg_type, MsgType::Con);
    }

    #[test]
    fn dotted_quads() {
        assert!(looks_like_dotted_quad("127.1"));
        assert!(looks_like_dotted_quad("10.0.0.1"));
        assert!(!looks_like_dotted_quad("example.com"));
        assert!(!looks_like_dotted_quad(""));
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert_eq!(
            resolve("bad\0name", AddressFamily::Inet6, None),
            Err(Error::InvalidArgument)
        );
    }
}
