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

//! Blocking on sockets, resource descriptors and timer deadlines at the same time.

use super::*;
use coap_node::readiness::{Descriptor, Interest, WaitSet};
use std::io;

const POLL_READABLE: libc::c_short = libc::POLLIN | libc::POLLHUP;
const POLL_URGENT: libc::c_short = libc::POLLPRI | libc::POLLERR;

/// Which of the watched descriptors became ready.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Readiness {
    /// Session sockets with a datagram waiting.
    pub sessions: Vec<SessionKind>,

    /// Wait-set descriptors whose interest was satisfied.
    pub descriptors: Vec<(Descriptor, Interest)>,
}

/// Result of [`Transport::wait`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WaitOutcome {
    /// At least one descriptor is ready.
    Ready(Readiness),

    /// The timeout expired with nothing ready.
    TimedOut,
}

fn events_for(interest: Interest) -> libc::c_short {
    match interest {
        Interest::Readable => POLL_READABLE,
        Interest::Urgent => POLL_URGENT,
    }
}

/// Calls `poll(2)` on `fds`. A negative timeout blocks indefinitely.
pub(crate) fn poll_fds(fds: &mut [libc::pollfd], timeout_ms: libc::c_int) -> io::Result<usize> {
    // SAFETY: `fds` is a valid, writable slice of pollfd structures of the given length.
    let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };

    if ret < 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret as usize)
    }
}

/// Returns true if a single descriptor has an urgent condition pending, without blocking.
pub(crate) fn poll_urgent(fd: Descriptor) -> io::Result<bool> {
    let mut fds = [libc::pollfd {
        fd,
        events: POLL_URGENT,
        revents: 0,
    }];

    poll_fds(&mut fds, 0)?;

    Ok(fds[0].revents & POLL_URGENT != 0)
}

/// Combines the delay requested by the caller with the other deadlines in play.
///
/// A negative `cms` means the caller has no deadline of its own. The result is never
/// negative.
pub fn effective_timeout(cms: Cms, engine_deadline: Cms, extra: Option<Cms>) -> Cms {
    let mut timeout = engine_deadline;

    if cms >= 0 {
        timeout = timeout.min(cms);
    }

    if let Some(extra) = extra {
        timeout = timeout.min(extra);
    }

    timeout.max(0)
}

impl Transport {
    /// Blocks until a session socket or a wait-set descriptor is ready, or the timeout
    /// expires.
    ///
    /// The timeout is the smallest of `cms` (ignored when negative), the engine's next
    /// timer deadline and the wait set's bound. An interrupted wait reports
    /// [`WaitOutcome::TimedOut`].
    pub fn wait(
        &self,
        engine: &dyn ProtocolEngine,
        cms: Cms,
        extra: &WaitSet,
    ) -> Result<WaitOutcome, Error> {
        let sessions = self.readiness_set();
        let mut fds: Vec<libc::pollfd> = sessions
            .iter()
            .map(|(_, fd)| libc::pollfd {
                fd: *fd,
                events: POLL_READABLE,
                revents: 0,
            })
            .chain(extra.entries().iter().map(|(fd, interest)| libc::pollfd {
                fd: *fd,
                events: events_for(*interest),
                revents: 0,
            }))
            .collect();

        let timeout = effective_timeout(cms, engine.next_timer_deadline(), extra.timeout());
        let timeout = timeout.min(libc::c_int::MAX as Cms) as libc::c_int;

        trace!("waiting on {} descriptors for {}ms", fds.len(), timeout);

        let count = match poll_fds(&mut fds, timeout) {
            Ok(count) => count,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => 0,
            Err(err) => {
                error!("poll failed: {}", err);
                return Err(err.into());
            }
        };

        if count == 0 {
            return Ok(WaitOutcome::TimedOut);
        }

        let mut ready = Readiness::default();
        let (session_fds, extra_fds) = fds.split_at(sessions.len());

        for ((kind, _), pfd) in sessions.iter().zip(session_fds) {
            if pfd.revents != 0 {
                ready.sessions.push(*kind);
            }
        }

        for (entry, pfd) in extra.entries().iter().zip(extra_fds) {
            if pfd.revents & (events_for(entry.1) | libc::POLLNVAL) != 0 {
                ready.descriptors.push(*entry);
            }
        }

        Ok(WaitOutcome::Ready(ready))
    }

    /// Session sockets with something to read right now.
    pub(crate) fn ready_sessions(&self) -> Result<Vec<(SessionKind, RawFd)>, Error> {
        let sessions = self.readiness_set();
        let mut fds: Vec<libc::pollfd> = sessions
            .iter()
            .map(|(_, fd)| libc::pollfd {
                fd: *fd,
                events: POLL_READABLE,
                revents: 0,
            })
            .collect();

        if poll_fds(&mut fds, 0)? == 0 {
            return Ok(Vec::new());
        }

        Ok(sessions
            .into_iter()
            .zip(fds)
            .filter(|(_, pfd)| pfd.revents != 0)
            .map(|(session, _)| session)
            .collect())
    }
}
