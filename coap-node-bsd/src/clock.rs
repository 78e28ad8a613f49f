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

use coap_node::clock::{Clock, Timestamp};
use std::cell::Cell;
use std::time::Instant;

/// [`Clock`] backed by the OS monotonic clock.
///
/// If `CLOCK_MONOTONIC` cannot be read when the clock is created, readings count from
/// creation instead, using [`Instant`]. The source is fixed for the life of the clock and
/// readings never go backwards.
#[derive(Debug)]
pub struct MonotonicClock {
    fallback: Option<Instant>,
    last: Cell<i64>,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        MonotonicClock::new()
    }
}

impl MonotonicClock {
    /// Creates a new clock.
    pub fn new() -> MonotonicClock {
        let fallback = match kernel_ms() {
            Some(_) => None,
            None => {
                warn!("CLOCK_MONOTONIC unavailable, counting from now");
                Some(Instant::now())
            }
        };

        MonotonicClock {
            fallback,
            last: Cell::new(0),
        }
    }

    #[cfg(test)]
    fn counting_from_now() -> MonotonicClock {
        MonotonicClock {
            fallback: Some(Instant::now()),
            last: Cell::new(0),
        }
    }

    fn read_ms(&self) -> i64 {
        match self.fallback {
            Some(base) => base.elapsed().as_millis() as i64,
            None => kernel_ms().unwrap_or_else(|| self.last.get()),
        }
    }
}

fn kernel_ms() -> Option<i64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };

    // SAFETY: `ts` is a valid, writable timespec.
    if unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) } == 0 {
        Some(ts.tv_sec as i64 * 1000 + ts.tv_nsec as i64 / 1_000_000)
    } else {
        None
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let now = self.read_ms().max(self.last.get());
        self.last.set(now);
        Timestamp(now)
    }
}
