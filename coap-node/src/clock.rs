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

//! Monotonic deadline arithmetic.
//!
//! All scheduling in a node is expressed with two quantities: a relative delay in
//! milliseconds ([`Cms`]) and an absolute deadline ([`Timestamp`]) on the time base of some
//! [`Clock`]. Converting a delay into a deadline and back yields the original delay, up to
//! the resolution of the clock.

use std::cell::Cell;
use std::rc::Rc;

/// A signed delay in milliseconds. Negative values describe deadlines that already passed.
pub type Cms = i64;

/// Number of milliseconds in one second.
pub const MSEC_PER_SEC: Cms = 1000;

/// Delay value used to describe "no deadline at all".
pub const CMS_DISTANT_FUTURE: Cms = i32::MAX as Cms;

/// An absolute point in time, measured in milliseconds on the time base of a [`Clock`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Returns `self - rhs` as a signed delay.
    pub fn diff(self, rhs: Timestamp) -> Cms {
        self.0.wrapping_sub(rhs.0)
    }

    /// Returns the timestamp `cms` milliseconds after `self`.
    pub fn offset(self, cms: Cms) -> Timestamp {
        Timestamp(self.0.wrapping_add(cms))
    }
}

/// Returns `lhs - rhs` as a signed delay.
pub fn diff(lhs: Timestamp, rhs: Timestamp) -> Cms {
    lhs.diff(rhs)
}

/// A source of monotonically non-decreasing time.
pub trait Clock {
    /// Returns the current time. Successive calls never go backwards.
    fn now(&self) -> Timestamp;

    /// Converts a relative delay into an absolute deadline.
    fn to_timestamp(&self, cms: Cms) -> Timestamp {
        self.now().offset(cms)
    }

    /// Converts an absolute deadline into the delay remaining until it, which is negative if
    /// the deadline has already passed.
    fn to_cms(&self, ts: Timestamp) -> Cms {
        ts.diff(self.now())
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle and hand another to
/// the code under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<i64>>);

impl ManualClock {
    /// Creates a new manual clock starting at `start`.
    pub fn new(start: Timestamp) -> ManualClock {
        ManualClock(Rc::new(Cell::new(start.0)))
    }

    /// Moves the clock forward by `cms` milliseconds. Negative values are ignored, since a
    /// clock may never go backwards.
    pub fn advance(&self, cms: Cms) {
        if cms > 0 {
            self.0.set(self.0.get() + cms);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.0.get())
    }
}
