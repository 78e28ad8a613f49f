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

//! Readiness interests contributed by resources to the node's main wait call.

use super::*;

/// A raw OS descriptor.
pub type Descriptor = std::os::raw::c_int;

/// The condition a descriptor is watched for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Interest {
    /// Data can be read without blocking.
    Readable,

    /// An urgent or exceptional condition, such as a sysfs attribute changing value.
    Urgent,
}

/// Descriptors and a timeout bound collected for a single wait.
///
/// Each contributor adds the descriptors it cares about and lowers the timeout to its own
/// nearest deadline. The timeout can only ever shrink.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct WaitSet {
    entries: Vec<(Descriptor, Interest)>,
    timeout: Option<Cms>,
}

impl WaitSet {
    /// Creates an empty wait set with no timeout bound.
    pub fn new() -> WaitSet {
        WaitSet::default()
    }

    /// Watches `fd` for `interest`. Adding the same pair twice has no effect.
    pub fn add(&mut self, fd: Descriptor, interest: Interest) {
        if !self.entries.contains(&(fd, interest)) {
            self.entries.push((fd, interest));
        }
    }

    /// Lowers the timeout bound to `cms` if it is nearer than the current one. Negative
    /// values are treated as zero.
    pub fn clamp_timeout(&mut self, cms: Cms) {
        let cms = cms.max(0);
        self.timeout = Some(match self.timeout {
            Some(current) => current.min(cms),
            None => cms,
        });
    }

    /// The timeout bound, or `None` if no contributor has a deadline.
    pub fn timeout(&self) -> Option<Cms> {
        self.timeout
    }

    /// The watched descriptors.
    pub fn entries(&self) -> &[(Descriptor, Interest)] {
        &self.entries
    }

    /// Returns true if nothing has been added, neither descriptors nor a timeout.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.timeout.is_none()
    }

    /// Empties the set so it can be reused for the next wait.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.timeout = None;
    }
}
