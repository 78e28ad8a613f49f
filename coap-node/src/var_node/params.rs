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

use crate::clock::{Cms, MSEC_PER_SEC};
use std::time::Duration;

/// Tunables of a [`VarNode`](super::VarNode).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VarNodeParams {
    /// Longest time observers go without a notification, even if the value never changes.
    /// Also advertised to clients as Max-Age.
    pub refresh_period: Duration,

    /// How often the store is re-read to detect changes made behind the node's back.
    pub poll_period: Duration,

    /// Size of the content buffer. Content beyond this length is not served.
    pub max_content_len: usize,
}

impl VarNodeParams {
    /// Default refresh period of thirty seconds.
    pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30);

    /// Default poll period of one second.
    pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

    /// Default content buffer size.
    pub const DEFAULT_MAX_CONTENT_LEN: usize = 256;

    pub(crate) fn refresh_cms(&self) -> Cms {
        duration_to_cms(self.refresh_period)
    }

    pub(crate) fn poll_cms(&self) -> Cms {
        duration_to_cms(self.poll_period)
    }

    /// Max-Age advertised in responses, in whole seconds.
    ///
    /// One second more than the whole seconds of the refresh period, so a cached value
    /// never expires before the next scheduled refresh reaches the observer.
    pub fn max_age_secs(&self) -> u32 {
        let secs = self.refresh_cms() / MSEC_PER_SEC + 1;
        secs.min(u32::MAX as Cms) as u32
    }
}

impl Default for VarNodeParams {
    fn default() -> Self {
        VarNodeParams {
            refresh_period: Self::DEFAULT_REFRESH_PERIOD,
            poll_period: Self::DEFAULT_POLL_PERIOD,
            max_content_len: Self::DEFAULT_MAX_CONTENT_LEN,
        }
    }
}

fn duration_to_cms(d: Duration) -> Cms {
    let ms = d.as_millis();
    if ms > Cms::max_value() as u128 {
        Cms::max_value()
    } else {
        ms as Cms
    }
}
