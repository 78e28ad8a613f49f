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
use std::cell::RefCell;
use std::rc::Rc;

/// The external readable and writable value behind a [`VarNode`].
///
/// A store is owned exclusively by its node.
pub trait VarStore {
    /// Where the value lives, such as a file path. Never empty.
    fn location(&self) -> &str;

    /// Reads the value from its beginning into `buf`, returning the number of bytes read.
    /// At most `buf.len()` bytes are read.
    fn read_content(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Replaces the value with `data`. The change must be committed when this returns.
    fn write_content(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Checks, without blocking, whether the store reports an urgent or exceptional
    /// condition. A true result means the value should be considered changed.
    fn poll_urgent(&mut self) -> Result<bool, Error>;

    /// Descriptor to watch for [`Interest::Urgent`], if the store has one.
    fn error_descriptor(&self) -> Option<Descriptor>;
}

#[derive(Debug, Default)]
struct MemoryState {
    content: Vec<u8>,
    reads: usize,
    writes: usize,
    urgent: bool,
    refuse_writes: bool,
}

/// A [`VarStore`] kept in memory.
///
/// Clones share the same value, so a handle kept outside the node can change the value
/// behind the node's back and count how often the node touched it.
#[derive(Debug, Clone)]
pub struct MemoryVarStore {
    location: String,
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryVarStore {
    /// Creates a store named `location` holding `content`.
    pub fn new(location: &str, content: &[u8]) -> MemoryVarStore {
        MemoryVarStore {
            location: location.to_string(),
            state: Rc::new(RefCell::new(MemoryState {
                content: content.to_vec(),
                ..MemoryState::default()
            })),
        }
    }

    /// Changes the value without going through the node.
    pub fn set_content(&self, content: &[u8]) {
        self.state.borrow_mut().content = content.to_vec();
    }

    /// The current value.
    pub fn content(&self) -> Vec<u8> {
        self.state.borrow().content.clone()
    }

    /// Raises the urgent condition until the next [`VarStore::poll_urgent`].
    pub fn raise_urgent(&self) {
        self.state.borrow_mut().urgent = true;
    }

    /// Makes every following write fail without touching the value.
    pub fn refuse_writes(&self, refuse: bool) {
        self.state.borrow_mut().refuse_writes = refuse;
    }

    /// Number of reads so far.
    pub fn read_count(&self) -> usize {
        self.state.borrow().reads
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }
}

impl VarStore for MemoryVarStore {
    fn location(&self) -> &str {
        &self.location
    }

    fn read_content(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;
        let len = state.content.len().min(buf.len());
        buf[..len].copy_from_slice(&state.content[..len]);
        Ok(len)
    }

    fn write_content(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut state = self.state.borrow_mut();
        state.writes += 1;
        if state.refuse_writes {
            return Err(Error::IoError(format!("{}: write refused", self.location)));
        }
        state.content = data.to_vec();
        Ok(())
    }

    fn poll_urgent(&mut self) -> Result<bool, Error> {
        let mut state = self.state.borrow_mut();
        Ok(std::mem::replace(&mut state.urgent, false))
    }

    fn error_descriptor(&self) -> Option<Descriptor> {
        None
    }
}
