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
use crate::multiplexer::poll_urgent;
use coap_node::readiness::Descriptor;
use coap_node::var_node::VarStore;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;

/// A [`VarStore`] backed by a file, typically a sysfs attribute.
///
/// The file stays open for reading so its descriptor can be watched for urgent
/// conditions, which is how sysfs attributes announce a new value. Every read starts
/// from the beginning of the file with a single `read` call. Every write reopens the file
/// and closes it again, which is what commits a value to a sysfs attribute.
#[derive(Debug)]
pub struct FileVarStore {
    path: String,
    file: File,
}

impl FileVarStore {
    /// Opens the file at `path` for reading.
    pub fn open(path: &str) -> Result<FileVarStore, Error> {
        if path.is_empty() {
            return Err(Error::InvalidArgument);
        }

        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|err| {
                warn!("unable to open {}: {}", path, err);
                Error::from(err)
            })?;

        Ok(FileVarStore {
            path: path.to_string(),
            file,
        })
    }
}

impl VarStore for FileVarStore {
    fn location(&self) -> &str {
        &self.path
    }

    fn read_content(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        if let Err(err) = self.file.seek(SeekFrom::Start(0)) {
            warn!("unable to rewind {}: {}", self.path, err);
        }

        Ok(self.file.read(buf)?)
    }

    fn write_content(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut file = OpenOptions::new()
            .write(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&self.path)?;

        file.write_all(data)?;

        // Regular files keep their old tail otherwise. Attributes ignore this.
        if matches!(file.metadata(), Ok(meta) if meta.is_file() && meta.len() > data.len() as u64)
        {
            if let Err(err) = file.set_len(data.len() as u64) {
                debug!("unable to truncate {}: {}", self.path, err);
            }
        }

        debug!("wrote {} bytes to {}", data.len(), self.path);

        Ok(())
    }

    fn poll_urgent(&mut self) -> Result<bool, Error> {
        Ok(poll_urgent(self.file.as_raw_fd())?)
    }

    fn error_descriptor(&self) -> Option<Descriptor> {
        Some(self.file.as_raw_fd())
    }
}
