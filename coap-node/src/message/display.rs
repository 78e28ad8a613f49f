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
use core::fmt::{Display, Formatter};

/// Provides an implementation of [`core::fmt::Display`] for any type implementing
/// [`MessageRead`]. Used when tracing messages in log output.
#[derive(Debug)]
pub struct MessageDisplay<'a, T: MessageRead + ?Sized>(pub &'a T);

impl<'a, T: MessageRead + ?Sized> Display for MessageDisplay<'a, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "<{} {}", self.0.msg_type(), self.0.msg_code())?;
        write!(f, " MID:{:04X}", self.0.msg_id())?;

        let token = self.0.msg_token();
        if !token.is_empty() {
            write!(f, " TOK:{}", token)?;
        }

        for (number, bytes) in self.0.options() {
            write!(f, " {}", number)?;
            match number {
                OptionNumber::CONTENT_FORMAT | OptionNumber::ACCEPT => {
                    if let Some(i) = try_decode_u16(bytes) {
                        write!(f, ":{}", ContentFormat(i))?;
                    }
                }
                OptionNumber::OBSERVE | OptionNumber::MAX_AGE => {
                    if let Some(i) = try_decode_u32(bytes) {
                        write!(f, ":{}", i)?;
                    }
                }
                OptionNumber::URI_PATH => {
                    if let Ok(s) = std::str::from_utf8(bytes) {
                        write!(f, ":{:?}", s)?;
                    }
                }
                _ => {
                    if !bytes.is_empty() {
                        f.write_str(":")?;
                        for b in bytes {
                            write!(f, "{:02X}", b)?;
                        }
                    }
                }
            }
        }

        let payload = self.0.payload();
        if !payload.is_empty() {
            if let Ok(payload_str) = std::str::from_utf8(payload) {
                write!(f, " {:?}", payload_str)?;
            } else {
                write!(f, " {:?}", payload)?;
            }
        }

        write!(f, ">")
    }
}
