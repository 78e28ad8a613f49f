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

use crate::message::MsgCode;

/// Type for errors encountered by the transport, the dispatch loop and resource handlers.
///
/// Transport-level variants abort the current dispatch pass but never the process. The
/// protocol-level variants ([`Error::BadOption`], [`Error::NotFound`],
/// [`Error::UnsupportedMediaType`], [`Error::Duplicate`], [`Error::NotAllowed`],
/// [`Error::UnsupportedMethod`], [`Error::EntityTooLarge`]) are outcomes
/// of a single exchange and are converted into a CoAP response by the handler that produced
/// them.
#[derive(Debug, Eq, PartialEq, Hash, Clone, thiserror::Error)]
pub enum Error {
    /// An OS call failed. Carries the reason reported by the OS.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The requested local address is already bound.
    #[error("address in use")]
    AddressInUse,

    /// The OS refused the operation for lack of privileges.
    #[error("permission denied")]
    PermissionDenied,

    /// The session kind or address family is not supported by this build.
    #[error("not implemented")]
    NotImplemented,

    /// Unable to resolve the given host name.
    #[error("host lookup failure")]
    HostLookupFailure,

    /// The resolver could not answer right now. Try again later.
    #[error("temporary failure in name resolution")]
    TemporaryFailure,

    /// The OS accepted fewer bytes than the datagram contained.
    #[error("short write")]
    ShortWrite,

    /// One or more of the supplied arguments are not valid for the given operation.
    #[error("invalid argument")]
    InvalidArgument,

    /// There is no open handle for the session kind this operation needs.
    #[error("session not open")]
    SessionNotOpen,

    /// There is not enough space in the given buffer to complete the operation.
    #[error("out of space")]
    OutOfSpace,

    /// A critical option present in the request was not recognized.
    #[error("bad option")]
    BadOption,

    /// The request addressed a resource that does not exist.
    #[error("not found")]
    NotFound,

    /// The requested content format is not supported by the resource.
    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// The request is a duplicate of one that was already handled.
    #[error("duplicate")]
    Duplicate,

    /// The method is not allowed on this resource.
    #[error("not allowed")]
    NotAllowed,

    /// The resource does not implement the request method.
    #[error("unsupported method")]
    UnsupportedMethod,

    /// The request body does not fit the resource.
    #[error("entity too large")]
    EntityTooLarge,
}

impl Error {
    /// Returns the CoAP response code a handler should send to the peer for this error, or
    /// `None` if no response should be sent at all.
    pub fn response_code(&self) -> Option<MsgCode> {
        Some(match self {
            Error::BadOption => MsgCode::ClientErrorBadOption,
            Error::NotFound => MsgCode::ClientErrorNotFound,
            Error::UnsupportedMediaType => MsgCode::ClientErrorUnsupportedMediaType,
            Error::NotAllowed => MsgCode::ClientErrorMethodNotAllowed,
            Error::EntityTooLarge => MsgCode::ClientErrorRequestEntityTooLarge,
            Error::NotImplemented | Error::UnsupportedMethod => {
                MsgCode::ServerErrorNotImplemented
            }
            Error::Duplicate => return None,
            _ => MsgCode::ServerErrorInternalServerError,
        })
    }

    /// Returns true if this error is a protocol-level outcome of a single exchange rather
    /// than a fault of the node.
    pub fn is_protocol_outcome(&self) -> bool {
        match self {
            Error::BadOption
            | Error::NotFound
            | Error::UnsupportedMediaType
            | Error::Duplicate
            | Error::NotAllowed
            | Error::UnsupportedMethod
            | Error::EntityTooLarge => true,
            _ => false,
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::AddrInUse => Error::AddressInUse,
            std::io::ErrorKind::PermissionDenied => Error::PermissionDenied,
            _ => Error::IoError(err.to_string()),
        }
    }
}

impl From<std::fmt::Error> for Error {
    fn from(_err: std::fmt::Error) -> Self {
        Error::OutOfSpace
    }
}
