// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of errfmt.
//
// errfmt is free software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// errfmt is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with errfmt.  If not,
// see <http://www.gnu.org/licenses/>.

//! [errfmt](crate) errors

use backtrace::Backtrace;

/// [errfmt](crate) error type
///
/// [errfmt](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of a
/// straightforward enumeration with a few match arms chosen on the basis what the caller will need
/// to respond.
///
/// Note that none of the emitters return this type: formatting a record always produces
/// _something_. It shows up at configuration time (e.g. an over-long RFC 5424 APP-NAME) and as the
/// payload of marshalling & write failures that get folded back into the output.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    BadRfc5424AppName {
        name: Vec<u8>,
        back: Backtrace,
    },
    BadRfc5424Hostname {
        name: Vec<u8>,
        back: Backtrace,
    },
    BadRfc5424IpAddress,
    BadRfc5424MsgId {
        name: Vec<u8>,
        back: Backtrace,
    },
    BadRfc5424ProcId {
        name: Vec<u8>,
        back: Backtrace,
    },
    /// A value could not be rendered as JSON
    Marshal {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// Failed to fetch the current executable (via std::env)
    NoExecutable {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to write a formatted record to its destination
    Write {
        source: std::io::Error,
        back: Backtrace,
    },
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Marshal {
            source: err,
            back: Backtrace::new(),
        }
    }
}

impl std::convert::From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Write {
            source: err,
            back: Backtrace::new(),
        }
    }
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadRfc5424AppName { name, .. } => write!(
                f,
                "{:?} is not an RFC 5424-compliant APP-NAME",
                String::from_utf8_lossy(name)
            ),
            Error::BadRfc5424Hostname { .. } => {
                write!(
                    f,
                    "The provided or discovered hostname is not compliant with RFC 5424"
                )
            }
            Error::BadRfc5424IpAddress => {
                write!(
                    f,
                    "The provided or discovered IP address is not compliant with RFC 5424"
                )
            }
            Error::BadRfc5424MsgId { name, .. } => write!(
                f,
                "{:?} is not an RFC 5424-compliant MSGID",
                String::from_utf8_lossy(name)
            ),
            Error::BadRfc5424ProcId { name, .. } => write!(
                f,
                "{:?} is not an RFC 5424-compliant PROCID",
                String::from_utf8_lossy(name)
            ),
            // The marshalling error's own text ends up in emitted output, so don't decorate it
            Error::Marshal { source, .. } => write!(f, "{}", source),
            Error::NoExecutable { source, .. } => {
                write!(f, "Couldn't determine the current executable: {}", source)
            }
            Error::NoHostname { source, .. } => {
                write!(f, "Couldn't determine the hostname: {}", source)
            }
            Error::Write { source, .. } => write!(f, "{}", source),
            _ => write!(f, "Other errfmt error"),
        }
    }
}

impl std::fmt::Debug for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::BadRfc5424AppName { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadRfc5424Hostname { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadRfc5424IpAddress => write!(f, "{}", self),
            Error::BadRfc5424MsgId { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::BadRfc5424ProcId { name: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Marshal { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::NoExecutable { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::NoHostname { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Write { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "errfmt error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Marshal { source, .. } => Some(source),
            Error::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
