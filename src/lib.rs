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

//! Render wrapped errors & log records consistently, whether to a console, a log file, a [`syslog`]
//! daemon or an HTTP client.
//!
//! [`syslog`]: https://en.wikipedia.org/wiki/Syslog
//!
//! # Introduction
//!
//! An error worth logging usually arrives wrapped in a few layers of context: "loading config:
//! parsing port: invalid digit found in string". Each layer may know something useful (which
//! file, which port, what the input was) and the innermost layer that went to the trouble may
//! have captured a call stack. The trouble starts when that error has to be _shown_ to someone:
//! the console wants a compact line, the log shipper wants JSON, the syslog daemon wants RFC
//! [5424] structured data and the HTTP client wants an RFC [7807] problem body. Written by hand,
//! those four renditions drift apart quickly.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//! [7807]: https://datatracker.ietf.org/doc/html/rfc7807
//!
//! This crate funnels all four through one intermediate representation, the [`LogRecord`]:
//!
//! 1. the record's error chain is flattened into key-value details ([`details`]) & a compact
//!    call stack ([`stack`])
//! 2. field names that collide with the record's own attributes are renamed, never dropped
//!    ([`policy`])
//! 3. values are rendered per type ([`render`])
//! 4. an [`Emitter`] lays the fields out in a deterministic order & serializes them: [`text`],
//!    [`json`], [`syslog`](mod@syslog) or [`problem`]
//!
//! # Usage
//!
//! ```rust
//! use errfmt::{
//!     chain::ErrorExt,
//!     details,
//!     emit::Emitter,
//!     policy::FieldOrder,
//!     record::{Level, LogRecord},
//!     text::TextEmitter,
//! };
//!
//! let err = "abc".parse::<u16>().unwrap_err()
//!     .wrap_with_details("parsing port", details!["input" => "abc"]);
//! let record = LogRecord::new(Level::Error, "startup failed").with_error(err);
//!
//! let emitter = TextEmitter::default().with_field_order(FieldOrder::default().disable("time"));
//! assert_eq!(
//!     String::from_utf8(emitter.format(record)).unwrap(),
//!     "level=error error=\"parsing port: invalid digit found in string\" msg=\"startup failed\" input=abc\n"
//! );
//! ```
//!
//! To format [`tracing`] events, install a [`layer::Layer`] in your subscriber.
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`LogRecord`]: record::LogRecord
//! [`Emitter`]: emit::Emitter

pub mod chain;
pub mod config;
pub mod details;
pub mod emit;
pub mod error;
pub mod facility;
pub mod json;
pub mod layer;
pub mod pipeline;
pub mod policy;
pub mod problem;
pub mod record;
pub mod render;
pub mod stack;
pub mod syslog;
pub mod text;
pub mod value;

pub use error::{Error, Result};
