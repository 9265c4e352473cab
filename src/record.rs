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

//! The unit of formatting: [`LogRecord`].
//!
//! A record is built once per log call, pushed through the [`Pipeline`] stages and handed to
//! exactly one [`Emitter`].
//!
//! [`Pipeline`]: crate::pipeline::Pipeline
//! [`Emitter`]: crate::emit::Emitter

use crate::{
    stack::TrimPrefixes,
    value::{SharedError, Value},
};

use chrono::prelude::*;

use std::{collections::BTreeMap, sync::Arc};

/// Record fields; the final order is computed by the [`FieldOrder`](crate::policy::FieldOrder),
/// so the map's own order doesn't matter.
pub type Fields = BTreeMap<String, Value>;

/// Record severity, most severe first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Panic,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Level::Panic => "panic",
                Level::Fatal => "fatal",
                Level::Error => "error",
                Level::Warn => "warning",
                Level::Info => "info",
                Level::Debug => "debug",
                Level::Trace => "trace",
            }
        )
    }
}

impl std::convert::From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// Where the log call was made
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new<S1: Into<String>, S2: Into<String>>(function: S1, file: S2, line: u32) -> Caller {
        Caller {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    /// Produce the `func` & `file` field values: the function name less any configured module
    /// prefix, and `basename:line`.
    pub fn pretty(&self, prefixes: &TrimPrefixes) -> (String, String) {
        let file = match self.file.rfind(&['/', '\\'][..]) {
            Some(i) => &self.file[i + 1..],
            None => &self.file,
        };
        (
            prefixes.trim(&self.function).to_string(),
            format!("{}:{}", file, self.line),
        )
    }
}

/// One formatting unit
#[derive(Clone, Debug)]
pub struct LogRecord {
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub caller: Option<Caller>,
    pub error: Option<SharedError>,
    pub fields: Fields,
    /// Rendered call-stack lines, innermost first; filled-in by
    /// [`Pipeline::build_call_stack`](crate::pipeline::Pipeline::build_call_stack)
    pub callstack: Vec<String>,
}

impl LogRecord {
    pub fn new<S: Into<String>>(level: Level, message: S) -> LogRecord {
        LogRecord {
            level,
            timestamp: Utc::now(),
            message: message.into(),
            caller: None,
            error: None,
            fields: Fields::new(),
            callstack: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_error<E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>>(
        mut self,
        err: E,
    ) -> Self {
        self.error = Some(Arc::from(err.into()));
        self
    }

    pub fn with_shared_error(mut self, err: SharedError) -> Self {
        self.error = Some(err);
        self
    }

    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// The attached error's full message, if any
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|err| err.to_string())
    }
}
