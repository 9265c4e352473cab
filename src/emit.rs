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

//! The [`Emitter`] trait & a few helpers its implementations share.

use crate::{
    config::Options,
    policy::{FieldOrder, KEY_CALLSTACK, KEY_ERROR, KEY_FILE, KEY_FUNC, KEY_LEVEL, KEY_MSG, KEY_TIME},
    record::LogRecord,
    value::Value,
};

use chrono::{DateTime, SecondsFormat, Utc};

use std::sync::Arc;

/// Turn a [`LogRecord`] into bytes.
///
/// Implementations own their configuration & run the [`Pipeline`](crate::pipeline::Pipeline)
/// themselves, so the caller just hands over the raw record. Formatting never fails: anything
/// that goes wrong along the way is reported in the output.
pub trait Emitter: Send + Sync {
    fn format(&self, record: LogRecord) -> Vec<u8>;
}

impl<E: Emitter + ?Sized> Emitter for Arc<E> {
    fn format(&self, record: LogRecord) -> Vec<u8> {
        (**self).format(record)
    }
}

impl<E: Emitter + ?Sized> Emitter for Box<E> {
    fn format(&self, record: LogRecord) -> Vec<u8> {
        (**self).format(record)
    }
}

/// RFC 3339, whole seconds, `Z` for UTC
pub fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Every attribute of a prepared record as a (name, value) pair, laid out by `order`.
///
/// The call stack is included (as a list) only if `with_call_stack` & there is one.
pub fn entries(
    record: &LogRecord,
    options: &Options,
    order: &FieldOrder,
    with_call_stack: bool,
) -> Vec<(String, Value)> {
    let mut entries: Vec<(String, Value)> = Vec::with_capacity(record.fields.len() + 7);
    entries.push((KEY_LEVEL.to_string(), Value::from(record.level.to_string())));
    entries.push((KEY_TIME.to_string(), Value::from(timestamp(&record.timestamp))));
    entries.push((KEY_MSG.to_string(), Value::from(record.message.clone())));
    if let Some(caller) = &record.caller {
        let (func, file) = caller.pretty(&options.trim_prefixes);
        entries.push((KEY_FUNC.to_string(), Value::from(func)));
        entries.push((KEY_FILE.to_string(), Value::from(file)));
    }
    if let Some(msg) = record.error_message() {
        entries.push((KEY_ERROR.to_string(), Value::from(msg)));
    }
    entries.extend(record.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    if with_call_stack && !record.callstack.is_empty() {
        entries.push((KEY_CALLSTACK.to_string(), Value::from(record.callstack.clone())));
    }
    order.arrange(entries)
}

/// Append a call stack to a formatted line: one frame per line, each indented by a tab.
pub fn append_call_stack(buf: &mut Vec<u8>, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
    buf.push(b'\t');
    buf.extend_from_slice(lines.join("\n\t").as_bytes());
    buf.push(b'\n');
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::record::{Caller, Level};

    use chrono::TimeZone;

    #[test]
    fn call_stack_is_indented() {
        let lines = vec!["f() a.rs:1".to_string(), "g() b.rs:2".to_string()];
        let mut buf = b"line".to_vec();
        append_call_stack(&mut buf, &lines);
        assert_eq!(buf, b"line\n\tf() a.rs:1\n\tg() b.rs:2\n");

        let mut buf = b"line\n".to_vec();
        append_call_stack(&mut buf, &lines);
        assert_eq!(buf, b"line\n\tf() a.rs:1\n\tg() b.rs:2\n");

        let mut buf = b"line\n".to_vec();
        append_call_stack(&mut buf, &[]);
        assert_eq!(buf, b"line\n");
    }

    #[test]
    fn entries_in_default_order() {
        let record = LogRecord::new(Level::Warn, "hello")
            .with_timestamp(Utc.with_ymd_and_hms(2022, 8, 10, 1, 2, 3).unwrap())
            .with_caller(Caller::new("app::run", "src/main.rs", 7))
            .with_error("boom")
            .with_field("b", 2)
            .with_field("a", 1);
        let names: Vec<String> = entries(&record, &Options::default(), &FieldOrder::default(), true)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            names,
            vec!["level", "time", "func", "error", "msg", "file", "a", "b"]
        );
        assert_eq!(timestamp(&record.timestamp), "2022-08-10T01:02:03Z");
    }
}
