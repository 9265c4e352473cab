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

//! `key=value` lines.
//!
//! ```text
//! level=error time="2022-08-10T01:02:03Z" func="handlers::get" error="not found" msg="lookup failed" file="handlers.rs:42" user=alice
//! ```

use crate::{
    config::Options,
    emit::{append_call_stack, entries, Emitter},
    pipeline::Pipeline,
    policy::FieldOrder,
    record::LogRecord,
};

/// Does `s` need quoting to survive as a `key=value` value?
fn needs_quoting(s: &str) -> bool {
    s.is_empty()
        || !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+'))
}

/// Quote `s` if need be
pub fn quote(s: &str) -> String {
    if needs_quoting(s) {
        format!("{:?}", s)
    } else {
        s.to_string()
    }
}

#[derive(Clone, Debug, Default)]
pub struct TextEmitter {
    pipeline: Pipeline,
    order: FieldOrder,
}

impl TextEmitter {
    pub fn new(options: Options) -> TextEmitter {
        TextEmitter {
            pipeline: Pipeline::new(options),
            order: FieldOrder::default(),
        }
    }

    pub fn with_field_order(mut self, order: FieldOrder) -> Self {
        self.order = order;
        self
    }
}

impl Emitter for TextEmitter {
    fn format(&self, record: LogRecord) -> Vec<u8> {
        let record = self.pipeline.prepare(record);
        let options = self.pipeline.options();
        let mut buf = entries(&record, options, &self.order, options.call_stack_in_fields)
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, quote(&v.text())))
            .collect::<Vec<String>>()
            .join(" ")
            .into_bytes();
        buf.push(b'\n');
        if options.call_stack_on_console {
            append_call_stack(&mut buf, &record.callstack);
        }
        buf
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        chain::{CallStackFrame, ErrorExt, Stack},
        details,
        record::{Caller, Level},
        stack::CallStackPolicy,
        value::Value,
    };

    use chrono::prelude::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 10, 1, 2, 3).unwrap()
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("V1"), "V1");
        assert_eq!(quote("a-b.c_d/e@f^g+h"), "a-b.c_d/e@f^g+h");
        assert_eq!(quote(""), r#""""#);
        assert_eq!(quote("V2 value"), r#""V2 value""#);
        assert_eq!(quote(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote("a=b"), r#""a=b""#);
    }

    #[test]
    fn smoke() {
        let record = LogRecord::new(Level::Info, "hello")
            .with_timestamp(ts())
            .with_field("K1", "V1")
            .with_field("K2", "V2 value")
            .with_field("n", 12);
        let out = TextEmitter::default().format(record);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "level=info time=\"2022-08-10T01:02:03Z\" msg=hello K1=V1 K2=\"V2 value\" n=12\n"
        );
    }

    #[test]
    fn errors_callers_and_details() {
        let record = LogRecord::new(Level::Error, "lookup failed")
            .with_timestamp(ts())
            .with_caller(Caller::new("myapp::handlers::get", "/src/handlers.rs", 42))
            .with_error("not found".with_details(details!["user" => "alice", "msg" => "clash"]));
        let emitter = TextEmitter::new(
            Options::builder()
                .trim_prefixes(crate::stack::TrimPrefixes::new(["myapp"]))
                .build(),
        );
        assert_eq!(
            String::from_utf8(emitter.format(record)).unwrap(),
            "level=error time=\"2022-08-10T01:02:03Z\" func=\"handlers::get\" error=\"not found\" \
             msg=\"lookup failed\" file=\"handlers.rs:42\" fields.msg=clash user=alice\n"
        );
    }

    #[test]
    fn console_call_stack() {
        let stack = Stack::from(vec![
            CallStackFrame::new("app::inner", "a.rs", 1),
            CallStackFrame::new("app::outer", "b.rs", 2),
            CallStackFrame::new("main", "main.rs", 3),
        ]);
        let record = LogRecord::new(Level::Error, "x")
            .with_timestamp(ts())
            .with_error("boom".attach_stack(stack));
        let emitter = TextEmitter::new(
            Options::builder()
                .call_stack_on_console(true)
                .call_stack(CallStackPolicy::skip_last(1))
                .build(),
        )
        .with_field_order(FieldOrder::default().disable("time"));
        assert_eq!(
            String::from_utf8(emitter.format(record)).unwrap(),
            "level=error error=boom msg=x\n\tapp::inner() a.rs:1\n\tapp::outer() b.rs:2\n"
        );
    }

    #[test]
    fn struct_field_names() {
        let record = || {
            LogRecord::new(Level::Debug, "x")
                .with_timestamp(ts())
                .with_field("s", Value::json(&serde_json::json!({"Text": "t", "Int": 42})))
        };
        let order = FieldOrder::default().disable("time").disable("level");
        let plain = TextEmitter::default().with_field_order(order.clone());
        assert_eq!(
            String::from_utf8(plain.format(record())).unwrap(),
            "msg=x s=\"{t 42}\"\n"
        );
        let verbose = TextEmitter::new(Options::builder().print_struct_field_names(true).build())
            .with_field_order(order);
        assert_eq!(
            String::from_utf8(verbose.format(record())).unwrap(),
            "msg=x s=\"{Text:t Int:42}\"\n"
        );
    }
}
