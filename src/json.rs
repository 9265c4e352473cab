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

//! One JSON object per record.
//!
//! Members appear in [`FieldOrder`] order (`serde_json` is built with `preserve_order`, so the map
//! keeps insertion order). A value that won't marshal is replaced by the marshalling error's
//! message; the rest of the record is unaffected.

use crate::{
    config::Options,
    emit::{entries, Emitter},
    pipeline::Pipeline,
    policy::FieldOrder,
    record::LogRecord,
    value::Value,
};

use tracing::debug;

/// Marshal `value`, substituting the marshalling error's message on failure
pub(crate) fn marshal_or_error(name: &str, value: &Value) -> String {
    match value.marshal() {
        Ok(text) => text,
        Err(err) => {
            debug!(field = %name, error = %err, "substituting marshalling error for field value");
            err.to_string()
        }
    }
}

/// `value` as a JSON value; on failure, the marshalling error's message as a JSON string
fn to_json_or_error(name: &str, value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|err| {
        debug!(field = %name, error = %err, "substituting marshalling error for field value");
        serde_json::Value::String(err.to_string())
    })
}

#[derive(Clone, Debug, Default)]
pub struct JsonEmitter {
    pipeline: Pipeline,
    order: FieldOrder,
}

impl JsonEmitter {
    pub fn new(options: Options) -> JsonEmitter {
        JsonEmitter {
            pipeline: Pipeline::new(options),
            order: FieldOrder::default(),
        }
    }

    pub fn with_field_order(mut self, order: FieldOrder) -> Self {
        self.order = order;
        self
    }
}

impl Emitter for JsonEmitter {
    fn format(&self, record: LogRecord) -> Vec<u8> {
        let record = self.pipeline.prepare(record);
        let options = self.pipeline.options();
        let members: serde_json::Map<String, serde_json::Value> =
            entries(&record, options, &self.order, options.call_stack_in_fields)
                .into_iter()
                .map(|(k, v)| {
                    let v = to_json_or_error(&k, &v);
                    (k, v)
                })
                .collect();
        // A `serde_json::Value` holds nothing that can fail to serialize
        let mut buf = serde_json::to_vec(&members).unwrap_or_default();
        buf.push(b'\n');
        buf
    }
}
