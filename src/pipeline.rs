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

//! The stages a [`LogRecord`] goes through before it reaches an emitter.
//!
//! Each stage takes the record by value & hands it back, so they compose in any order a caller
//! cares to use; [`Pipeline::prepare`] runs them in the usual one:
//!
//! 1. [`extract_details`](Pipeline::extract_details)
//! 2. [`build_call_stack`](Pipeline::build_call_stack)
//! 3. [`resolve_clashes`](Pipeline::resolve_clashes)
//! 4. [`render_values`](Pipeline::render_values)

use crate::{
    config::Options,
    details::extract,
    policy::{self, RESERVED},
    record::LogRecord,
    render, stack,
};

use tracing::debug;

type StdError = dyn std::error::Error + 'static;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pipeline {
    options: Options,
}

impl Pipeline {
    pub fn new(options: Options) -> Pipeline {
        Pipeline { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Merge the details carried by the record's error chain into its fields.
    ///
    /// Fields already on the record win over details of the same name.
    pub fn extract_details(&self, mut record: LogRecord) -> LogRecord {
        if !self.options.extract_details {
            return record;
        }
        let extracted = extract(record.error.as_deref().map(|e| e as &StdError));
        for (key, value) in extracted.details {
            record.fields.entry(key).or_insert(value);
        }
        record
    }

    /// Render the chain's call stack into the record, if anyone's going to want it.
    pub fn build_call_stack(&self, mut record: LogRecord) -> LogRecord {
        if !self.options.wants_call_stack() {
            return record;
        }
        let err = record.error.as_deref().map(|e| e as &StdError);
        record.callstack = stack::call_stack(
            err,
            &self.options.call_stack,
            &self.options.trim_prefixes,
        );
        if record.callstack.is_empty() && err.map(crate::chain::has_stack).unwrap_or(false) {
            debug!(
                skip_last = self.options.call_stack.skip_last,
                "call stack suppressed"
            );
        }
        record
    }

    /// Rename fields that collide with the record's own attributes.
    pub fn resolve_clashes(&self, mut record: LogRecord) -> LogRecord {
        policy::resolve_clashes(&mut record.fields, &RESERVED);
        record
    }

    pub fn render_values(&self, mut record: LogRecord) -> LogRecord {
        render::render_values(&mut record.fields, self.options.print_struct_field_names);
        record
    }

    /// All four stages
    pub fn prepare(&self, record: LogRecord) -> LogRecord {
        self.render_values(self.resolve_clashes(self.build_call_stack(self.extract_details(record))))
    }
}
