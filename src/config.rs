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

//! Formatting options shared by every emitter.
//!
//! Everything here is fixed at construction time:
//!
//! ```rust
//! use errfmt::{config::Options, stack::{CallStackPolicy, TrimPrefixes}};
//! let opts = Options::builder()
//!     .call_stack_in_fields(true)
//!     .call_stack(CallStackPolicy::skip_last(2))
//!     .trim_prefixes(TrimPrefixes::from_module_path(module_path!()))
//!     .build();
//! assert!(opts.extract_details);
//! ```

use crate::stack::{CallStackPolicy, TrimPrefixes};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// Merge the error chain's details into the record's fields
    pub extract_details: bool,
    /// Emit the call stack as a field (JSON, syslog)
    pub call_stack_in_fields: bool,
    /// Append the call stack to the formatted line, one frame per line (text, syslog)
    pub call_stack_on_console: bool,
    /// Include the call stack in HTTP problem bodies
    pub call_stack_in_http_problem: bool,
    /// Render non-string, non-numeric values with their field names
    pub print_struct_field_names: bool,
    /// Strip the surrounding quotes from JSON-marshalled syslog param values
    pub trim_json_dquote: bool,
    pub call_stack: CallStackPolicy,
    pub trim_prefixes: TrimPrefixes,
}

impl std::default::Default for Options {
    fn default() -> Self {
        Options {
            extract_details: true,
            call_stack_in_fields: false,
            call_stack_on_console: false,
            call_stack_in_http_problem: false,
            print_struct_field_names: false,
            trim_json_dquote: false,
            call_stack: CallStackPolicy::default(),
            trim_prefixes: TrimPrefixes::default(),
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder {
            imp: Options::default(),
        }
    }

    /// Does any consumer of this configuration want a call stack?
    pub fn wants_call_stack(&self) -> bool {
        self.call_stack_in_fields || self.call_stack_on_console || self.call_stack_in_http_problem
    }
}

pub struct OptionsBuilder {
    imp: Options,
}

impl OptionsBuilder {
    pub fn extract_details(mut self, on: bool) -> Self {
        self.imp.extract_details = on;
        self
    }
    pub fn call_stack_in_fields(mut self, on: bool) -> Self {
        self.imp.call_stack_in_fields = on;
        self
    }
    pub fn call_stack_on_console(mut self, on: bool) -> Self {
        self.imp.call_stack_on_console = on;
        self
    }
    pub fn call_stack_in_http_problem(mut self, on: bool) -> Self {
        self.imp.call_stack_in_http_problem = on;
        self
    }
    pub fn print_struct_field_names(mut self, on: bool) -> Self {
        self.imp.print_struct_field_names = on;
        self
    }
    pub fn trim_json_dquote(mut self, on: bool) -> Self {
        self.imp.trim_json_dquote = on;
        self
    }
    pub fn call_stack(mut self, policy: CallStackPolicy) -> Self {
        self.imp.call_stack = policy;
        self
    }
    pub fn trim_prefixes(mut self, prefixes: TrimPrefixes) -> Self {
        self.imp.trim_prefixes = prefixes;
        self
    }
    pub fn build(self) -> Options {
        self.imp
    }
}
