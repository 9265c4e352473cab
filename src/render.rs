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

//! Per-type value rendering.

use crate::{record::Fields, value::Value};

/// Render a single value.
///
/// Errors always become their message. If `verbose`, anything that's neither a string nor a
/// number becomes its field-name-qualified textual form; otherwise structured values are left
/// alone for the emitter to deal with.
pub fn render_value(value: Value, verbose: bool) -> Value {
    match value {
        Value::Error(err) => Value::Str(err.to_string()),
        v if verbose && !v.is_str() && !v.is_numeric() => Value::Str(v.verbose()),
        v => v,
    }
}

/// Render every value in `fields`, in place.
pub fn render_values(fields: &mut Fields, verbose: bool) {
    let rendered: Fields = std::mem::take(fields)
        .into_iter()
        .map(|(k, v)| (k, render_value(v, verbose)))
        .collect();
    *fields = rendered;
}
