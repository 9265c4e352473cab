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

//! Field values.
//!
//! A [`Value`] is what gets attached to a record field or to an error detail. Rather than inspect
//! arbitrary values at runtime, callers convert into one of a small, closed set of variants up
//! front (there are [`From`] implementations for the usual suspects, and [`Value::json`] for
//! anything [`serde::Serialize`]).
//!
//! Each variant has three renderings:
//!
//! - [`Value::text`]: the compact, human-oriented form used by the text emitter (`{text 42 true}`
//!   for a struct)
//! - [`Value::verbose`]: like `text`, but structured values carry their field names
//!   (`{Text:text Integer:42 Bool:true}`)
//! - [`Value::marshal`]: JSON, for the JSON & syslog emitters and the HTTP problem body

use crate::error::Result;

use serde::ser::{Serialize, Serializer};

use std::sync::Arc;

/// A shareable, type-erased error.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// A field value
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    /// An error; rendered by its message, never by its stack
    Error(SharedError),
    /// Structured data (maps, structs, sequences)
    Json(serde_json::Value),
}

impl Value {
    /// Capture anything [`Serialize`] as structured data.
    ///
    /// If `value` can't be converted, the conversion error's message is kept instead (as a
    /// string); a bad field value should never cost us the log line.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Value {
        match serde_json::to_value(value) {
            Ok(v) => Value::Json(v),
            Err(err) => Value::Str(err.to_string()),
        }
    }

    /// Wrap an error value
    pub fn error<E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>>(err: E) -> Value {
        Value::Error(Arc::from(err.into()))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::I64(_) | Value::U64(_) | Value::F64(_))
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            Value::U64(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// The compact textual form
    pub fn text(&self) -> String {
        match self {
            Value::Null => "<nil>".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::I64(i) => i.to_string(),
            Value::U64(u) => u.to_string(),
            Value::F64(x) => x.to_string(),
            Value::Str(s) => s.clone(),
            Value::Error(err) => err.to_string(),
            Value::Json(v) => json_text(v, false),
        }
    }

    /// The textual form, with field names for structured values
    pub fn verbose(&self) -> String {
        match self {
            Value::Json(v) => json_text(v, true),
            _ => self.text(),
        }
    }

    /// Render this value as JSON.
    ///
    /// Fails for values JSON can't represent, like NaN or the infinities.
    pub fn marshal(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Go-ish `%v`/`%+v` rendering of a JSON value: strings bare, objects in braces with
/// space-separated members, arrays in brackets.
fn json_text(v: &serde_json::Value, with_names: bool) -> String {
    match v {
        serde_json::Value::Null => "<nil>".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => format!(
            "[{}]",
            items
                .iter()
                .map(|item| json_text(item, with_names))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        serde_json::Value::Object(members) => format!(
            "{{{}}}",
            members
                .iter()
                .map(|(k, item)| if with_names {
                    format!("{}:{}", k, json_text(item, with_names))
                } else {
                    json_text(item, with_names)
                })
                .collect::<Vec<_>>()
                .join(" ")
        ),
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::I64(i) => serializer.serialize_i64(*i),
            Value::U64(u) => serializer.serialize_u64(*u),
            // serde_json would quietly write `null` here; I'd rather know.
            Value::F64(x) if !x.is_finite() => Err(serde::ser::Error::custom(format!(
                "json: unsupported value: {}",
                x
            ))),
            Value::F64(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Error(err) => serializer.serialize_str(&err.to_string()),
            Value::Json(v) => v.serialize(serializer),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::I64(i) => write!(f, "I64({})", i),
            Value::U64(u) => write!(f, "U64({})", u),
            Value::F64(x) => write!(f, "F64({})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Error(err) => write!(f, "Error({:?})", err.to_string()),
            Value::Json(v) => write!(f, "Json({})", v),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::U64(a), Value::U64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a.to_string() == b.to_string(),
            (Value::Json(a), Value::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_signed {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(i: $t) -> Self {
                Value::I64(i as i64)
            }
        })*
    };
}

macro_rules! from_unsigned {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(u: $t) -> Self {
                Value::U64(u as u64)
            }
        })*
    };
}

from_signed!(i8, i16, i32, i64, isize);
from_unsigned!(u8, u16, u32, u64, usize);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::F64(x as f64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::F64(x)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Json(serde_json::Value::Array(
            v.into_iter().map(serde_json::Value::String).collect(),
        ))
    }
}

impl From<SharedError> for Value {
    fn from(err: SharedError) -> Self {
        Value::Error(err)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        x.map(Into::into).unwrap_or(Value::Null)
    }
}
