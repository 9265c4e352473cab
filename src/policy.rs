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

//! Field names: clashes & ordering.
//!
//! Two jobs, neither of which ever touches a field's value:
//!
//! 1. [`resolve_clashes`]: a detail named, say, `msg` would collide with the record's own message;
//!    rather than drop either, the detail is renamed to `fields.msg`
//! 2. [`FieldOrder`]: every emitter lays its fields out by weight (heaviest first), breaking ties
//!    alphabetically, so the same record always comes out the same way

use crate::record::Fields;

use std::collections::HashMap;

pub const KEY_LEVEL: &str = "level";
pub const KEY_TIME: &str = "time";
pub const KEY_FUNC: &str = "func";
pub const KEY_MSG: &str = "msg";
pub const KEY_FILE: &str = "file";
pub const KEY_ERROR: &str = "error";
pub const KEY_CALLSTACK: &str = "callstack";

/// Field names the record claims for itself
pub const RESERVED: [&str; 7] = [
    KEY_LEVEL,
    KEY_TIME,
    KEY_FUNC,
    KEY_MSG,
    KEY_FILE,
    KEY_ERROR,
    KEY_CALLSTACK,
];

/// Prepended to a field name that clashes with a reserved one
pub const CLASH_PREFIX: &str = "fields.";

/// Fields weighing this much (or less) are dropped by default
pub const DISABLED_FIELD_WEIGHT: i32 = -100;

/// Rename every field in `fields` whose name appears in `reserved`.
///
/// The new name is the old one with [`CLASH_PREFIX`] prepended, repeatedly if need be (should
/// `fields.msg` _also_ be taken, we'll use `fields.fields.msg`); nothing is ever overwritten.
pub fn resolve_clashes(fields: &mut Fields, reserved: &[&str]) {
    for key in reserved {
        if let Some(value) = fields.remove(*key) {
            let mut renamed = format!("{}{}", CLASH_PREFIX, key);
            while fields.contains_key(&renamed) {
                renamed.insert_str(0, CLASH_PREFIX);
            }
            fields.insert(renamed, value);
        }
    }
}

/// Field weights
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldOrder {
    weights: HashMap<String, i32>,
    disabled: i32,
}

impl std::default::Default for FieldOrder {
    /// The default order: `level time func error msg file`, then everything else alphabetically,
    /// then the call stack.
    fn default() -> Self {
        FieldOrder::empty()
            .with_weight(KEY_LEVEL, 100)
            .with_weight(KEY_TIME, 90)
            .with_weight(KEY_FUNC, 80)
            .with_weight(KEY_ERROR, 70)
            .with_weight(KEY_MSG, 60)
            .with_weight(KEY_FILE, 40)
            .with_weight(KEY_CALLSTACK, -10)
    }
}

impl FieldOrder {
    /// No weights at all; plain alphabetical order
    pub fn empty() -> FieldOrder {
        FieldOrder {
            weights: HashMap::new(),
            disabled: DISABLED_FIELD_WEIGHT,
        }
    }

    pub fn with_weight<S: Into<String>>(mut self, name: S, weight: i32) -> Self {
        self.weights.insert(name.into(), weight);
        self
    }

    /// Drop `name` from the output altogether
    pub fn disable<S: Into<String>>(self, name: S) -> Self {
        let disabled = self.disabled;
        self.with_weight(name, disabled)
    }

    /// Move the suppression threshold
    pub fn with_disabled_weight(mut self, disabled: i32) -> Self {
        self.disabled = disabled;
        self
    }

    /// Weight for `name`; 0 for names we've never heard of
    pub fn weight(&self, name: &str) -> i32 {
        self.weights.get(name).copied().unwrap_or(0)
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.weight(name) <= self.disabled
    }

    /// Put `keys` in emission order, dropping disabled ones.
    pub fn sort(&self, keys: &mut Vec<String>) {
        keys.retain(|k| !self.is_disabled(k));
        keys.sort_by(|a, b| {
            self.weight(b)
                .cmp(&self.weight(a))
                .then_with(|| a.cmp(b))
        });
    }

    /// Like [`sort`](FieldOrder::sort), but over (name, value) pairs
    pub fn arrange<V>(&self, entries: Vec<(String, V)>) -> Vec<(String, V)> {
        let mut entries: Vec<(String, V)> = entries
            .into_iter()
            .filter(|(k, _)| !self.is_disabled(k))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            self.weight(b)
                .cmp(&self.weight(a))
                .then_with(|| a.cmp(b))
        });
        entries
    }
}
