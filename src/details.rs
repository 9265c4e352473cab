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

//! Pull the details out of an error chain.
//!
//! When two layers of a chain carry the same key, the _outer_ layer wins: it was attached closer
//! to where the current log call is being made, and so is the more specific annotation. Note that
//! this is decided explicitly here, not left to the iteration order of some map.

use crate::{chain::wrapped_layers, value::Value};

/// What [`extract`] found
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extracted {
    /// The chain's full message (empty if there was no error)
    pub message: String,
    /// Flattened details, in order of first appearance walking outermost-to-innermost
    pub details: Vec<(String, Value)>,
}

/// Flatten the details of `err`'s chain & render its message.
///
/// No error yields an empty [`Extracted`]; this never fails.
pub fn extract(err: Option<&(dyn std::error::Error + 'static)>) -> Extracted {
    let err = match err {
        Some(err) => err,
        None => return Extracted::default(),
    };

    let mut details: Vec<(String, Value)> = Vec::new();
    for layer in wrapped_layers(err) {
        for (key, value) in layer.details() {
            if !details.iter().any(|(k, _)| k == key) {
                details.push((key.clone(), value.clone()));
            }
        }
    }

    Extracted {
        message: err.to_string(),
        details,
    }
}
