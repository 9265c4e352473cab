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

//! Compact call stacks.
//!
//! Turns the [`Stack`] captured somewhere in an error chain into a list of `function() file:line`
//! lines suitable for a log record. Two things get trimmed along the way:
//!
//! 1. module prefixes: `myapp::handlers::get` reads better as `handlers::get` when every frame
//!    of interest lives in `myapp`
//! 2. the tail: the last few frames of any stack are the runtime getting `main` going, and are of
//!    no interest to anyone

use crate::chain::{outermost_stack, CallStackFrame, Stack};

/// Module prefixes to be trimmed from function names, checked in order.
///
/// Configured once, up front; there's no process-wide registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrimPrefixes(Vec<String>);

impl TrimPrefixes {
    pub fn new<I, S>(prefixes: I) -> TrimPrefixes
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TrimPrefixes(
            prefixes
                .into_iter()
                .map(|s| s.into().trim_end_matches("::").to_string())
                .collect(),
        )
    }

    /// Trim the _parent_ of `module_path`; meant to be called as
    /// `TrimPrefixes::from_module_path(module_path!())` from some module in the application crate.
    ///
    /// ```rust
    /// use errfmt::stack::TrimPrefixes;
    /// let prefixes = TrimPrefixes::from_module_path("myapp::server::handlers");
    /// assert_eq!(prefixes.trim("myapp::server::listen"), "listen");
    /// ```
    pub fn from_module_path(module_path: &str) -> TrimPrefixes {
        match module_path.rfind("::") {
            Some(i) => TrimPrefixes::new([&module_path[..i]]),
            None => TrimPrefixes::default(),
        }
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.0.push(prefix.into().trim_end_matches("::").to_string());
        self
    }

    /// Strip the first matching prefix (along with its trailing `::`) from `function`
    pub fn trim<'a>(&self, function: &'a str) -> &'a str {
        self.0
            .iter()
            .find_map(|prefix| {
                function
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix("::"))
            })
            .unwrap_or(function)
    }
}

/// How much of the stack to keep
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallStackPolicy {
    /// Number of trailing frames (those closest to process entry) to omit
    pub skip_last: usize,
}

impl CallStackPolicy {
    pub fn skip_last(skip_last: usize) -> CallStackPolicy {
        CallStackPolicy { skip_last }
    }

    /// Drop `skip_last` frames from the end; if that would leave nothing (or less than nothing),
    /// the stack is suppressed entirely.
    pub fn apply<T>(&self, mut frames: Vec<T>) -> Vec<T> {
        if frames.len() > self.skip_last {
            frames.truncate(frames.len() - self.skip_last);
            frames
        } else {
            Vec::new()
        }
    }
}

/// Render one frame, less any configured prefix
pub fn frame_line(frame: &CallStackFrame, prefixes: &TrimPrefixes) -> String {
    format!(
        "{}() {}:{}",
        prefixes.trim(&frame.function),
        frame.file,
        frame.line
    )
}

/// Render a captured stack, innermost frame first
pub fn stack_lines(stack: &Stack, policy: &CallStackPolicy, prefixes: &TrimPrefixes) -> Vec<String> {
    policy.apply(
        stack
            .frames()
            .iter()
            .map(|frame| frame_line(frame, prefixes))
            .collect(),
    )
}

/// Build the call stack for an error chain.
///
/// The outermost layer carrying a stack is used; no error, or no stack anywhere in the chain,
/// yields an empty list.
pub fn call_stack(
    err: Option<&(dyn std::error::Error + 'static)>,
    policy: &CallStackPolicy,
    prefixes: &TrimPrefixes,
) -> Vec<String> {
    err.and_then(outermost_stack)
        .map(|stack| stack_lines(stack, policy, prefixes))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::chain::ErrorExt;

    fn stack(n: u32) -> Stack {
        Stack::from(
            (0..n)
                .map(|i| CallStackFrame::new(format!("myapp::mod{}::f", i), "lib.rs", i + 1))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn prefixes() {
        let p = TrimPrefixes::new(["myapp", "other::"]);
        assert_eq!(p.trim("myapp::server::run"), "server::run");
        assert_eq!(p.trim("other::x"), "x");
        // Must match on a path boundary
        assert_eq!(p.trim("myapplication::run"), "myapplication::run");
        assert_eq!(TrimPrefixes::default().trim("a::b"), "a::b");
        assert_eq!(TrimPrefixes::from_module_path("solo").trim("solo::x"), "solo::x");
    }

    #[test]
    fn skip_last() {
        for n in 0..6usize {
            for skip in 0..8usize {
                let frames: Vec<usize> = (0..n).collect();
                let kept = CallStackPolicy::skip_last(skip).apply(frames);
                if n <= skip {
                    assert!(kept.is_empty());
                } else {
                    assert_eq!(kept, (0..n - skip).collect::<Vec<_>>());
                }
            }
        }
    }

    #[test]
    fn from_error_chain() {
        let err = "root".attach_stack(stack(4)).with_message("ctx");
        let lines = call_stack(
            Some(&err),
            &CallStackPolicy::skip_last(1),
            &TrimPrefixes::new(["myapp"]),
        );
        assert_eq!(
            lines,
            vec![
                "mod0::f() lib.rs:1".to_string(),
                "mod1::f() lib.rs:2".to_string(),
                "mod2::f() lib.rs:3".to_string()
            ]
        );

        let none = call_stack(None, &CallStackPolicy::default(), &TrimPrefixes::default());
        assert!(none.is_empty());
        let plain = std::io::Error::new(std::io::ErrorKind::Other, "x");
        assert!(call_stack(Some(&plain), &CallStackPolicy::default(), &TrimPrefixes::default())
            .is_empty());
    }
}
