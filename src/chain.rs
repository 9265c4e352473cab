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

//! Wrapped errors.
//!
//! # Introduction
//!
//! An "error chain" is just the usual [`std::error::Error::source`] linked list, outermost first.
//! Some links in that list are [`Wrapped`] layers, each of which may carry:
//!
//! 1. a message segment ("while loading the config")
//! 2. key-value details (`path="/etc/app.toml"`)
//! 3. a captured call stack
//!
//! A [`Wrapped`] layer displays as its message, then `": "`, then whatever it wraps; so the chain's
//! rendered message is all the segments joined outermost-first, ending in the root cause's own
//! text. Layers without a message are transparent.
//!
//! # Usage
//!
//! ```rust
//! use errfmt::{chain::ErrorExt, details};
//!
//! let err = "abc".parse::<i32>().unwrap_err()
//!     .wrap_with_details("parsing port", details!["input" => "abc"])
//!     .with_message("loading config");
//! assert_eq!(format!("{}", err), "loading config: parsing port: invalid digit found in string");
//! ```
//!
//! [`ErrorExt`] is implemented for anything convertible into a boxed error, so it works on
//! `std::io::Error`, on `&str`, and on a [`Wrapped`] itself (which is how layers stack up).

use crate::value::Value;

use backtrace::Backtrace;

type StdResult<T, E> = std::result::Result<T, E>;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build a `Vec<(String, Value)>` of details
///
/// ```rust
/// use errfmt::details;
/// let d = details!["K5_int" => 12, "K5_bool" => true];
/// assert_eq!(d.len(), 2);
/// ```
#[macro_export]
macro_rules! details {
    () => { ::std::vec::Vec::<(::std::string::String, $crate::value::Value)>::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$((::std::string::String::from($key), $crate::value::Value::from($value))),+]
    };
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         call stacks                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One resolved stack frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallStackFrame {
    pub function: String,
    pub file: String,
    pub line: u32,
}

impl CallStackFrame {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        function: S1,
        file: S2,
        line: u32,
    ) -> CallStackFrame {
        CallStackFrame {
            function: function.into(),
            file: file.into(),
            line,
        }
    }
}

impl std::fmt::Display for CallStackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}() {}:{}", self.function, self.file, self.line)
    }
}

/// A captured call stack, innermost frame first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stack(Vec<CallStackFrame>);

/// Frames belonging to the capture machinery itself; they lead every raw backtrace.
fn is_capture_frame(function: &str) -> bool {
    function.starts_with("backtrace::")
        || function.contains("errfmt::chain::Stack::capture")
        || function.contains("errfmt::chain::ErrorExt")
        || function.contains("errfmt::chain::Wrapped")
}

impl Stack {
    /// Capture the current call stack.
    ///
    /// Frames with no symbol information are dropped, as are the leading frames belonging to
    /// [`backtrace`] & this module. File names are reduced to their base name.
    #[inline(never)]
    pub fn capture() -> Stack {
        let back = Backtrace::new();
        let frames = back
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .filter_map(|sym| {
                // `{:#}` drops the trailing hash from the demangled name
                let function = format!("{:#}", sym.name()?);
                let file = sym
                    .filename()
                    .and_then(|p| p.file_name())
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "?".to_string());
                Some(CallStackFrame {
                    function,
                    file,
                    line: sym.lineno().unwrap_or(0),
                })
            })
            .skip_while(|frame| is_capture_frame(&frame.function))
            .collect();
        Stack(frames)
    }

    pub fn frames(&self) -> &[CallStackFrame] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::convert::From<Vec<CallStackFrame>> for Stack {
    fn from(frames: Vec<CallStackFrame>) -> Self {
        Stack(frames)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         struct Wrapped                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One wrap layer in an error chain
pub struct Wrapped {
    message: Option<String>,
    details: Vec<(String, Value)>,
    stack: Option<Stack>,
    source: BoxError,
}

impl Wrapped {
    pub fn new<E: Into<BoxError>>(source: E) -> Wrapped {
        Wrapped {
            message: None,
            details: Vec::new(),
            stack: None,
            source: source.into(),
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn details(&self) -> &[(String, Value)] {
        &self.details
    }

    pub fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }

    /// Flatten an arbitrary chain into a single, owned layer.
    ///
    /// The result displays identically to `err`, and yields the same details & call stack, but
    /// owns everything. Handy when all you have is a borrowed `&dyn Error` (as in a
    /// [`tracing`] visitor) and you need to hang onto it.
    pub fn snapshot(err: &(dyn std::error::Error + 'static)) -> Wrapped {
        Wrapped {
            message: None,
            details: crate::details::extract(Some(err)).details,
            stack: outermost_stack(err).cloned(),
            source: Box::new(Opaque(err.to_string())),
        }
    }
}

impl std::fmt::Display for Wrapped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", msg, self.source),
            None => write!(f, "{}", self.source),
        }
    }
}

impl std::fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        f.debug_struct("Wrapped")
            .field("message", &self.message)
            .field("details", &self.details)
            .field("stack", &self.stack.as_ref().map(|s| s.len()))
            .field("source", &self.source)
            .finish()
    }
}

impl std::error::Error for Wrapped {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}

/// Root cause standing in for an error we could only see by reference
struct Opaque(String);

impl std::fmt::Display for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for Opaque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{:?}", self.0)
    }
}

impl std::error::Error for Opaque {}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           traversal                                            //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Walk an error chain, outermost first
pub fn layers<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(Some(err), |e| e.source())
}

/// Walk just the [`Wrapped`] layers of an error chain, outermost first
pub fn wrapped_layers<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a Wrapped> {
    layers(err).filter_map(|e| e.downcast_ref::<Wrapped>())
}

/// The stack captured by the outermost layer that has one
pub fn outermost_stack<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a Stack> {
    wrapped_layers(err).find_map(|w| w.stack())
}

/// Does any layer of this chain carry a call stack?
pub fn has_stack(err: &(dyn std::error::Error + 'static)) -> bool {
    outermost_stack(err).is_some()
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         trait ErrorExt                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Wrap errors in [`Wrapped`] layers
pub trait ErrorExt: Sized {
    /// Attach a message, capturing the call stack if nothing underneath has one yet.
    fn wrap<S: Into<String>>(self, msg: S) -> Wrapped;
    /// Attach a message & details, capturing the call stack if nothing underneath has one yet.
    fn wrap_with_details<S: Into<String>>(self, msg: S, details: Vec<(String, Value)>) -> Wrapped;
    /// Attach a message only
    fn with_message<S: Into<String>>(self, msg: S) -> Wrapped;
    /// Attach details only
    fn with_details(self, details: Vec<(String, Value)>) -> Wrapped;
    /// Capture the call stack, unless something underneath has one already
    fn with_stack(self) -> Wrapped;
    /// Attach an already-captured (or synthesized) stack
    fn attach_stack(self, stack: Stack) -> Wrapped;
}

impl<E: Into<BoxError>> ErrorExt for E {
    #[inline(never)]
    fn wrap<S: Into<String>>(self, msg: S) -> Wrapped {
        let mut w = self.with_stack();
        w.message = Some(msg.into());
        w
    }
    #[inline(never)]
    fn wrap_with_details<S: Into<String>>(self, msg: S, details: Vec<(String, Value)>) -> Wrapped {
        let mut w = self.wrap(msg);
        w.details = details;
        w
    }
    fn with_message<S: Into<String>>(self, msg: S) -> Wrapped {
        let mut w = Wrapped::new(self);
        w.message = Some(msg.into());
        w
    }
    fn with_details(self, details: Vec<(String, Value)>) -> Wrapped {
        let mut w = Wrapped::new(self);
        w.details = details;
        w
    }
    #[inline(never)]
    fn with_stack(self) -> Wrapped {
        let mut w = Wrapped::new(self);
        if !has_stack(&*w.source) {
            w.stack = Some(Stack::capture());
        }
        w
    }
    fn attach_stack(self, stack: Stack) -> Wrapped {
        let mut w = Wrapped::new(self);
        w.stack = Some(stack);
        w
    }
}
