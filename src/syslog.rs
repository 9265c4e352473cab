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

//! RFC [5424]-compliant syslog messages with structured data
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424
//!
//! [`Rfc5424`] is an [`Emitter`] producing messages of the form:
//!
//! ```text
//! <PRI>1 TIMESTAMP HOSTNAME APP-NAME PROCID MSGID STRUCTURED-DATA MSG
//! ```
//!
//! The record's fields go into a single SD-ELEMENT named `details` (the function name first, the
//! file name last), each value JSON-encoded. If the call stack was requested as a field, it goes
//! into a second element, `calls`, and the default MSGID changes from [`DETAILS_MSG`] to
//! [`DETAILS_CALLS_MSG`] so that a collector can tell the two apart without parsing the SD.

use crate::{
    config::Options,
    emit::{append_call_stack, Emitter},
    error::{Error, Result},
    facility::{pri, Facility, Severity},
    json::marshal_or_error,
    pipeline::Pipeline,
    policy::{FieldOrder, KEY_CALLSTACK, KEY_ERROR, KEY_FILE, KEY_FUNC},
    record::LogRecord,
    value::Value,
};

use backtrace::Backtrace;
use bytes::buf::BufMut;
use chrono::SecondsFormat;

type StdResult<T, E> = std::result::Result<T, E>;

/// Default MSGID for messages whose call stack isn't in the structured data
pub const DETAILS_MSG: &str = "DETAILS_MSG";
/// Default MSGID for messages carrying a `calls` element
pub const DETAILS_CALLS_MSG: &str = "DETAILS_CALLS_MSG";
/// SD-ID of the element holding the record's fields
pub const SD_ID_DETAILS: &str = "details";
/// SD-ID of the element holding the call stack
pub const SD_ID_CALLS: &str = "calls";
/// Stands in for any byte that may not appear in an SD-NAME
pub const SD_NAME_REPLACEMENT: char = '_';

/// Produce a [`Vec`] of bytes from an [`OsString`](std::ffi::OsString).
#[cfg(unix)]
fn bytes_from_os_str(s: std::ffi::OsString) -> Vec<u8> {
    use std::os::unix::ffi::OsStringExt;
    s.into_vec()
}

#[cfg(not(unix))]
fn bytes_from_os_str(s: std::ffi::OsString) -> Vec<u8> {
    s.to_string_lossy().as_bytes().to_vec()
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         header fields                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`Vec<u8>`] instance with the additional constraint that it must be less than 256 bytes
/// of ASCII.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rfc5424Hostname(Vec<u8>);

impl Rfc5424Hostname {
    /// An RFC 5424-compliant hostname is at most 255 bytes of ASCII
    pub fn new(bytes: Vec<u8>) -> Result<Rfc5424Hostname> {
        if bytes.is_ascii() && bytes.len() < 256 {
            Ok(Rfc5424Hostname(bytes))
        } else {
            Err(Error::BadRfc5424Hostname {
                name: bytes,
                back: Backtrace::new(),
            })
        }
    }
}

impl std::default::Default for Rfc5424Hostname {
    /// Attempt to figure-out an RFC [5424]-compliant hostname.
    ///
    /// The RFC's order of preference for HOSTNAME is FQDN, static IP, hostname, dynamic IP &
    /// finally the NILVALUE. This implementation first simply tries [gethostname()], then falls
    /// back to the local IP address, and then to "-".
    ///
    /// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
    /// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
    fn default() -> Self {
        hostname::get()
            .map_err(|err| Error::NoHostname {
                source: Box::new(err),
                back: Backtrace::new(),
            })
            // vvv :=> StdResult<Rfc5424Hostname, Error>
            .and_then(|hn| Rfc5424Hostname::new(bytes_from_os_str(hn)))
            .or_else(|_err| {
                let ip: StdResult<std::net::IpAddr, Error> =
                    local_ip_address::local_ip().map_err(|_| Error::BadRfc5424IpAddress);
                ip.and_then(|ip| Rfc5424Hostname::new(ip.to_string().into_bytes()))
            })
            .unwrap_or_else(|_| Rfc5424Hostname(b"-".to_vec()))
    }
}

impl std::convert::TryFrom<String> for Rfc5424Hostname {
    type Error = Error;
    fn try_from(x: String) -> StdResult<Self, Self::Error> {
        Rfc5424Hostname::new(x.into_bytes())
    }
}

/// A string with the additional constraint that it is less than forty-nine bytes of ASCII.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppName(Vec<u8>);

impl std::fmt::Display for AppName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl AppName {
    pub fn new(bytes: Vec<u8>) -> Result<AppName> {
        if bytes.is_ascii() && bytes.len() < 49 {
            Ok(AppName(bytes))
        } else {
            Err(Error::BadRfc5424AppName {
                name: bytes,
                back: Backtrace::new(),
            })
        }
    }
}

impl std::convert::TryFrom<String> for AppName {
    type Error = Error;
    fn try_from(x: String) -> StdResult<Self, Self::Error> {
        AppName::new(x.into_bytes())
    }
}

impl std::default::Default for AppName {
    /// The base name of [`std::env::current_exe`]. It cannot fail; if for any reason that value
    /// cannot be retrieved, or is not a valid APP-NAME, it simply returns "-".
    fn default() -> Self {
        std::env::current_exe()
            .map_err(|err| Error::NoExecutable {
                source: Box::new(err),
                back: Backtrace::new(),
            })
            .and_then(|pbuf| match pbuf.file_name() {
                Some(os_str) => AppName::new(bytes_from_os_str(os_str.to_os_string())),
                None => Ok(AppName(b"-".to_vec())),
            })
            .unwrap_or_else(|_| AppName(b"-".to_vec()))
    }
}

/// A string with the additional constraint that it is less than 129 bytes of ASCII.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcId(Vec<u8>);

impl std::fmt::Display for ProcId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl ProcId {
    pub fn new(bytes: Vec<u8>) -> Result<ProcId> {
        if bytes.is_ascii() && bytes.len() < 129 {
            Ok(ProcId(bytes))
        } else {
            Err(Error::BadRfc5424ProcId {
                name: bytes,
                back: Backtrace::new(),
            })
        }
    }
}

impl std::convert::TryFrom<String> for ProcId {
    type Error = Error;
    fn try_from(x: String) -> StdResult<Self, Self::Error> {
        ProcId::new(x.into_bytes())
    }
}

impl std::default::Default for ProcId {
    /// "PROCID is a value that is included in the message, having no interoperable meaning,
    /// except that a change in the value indicates there has been a discontinuity in syslog
    /// reporting." We use [`std::process::id`].
    fn default() -> Self {
        ProcId(std::process::id().to_string().into_bytes())
    }
}

/// A string with the additional constraint that it is less than thirty-three bytes of printable
/// ASCII.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MsgId(Vec<u8>);

impl std::fmt::Display for MsgId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl MsgId {
    pub fn new(bytes: Vec<u8>) -> Result<MsgId> {
        if !bytes.is_empty() && bytes.len() < 33 && bytes.iter().all(|b| (33..=126).contains(b)) {
            Ok(MsgId(bytes))
        } else {
            Err(Error::BadRfc5424MsgId {
                name: bytes,
                back: Backtrace::new(),
            })
        }
    }
}

impl std::convert::TryFrom<String> for MsgId {
    type Error = Error;
    fn try_from(x: String) -> StdResult<Self, Self::Error> {
        MsgId::new(x.into_bytes())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        structured data                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Coerce `name` into an SD-NAME.
///
/// SD-NAME is printable US-ASCII less `=`, space, `]` & `"`; every byte outside that class is
/// replaced with [`SD_NAME_REPLACEMENT`] (so a multi-byte UTF-8 character becomes several). This
/// is lossy, but idempotent.
pub fn fix_sd_name(name: &str) -> String {
    name.bytes()
        .map(|b| match b {
            b'=' | b' ' | b']' | b'"' => SD_NAME_REPLACEMENT,
            b if !(b'!'..=b'~').contains(&b) => SD_NAME_REPLACEMENT,
            b => b as char,
        })
        .collect()
}

/// Escape a PARAM-VALUE: `"`, `\` & `]` must be preceded by a backslash
pub fn escape_param_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One SD-ELEMENT
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredDataElement {
    id: String,
    params: Vec<(String, String)>,
}

impl StructuredDataElement {
    pub fn new(id: &str) -> StructuredDataElement {
        StructuredDataElement {
            id: fix_sd_name(id),
            params: Vec::new(),
        }
    }

    /// Add a parameter; `value` is JSON-encoded (& optionally stripped of its quotes).
    pub fn append(&mut self, name: &str, value: &Value, trim_json_dquote: bool) {
        let mut text = marshal_or_error(name, value);
        if trim_json_dquote && text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
            text = text[1..text.len() - 1].to_string();
        }
        self.params.push((fix_sd_name(name), text));
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

impl std::fmt::Display for StructuredDataElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "[{}", self.id)?;
        for (name, value) in &self.params {
            write!(f, " {}=\"{}\"", name, escape_param_value(value))?;
        }
        write!(f, "]")
    }
}

/// Render STRUCTURED-DATA: the NILVALUE if there are no elements
pub fn structured_data(elements: &[StructuredDataElement]) -> String {
    if elements.is_empty() {
        "-".to_string()
    } else {
        elements.iter().map(|e| e.to_string()).collect()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Rfc5424                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// An emitter that produces RFC [5424]-conformant syslog messages.
///
/// The output carries no trailing newline (unless a console call stack is appended).
///
/// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
#[derive(Clone, Debug)]
pub struct Rfc5424 {
    facility: Facility,
    hostname: Rfc5424Hostname,
    appname: AppName,
    pid: ProcId,
    msgid: Option<MsgId>,
    with_bom: bool,
    pipeline: Pipeline,
    order: FieldOrder,
}

impl std::default::Default for Rfc5424 {
    fn default() -> Self {
        Rfc5424 {
            facility: Facility::LOG_USER,
            hostname: Rfc5424Hostname::default(),
            appname: AppName::default(),
            pid: ProcId::default(),
            msgid: None,
            with_bom: false,
            pipeline: Pipeline::default(),
            order: FieldOrder::default(),
        }
    }
}

pub struct Rfc5424Builder {
    imp: Rfc5424,
}

impl Rfc5424Builder {
    pub fn facility(mut self, facility: Facility) -> Self {
        self.imp.facility = facility;
        self
    }
    pub fn hostname(mut self, hostname: Rfc5424Hostname) -> Self {
        self.imp.hostname = hostname;
        self
    }
    pub fn hostname_as_string(mut self, hostname: String) -> Result<Self> {
        self.imp.hostname = Rfc5424Hostname::try_from(hostname)?;
        Ok(self)
    }
    pub fn appname_as_string(mut self, appname: String) -> Result<Self> {
        self.imp.appname = AppName::try_from(appname)?;
        Ok(self)
    }
    pub fn pid_as_string(mut self, pid: String) -> Result<Self> {
        self.imp.pid = ProcId::try_from(pid)?;
        Ok(self)
    }
    /// Override the default MSGIDs
    pub fn msgid_as_string(mut self, msgid: String) -> Result<Self> {
        self.imp.msgid = Some(MsgId::try_from(msgid)?);
        Ok(self)
    }
    pub fn with_bom(mut self, with_bom: bool) -> Self {
        self.imp.with_bom = with_bom;
        self
    }
    pub fn options(mut self, options: Options) -> Self {
        self.imp.pipeline = Pipeline::new(options);
        self
    }
    pub fn field_order(mut self, order: FieldOrder) -> Self {
        self.imp.order = order;
        self
    }
    pub fn build(self) -> Rfc5424 {
        self.imp
    }
}

impl Rfc5424 {
    pub fn builder() -> Rfc5424Builder {
        Rfc5424Builder {
            imp: Rfc5424::default(),
        }
    }

    /// Build the `details` element (& the `calls` element, if wanted) for a prepared record
    fn elements(&self, record: &LogRecord) -> Vec<StructuredDataElement> {
        let options = self.pipeline.options();
        let trim = options.trim_json_dquote;
        let caller = record
            .caller
            .as_ref()
            .map(|c| c.pretty(&options.trim_prefixes));

        let mut details = StructuredDataElement::new(SD_ID_DETAILS);
        if let Some((func, _)) = &caller {
            if !self.order.is_disabled(KEY_FUNC) {
                details.append(KEY_FUNC, &Value::from(func.as_str()), trim);
            }
        }
        if let Some(msg) = record.error_message() {
            if !self.order.is_disabled(KEY_ERROR) {
                details.append(KEY_ERROR, &Value::from(msg), trim);
            }
        }
        let mut keys: Vec<String> = record.fields.keys().cloned().collect();
        self.order.sort(&mut keys);
        for key in &keys {
            if let Some(value) = record.fields.get(key) {
                details.append(key, value, trim);
            }
        }
        if let Some((_, file)) = &caller {
            if !self.order.is_disabled(KEY_FILE) {
                details.append(KEY_FILE, &Value::from(file.as_str()), trim);
            }
        }

        let mut elements = vec![details];
        if options.call_stack_in_fields && !record.callstack.is_empty() {
            let mut calls = StructuredDataElement::new(SD_ID_CALLS);
            calls.append(KEY_CALLSTACK, &Value::from(record.callstack.clone()), trim);
            elements.push(calls);
        }
        elements
    }
}

impl Emitter for Rfc5424 {
    fn format(&self, record: LogRecord) -> Vec<u8> {
        let record = self.pipeline.prepare(record);
        let options = self.pipeline.options();
        let elements = self.elements(&record);

        let msgid = match &self.msgid {
            Some(msgid) => msgid.to_string(),
            None if elements.len() > 1 => DETAILS_CALLS_MSG.to_string(),
            None => DETAILS_MSG.to_string(),
        };

        // TIME-SECFRAC is limited to six digits
        let mut buf = format!(
            "<{}>1 {} ",
            pri(self.facility, Severity::from(record.level)),
            record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, false)
        )
        .into_bytes();

        buf.put_slice(&self.hostname.0);
        buf.put_slice(
            format!(
                " {} {} {} {}",
                self.appname,
                self.pid,
                msgid,
                structured_data(&elements)
            )
            .as_bytes(),
        );

        if !record.message.is_empty() {
            buf.put_u8(b' ');
            // "If a syslog application encodes MSG in UTF-8, the string MUST start with the
            // Unicode byte order mask (BOM)..."
            if self.with_bom {
                buf.put_slice(&[0xef, 0xbb, 0xbf]);
            }
            buf.put_slice(record.message.as_bytes());
        }

        if options.call_stack_on_console {
            append_call_stack(&mut buf, &record.callstack);
        }
        buf
    }
}
