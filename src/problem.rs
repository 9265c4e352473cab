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

//! RFC [7807] "problem" HTTP response bodies
//!
//! [7807]: https://datatracker.ietf.org/doc/html/rfc7807
//!
//! # Introduction
//!
//! When a request handler fails, the same record that gets logged can be turned into the
//! response body, so that the client sees (more or less) what the operator sees:
//!
//! ```json
//! {
//!   "type": "about:blank",
//!   "title": "Precondition Failed",
//!   "status": 412,
//!   "detail": "loading user: record not found",
//!   "details": {
//!     "error": "\"loading user: record not found\"",
//!     "level": "\"warning\"",
//!     "time": "\"2022-08-10T01:02:03Z\"",
//!     "user": "\"alice\""
//!   }
//! }
//! ```
//!
//! Each member of `details` is the JSON encoding of the corresponding field, as a string (or, should
//! the field not marshal, the marshalling error's message).
//!
//! # Writing responses
//!
//! [`HttpProblemBuilder::write_problem`] & [`HttpProblemBuilder::write_json`] write to anything
//! implementing [`ResponseWriter`] (there's an implementation for [`http::Response<Vec<u8>>`]).
//! Neither returns an error; failures are recorded on the returned record, which the caller is
//! expected to log.

use crate::{
    config::Options,
    emit::{timestamp, Emitter},
    error::Error,
    json::marshal_or_error,
    pipeline::Pipeline,
    policy::{KEY_ERROR, KEY_FILE, KEY_FUNC, KEY_LEVEL, KEY_TIME},
    record::{Level, LogRecord},
    syslog::fix_sd_name,
    value::Value,
};

use http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use std::collections::{BTreeMap, HashMap};

type StdResult<T, E> = std::result::Result<T, E>;

/// RFC 7807 media type
pub const CONTENT_TYPE_PROBLEM: &str = "application/problem+json";
/// Media type for successful JSON responses
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";
/// Field recording a failure to marshal the problem body
pub const KEY_HTTP_PROBLEM_ERROR: &str = "httpproblem_error";
/// Field recording a failure to write the response
pub const KEY_HTTP_WRITE_ERROR: &str = "httpwrite_error";
/// Prefix for request information fields
pub const KEY_PREFIX_REQUEST: &str = "req_";
/// Field holding the response status; [`ProblemEmitter`] reads it
pub const KEY_HTTP_STATUS: &str = "resp_status";
/// Field naming the handler behind [`HttpProblemBuilder::handle`]
pub const KEY_HANDLER_FUNC: &str = "handlerFunc";
/// The problem type used throughout
pub const ABOUT_BLANK: &str = "about:blank";

/// An RFC 7807 problem body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpProblem {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callstack: Vec<String>,
}

impl HttpProblem {
    pub fn new<S: Into<String>>(status: StatusCode, detail: S) -> HttpProblem {
        HttpProblem {
            problem_type: ABOUT_BLANK.to_string(),
            title: status.canonical_reason().unwrap_or("").to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            details: BTreeMap::new(),
            callstack: Vec::new(),
        }
    }
}

/// Pretty-print `problem`.
///
/// Should that fail, a generic 500 body carrying the failure's text is returned instead, along
/// with the failure itself.
pub fn marshal_problem<P: Serialize>(problem: &P) -> (Vec<u8>, Option<Error>) {
    match serde_json::to_vec_pretty(problem) {
        Ok(body) => (body, None),
        Err(err) => {
            let err = Error::from(err);
            let fallback = HttpProblem::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string());
            // All strings; this can't fail
            let body = serde_json::to_vec_pretty(&fallback).unwrap_or_default();
            (body, Some(err))
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        ResponseWriter                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The bits of an HTTP response we need to write a body
pub trait ResponseWriter {
    fn header_map_mut(&mut self) -> &mut HeaderMap;
    fn set_status(&mut self, status: StatusCode);
    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()>;
}

impl ResponseWriter for http::Response<Vec<u8>> {
    fn header_map_mut(&mut self) -> &mut HeaderMap {
        self.headers_mut()
    }
    fn set_status(&mut self, status: StatusCode) {
        *self.status_mut() = status;
    }
    fn write_body(&mut self, body: &[u8]) -> std::io::Result<()> {
        self.body_mut().extend_from_slice(body);
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      HttpProblemBuilder                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, Default)]
pub struct HttpProblemBuilder {
    pipeline: Pipeline,
}

impl HttpProblemBuilder {
    pub fn new(options: Options) -> HttpProblemBuilder {
        HttpProblemBuilder {
            pipeline: Pipeline::new(options),
        }
    }

    /// Build the problem for `record`; the record itself is untouched.
    pub fn problem(&self, status: StatusCode, record: &LogRecord) -> HttpProblem {
        let record = self.pipeline.prepare(record.clone());
        let options = self.pipeline.options();

        let mut entries: Vec<(String, Value)> = vec![
            (KEY_LEVEL.to_string(), Value::from(record.level.to_string())),
            (KEY_TIME.to_string(), Value::from(timestamp(&record.timestamp))),
        ];
        if let Some(caller) = &record.caller {
            let (func, file) = caller.pretty(&options.trim_prefixes);
            entries.push((KEY_FUNC.to_string(), Value::from(func)));
            entries.push((KEY_FILE.to_string(), Value::from(file)));
        }
        let error_message = record.error_message();
        if let Some(msg) = &error_message {
            entries.push((KEY_ERROR.to_string(), Value::from(msg.as_str())));
        }
        entries.extend(record.fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut problem = HttpProblem::new(status, error_message.unwrap_or(record.message));
        problem.details = entries
            .into_iter()
            .map(|(k, v)| {
                let text = marshal_or_error(&k, &v);
                (k, text)
            })
            .collect();
        if options.call_stack_in_http_problem {
            problem.callstack = record.callstack;
        }
        problem
    }

    /// Render the problem body for `record`.
    ///
    /// If the body can't be marshalled, a generic 500 body is returned & the failure is recorded
    /// on `record` under [`KEY_HTTP_PROBLEM_ERROR`].
    pub fn render(&self, status: StatusCode, record: &mut LogRecord) -> Vec<u8> {
        self.render_with(&self.problem(status, record), record)
    }

    fn render_with<P: Serialize>(&self, problem: &P, record: &mut LogRecord) -> Vec<u8> {
        let (body, err) = marshal_problem(problem);
        if let Some(err) = err {
            warn!(error = %err, "falling back to a generic problem body");
            record
                .fields
                .insert(KEY_HTTP_PROBLEM_ERROR.to_string(), Value::from(err.to_string()));
        }
        body
    }

    /// Send a problem response: `Content-Type: application/problem+json`, `status` & the body.
    ///
    /// Returns `record`, annotated with any marshalling or write failure.
    pub fn write_problem<W: ResponseWriter + ?Sized>(
        &self,
        writer: &mut W,
        status: StatusCode,
        mut record: LogRecord,
    ) -> LogRecord {
        writer
            .header_map_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PROBLEM));
        writer.set_status(status);
        let body = self.render(status, &mut record);
        if let Err(err) = writer.write_body(&body) {
            debug!(error = %err, "failed to write problem response");
            record
                .fields
                .insert(KEY_HTTP_WRITE_ERROR.to_string(), Value::from(err.to_string()));
        }
        record
    }

    /// Send a successful JSON response.
    ///
    /// The `Content-Type` is set to [`CONTENT_TYPE_JSON`] unless the caller already set one. If
    /// `value` can't be marshalled, a problem response is sent instead (with `status`) and the
    /// marshalling error becomes the record's error. A write failure is recorded on the record,
    /// whose level is raised to at least [`Level::Error`].
    pub fn write_json<W: ResponseWriter + ?Sized, T: Serialize + ?Sized>(
        &self,
        writer: &mut W,
        status: StatusCode,
        value: &T,
        record: LogRecord,
    ) -> LogRecord {
        match serde_json::to_vec_pretty(value) {
            Ok(body) => {
                let mut record = record;
                writer
                    .header_map_mut()
                    .entry(CONTENT_TYPE)
                    .or_insert(HeaderValue::from_static(CONTENT_TYPE_JSON));
                writer.set_status(status);
                if let Err(err) = writer.write_body(&body) {
                    debug!(error = %err, "failed to write JSON response");
                    record
                        .fields
                        .insert(KEY_HTTP_WRITE_ERROR.to_string(), Value::from(err.to_string()));
                    if record.level > Level::Error {
                        record.level = Level::Error;
                    }
                }
                record
            }
            Err(err) => self.write_problem(writer, status, record.with_error(Error::from(err))),
        }
    }

    /// Run `handler` & send its outcome.
    ///
    /// On success the value is sent with [`write_json`](HttpProblemBuilder::write_json); on
    /// failure the error becomes a problem response via
    /// [`write_problem`](HttpProblemBuilder::write_problem). Either way the returned record is
    /// leveled by `levels` (raised to [`Level::Error`] if the response couldn't be written),
    /// names the handler under [`KEY_HANDLER_FUNC`] & is ready to hand to an [`Emitter`].
    pub fn handle<W, T, E, F>(
        &self,
        writer: &mut W,
        levels: &LevelByStatus,
        handler: F,
    ) -> LogRecord
    where
        W: ResponseWriter + ?Sized,
        T: Serialize,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
        F: FnOnce(&mut W) -> (StatusCode, StdResult<T, E>),
    {
        let name = std::any::type_name::<F>();
        let (status, outcome) = handler(writer);
        let record = LogRecord::new(levels.level(status), "").with_field(KEY_HANDLER_FUNC, name);
        match outcome {
            Ok(value) => self.write_json(writer, status, &value, record),
            Err(err) => self.write_problem(writer, status, record.with_error(err)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        request & status                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Choose a log level by HTTP status class
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelByStatus(HashMap<u16, Level>);

impl std::default::Default for LevelByStatus {
    /// 2xx: debug, 4xx: warning, 5xx: error
    fn default() -> Self {
        LevelByStatus::empty()
            .with_class(2, Level::Debug)
            .with_class(4, Level::Warn)
            .with_class(5, Level::Error)
    }
}

impl LevelByStatus {
    pub fn empty() -> LevelByStatus {
        LevelByStatus(HashMap::new())
    }

    /// Map status class `class` (the first digit: 2 for 2xx, &c) to `level`
    pub fn with_class(mut self, class: u16, level: Level) -> Self {
        self.0.insert(class, level);
        self
    }

    /// Unmapped classes get [`Level::Trace`]
    pub fn level(&self, status: StatusCode) -> Level {
        self.0
            .get(&(status.as_u16() / 100))
            .copied()
            .unwrap_or(Level::Trace)
    }
}

/// The most informative bits of a request
pub const DEFAULT_REQUEST_INFO: [&str; 10] = [
    "method",
    "host",
    "remoteaddr",
    "requesturi",
    "From",
    "Forwarded",
    "Content-Length",
    "X-Forwarded-For",
    "X-Forwarded-Host",
    "X-Http-Method-Override",
];

/// Collect `selected` request information as `req_*` fields.
///
/// `method`, `host`, `remoteaddr` & `requesturi` are taken from the request itself (the remote
/// address from a [`std::net::SocketAddr`] request extension, as set by most servers); anything
/// else names a header, which is included only if present & non-empty. Header-derived field names
/// are SD-NAME sanitized so they survive the trip to syslog.
pub fn request_info<B>(request: &http::Request<B>, selected: &[&str]) -> Vec<(String, Value)> {
    let mut info = Vec::with_capacity(selected.len());
    for field in selected {
        let value = match *field {
            "method" => Some(request.method().as_str().to_string()),
            "host" => request
                .headers()
                .get(http::header::HOST)
                .and_then(|h| h.to_str().ok())
                .map(|h| h.to_string())
                .or_else(|| request.uri().authority().map(|a| a.to_string())),
            "remoteaddr" => request
                .extensions()
                .get::<std::net::SocketAddr>()
                .map(|addr| addr.to_string()),
            "requesturi" => Some(
                request
                    .uri()
                    .path_and_query()
                    .map(|pq| pq.to_string())
                    .unwrap_or_else(|| request.uri().to_string()),
            ),
            header => {
                let value = request
                    .headers()
                    .get(header)
                    .and_then(|h| h.to_str().ok())
                    .filter(|h| !h.is_empty())
                    .map(|h| h.to_string());
                if let Some(value) = value {
                    info.push((
                        fix_sd_name(&format!("{}{}", KEY_PREFIX_REQUEST, header)),
                        Value::from(value),
                    ));
                }
                continue;
            }
        };
        if let Some(value) = value {
            info.push((format!("{}{}", KEY_PREFIX_REQUEST, field), Value::from(value)));
        }
    }
    info
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        ProblemEmitter                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// [`HttpProblemBuilder`] as an [`Emitter`]; the status is read from the record's
/// [`KEY_HTTP_STATUS`] field, defaulting to 500.
#[derive(Clone, Debug, Default)]
pub struct ProblemEmitter {
    builder: HttpProblemBuilder,
}

impl ProblemEmitter {
    pub fn new(options: Options) -> ProblemEmitter {
        ProblemEmitter {
            builder: HttpProblemBuilder::new(options),
        }
    }
}

fn status_of(record: &LogRecord) -> Option<StatusCode> {
    record
        .fields
        .get(KEY_HTTP_STATUS)
        .and_then(Value::as_i64)
        .and_then(|s| u16::try_from(s).ok())
        .and_then(|s| StatusCode::from_u16(s).ok())
}

impl Emitter for ProblemEmitter {
    fn format(&self, mut record: LogRecord) -> Vec<u8> {
        let status = status_of(&record).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.builder.render(status, &mut record)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{
        chain::{CallStackFrame, ErrorExt, Stack},
        details,
        record::Caller,
    };

    use chrono::prelude::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 8, 10, 1, 2, 3).unwrap()
    }

    #[test]
    fn not_found_without_error() {
        let mut record = LogRecord::new(Level::Warn, "not found").with_timestamp(ts());
        let body = HttpProblemBuilder::default().render(StatusCode::NOT_FOUND, &mut record);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{
  "type": "about:blank",
  "title": "Not Found",
  "status": 404,
  "detail": "not found",
  "details": {
    "level": "\"warning\"",
    "time": "\"2022-08-10T01:02:03Z\""
  }
}"#
        );
        assert!(!record.fields.contains_key(KEY_HTTP_PROBLEM_ERROR));
    }

    #[test]
    fn error_details_and_call_stack() {
        let stack = Stack::from(vec![
            CallStackFrame::new("app::inner", "a.rs", 1),
            CallStackFrame::new("app::outer", "b.rs", 2),
            CallStackFrame::new("main", "main.rs", 3),
        ]);
        let record = LogRecord::new(Level::Error, "USER MSG")
            .with_timestamp(ts())
            .with_caller(Caller::new("app::handler", "src/handler.rs", 9))
            .with_field("K3 2", "V3 space")
            .with_error(
                "root"
                    .attach_stack(stack)
                    .wrap_with_details("loading", details!["K5_int" => 12, "msg" => "clash"]),
            );
        let builder = HttpProblemBuilder::new(
            Options::builder()
                .call_stack_in_http_problem(true)
                .call_stack(crate::stack::CallStackPolicy::skip_last(1))
                .build(),
        );
        let problem = builder.problem(StatusCode::PRECONDITION_FAILED, &record);
        assert_eq!(problem.title, "Precondition Failed");
        assert_eq!(problem.status, 412);
        assert_eq!(problem.detail, "loading: root");
        let keys: Vec<&str> = problem.details.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["K3 2", "K5_int", "error", "fields.msg", "file", "func", "level", "time"]
        );
        assert_eq!(problem.details["K3 2"], "\"V3 space\"");
        assert_eq!(problem.details["K5_int"], "12");
        assert_eq!(problem.details["error"], "\"loading: root\"");
        assert_eq!(problem.details["file"], "\"handler.rs:9\"");
        assert_eq!(
            problem.callstack,
            vec!["app::inner() a.rs:1", "app::outer() b.rs:2"]
        );

        // round-trips through serde
        let mut record = record;
        let body = builder.render(StatusCode::PRECONDITION_FAILED, &mut record);
        let parsed: HttpProblem = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, problem);
    }

    #[test]
    fn per_field_marshal_failures() {
        let record = LogRecord::new(Level::Error, "m")
            .with_timestamp(ts())
            .with_field("nan", f64::NAN);
        let problem = HttpProblemBuilder::default().problem(StatusCode::BAD_REQUEST, &record);
        assert_eq!(problem.details["nan"], "json: unsupported value: NaN");
    }

    struct Unmarshallable;

    impl Serialize for Unmarshallable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("no can do"))
        }
    }

    #[test]
    fn fallback_body() {
        let (body, err) = marshal_problem(&Unmarshallable);
        assert!(err.is_some());
        let parsed: HttpProblem = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.status, 500);
        assert_eq!(parsed.title, "Internal Server Error");
        assert_eq!(parsed.detail, "no can do");

        let mut record = LogRecord::new(Level::Error, "m");
        let _ = HttpProblemBuilder::default().render_with(&Unmarshallable, &mut record);
        assert_eq!(
            record.fields.get(KEY_HTTP_PROBLEM_ERROR),
            Some(&Value::from("no can do"))
        );
    }

    struct BrokenPipe {
        headers: HeaderMap,
        status: StatusCode,
    }

    impl ResponseWriter for BrokenPipe {
        fn header_map_mut(&mut self) -> &mut HeaderMap {
            &mut self.headers
        }
        fn set_status(&mut self, status: StatusCode) {
            self.status = status;
        }
        fn write_body(&mut self, _: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"))
        }
    }

    #[test]
    fn write_problem_to_response() {
        let mut resp = http::Response::new(Vec::new());
        let record = HttpProblemBuilder::default().write_problem(
            &mut resp,
            StatusCode::NOT_FOUND,
            LogRecord::new(Level::Warn, "not found"),
        );
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], CONTENT_TYPE_PROBLEM);
        let parsed: HttpProblem = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(parsed.detail, "not found");
        assert!(!record.fields.contains_key(KEY_HTTP_WRITE_ERROR));

        let mut broken = BrokenPipe {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
        };
        let record = HttpProblemBuilder::default().write_problem(
            &mut broken,
            StatusCode::CONFLICT,
            LogRecord::new(Level::Warn, "conflict"),
        );
        assert_eq!(broken.status, StatusCode::CONFLICT);
        assert_eq!(
            record.fields.get(KEY_HTTP_WRITE_ERROR),
            Some(&Value::from("broken pipe"))
        );
    }

    fn get_user(
        resp: &mut http::Response<Vec<u8>>,
    ) -> (StatusCode, StdResult<serde_json::Value, std::io::Error>) {
        resp.headers_mut().insert("X-Request-Id", HeaderValue::from_static("42"));
        (StatusCode::OK, Ok(serde_json::json!({"name": "alice"})))
    }

    fn get_missing(
        _: &mut http::Response<Vec<u8>>,
    ) -> (StatusCode, StdResult<serde_json::Value, std::io::Error>) {
        (
            StatusCode::NOT_FOUND,
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "no such user")),
        )
    }

    #[test]
    fn handlers() {
        let builder = HttpProblemBuilder::default();
        let levels = LevelByStatus::default();

        let mut resp = http::Response::new(Vec::new());
        let record = builder.handle(&mut resp, &levels, get_user);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);
        assert_eq!(resp.headers()["X-Request-Id"], "42");
        assert_eq!(resp.body().as_slice(), b"{\n  \"name\": \"alice\"\n}");
        assert_eq!(record.level, Level::Debug);
        assert!(record.error.is_none());
        assert!(record
            .fields
            .get(KEY_HANDLER_FUNC)
            .and_then(Value::as_str)
            .map_or(false, |name| name.ends_with("get_user")));

        let mut resp = http::Response::new(Vec::new());
        let record = builder.handle(&mut resp, &levels, get_missing);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[CONTENT_TYPE], CONTENT_TYPE_PROBLEM);
        let parsed: HttpProblem = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(parsed.detail, "no such user");
        assert_eq!(parsed.title, "Not Found");
        assert_eq!(record.level, Level::Warn);
        assert_eq!(record.error_message(), Some("no such user".to_string()));

        // A closure works as well; a failed write raises the level
        let mut broken = BrokenPipe {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
        };
        let record = builder.handle(&mut broken, &levels, |_: &mut BrokenPipe| {
            (StatusCode::CREATED, Ok::<_, std::io::Error>(1))
        });
        assert_eq!(broken.status, StatusCode::CREATED);
        assert_eq!(record.level, Level::Error);
        assert_eq!(
            record.fields.get(KEY_HTTP_WRITE_ERROR),
            Some(&Value::from("broken pipe"))
        );
    }

    #[test]
    fn write_json_responses() {
        let builder = HttpProblemBuilder::default();

        let mut resp = http::Response::new(Vec::new());
        let record = builder.write_json(
            &mut resp,
            StatusCode::OK,
            &serde_json::json!({"id": 1}),
            LogRecord::new(Level::Debug, "ok"),
        );
        assert_eq!(resp.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);
        assert_eq!(resp.body().as_slice(), b"{\n  \"id\": 1\n}");
        assert!(record.error.is_none());

        // A caller-chosen content type is kept
        let mut resp = http::Response::new(Vec::new());
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/vnd.x+json"));
        builder.write_json(&mut resp, StatusCode::OK, &1, LogRecord::new(Level::Debug, "ok"));
        assert_eq!(resp.headers()[CONTENT_TYPE], "application/vnd.x+json");

        // Marshalling failure: problem response instead
        let mut resp = http::Response::new(Vec::new());
        let record = builder.write_json(
            &mut resp,
            StatusCode::OK,
            &Unmarshallable,
            LogRecord::new(Level::Debug, "ok"),
        );
        assert_eq!(resp.headers()[CONTENT_TYPE], CONTENT_TYPE_PROBLEM);
        assert_eq!(record.error_message(), Some("no can do".to_string()));

        // Write failure: level raised
        let mut broken = BrokenPipe {
            headers: HeaderMap::new(),
            status: StatusCode::OK,
        };
        let record = builder.write_json(&mut broken, StatusCode::OK, &1, LogRecord::new(Level::Debug, "ok"));
        assert_eq!(record.level, Level::Error);
        assert!(record.fields.contains_key(KEY_HTTP_WRITE_ERROR));
    }

    #[test]
    fn levels_by_status() {
        let l = LevelByStatus::default();
        assert_eq!(l.level(StatusCode::OK), Level::Debug);
        assert_eq!(l.level(StatusCode::NOT_FOUND), Level::Warn);
        assert_eq!(l.level(StatusCode::BAD_GATEWAY), Level::Error);
        assert_eq!(l.level(StatusCode::MOVED_PERMANENTLY), Level::Trace);
    }

    #[test]
    fn request_fields() {
        let mut req = http::Request::builder()
            .method("GET")
            .uri("http://127.0.0.1:8080/test?key=val")
            .header("From", "user@example.com")
            .header("X-Forwarded-For", "client1, proxy1, proxy2")
            .header("X-HTTP-Method-Override", "DELETE")
            .header("Forwarded", "")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert("10.0.0.1:4242".parse::<std::net::SocketAddr>().unwrap());
        let info = request_info(&req, &DEFAULT_REQUEST_INFO);
        assert_eq!(
            info,
            vec![
                ("req_method".to_string(), Value::from("GET")),
                ("req_host".to_string(), Value::from("127.0.0.1:8080")),
                ("req_remoteaddr".to_string(), Value::from("10.0.0.1:4242")),
                ("req_requesturi".to_string(), Value::from("/test?key=val")),
                ("req_From".to_string(), Value::from("user@example.com")),
                (
                    "req_X-Forwarded-For".to_string(),
                    Value::from("client1, proxy1, proxy2")
                ),
                ("req_X-Http-Method-Override".to_string(), Value::from("DELETE")),
            ]
        );
    }

    #[test]
    fn emitter_reads_status_field() {
        let emitter = ProblemEmitter::default();
        let body = emitter.format(LogRecord::new(Level::Warn, "gone").with_field(KEY_HTTP_STATUS, 410));
        let parsed: HttpProblem = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.status, 410);
        assert_eq!(parsed.title, "Gone");
        let body = emitter.format(LogRecord::new(Level::Warn, "?"));
        let parsed: HttpProblem = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.status, 500);
    }
}
