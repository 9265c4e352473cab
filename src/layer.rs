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

//! A [`tracing-subscriber`] [`Layer`](tracing_subscriber::layer::Layer) that formats events with
//! an [`Emitter`].
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber
//!
//! Each [`Event`] becomes a [`LogRecord`]:
//!
//! - the `message` field becomes the record's message
//! - a field named `error`, recorded as a `&dyn Error`, becomes the record's error chain (details
//!   & call stack included)
//! - every other field becomes a record field, typed as recorded
//! - the caller is taken from the event's metadata: module path, file & line
//!
//! ```rust
//! use errfmt::{layer::Layer, text::TextEmitter};
//! use tracing_subscriber::{layer::SubscriberExt, registry::Registry};
//!
//! let subscriber = Registry::default().with(Layer::stderr(TextEmitter::default()));
//! let _guard = tracing::subscriber::set_default(subscriber);
//! tracing::info!(user = "alice", "logged in");
//! ```

use crate::{
    chain::Wrapped,
    emit::Emitter,
    error::Result,
    record::{Caller, Fields, Level, LogRecord},
    value::{SharedError, Value},
};

use tracing::Event;
use tracing_subscriber::layer::Context;

use std::{cell::Cell, io::Write, sync::Arc, sync::Mutex};

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated in the `log` crate.
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

thread_local! {
    // Set while this thread is formatting an event; anything logged in the meantime (by us or by
    // a crate we call) is not fed back into the layer.
    static FORMATTING: Cell<bool> = const { Cell::new(false) };
}

/// Holds [`FORMATTING`] for as long as it lives, unwinding included
struct FormattingGuard;

impl FormattingGuard {
    /// `None` if this thread is already formatting an event
    fn enter() -> Option<FormattingGuard> {
        if FORMATTING.with(|f| f.replace(true)) {
            None
        } else {
            Some(FormattingGuard)
        }
    }
}

impl std::ops::Drop for FormattingGuard {
    fn drop(&mut self) {
        FORMATTING.with(|f| f.set(false));
    }
}

/// Pull a [`LogRecord`]'s worth of information out of an [`Event`]
#[derive(Default)]
struct RecordVisitor {
    message: Option<String>,
    fields: Fields,
    error: Option<SharedError>,
}

impl RecordVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        // Fields added by tracing-log to carry `log` metadata
        #[cfg(feature = "tracing-log")]
        if field.name().starts_with("log.") {
            return;
        }
        self.fields.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for RecordVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // The tracing macros "pre-format" the `message` field, so that `value` is actually a
            // `std::fmt::Arguments`, which prints to a debug format without enclosing quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::from(format!("{:?}", value)));
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, Value::from(value));
        }
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::from(value));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::from(value));
    }
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::from(value));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::from(value));
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        let snapshot: SharedError = Arc::new(Wrapped::snapshot(value));
        if field.name() == "error" {
            self.error = Some(snapshot);
        } else {
            self.insert(field, Value::Error(snapshot));
        }
    }
}

pub struct Layer<E: Emitter, W: Write> {
    emitter: E,
    writer: Mutex<W>,
    map_level: Box<dyn Fn(&tracing::Level) -> Level + Send + Sync>,
}

fn default_level_mapping(level: &tracing::Level) -> Level {
    Level::from(level)
}

impl<E: Emitter> Layer<E, std::io::Stderr> {
    /// Write formatted events to stderr
    pub fn stderr(emitter: E) -> Layer<E, std::io::Stderr> {
        Layer::new(emitter, std::io::stderr())
    }
}

impl<E: Emitter, W: Write> Layer<E, W> {
    pub fn new(emitter: E, writer: W) -> Layer<E, W> {
        Layer {
            emitter,
            writer: Mutex::new(writer),
            map_level: Box::new(default_level_mapping),
        }
    }

    /// Replace the default [`tracing::Level`] to [`Level`] mapping
    pub fn with_level_mapping<F>(mut self, map_level: F) -> Self
    where
        F: Fn(&tracing::Level) -> Level + Send + Sync + 'static,
    {
        self.map_level = Box::new(map_level);
        self
    }

    fn record(&self, event: &Event<'_>, meta: &tracing::Metadata<'_>) -> LogRecord {
        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut record = LogRecord::new(
            (self.map_level)(meta.level()),
            visitor.message.unwrap_or_default(),
        );
        record.fields = visitor.fields;
        record.error = visitor.error;
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record.caller = Some(Caller::new(
                meta.module_path().unwrap_or_else(|| meta.target()),
                file,
                line,
            ));
        }
        record
    }

    fn write(&self, mut buf: Vec<u8>) -> Result<()> {
        if buf.last() != Some(&b'\n') {
            buf.push(b'\n');
        }
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&buf)?;
        writer.flush()?;
        Ok(())
    }
}

impl<S, E, W> tracing_subscriber::layer::Layer<S> for Layer<E, W>
where
    S: tracing::Subscriber,
    E: Emitter + 'static,
    W: Write + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let _guard = match FormattingGuard::enter() {
            Some(guard) => guard,
            None => return,
        };

        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let result = self.write(self.emitter.format(self.record(event, meta)));
        if let Err(err) = result {
            // Other layers will see this; we won't.
            ::tracing::error!(error = %err, "failed to write log record");
        }
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::{
        chain::{CallStackFrame, ErrorExt, Stack},
        config::Options,
        details,
        json::JsonEmitter,
        policy::FieldOrder,
        text::TextEmitter,
    };

    use tracing_subscriber::{
        layer::SubscriberExt, // Needed to get `with()`
        registry::Registry,
    };

    /// An in-memory sink we can inspect after the fact
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    use tracing::Callsite;

    // Just enough `tracing` internals to hand-build an Event we can turn into a record.
    struct TestCallsite {
        metadata: &'static tracing::Metadata<'static>,
    }
    impl tracing_core::callsite::Callsite for TestCallsite {
        fn set_interest(&self, _interest: tracing_core::subscriber::Interest) {}
        fn metadata(&self) -> &tracing::Metadata<'static> {
            self.metadata
        }
    }
    impl TestCallsite {
        pub const fn new(metadata: &'static tracing::Metadata<'static>) -> TestCallsite {
            TestCallsite { metadata }
        }
    }

    #[test]
    #[allow(clippy::redundant_closure_call)]
    fn event_to_record() {
        static CALLSITE: TestCallsite = {
            static METADATA: tracing::Metadata = tracing::Metadata::new(
                "test event metadata",
                "test-target",
                tracing::Level::WARN,
                Some("src/handlers.rs"),
                Some(42),
                Some("myapp::handlers"),
                tracing::field::FieldSet::new(
                    &["user", "message"],
                    tracing_core::callsite::Identifier(&CALLSITE),
                ),
                tracing_core::metadata::Kind::EVENT,
            );
            TestCallsite::new(&METADATA)
        };

        let layer = Layer::new(TextEmitter::default(), Vec::new());
        (|value_set: ::tracing::field::ValueSet| {
            let event = Event::new(CALLSITE.metadata(), &value_set);
            let record = layer.record(&event, CALLSITE.metadata());
            assert_eq!(record.level, Level::Warn);
            assert_eq!(record.message, "Hello, world!");
            assert_eq!(record.fields.get("user"), Some(&Value::from("alice")));
            assert_eq!(
                record.caller,
                Some(Caller::new("myapp::handlers", "src/handlers.rs", 42))
            );
            assert!(record.error.is_none());
        })(tracing::valueset!(
            CALLSITE.metadata().fields(),
            user = "alice",
            message = format_args!("{}", "Hello, world!")
        ));
    }

    fn quiet_order() -> FieldOrder {
        FieldOrder::default()
            .disable("time")
            .disable("func")
            .disable("file")
    }

    #[test]
    fn text_events() {
        let buf = SharedBuf::default();
        let subscriber = Registry::default().with(Layer::new(
            TextEmitter::default().with_field_order(quiet_order()),
            buf.clone(),
        ));
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::info!(user = "alice", attempts = 3, ok = true, "logged in");
        tracing::warn!("Hello, 世界!");
        assert_eq!(
            buf.contents(),
            "level=info msg=\"logged in\" attempts=3 ok=true user=alice\n\
             level=warning msg=\"Hello, 世界!\"\n"
        );
    }

    #[test]
    fn error_chains() {
        let buf = SharedBuf::default();
        let subscriber = Registry::default().with(Layer::new(
            JsonEmitter::new(Options::builder().call_stack_in_fields(true).build())
                .with_field_order(quiet_order()),
            buf.clone(),
        ));
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = "no such user"
            .attach_stack(Stack::from(vec![CallStackFrame::new("app::find", "db.rs", 7)]))
            .wrap_with_details("lookup failed", details!["user" => "bob"]);
        tracing::error!(error = &err as &dyn std::error::Error, "request failed");
        assert_eq!(
            buf.contents(),
            "{\"level\":\"error\",\"error\":\"lookup failed: no such user\",\
             \"msg\":\"request failed\",\"user\":\"bob\",\"callstack\":[\"app::find() db.rs:7\"]}\n"
        );
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures() {
        let layer = Layer::new(TextEmitter::default(), BrokenPipe);
        match layer.write(b"x".to_vec()) {
            Err(crate::error::Error::Write { source, .. }) => {
                assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe)
            }
            other => panic!("expected a write error, got {:?}", other),
        }

        // ...and through a subscriber, the failure is reported without feeding back into us
        let subscriber = Registry::default().with(Layer::new(TextEmitter::default(), BrokenPipe));
        let _guard = tracing::subscriber::set_default(subscriber);
        tracing::info!("dropped");
        assert!(!FORMATTING.with(|f| f.get()));
    }

    /// Panics on the first record only
    struct PanicOnce {
        armed: std::sync::atomic::AtomicBool,
        inner: TextEmitter,
    }

    impl Emitter for PanicOnce {
        fn format(&self, record: LogRecord) -> Vec<u8> {
            if self.armed.swap(false, std::sync::atomic::Ordering::SeqCst) {
                panic!("emitter failure");
            }
            self.inner.format(record)
        }
    }

    #[test]
    fn recovers_from_emitter_panic() {
        let buf = SharedBuf::default();
        let subscriber = Registry::default().with(Layer::new(
            PanicOnce {
                armed: std::sync::atomic::AtomicBool::new(true),
                inner: TextEmitter::default().with_field_order(quiet_order()),
            },
            buf.clone(),
        ));
        let _guard = tracing::subscriber::set_default(subscriber);

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracing::info!("first");
        }));
        assert!(caught.is_err());
        assert!(!FORMATTING.with(|f| f.get()));

        tracing::info!("second");
        assert_eq!(buf.contents(), "level=info msg=second\n");
    }

    #[test]
    fn caller_and_level_mapping() {
        let buf = SharedBuf::default();
        let subscriber = Registry::default().with(
            Layer::new(
                TextEmitter::default().with_field_order(FieldOrder::default().disable("time")),
                buf.clone(),
            )
            .with_level_mapping(|_| Level::Fatal),
        );
        let _guard = tracing::subscriber::set_default(subscriber);

        tracing::debug!("x");
        let out = buf.contents();
        assert!(out.starts_with("level=fatal func=\"errfmt::layer::smoke\" msg=x file=\"layer.rs:"));
        assert!(out.ends_with("\"\n"));
    }
}
