// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatter for the forwarder.
//!
//! ```text
//! WF_METRICS | LEVEL | [span_name{span_fields}:] message {event_fields}
//! WF_METRICS | INFO | Published metric record_id=3 metric=encode-duration value=4200.0
//! ```

use std::fmt;

use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

pub const LOG_PREFIX: &str = "WF_METRICS";

/// Prefixes every line with [`LOG_PREFIX`] and the level, then the active
/// span hierarchy, so forwarder lines stand out in shared log streams.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{LOG_PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                // populated by the fmt layer on span creation
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(Formatter)
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_prefix_and_fields() {
        let output = capture(|| {
            tracing::info!(record_id = "3", metric = "encode-duration", "Published metric");
        });
        assert_eq!(
            output,
            "WF_METRICS | INFO | Published metric record_id=\"3\" metric=\"encode-duration\"\n"
        );
    }

    #[test]
    fn test_span_context() {
        let output = capture(|| {
            let span = tracing::info_span!("batch", records = 2);
            let _guard = span.enter();
            tracing::warn!("Skipping record");
        });
        assert_eq!(output, "WF_METRICS | WARN | batch{records=2}: Skipping record\n");
    }
}
