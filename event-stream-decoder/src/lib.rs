//! Incremental decoder for chat completion response bodies.
//!
//! Bodies arrive as arbitrary byte chunks. A chunk that looks like a server-sent event
//! stream (`data:` lines separated by blank lines, terminated by `data: [DONE]`) has the
//! text delta of every event extracted; any other chunk is passed through as raw text.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::warn;

/// JSON pointer of the text delta in an OpenAI-style streaming chunk.
pub const DEFAULT_DELTA_POINTER: &str = "/choices/0/delta/content";

const DONE_SENTINEL: &str = "[DONE]";
const EVENT_FIELDS: [&str; 2] = ["data:", "event:"];
const IGNORED_FIELDS: [&str; 3] = [":", "id:", "retry:"];

/// How the body has been classified so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    /// Nothing but blank, comment or metadata lines seen yet.
    Undecided,
    EventStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    EventStream,
    Raw,
    Pending,
}

#[derive(Debug, Clone)]
pub struct EventStreamDecoder {
    delta_pointer: String,
    utf8_pending: Vec<u8>,
    line_buffer: String,
    data_lines: Vec<String>,
    event_name: Option<String>,
    format: BodyFormat,
    done: bool,
    errors: Vec<String>,
}

impl Default for EventStreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStreamDecoder {
    pub fn new() -> Self {
        Self::with_delta_pointer(DEFAULT_DELTA_POINTER)
    }

    pub fn with_delta_pointer(pointer: impl Into<String>) -> Self {
        Self {
            delta_pointer: pointer.into(),
            utf8_pending: Vec::new(),
            line_buffer: String::new(),
            data_lines: Vec::new(),
            event_name: None,
            format: BodyFormat::Undecided,
            done: false,
            errors: Vec::new(),
        }
    }

    /// True once the `[DONE]` sentinel has been seen. Later input is ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Payloads of `event: error` events seen since the last call.
    pub fn take_errors(&mut self) -> Vec<String> {
        std::mem::take(&mut self.errors)
    }

    /// Feeds one chunk and returns the deltas it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        let text = self.decode_utf8(chunk);
        if text.is_empty() {
            return out;
        }

        self.line_buffer.push_str(&text);
        if self.format == BodyFormat::Undecided {
            match classify(&self.line_buffer, false) {
                Classification::EventStream => self.format = BodyFormat::EventStream,
                Classification::Raw => {
                    out.push(std::mem::take(&mut self.line_buffer));
                    return out;
                }
                Classification::Pending => return out,
            }
        }

        self.drain_lines(&mut out);
        out
    }

    /// Flushes buffered input at end of body. An unterminated final event is dispatched.
    pub fn finish(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        if self.done {
            return out;
        }

        let tail = String::from_utf8_lossy(&std::mem::take(&mut self.utf8_pending)).into_owned();
        self.line_buffer.push_str(&tail);

        if self.format == BodyFormat::Undecided
            && classify(&self.line_buffer, true) != Classification::EventStream
        {
            let raw = std::mem::take(&mut self.line_buffer);
            if !raw.trim().is_empty() {
                out.push(raw);
            }
        } else {
            self.drain_lines(&mut out);
            let last_line = std::mem::take(&mut self.line_buffer);
            let last_line = last_line.trim_end_matches('\r');
            if !self.done && !last_line.is_empty() {
                self.process_line(last_line, &mut out);
            }
            if !self.done {
                self.dispatch(&mut out);
            }
        }

        self.done = true;
        out
    }

    /// Decodes as much of the pending bytes as forms complete UTF-8. A trailing partial
    /// sequence is kept for the next chunk; invalid sequences become U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_pending);
        bytes.extend_from_slice(chunk);

        let mut text = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        None => {
                            self.utf8_pending = after.to_vec();
                            break;
                        }
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = after.get(len..).unwrap_or_default();
                        }
                    }
                }
            }
        }

        text
    }

    fn drain_lines(&mut self, out: &mut Vec<String>) {
        while let Some(pos) = self.line_buffer.find('\n') {
            let rest = self.line_buffer.split_off(pos.saturating_add(1));
            let mut line = std::mem::replace(&mut self.line_buffer, rest);
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }

            self.process_line(&line, out);
            if self.done {
                self.line_buffer.clear();
                return;
            }
        }
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<String>) {
        if line.is_empty() {
            self.dispatch(out);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_name = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self, out: &mut Vec<String>) {
        let event_name = self.event_name.take();
        if self.data_lines.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.data_lines);
        let data = lines.join("\n");

        if event_name.as_deref() == Some("error") {
            warn!(payload = %data, "Upstream reported a stream error");
            self.errors.push(data);
            return;
        }

        if self.handle_payload(&data, out) {
            return;
        }

        // Producers that omit the blank separator put several payloads in one event.
        if lines.len() > 1 {
            for line in &lines {
                if self.done {
                    break;
                }
                if !self.handle_payload(line, out) {
                    warn!(payload = %line, "Skipping malformed stream event");
                }
            }
        } else {
            warn!(payload = %data, "Skipping malformed stream event");
        }
    }

    /// Returns false when the payload is neither the sentinel nor JSON.
    fn handle_payload(&mut self, data: &str, out: &mut Vec<String>) -> bool {
        let payload = data.trim();
        if payload.is_empty() {
            return true;
        }
        if payload == DONE_SENTINEL {
            self.done = true;
            return true;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => {
                if let Some(delta) = value.pointer(&self.delta_pointer).and_then(Value::as_str) {
                    if !delta.is_empty() {
                        out.push(delta.to_string());
                    }
                }
                true
            }
            Err(_) => false,
        }
    }
}

/// Decides whether buffered body text is an event stream.
///
/// Only a `data:` or `event:` line marks an event stream. Blank, comment, `id:` and
/// `retry:` lines leave the decision open, as does an unterminated line that could still
/// grow into a field prefix (`"da"`) unless `at_end` is set. Any other line means raw text.
fn classify(text: &str, at_end: bool) -> Classification {
    let mut segments = text.split('\n').peekable();
    while let Some(segment) = segments.next() {
        let line = segment.trim_start().trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        if EVENT_FIELDS.iter().any(|field| line.starts_with(field)) {
            return Classification::EventStream;
        }
        if IGNORED_FIELDS.iter().any(|field| line.starts_with(field)) {
            continue;
        }
        let unterminated = segments.peek().is_none();
        let could_grow = EVENT_FIELDS
            .iter()
            .chain(IGNORED_FIELDS.iter())
            .any(|field| field.starts_with(line));
        if unterminated && could_grow && !at_end {
            return Classification::Pending;
        }
        return Classification::Raw;
    }
    if at_end {
        Classification::Raw
    } else {
        Classification::Pending
    }
}

/// Adapts a fallible byte stream into a stream of text deltas.
///
/// The output ends at `[DONE]`, at the end of the input, or after the first input error,
/// which is forwarded unchanged.
pub fn decode_stream<S, B, E>(stream: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    async_stream::stream! {
        let mut decoder = EventStreamDecoder::new();
        let mut stream = Box::pin(stream);

        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => {
                    for delta in decoder.push(bytes.as_ref()) {
                        yield Ok(delta);
                    }
                    if decoder.is_done() {
                        return;
                    }
                }
                Err(err) => {
                    yield Err(err);
                    return;
                }
            }
        }

        for delta in decoder.finish() {
            yield Ok(delta);
        }
    }
}
