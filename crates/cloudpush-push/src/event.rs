//! Server-sent event frames written on the push response stream.
//!
//! ```text
//! event: keepalive
//! data:
//!
//! event: nack
//! data: first line
//! data: second line
//!
//! ```

use bytes::Bytes;

/// One event on the push response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// The callback is still running.
    Keepalive,
    /// The callback succeeded.
    Ack,
    /// The callback failed with this text.
    Nack(String),
}

impl SseEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SseEvent::Keepalive => "keepalive",
            SseEvent::Ack => "ack",
            SseEvent::Nack(_) => "nack",
        }
    }

    pub fn data(&self) -> &str {
        match self {
            SseEvent::Nack(text) => text,
            SseEvent::Keepalive | SseEvent::Ack => "",
        }
    }

    /// Whether this event ends the delivery.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SseEvent::Keepalive)
    }

    /// Render the frame.
    ///
    /// Every line of the data gets its own `data:` field, so a line break in
    /// the text can never end the frame early or inject a field.
    pub fn encode(&self) -> Bytes {
        let mut frame = format!("event: {}\n", self.name());
        let data = self.data().replace("\r\n", "\n").replace('\r', "\n");
        for line in data.split('\n') {
            frame.push_str("data: ");
            frame.push_str(line);
            frame.push('\n');
        }
        frame.push('\n');
        Bytes::from(frame)
    }

    /// Decode a stream of frames, e.g. a whole response body.
    ///
    /// Multiple `data:` lines are joined with `\n`. Frames with an unknown
    /// event name are skipped; a trailing partial frame is ignored.
    pub fn decode_all(text: &str) -> Vec<SseEvent> {
        let text = text.replace("\r\n", "\n");
        let mut events = Vec::new();

        let mut frames: Vec<&str> = text.split("\n\n").collect();
        // The piece after the last blank line is incomplete.
        frames.pop();

        for frame in frames {
            let mut name = None;
            let mut data: Vec<&str> = Vec::new();
            for line in frame.lines() {
                if let Some(value) = field(line, "event") {
                    name = Some(value);
                } else if let Some(value) = field(line, "data") {
                    data.push(value);
                }
            }
            let event = match name {
                Some("keepalive") => SseEvent::Keepalive,
                Some("ack") => SseEvent::Ack,
                Some("nack") => SseEvent::Nack(data.join("\n")),
                _ => continue,
            };
            events.push(event);
        }

        events
    }
}

fn field<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let value = line.strip_prefix(name)?.strip_prefix(':')?;
    Some(value.strip_prefix(' ').unwrap_or(value))
}
