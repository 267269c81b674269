//! Progress protocol spoken by the batch worker.
//!
//! The worker writes `\r\n`-terminated lines to its standard output and
//! error streams:
//!
//! - a line starting with an ASCII digit is a progress report; its leading
//!   digits are the percentage (`"42"`, `"42%"` and `"42 done"` all mean 42)
//! - an empty line is ignored
//! - any other line is an error message
//!
//! Reads arrive in arbitrary chunks, so [`MessageParser`] holds a partial
//! trailing line until the rest of it (or end of stream) arrives.

/// Size of a single pipe read
pub const READ_CHUNK_SIZE: usize = 4096;

/// Line terminator of the worker protocol
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeMessage {
    /// Percent complete, clamped to `0..=100`.
    Progress(i32),
    Error(String),
}

/// Incremental line parser with residual buffering.
#[derive(Debug, Default)]
pub struct MessageParser {
    pending: Vec<u8>,
}

impl MessageParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes received but not yet parsed.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Append a chunk and parse every complete line in order.
    ///
    /// Parsing stops after the first error message; lines behind it stay
    /// buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<PipeMessage> {
        self.pending.extend_from_slice(bytes);
        self.parse_complete_lines()
    }

    /// End of stream: treat any unterminated remainder as a final line and
    /// parse everything still buffered.
    pub fn finish(&mut self) -> Vec<PipeMessage> {
        if !self.pending.is_empty() && !self.pending.ends_with(LINE_TERMINATOR) {
            self.pending.extend_from_slice(LINE_TERMINATOR);
        }

        let mut messages = Vec::new();
        while !self.pending.is_empty() {
            let batch = self.parse_complete_lines();
            if batch.is_empty() {
                break;
            }
            messages.extend(batch);
        }
        self.pending.clear();
        messages
    }

    fn parse_complete_lines(&mut self) -> Vec<PipeMessage> {
        let mut messages = Vec::new();
        let mut consumed = 0;

        while let Some(end) = find_terminator(&self.pending[consumed..]) {
            let line = &self.pending[consumed..consumed + end];
            consumed += end + LINE_TERMINATOR.len();

            match parse_line(line) {
                Some(PipeMessage::Error(text)) => {
                    messages.push(PipeMessage::Error(text));
                    break;
                }
                Some(message) => messages.push(message),
                None => {}
            }
        }

        self.pending.drain(..consumed);
        messages
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(LINE_TERMINATOR.len())
        .position(|window| window == LINE_TERMINATOR)
}

/// Parse one line without its terminator.
pub fn parse_line(line: &[u8]) -> Option<PipeMessage> {
    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with(|c: char| c.is_ascii_digit()) {
        Some(PipeMessage::Progress(leading_integer(text)))
    } else {
        Some(PipeMessage::Error(text.to_string()))
    }
}

/// Value of the leading run of ASCII digits, saturating at 100.
fn leading_integer(text: &str) -> i32 {
    text.bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i32, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i32::from(digit - b'0'))
        })
        .min(100)
}

/// Format a progress line as the worker writes it.
pub fn progress_line(percent: i32) -> String {
    format!("{}\r\n", percent.clamp(0, 100))
}

/// Format an error line as the worker writes it. The text is prefixed so
/// that it can never be mistaken for a progress report.
pub fn error_line(message: &str) -> String {
    let single_line = message.replace(['\r', '\n'], " ");
    format!("Error: {}\r\n", single_line)
}
