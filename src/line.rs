//! Line framing over the raw byte stream.
//!
//! The modem emits CR/LF-delimited text with no further framing guarantee, so
//! every reply is collected one byte at a time into a fixed-capacity [`Line`].
//! A read is bounded by a byte budget that doubles as the implicit timeout:
//! when the budget runs out before a terminator shows up, the call still
//! hands back whatever was collected.

use crate::{error::Error, matcher, port::Transport};

/// Capacity of a reply buffer. Must fit a full SMS notification line.
pub const LINE_CAP: usize = 160;

/// A bounded, terminator-stripped line of modem output.
///
/// Overflowing bytes are dropped silently; the buffer never grows and never
/// corrupts neighbouring data.
#[derive(Clone)]
pub struct Line {
    buf: [u8; LINE_CAP],
    len: usize,
}

impl Line {
    pub fn new() -> Self {
        Line {
            buf: [0; LINE_CAP],
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends one byte, silently truncating at capacity.
    pub fn push(&mut self, byte: u8) {
        if self.len < LINE_CAP {
            self.buf[self.len] = byte;
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// UTF-8 view of the line; modem traffic is ASCII, anything else renders
    /// as an empty string and simply fails to classify.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).unwrap_or("")
    }

    pub fn contains(&self, token: &str) -> bool {
        matcher::contains(self.as_bytes(), token.as_bytes())
    }
}

impl Default for Line {
    fn default() -> Self {
        Line::new()
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Line({:?})", self.as_str())
    }
}

/// Reads one terminated line from the transport into `line`.
///
/// A CR or LF ends the line only once at least one byte has been accumulated,
/// so terminator runs between replies never surface as empty lines. At most
/// `budget` bytes are consumed per call; on exhaustion the partial line is
/// returned as-is - there is no distinct timeout failure.
pub fn read_into<T: Transport>(
    transport: &mut T,
    line: &mut Line,
    budget: usize,
) -> Result<(), Error> {
    line.clear();
    for _ in 0..budget {
        let byte = transport.read_byte()?;
        if byte == b'\r' || byte == b'\n' {
            if !line.is_empty() {
                return Ok(());
            }
        } else {
            line.push(byte);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;

    const BUDGET: usize = 150;

    #[test]
    fn reads_one_terminated_line() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n+CREG: 0,1\r\n");
        let mut line = Line::new();
        read_into(&mut transport, &mut line, BUDGET).unwrap();
        assert_eq!(line.as_str(), "+CREG: 0,1");
    }

    #[test]
    fn terminator_runs_do_not_surface_empty_lines() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n\r\n\r\nOK\r\n");
        let mut line = Line::new();
        read_into(&mut transport, &mut line, BUDGET).unwrap();
        assert_eq!(line.as_str(), "OK");
    }

    #[test]
    fn overflow_truncates_without_corruption() {
        let long = "A".repeat(400);
        let mut transport = MockTransport::new();
        transport.push_rx(&long);
        let mut line = Line::new();
        read_into(&mut transport, &mut line, 400).unwrap();
        assert!(line.len() <= LINE_CAP);
        assert!(line.as_bytes().iter().all(|&b| b == b'A'));
    }

    #[test]
    fn budget_exhaustion_returns_partial_line() {
        let mut transport = MockTransport::new();
        transport.push_rx(&"B".repeat(200));
        let mut line = Line::new();
        read_into(&mut transport, &mut line, BUDGET).unwrap();
        // no terminator was seen, the call still reports what it has
        assert_eq!(line.len(), BUDGET);
    }

    #[test]
    fn consecutive_reads_reuse_the_buffer() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\nFIRST LINE MUCH LONGER\r\nOK\r\n");
        let mut line = Line::new();
        read_into(&mut transport, &mut line, BUDGET).unwrap();
        assert_eq!(line.as_str(), "FIRST LINE MUCH LONGER");
        read_into(&mut transport, &mut line, BUDGET).unwrap();
        assert_eq!(line.as_str(), "OK");
    }
}
