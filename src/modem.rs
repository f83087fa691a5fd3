//! Shared link layer.
//!
//! One [`Modem`] owns the transport, the delay clock and the wake line, plus
//! the two scratch buffers every component classifies against: the generic
//! response line and the SMS body line. Components borrow the modem
//! exclusively, so there is never more than one in-flight exchange and every
//! buffer has a single writer by total program order.
//!
//! Each logical exchange is tagged with a short operation id so interleaved
//! retry loops stay readable in the logs.

use crate::error::Error;
use crate::line::{self, Line};
use crate::port::{Clock, Transport, WakeLine};
use colored::Colorize;
use std::time::Duration;
use uuid::Uuid;

fn debug_log(op_id: &Uuid, msg: &str) {
    log::debug!("{} - {msg}", format!("[{op_id}]").yellow())
}

fn info_log(op_id: &Uuid, msg: &str) {
    log::info!("{} - {msg}", format!("[{op_id}]").yellow())
}

pub struct Modem<T: Transport, C: Clock, W: WakeLine> {
    transport: T,
    clock: C,
    wake_line: W,
    response: Line,
    body: Line,
    line_budget: usize,
    op: Uuid,
}

impl<T: Transport, C: Clock, W: WakeLine> Modem<T, C, W> {
    pub fn new(transport: T, clock: C, wake_line: W, line_budget: usize) -> Self {
        Modem {
            transport,
            clock,
            wake_line,
            response: Line::new(),
            body: Line::new(),
            line_budget,
            op: Uuid::new_v4(),
        }
    }

    /// Starts a new logged exchange; subsequent TX/RX lines carry its id.
    pub fn begin_op(&mut self, msg: &str) {
        self.op = Uuid::new_v4();
        info_log(&self.op, msg);
    }

    pub fn send(&mut self, cmd: &str) -> Result<(), Error> {
        debug_log(&self.op, &format!("TX: {}", cmd.trim_end()));
        self.transport.write(cmd.as_bytes())
    }

    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<(), Error> {
        debug_log(&self.op, &format!("TX raw: {bytes:?}"));
        self.transport.write(bytes)
    }

    /// Reads the next terminated line into the response buffer.
    pub fn read_line(&mut self) -> Result<&Line, Error> {
        line::read_into(&mut self.transport, &mut self.response, self.line_budget)?;
        debug_log(&self.op, &format!("RX: {}", self.response.as_str()));
        Ok(&self.response)
    }

    /// Reads the body of an incoming SMS into its own buffer, so the body
    /// cannot disturb the envelope still held in the response buffer.
    pub fn read_sms_body(&mut self) -> Result<&Line, Error> {
        line::read_into(&mut self.transport, &mut self.body, self.line_budget)?;
        debug_log(&self.op, &format!("RX body: {}", self.body.as_str()));
        Ok(&self.body)
    }

    pub fn response(&self) -> &Line {
        &self.response
    }

    pub fn body(&self) -> &Line {
        &self.body
    }

    /// Discards any stale unread bytes so leftovers are never misclassified
    /// as a fresh event.
    pub fn flush_input(&mut self) -> Result<(), Error> {
        while self.transport.has_input()? {
            self.transport.read_byte()?;
        }
        Ok(())
    }

    /// Polls for inbound traffic in small steps until a byte shows up or the
    /// window lapses. The pending byte is left on the transport.
    pub fn wait_for_traffic(&mut self, window: Duration) -> Result<bool, Error> {
        const STEP: Duration = Duration::from_millis(50);
        let mut waited = Duration::ZERO;
        while waited < window {
            if self.transport.has_input()? {
                return Ok(true);
            }
            self.clock.sleep(STEP);
            waited += STEP;
        }
        Ok(false)
    }

    pub fn delay_secs(&mut self, secs: u64) {
        self.clock.sleep(Duration::from_secs(secs));
    }

    /// Brings the modem out of software sleep: hold DTR low, poke it with a
    /// dummy command, disable sleep mode, then release the line.
    pub fn wake_up(&mut self) -> Result<(), Error> {
        debug_log(&self.op, "waking the modem");
        self.wake_line.wake();
        self.send("AT\r")?;
        self.delay_secs(1);
        self.send("AT+CSCLK=0\r")?;
        self.delay_secs(1);
        self.wake_line.release();
        self.delay_secs(1);
        Ok(())
    }

    /// Re-arms software sleep; the modem dozes off once the line is quiet.
    pub fn sleep_on(&mut self) -> Result<(), Error> {
        debug_log(&self.op, "letting the modem sleep");
        self.send("AT+CSCLK=1\r")?;
        self.delay_secs(2);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn transport_ref(&self) -> &T {
        &self.transport
    }

    #[cfg(test)]
    pub(crate) fn clock_ref(&self) -> &C {
        &self.clock
    }

    #[cfg(test)]
    pub(crate) fn wake_line_ref(&self) -> &W {
        &self.wake_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClock, MockTransport, MockWakeLine};

    fn modem(transport: MockTransport) -> Modem<MockTransport, MockClock, MockWakeLine> {
        Modem::new(transport, MockClock::new(), MockWakeLine::new(), 150)
    }

    #[test]
    fn flush_discards_stale_bytes() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\nstale OK\r\n");
        let mut modem = modem(transport);
        modem.flush_input().unwrap();
        assert!(!modem.transport_ref().has_pending());
    }

    #[test]
    fn body_read_leaves_the_response_buffer_alone() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n+CMT: \"+15550001\",\"\",\"26/08/28\"\r\nGUARD\r\n");
        let mut modem = modem(transport);
        modem.read_line().unwrap();
        modem.read_sms_body().unwrap();
        assert!(modem.response().contains("+CMT:"));
        assert_eq!(modem.body().as_str(), "GUARD");
    }

    #[test]
    fn wait_for_traffic_respects_the_window() {
        let transport = MockTransport::new();
        let mut modem = modem(transport);
        let seen = modem.wait_for_traffic(Duration::from_secs(1)).unwrap();
        assert!(!seen);
        assert!(modem.clock_ref().total_slept() >= Duration::from_secs(1));
    }

    #[test]
    fn wake_sequence_toggles_the_line_and_disables_sleep() {
        let mut modem = modem(MockTransport::new());
        modem.wake_up().unwrap();
        assert_eq!(modem.transport_ref().writes_containing("AT+CSCLK=0"), 1);
        assert_eq!(modem.wake_line_ref().wake_count, 1);
        assert_eq!(modem.wake_line_ref().release_count, 1);
    }
}
