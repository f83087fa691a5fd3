//! Scripted collaborators for the protocol tests.
//!
//! [`MockTransport`] records every write and answers through a programmable
//! responder closure, so multi-step conversations (registration backoff, fix
//! polling) can be scripted with plain counters. Unsolicited traffic that
//! must show up *during* a listen wait - after the engine has flushed stale
//! input - is queued with [`MockTransport::inject_after_polls`], keyed on the
//! cumulative count of empty input polls.

use crate::error::Error;
use crate::port::{Clock, Transport, WakeLine};
use crate::store::ContactStore;
use std::collections::VecDeque;
use std::time::Duration;

type Responder = Box<dyn FnMut(&str) -> Option<String>>;

pub struct MockTransport {
    pub sent: Vec<String>,
    rx: VecDeque<u8>,
    responder: Option<Responder>,
    injections: VecDeque<(u32, String)>,
    empty_polls: u32,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            sent: Vec::new(),
            rx: VecDeque::new(),
            responder: None,
            injections: VecDeque::new(),
            empty_polls: 0,
        }
    }

    pub fn with_responder(responder: impl FnMut(&str) -> Option<String> + 'static) -> Self {
        let mut transport = MockTransport::new();
        transport.responder = Some(Box::new(responder));
        transport
    }

    /// Queues bytes as immediately pending input.
    pub fn push_rx(&mut self, text: &str) {
        self.rx.extend(text.bytes());
    }

    /// Schedules `text` to appear once the engine has seen `polls` empty
    /// input checks in total. Models a URC arriving mid-wait.
    pub fn inject_after_polls(&mut self, polls: u32, text: &str) {
        self.injections.push_back((polls, text.to_string()));
    }

    pub fn has_pending(&self) -> bool {
        !self.rx.is_empty()
    }

    pub fn sent_joined(&self) -> String {
        self.sent.concat()
    }

    pub fn writes_containing(&self, needle: &str) -> usize {
        self.sent.iter().filter(|sent| sent.contains(needle)).count()
    }

    pub fn last_write(&self) -> String {
        self.sent.last().cloned().unwrap_or_default()
    }
}

impl Transport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let text = String::from_utf8_lossy(bytes).to_string();
        if let Some(responder) = self.responder.as_mut() {
            if let Some(reply) = responder(&text) {
                self.rx.extend(reply.bytes());
            }
        }
        self.sent.push(text);
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Error> {
        self.rx.pop_front().ok_or(Error::LinkClosed)
    }

    fn has_input(&mut self) -> Result<bool, Error> {
        if self.rx.is_empty() {
            self.empty_polls += 1;
            if let Some((threshold, _)) = self.injections.front() {
                if self.empty_polls >= *threshold {
                    let (_, text) = self.injections.pop_front().unwrap();
                    self.rx.extend(text.bytes());
                }
            }
        }
        Ok(!self.rx.is_empty())
    }
}

/// Clock that only records; simulated time passes instantly.
pub struct MockClock {
    pub sleeps: Vec<Duration>,
}

impl MockClock {
    pub fn new() -> Self {
        MockClock { sleeps: Vec::new() }
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.iter().sum()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.sleeps.iter().filter(|slept| **slept == duration).count()
    }
}

impl Clock for MockClock {
    fn sleep(&mut self, duration: Duration) {
        self.sleeps.push(duration);
    }
}

pub struct MockWakeLine {
    pub wake_count: u32,
    pub release_count: u32,
}

impl MockWakeLine {
    pub fn new() -> Self {
        MockWakeLine {
            wake_count: 0,
            release_count: 0,
        }
    }
}

impl WakeLine for MockWakeLine {
    fn wake(&mut self) {
        self.wake_count += 1;
    }

    fn release(&mut self) {
        self.release_count += 1;
    }
}

pub struct MemoryContactStore {
    pub contact: Option<String>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        MemoryContactStore { contact: None }
    }
}

impl ContactStore for MemoryContactStore {
    fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.contact.clone())
    }

    fn store(&mut self, msisdn: &str) -> Result<(), Error> {
        self.contact = Some(msisdn.to_string());
        Ok(())
    }
}
