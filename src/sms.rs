//! SMS interpretation and composition.
//!
//! An incoming SMS shows up as a `+CMT:` notification line with the sender
//! MSISDN in quotes, followed by the body on its own line. The body is read
//! first - the serial stream will not wait for envelope parsing. Keywords are
//! tested independently and non-exclusively, in the original dispatch order:
//! a body carrying two keywords triggers both branches, and the last mode
//! assignment wins. Unmatched bodies cause no state change and no reply.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::gnss;
use crate::modem::Modem;
use crate::port::{Clock, Transport, WakeLine};
use crate::store::ContactStore;
use crate::tracker::SessionMode;
use crate::SMS_SENDER_REGEX;

/// Longest MSISDN kept; anything beyond is truncated.
pub const MSISDN_MAX: usize = 19;

const ACK_SINGLE: &str =
    "SINGLE MEASUREMENT IN PROGRESS... PLEASE WAIT 7-8 MINUTES BEFORE NEXT COMMAND\n";
const ACK_MULTI: &str =
    "MULTIPLE MEASUREMENTS IN PROGRESS.. PLEASE WAIT 25 MINUTES BEFORE NEXT COMMAND\n";
const ACK_ACTIVATED: &str = "ACTIVATED ALERTS TO ";
const ACK_GUARD: &str = "GUARD MODE ACTIVATED.. PLEASE WAIT 5 MINUTES BEFORE NEXT COMMAND\n";
pub(crate) const ACK_STOP: &str = "GUARD MODE STOPPED";
pub(crate) const ALERT_PREFIX: &str = "ALERT, POSITION CHANGED TO :  ";
pub(crate) const MAPS_URL: &str = "\r\n http://maps.google.com/maps?q=";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Multi,
    Single,
    Activate,
    Guard,
    Stop,
}

/// One inbound message, consumed once per dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsMessage {
    pub sender: String,
    pub body: String,
}

/// Reads the body line and lifts the sender out of the envelope already held
/// in the response buffer. A notification without a quoted sender is dropped.
pub fn read_incoming<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<Option<SmsMessage>, Error> {
    modem.read_sms_body()?;
    let sender = match SMS_SENDER_REGEX.captures(modem.response().as_str()) {
        Some(captured) => {
            let mut msisdn = captured["msisdn"].to_string();
            msisdn.truncate(MSISDN_MAX);
            msisdn
        }
        None => return Ok(None),
    };
    Ok(Some(SmsMessage {
        sender,
        body: modem.body().as_str().to_string(),
    }))
}

/// The keywords present in a body, tested case-insensitively and
/// independently. STOP is deliberately absent: it is only honoured inside
/// the guard listen window.
pub fn commands_in(body: &str) -> Vec<Command> {
    let upper = body.to_uppercase();
    let mut found = Vec::new();
    for (token, command) in [
        ("MULTI", Command::Multi),
        ("SINGLE", Command::Single),
        ("ACTIVATE", Command::Activate),
        ("GUARD", Command::Guard),
    ] {
        if upper.contains(token) {
            found.push(command);
        }
    }
    found
}

pub fn is_stop(body: &str) -> bool {
    body.to_uppercase().contains("STOP")
}

/// Acts on every keyword of a message: wake the modem, acknowledge to the
/// sender, purge stored messages, then yield the mode change. ACTIVATE also
/// persists the sender as the authorized contact and leaves the mode alone.
pub fn dispatch<T: Transport, C: Clock, W: WakeLine, S: ContactStore>(
    modem: &mut Modem<T, C, W>,
    store: &mut S,
    config: &TrackerConfig,
    message: &SmsMessage,
) -> Result<Option<SessionMode>, Error> {
    let mut new_mode = None;
    for command in commands_in(&message.body) {
        modem.begin_op(&format!("SMS command {command:?} from {}", message.sender));
        modem.wake_up()?;
        match command {
            Command::Multi => {
                send(modem, &message.sender, &[ACK_MULTI])?;
                purge(modem)?;
                new_mode = Some(SessionMode::MultiShot(config.multi_count));
            }
            Command::Single => {
                send(modem, &message.sender, &[ACK_SINGLE])?;
                purge(modem)?;
                new_mode = Some(SessionMode::SingleShot(1));
            }
            Command::Activate => {
                store.store(&message.sender)?;
                send(modem, &message.sender, &[ACK_ACTIVATED, &message.sender])?;
                purge(modem)?;
            }
            Command::Guard => {
                send(modem, &message.sender, &[ACK_GUARD])?;
                purge(modem)?;
                // guard polls continuously, so the receiver starts now
                gnss::power_on(modem)?;
                gnss::cold_start(modem)?;
                new_mode = Some(SessionMode::Guard);
            }
            Command::Stop => {}
        }
    }
    Ok(new_mode)
}

/// Composes and sends one text-mode SMS: begin-compose with the destination,
/// the body fragments, then the single control byte that fires it off.
pub fn send<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    recipient: &str,
    fragments: &[&str],
) -> Result<(), Error> {
    modem.send("AT+CMGF=1\r")?;
    modem.delay_secs(1);
    let compose = format!("AT+CMGS=\"{recipient}\"\r");
    modem.send(&compose)?;
    modem.delay_secs(1);
    for fragment in fragments {
        modem.send(fragment)?;
    }
    modem.send_raw(&[0x1A])?;
    modem.delay_secs(10);
    Ok(())
}

/// Deletes stored messages so the modem memory never fills up.
pub fn purge<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<(), Error> {
    modem.send("AT+CMGF=1\r")?;
    modem.delay_secs(1);
    modem.send("AT+CMGD=4\r")?;
    modem.delay_secs(2);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryContactStore, MockClock, MockTransport, MockWakeLine};

    fn modem(transport: MockTransport) -> Modem<MockTransport, MockClock, MockWakeLine> {
        Modem::new(transport, MockClock::new(), MockWakeLine::new(), 150)
    }

    fn message(sender: &str, body: &str) -> SmsMessage {
        SmsMessage {
            sender: sender.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn keywords_match_any_case() {
        assert_eq!(commands_in("single"), vec![Command::Single]);
        assert_eq!(commands_in("Guard please"), vec![Command::Guard]);
        assert!(commands_in("position?").is_empty());
    }

    #[test]
    fn keyword_matching_is_independent_not_exclusive() {
        assert_eq!(
            commands_in("MULTI then GUARD"),
            vec![Command::Multi, Command::Guard]
        );
    }

    #[test]
    fn stop_is_recognized_only_by_its_own_check() {
        assert!(commands_in("STOP").is_empty());
        assert!(is_stop("please stop"));
    }

    #[test]
    fn envelope_parsing_takes_the_quoted_sender() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n+CMT: \"+15550001\",\"\",\"26/08/28,10:00:00\"\r\nSINGLE\r\n");
        let mut modem = modem(transport);
        modem.read_line().unwrap();
        let message = read_incoming(&mut modem).unwrap().unwrap();
        assert_eq!(message.sender, "+15550001");
        assert_eq!(message.body, "SINGLE");
    }

    #[test]
    fn oversized_sender_is_truncated_to_nineteen_chars() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n+CMT: \"+123456789012345678901234\",\"\",\"t\"\r\nACTIVATE\r\n");
        let mut modem = modem(transport);
        modem.read_line().unwrap();
        let message = read_incoming(&mut modem).unwrap().unwrap();
        assert_eq!(message.sender, "+123456789012345678");
        assert_eq!(message.sender.len(), MSISDN_MAX);
    }

    #[test]
    fn notification_without_quoted_sender_is_dropped() {
        let mut transport = MockTransport::new();
        transport.push_rx("\r\n+CMT: garbled\r\nSINGLE\r\n");
        let mut modem = modem(transport);
        modem.read_line().unwrap();
        assert!(read_incoming(&mut modem).unwrap().is_none());
    }

    #[test]
    fn single_sets_single_shot_and_sends_exactly_one_ack() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "single"),
        )
        .unwrap();
        assert_eq!(mode, Some(SessionMode::SingleShot(1)));
        assert_eq!(modem.transport_ref().writes_containing("AT+CMGS"), 1);
        assert!(modem
            .transport_ref()
            .sent_joined()
            .contains("AT+CMGS=\"+15550001\""));
    }

    #[test]
    fn multi_sets_the_configured_count() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "MULTI"),
        )
        .unwrap();
        assert_eq!(mode, Some(SessionMode::MultiShot(5)));
    }

    #[test]
    fn activate_persists_the_exact_sender_and_keeps_the_mode() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "activate"),
        )
        .unwrap();
        assert_eq!(mode, None);
        assert_eq!(store.contact.as_deref(), Some("+15550001"));
        assert_eq!(modem.transport_ref().writes_containing("AT+CMGS"), 1);
    }

    #[test]
    fn guard_powers_the_receiver_and_cold_starts_it() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "GUARD"),
        )
        .unwrap();
        assert_eq!(mode, Some(SessionMode::Guard));
        assert_eq!(modem.transport_ref().writes_containing("AT+CGNSPWR=1"), 1);
        assert_eq!(modem.transport_ref().writes_containing("AT+CGNSCOLD"), 1);
    }

    #[test]
    fn unmatched_body_changes_nothing_and_stays_silent() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "hello there"),
        )
        .unwrap();
        assert_eq!(mode, None);
        assert!(store.contact.is_none());
        assert_eq!(modem.transport_ref().writes_containing("AT+CMGS"), 0);
    }

    #[test]
    fn two_keywords_trigger_both_branches() {
        let mut modem = modem(MockTransport::new());
        let mut store = MemoryContactStore::new();
        let mode = dispatch(
            &mut modem,
            &mut store,
            &TrackerConfig::default(),
            &message("+15550001", "SINGLE GUARD"),
        )
        .unwrap();
        // both acks go out; the later assignment wins the mode
        assert_eq!(modem.transport_ref().writes_containing("AT+CMGS"), 2);
        assert_eq!(mode, Some(SessionMode::Guard));
    }
}
