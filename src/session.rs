//! Network bring-up state machine.
//!
//! Strictly ordered stages, each retried on its own: probe the modem until it
//! answers, switch echo off and lock the port settings, clear the SIM PIN,
//! then chase network registration with a power-saving backoff. Registration
//! search is the power-expensive part, so failed cycles are slept through in
//! long radio-off intervals instead of busy-polled; giving up here is a value,
//! not an error - the idle loop will simply try again later.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::matcher::{AT_ECHO, OK, PIN_READY, PIN_REQUIRED, REGISTERED_HOME, REGISTERED_ROAMING};
use crate::modem::Modem;
use crate::port::{Clock, Transport, WakeLine};
use crate::BATTERY_REGEX;

/// Full bring-up as performed once at power-on. Registration failure is
/// deferred, not fatal.
pub fn establish<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    config: &TrackerConfig,
) -> Result<(), Error> {
    modem.begin_op("bringing the modem up...");
    probe(modem, config)?;
    configure(modem)?;
    ensure_pin(modem, config)?;
    crate::sms::purge(modem)?;
    if !ensure_registration(modem, config)? {
        log::warn!("no network registration yet - will retry from the idle loop");
    }
    Ok(())
}

/// Sends `AT` until the modem answers with `OK` or an echoed probe.
/// Unbounded: the device is assumed to eventually respond.
pub fn probe<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    config: &TrackerConfig,
) -> Result<(), Error> {
    loop {
        modem.send("AT\r")?;
        let line = modem.read_line()?;
        if line.contains(OK) || line.contains(AT_ECHO) {
            return Ok(());
        }
        modem.delay_secs(config.probe_interval_secs);
    }
}

/// One-shot port setup, deliberately unverified: echo off, fixed UART rate,
/// +CREG unsolicited reports off, profile saved.
fn configure<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<(), Error> {
    modem.delay_secs(1);
    modem.send("ATE0\r")?;
    modem.delay_secs(1);
    modem.send("AT+IPR=9600\r")?;
    modem.delay_secs(1);
    modem.send("AT+CREG=0\r")?;
    modem.delay_secs(1);
    modem.send("AT&W\r")?;
    modem.delay_secs(3);
    Ok(())
}

/// Polls PIN status until the card reports ready, entering the configured
/// PIN whenever it is asked for.
pub fn ensure_pin<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    config: &TrackerConfig,
) -> Result<(), Error> {
    loop {
        modem.delay_secs(config.pin_poll_secs);
        modem.send("AT+CPIN?\r")?;
        let line = modem.read_line()?;
        if line.contains(PIN_READY) {
            return Ok(());
        }
        if line.contains(PIN_REQUIRED) {
            modem.delay_secs(1);
            let unlock = format!("AT+CPIN=\"{}\"\r", config.pin_code);
            modem.send(&unlock)?;
            modem.delay_secs(1);
        }
    }
}

/// Chases network registration. Returns `Ok(true)` once registered (home or
/// roaming), `Ok(false)` after the full backoff budget - the caller retries
/// on its next idle cycle.
pub fn ensure_registration<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    config: &TrackerConfig,
) -> Result<bool, Error> {
    modem.begin_op("verifying network registration...");
    modem.delay_secs(1);
    modem.send("AT+CREG?\r")?;
    if is_registered(modem.read_line()?) {
        return Ok(true);
    }

    // not on the network - make sure the radio is up, then search in cycles
    modem.delay_secs(1);
    modem.send("AT+CFUN=1\r")?;
    for _ in 0..config.registration_cycles {
        modem.delay_secs(config.registration_wait_secs);
        modem.send("AT+CREG?\r")?;
        if is_registered(modem.read_line()?) {
            return Ok(true);
        }

        // still nothing, likely an underground garage: radio and GPS off,
        // modem asleep, and a long pause before the next search
        modem.delay_secs(1);
        modem.send("AT+CFUN=4\r")?;
        modem.delay_secs(1);
        crate::gnss::power_off(modem)?;
        modem.sleep_on()?;
        for _ in 0..config.offline_sleep_mins {
            modem.delay_secs(60);
        }
        modem.wake_up()?;
        modem.send("AT+CFUN=1\r")?;
    }
    Ok(false)
}

fn is_registered(line: &crate::line::Line) -> bool {
    line.contains(REGISTERED_HOME) || line.contains(REGISTERED_ROAMING)
}

/// Battery voltage in millivolts, the third comma field of the `+CBC` reply.
pub fn read_battery<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<Option<String>, Error> {
    modem.delay_secs(1);
    modem.send("AT+CBC\r")?;
    let line = modem.read_line()?;
    Ok(BATTERY_REGEX
        .captures(line.as_str())
        .map(|captured| captured["millivolts"].to_string()))
}
