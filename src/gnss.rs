//! GNSS fix acquisition.
//!
//! The engine cold-starts the GNSS receiver only at the first or last slot of
//! a reporting sequence; intermediate slots just re-poll, avoiding redundant
//! restarts. A fix check classifies the `+CGNSINF` status reply; on success
//! the detailed record is read again and the two coordinate fields are taken
//! verbatim as signed decimal-degree strings.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::matcher::GPS_FIXED;
use crate::modem::Modem;
use crate::port::{Clock, Transport, WakeLine};
use crate::GNSS_DATA_REGEX;

/// A resolved position. Coordinates stay strings end to end; they are only
/// parsed as degrees where the geofence needs arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    pub latitude: String,
    pub longitude: String,
}

/// Where an acquisition sits inside its reporting sequence.
#[derive(Debug, Clone, Copy)]
pub struct PollSlot {
    /// Power the receiver on and cold-start it before polling.
    pub cold_start: bool,
    /// Power the receiver off afterwards (never in guard mode).
    pub final_slot: bool,
    /// Guard mode: a single failed check aborts so the loop stays responsive
    /// to an inbound STOP.
    pub guard: bool,
}

pub fn power_on<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<(), Error> {
    modem.send("AT+CGNSPWR=1\r")?;
    modem.delay_secs(2);
    Ok(())
}

pub fn power_off<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<(), Error> {
    modem.send("AT+CGNSPWR=0\r")?;
    modem.delay_secs(1);
    Ok(())
}

pub fn cold_start<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<(), Error> {
    modem.send("AT+CGNSCOLD\r")?;
    modem.delay_secs(1);
    Ok(())
}

/// Tries to obtain a fix for this slot. `Ok(None)` means the retry budget ran
/// out - never an error, the caller's own loop decides what happens next.
pub fn acquire<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
    config: &TrackerConfig,
    slot: PollSlot,
) -> Result<Option<GpsFix>, Error> {
    modem.begin_op("acquiring GPS fix...");
    if slot.cold_start {
        modem.delay_secs(1);
        power_on(modem)?;
        cold_start(modem)?;
    } else {
        modem.delay_secs(1);
    }

    let attempts = if slot.guard { 1 } else { config.gps_fix_attempts };
    for _ in 0..attempts {
        if !slot.guard {
            modem.delay_secs(config.gps_poll_secs);
        }
        modem.send("AT+CGNSINF\r")?;
        if modem.read_line()?.contains(GPS_FIXED) {
            let fix = read_fix(modem)?;
            modem.delay_secs(2);
            if slot.final_slot && !slot.guard {
                power_off(modem)?;
            }
            return Ok(fix);
        }
    }

    modem.delay_secs(2);
    if slot.final_slot && !slot.guard {
        power_off(modem)?;
    }
    Ok(None)
}

/// Issues the detailed record read and extracts the coordinate fields.
fn read_fix<T: Transport, C: Clock, W: WakeLine>(
    modem: &mut Modem<T, C, W>,
) -> Result<Option<GpsFix>, Error> {
    modem.send("AT+CGNSINF\r")?;
    let line = modem.read_line()?;
    Ok(parse_fix(line.as_str()))
}

/// Skips the power-state, fix-state and timestamp fields; the next two are
/// latitude and longitude, copied verbatim.
pub(crate) fn parse_fix(reply: &str) -> Option<GpsFix> {
    let captured = GNSS_DATA_REGEX.captures(reply)?;
    let data: Vec<&str> = captured["data"].split(',').collect();
    let latitude = data.get(3)?.trim();
    let longitude = data.get(4)?.trim();
    if latitude.is_empty() || longitude.is_empty() {
        return None;
    }
    Some(GpsFix {
        latitude: latitude.to_string(),
        longitude: longitude.to_string(),
    })
}
