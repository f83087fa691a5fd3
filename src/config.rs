//! Tracker configuration.
//!
//! Every retry bound, interval and threshold the state machines use lives
//! here as plain data, so the power/backoff policy is inspectable and the
//! loops are testable without editing code. Defaults mirror the field-proven
//! values for a battery-powered SIM7000 install.

use crate::error::Error;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// SIM PIN submitted when the card asks for one.
    pub pin_code: String,
    /// Byte budget of a single line read; doubles as its implicit timeout.
    pub line_budget: usize,
    /// Backoff between `AT` probes while waiting for the modem to boot.
    pub probe_interval_secs: u64,
    /// Poll spacing of the PIN status loop.
    pub pin_poll_secs: u64,
    /// Registration cycles before giving up for this round (24 * 30 min ~ 12 h).
    pub registration_cycles: u32,
    /// Network search time granted per registration cycle.
    pub registration_wait_secs: u64,
    /// Radio-off sleep between failed registration cycles.
    pub offline_sleep_mins: u64,
    /// Fix-status checks per acquisition outside guard mode.
    pub gps_fix_attempts: u32,
    /// Spacing between fix-status checks.
    pub gps_poll_secs: u64,
    /// Position reports in a MULTI sequence.
    pub multi_count: u8,
    /// Gap between consecutive reports of a finite sequence.
    pub report_gap_secs: u64,
    /// Settle delay after the last report, before returning to idle.
    pub settle_secs: u64,
    /// Silence span in idle after which coverage is re-verified.
    pub idle_watchdog_secs: u64,
    /// Listen window for an inbound STOP per guard iteration.
    pub stop_window_secs: u64,
    /// Movement threshold in decimal degrees (0.0027 is roughly 300 m).
    pub guard_threshold_deg: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            pin_code: "1111".to_string(),
            line_budget: 150,
            probe_interval_secs: 1,
            pin_poll_secs: 2,
            registration_cycles: 24,
            registration_wait_secs: 120,
            offline_sleep_mins: 30,
            gps_fix_attempts: 20,
            gps_poll_secs: 15,
            multi_count: 5,
            report_gap_secs: 180,
            settle_secs: 10,
            idle_watchdog_secs: 900,
            stop_window_secs: 60,
            guard_threshold_deg: 0.0027,
        }
    }
}

impl TrackerConfig {
    /// Loads a JSON config; absent keys fall back to the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}
