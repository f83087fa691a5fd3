//! Top-level mode controller.
//!
//! The tracker alternates between two phases: a low-power idle listen where
//! the modem sleeps with SMS delivery armed, and a polling phase entered when
//! a command SMS switches the mode. Finite modes report a fixed number of
//! positions and fall back to idle; guard mode polls until it sees movement
//! or an inbound STOP. Replies always go to the sender of the most recent
//! parsed command, seeded from the persisted contact at startup.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::gnss::{self, GpsFix, PollSlot};
use crate::guard::GeofenceMonitor;
use crate::matcher::SMS_URC;
use crate::modem::Modem;
use crate::port::{Clock, Transport, WakeLine};
use crate::sms;
use crate::store::ContactStore;
use crate::LogLevelFilter;
use simple_logger::SimpleLogger;
use std::time::Duration;

/// What the tracker is currently doing. The finite variants carry their
/// remaining report count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    SingleShot(u8),
    MultiShot(u8),
    Guard,
}

impl SessionMode {
    pub fn is_idle(&self) -> bool {
        matches!(self, SessionMode::Idle)
    }
}

pub struct Tracker<T: Transport, C: Clock, W: WakeLine, S: ContactStore> {
    modem: Modem<T, C, W>,
    store: S,
    monitor: GeofenceMonitor,
    mode: SessionMode,
    reply_to: Option<String>,
    config: TrackerConfig,
}

impl<T: Transport, C: Clock, W: WakeLine, S: ContactStore> Tracker<T, C, W, S> {
    pub fn new(
        transport: T,
        clock: C,
        wake_line: W,
        store: S,
        config: TrackerConfig,
        log_level: LogLevelFilter,
    ) -> Result<Self, Error> {
        match log_level {
            LogLevelFilter::Off => (),
            _ => SimpleLogger::new()
                .with_level(log_level)
                .init()
                .expect("Problems with initialising the logger."),
        }

        let reply_to = store.load()?;
        let modem = Modem::new(transport, clock, wake_line, config.line_budget);
        let monitor = GeofenceMonitor::new(config.guard_threshold_deg);
        Ok(Tracker {
            modem,
            store,
            monitor,
            mode: SessionMode::Idle,
            reply_to,
            config,
        })
    }

    /// Brings the modem up once, then alternates between listening and
    /// polling forever.
    pub fn run(&mut self) -> Result<(), Error> {
        crate::session::establish(&mut self.modem, &self.config)?;
        loop {
            self.idle_listen()?;
            self.poll_loop()?;
        }
    }

    /// Sleeps with SMS delivery armed until a command switches the mode.
    /// Non-SMS traffic is treated as a possible modem restart and answered
    /// with a fresh link verification; prolonged silence triggers a coverage
    /// check so a dead network is not slept through indefinitely.
    fn idle_listen(&mut self) -> Result<(), Error> {
        loop {
            self.modem.begin_op("idle: arming SMS delivery, going to sleep");
            self.modem.send("AT+CMGF=1\r")?;
            self.modem.delay_secs(1);
            self.modem.send("AT+CNMI=1,2,0,0,0\r")?;
            self.modem.delay_secs(1);
            gnss::power_off(&mut self.modem)?;
            self.modem.sleep_on()?;
            self.modem.flush_input()?;

            let window = Duration::from_secs(self.config.idle_watchdog_secs);
            if !self.modem.wait_for_traffic(window)? {
                self.modem.begin_op("idle watchdog: verifying coverage");
                self.modem.wake_up()?;
                crate::session::ensure_registration(&mut self.modem, &self.config)?;
                continue;
            }

            let line = self.modem.read_line()?;
            if line.contains(SMS_URC) {
                if let Some(message) = sms::read_incoming(&mut self.modem)? {
                    self.reply_to = Some(message.sender.clone());
                    if let Some(mode) =
                        sms::dispatch(&mut self.modem, &mut self.store, &self.config, &message)?
                    {
                        self.mode = mode;
                        return Ok(());
                    }
                }
            } else {
                // anything else here is most likely a restart banner
                self.modem.begin_op("unexpected idle traffic, verifying the link");
                self.modem.wake_up()?;
                crate::session::ensure_pin(&mut self.modem, &self.config)?;
                crate::session::ensure_registration(&mut self.modem, &self.config)?;
                sms::purge(&mut self.modem)?;
            }
        }
    }

    /// Runs the active mode to completion. Every acquired fix feeds the
    /// geofence baseline regardless of mode, so a later GUARD starts from a
    /// current position.
    fn poll_loop(&mut self) -> Result<(), Error> {
        let initial = match self.mode {
            SessionMode::SingleShot(count) | SessionMode::MultiShot(count) => count,
            SessionMode::Guard => 0,
            SessionMode::Idle => return Ok(()),
        };

        loop {
            let slot = self.poll_slot(initial);
            let fix = gnss::acquire(&mut self.modem, &self.config, slot)?;
            let moved = match fix.as_ref() {
                Some(fix) => self.monitor.observe(fix),
                None => false,
            };

            match self.mode {
                SessionMode::Guard => {
                    if moved {
                        if let Some(fix) = fix.as_ref() {
                            self.send_alert(fix)?;
                        }
                        self.mode = SessionMode::Idle;
                        return Ok(());
                    }
                    self.guard_stop_window()?;
                    if self.mode.is_idle() {
                        return Ok(());
                    }
                }
                SessionMode::SingleShot(remaining) | SessionMode::MultiShot(remaining) => {
                    if let Some(fix) = fix.as_ref() {
                        self.send_position(fix)?;
                    }
                    // a fixless slot still consumes its report
                    let remaining = remaining - 1;
                    if remaining == 0 {
                        self.modem.delay_secs(self.config.settle_secs);
                        self.mode = SessionMode::Idle;
                        return Ok(());
                    }
                    self.mode = match self.mode {
                        SessionMode::SingleShot(_) => SessionMode::SingleShot(remaining),
                        _ => SessionMode::MultiShot(remaining),
                    };
                    self.modem.delay_secs(self.config.report_gap_secs);
                }
                SessionMode::Idle => return Ok(()),
            }
        }
    }

    /// The receiver is cold-started on the first and last slot of a finite
    /// sequence and powered off after the last. Guard slots never touch
    /// receiver power; dispatch started it and STOP shuts it down.
    fn poll_slot(&self, initial: u8) -> PollSlot {
        match self.mode {
            SessionMode::Guard => PollSlot {
                cold_start: false,
                final_slot: false,
                guard: true,
            },
            SessionMode::SingleShot(remaining) | SessionMode::MultiShot(remaining) => PollSlot {
                cold_start: remaining == initial || remaining == 1,
                final_slot: remaining == 1,
                guard: false,
            },
            SessionMode::Idle => PollSlot {
                cold_start: false,
                final_slot: false,
                guard: false,
            },
        }
    }

    fn send_position(&mut self, fix: &GpsFix) -> Result<(), Error> {
        let recipient = match self.reply_to.clone() {
            Some(recipient) => recipient,
            None => return Ok(()),
        };
        self.modem.begin_op(&format!("reporting position to {recipient}"));
        let battery = crate::session::read_battery(&mut self.modem)?.unwrap_or_default();
        sms::send(
            &mut self.modem,
            &recipient,
            &[
                " LONGITUDE=",
                &fix.longitude,
                " LATITUDE=",
                &fix.latitude,
                "\nBATTERY[mV]=",
                &battery,
                sms::MAPS_URL,
                &fix.latitude,
                ",",
                &fix.longitude,
                "\r\n",
            ],
        )?;
        Ok(())
    }

    fn send_alert(&mut self, fix: &GpsFix) -> Result<(), Error> {
        if let Some(recipient) = self.reply_to.clone() {
            self.modem.begin_op(&format!("movement alert to {recipient}"));
            sms::send(
                &mut self.modem,
                &recipient,
                &[
                    sms::ALERT_PREFIX,
                    sms::MAPS_URL,
                    &fix.latitude,
                    ",",
                    &fix.longitude,
                    "\r\n",
                ],
            )?;
            self.modem.delay_secs(self.config.settle_secs);
        }
        gnss::power_off(&mut self.modem)?;
        sms::purge(&mut self.modem)?;
        Ok(())
    }

    /// Listens between guard polls so an owner can call the dog off. Only a
    /// STOP body ends guard mode; other messages merely retarget replies.
    fn guard_stop_window(&mut self) -> Result<(), Error> {
        self.modem.delay_secs(1);
        self.modem.flush_input()?;
        let window = Duration::from_secs(self.config.stop_window_secs);
        if !self.modem.wait_for_traffic(window)? {
            return Ok(());
        }
        let line = self.modem.read_line()?;
        if !line.contains(SMS_URC) {
            return Ok(());
        }
        if let Some(message) = sms::read_incoming(&mut self.modem)? {
            self.reply_to = Some(message.sender.clone());
            if sms::is_stop(&message.body) {
                self.modem.begin_op("guard stopped by SMS");
                sms::send(&mut self.modem, &message.sender, &[sms::ACK_STOP])?;
                sms::purge(&mut self.modem)?;
                gnss::power_off(&mut self.modem)?;
                self.mode = SessionMode::Idle;
            }
        }
        Ok(())
    }
}
